//! Locator configuration.

use serde::{Deserialize, Serialize};

use crate::{Aabb, LocatorError};

/// Default leaf capacity.
pub const DEFAULT_MAX_POINTS_PER_LEAF: usize = 128;

/// Side length of a flat axis, relative to the largest extent.
const MIN_SIDE_RATIO: f64 = 0.1;

/// Distance the min faces are pushed out, relative to the largest extent.
const FUDGE_RATIO: f64 = 1e-5;

/// Settings for building a [`PointLocator`](crate::PointLocator).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocatorConfig {
    /// Leaf capacity before subdivision; must be at least 1.
    pub max_points_per_leaf: usize,

    /// Grow the root box to a cube so every descendant cell is a cube too.
    pub build_cubic_octree: bool,

    /// Pad the root box so points on the caller's min faces are contained.
    pub pad_root_bounds: bool,

    /// Distance below which two points are considered the same point by
    /// [`PointLocator::insert_unique_point`](crate::PointLocator::insert_unique_point).
    /// `0.0` means exact coordinate equality.
    pub insert_tolerance: f64,
}

impl Default for LocatorConfig {
    fn default() -> Self {
        Self {
            max_points_per_leaf: DEFAULT_MAX_POINTS_PER_LEAF,
            build_cubic_octree: false,
            pad_root_bounds: true,
            insert_tolerance: 0.0,
        }
    }
}

impl LocatorConfig {
    /// Creates the default configuration with the given leaf capacity.
    pub fn with_max_points_per_leaf(max_points_per_leaf: usize) -> Self {
        Self {
            max_points_per_leaf,
            ..Self::default()
        }
    }

    /// Checks the settings without building anything.
    pub fn validate(&self) -> Result<(), LocatorError> {
        if self.max_points_per_leaf < 1 {
            return Err(LocatorError::InvalidMaxPointsPerLeaf(self.max_points_per_leaf));
        }
        if !(self.insert_tolerance.is_finite() && self.insert_tolerance >= 0.0) {
            return Err(LocatorError::InvalidTolerance(self.insert_tolerance));
        }
        Ok(())
    }

    /// Derives the root cell from the caller's data bounds.
    ///
    /// With `build_cubic_octree`, every axis is grown symmetrically to the
    /// largest extent. With `pad_root_bounds`, axes thinner than a tenth of
    /// the largest extent are widened to that size around their center, and
    /// the min face of every other axis is pushed out by a small fudge factor,
    /// so that the half-open root cell contains every point of `bounds`.
    pub fn root_bounds(&self, bounds: &Aabb) -> Aabb {
        let largest = match bounds.max_extent() {
            e if e > 0.0 => e,
            _ => 1.0,
        };
        let center = bounds.center();
        let mut min = bounds.min();
        let mut max = bounds.max();

        if self.build_cubic_octree {
            for axis in 0..3 {
                min[axis] = center[axis] - 0.5 * largest;
                max[axis] = center[axis] + 0.5 * largest;
            }
        }

        if self.pad_root_bounds {
            let min_side = largest * MIN_SIDE_RATIO;
            let fudge = largest * FUDGE_RATIO;
            for axis in 0..3 {
                if max[axis] - min[axis] < min_side {
                    min[axis] = center[axis] - 0.5 * min_side;
                    max[axis] = center[axis] + 0.5 * min_side;
                } else {
                    min[axis] -= fudge;
                }
            }
        }

        Aabb::new(min, max)
    }
}
