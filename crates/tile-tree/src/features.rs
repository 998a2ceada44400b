//! Per-feature bounding boxes.
//!
//! A feature is whatever one octree point stands for: a building, a single
//! cloud point, or a mesh piece. The tree indexes feature centroids under the
//! feature's id; statistics need the full box back.

use nalgebra::Point3;
use octree_locator::{Aabb, PointId};

use crate::TileError;

/// Supplies the bounding box of each feature by id.
pub trait FeatureBounds {
    /// Number of feature ids, including ids whose geometry is missing.
    fn feature_count(&self) -> usize;

    /// Returns the box of feature `id`.
    ///
    /// Fails with [`TileError::MissingGeometry`] if the id is unknown or the
    /// feature has no extent.
    fn feature_bounds(&self, id: PointId) -> Result<Aabb, TileError>;

    /// Point under which the feature is indexed in the octree.
    fn feature_center(&self, id: PointId) -> Result<Point3<f64>, TileError> {
        self.feature_bounds(id).map(|b| b.center())
    }
}

impl FeatureBounds for [Aabb] {
    fn feature_count(&self) -> usize {
        self.len()
    }

    fn feature_bounds(&self, id: PointId) -> Result<Aabb, TileError> {
        match self.get(id) {
            Some(b) if is_usable(b) => Ok(*b),
            _ => Err(TileError::MissingGeometry(id)),
        }
    }
}

impl FeatureBounds for Vec<Aabb> {
    fn feature_count(&self) -> usize {
        self.len()
    }

    fn feature_bounds(&self, id: PointId) -> Result<Aabb, TileError> {
        self.as_slice().feature_bounds(id)
    }
}

/// Each point is a feature with a degenerate box.
impl FeatureBounds for [Point3<f64>] {
    fn feature_count(&self) -> usize {
        self.len()
    }

    fn feature_bounds(&self, id: PointId) -> Result<Aabb, TileError> {
        match self.get(id) {
            Some(p) if p.iter().all(|v| v.is_finite()) => Ok(Aabb::new(*p, *p)),
            _ => Err(TileError::MissingGeometry(id)),
        }
    }
}

impl FeatureBounds for Vec<Point3<f64>> {
    fn feature_count(&self) -> usize {
        self.len()
    }

    fn feature_bounds(&self, id: PointId) -> Result<Aabb, TileError> {
        self.as_slice().feature_bounds(id)
    }
}

fn is_usable(b: &Aabb) -> bool {
    !b.is_empty() && b.min().iter().chain(b.max().iter()).all(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn box_features() {
        let features = vec![
            Aabb::from_bounds([0.0, 2.0, 0.0, 2.0, 0.0, 4.0]),
            Aabb::empty(),
        ];

        assert_eq!(features.feature_count(), 2);
        assert_eq!(features.feature_center(0).unwrap(), Point3::new(1.0, 1.0, 2.0));
        assert!(matches!(features.feature_bounds(1), Err(TileError::MissingGeometry(1))));
        assert!(matches!(features.feature_bounds(2), Err(TileError::MissingGeometry(2))));
    }

    #[test]
    fn point_features_are_degenerate() {
        let points = vec![Point3::new(1.0, 2.0, 3.0), Point3::new(f64::NAN, 0.0, 0.0)];

        let b = points.feature_bounds(0).unwrap();
        assert_eq!(b.diagonal(), 0.0);
        assert_eq!(b.center(), points[0]);
        assert!(points.feature_bounds(1).is_err());
    }
}
