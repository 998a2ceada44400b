//! Axis-aligned bounding boxes for octree cells and point data.

use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};

/// An axis-aligned bounding box in 3D space.
///
/// The same type describes two different things in the octree:
/// - the fixed spatial cell of a node, tested with [`Aabb::contains_half_open`]
///   so that siblings sharing a face never both own a point on it;
/// - the data box of a node, which grows as points arrive and is tested with
///   [`Aabb::contains_inclusive`].
///
/// An empty box has `min = +inf` and `max = -inf`. Expanding it by a single
/// point collapses it onto that point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    min: Point3<f64>,
    max: Point3<f64>,
}

impl Aabb {
    /// Creates a box from its min and max corners.
    ///
    /// # Panics (debug builds only)
    /// Panics if `min > max` on any axis.
    pub fn new(min: Point3<f64>, max: Point3<f64>) -> Self {
        debug_assert!(
            min.x <= max.x && min.y <= max.y && min.z <= max.z,
            "Aabb min must be <= max on all axes"
        );
        Self { min, max }
    }

    /// Creates a box from a `[xmin, xmax, ymin, ymax, zmin, zmax]` tuple.
    pub fn from_bounds(bounds: [f64; 6]) -> Self {
        Self::new(
            Point3::new(bounds[0], bounds[2], bounds[4]),
            Point3::new(bounds[1], bounds[3], bounds[5]),
        )
    }

    /// Returns the box as a `[xmin, xmax, ymin, ymax, zmin, zmax]` tuple.
    pub fn to_bounds(&self) -> [f64; 6] {
        [
            self.min.x, self.max.x, self.min.y, self.max.y, self.min.z, self.max.z,
        ]
    }

    /// Returns the empty box, the identity of [`Aabb::expand_to_box`].
    pub fn empty() -> Self {
        Self {
            min: Point3::new(f64::INFINITY, f64::INFINITY, f64::INFINITY),
            max: Point3::new(f64::NEG_INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY),
        }
    }

    /// Returns the tight box around `points`, or the empty box if there are none.
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Point3<f64>>) -> Self {
        let mut result = Self::empty();
        for p in points {
            result.expand_to_point(p);
        }
        result
    }

    /// Returns `true` if no point has been added to this box.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    #[inline]
    pub fn min(&self) -> Point3<f64> {
        self.min
    }

    #[inline]
    pub fn max(&self) -> Point3<f64> {
        self.max
    }

    /// Returns the midpoint of the box.
    #[inline]
    pub fn center(&self) -> Point3<f64> {
        nalgebra::center(&self.min, &self.max)
    }

    /// Returns `max - min`.
    #[inline]
    pub fn extent(&self) -> Vector3<f64> {
        self.max - self.min
    }

    /// Returns the largest side length.
    #[inline]
    pub fn max_extent(&self) -> f64 {
        self.extent().max()
    }

    /// Length of the space diagonal, `0.0` for an empty box.
    pub fn diagonal(&self) -> f64 {
        if self.is_empty() {
            0.0
        } else {
            self.extent().norm()
        }
    }

    /// Grows the box to include `p`.
    #[inline]
    pub fn expand_to_point(&mut self, p: &Point3<f64>) {
        self.min = self.min.inf(p);
        self.max = self.max.sup(p);
    }

    /// Grows the box to include `other`. Empty boxes are ignored.
    pub fn expand_to_box(&mut self, other: &Aabb) {
        if other.is_empty() {
            return;
        }
        self.min = self.min.inf(&other.min);
        self.max = self.max.sup(&other.max);
    }

    /// Returns the union of two boxes.
    pub fn union(&self, other: &Aabb) -> Aabb {
        let mut result = *self;
        result.expand_to_box(other);
        result
    }

    /// Half-open containment: `min < p <= max` on every axis.
    #[inline]
    pub fn contains_half_open(&self, p: &Point3<f64>) -> bool {
        (0..3).all(|i| self.min[i] < p[i] && p[i] <= self.max[i])
    }

    /// Inclusive containment: `min <= p <= max` on every axis.
    #[inline]
    pub fn contains_inclusive(&self, p: &Point3<f64>) -> bool {
        (0..3).all(|i| self.min[i] <= p[i] && p[i] <= self.max[i])
    }

    /// Returns `true` if the box has collapsed onto the single point `p`.
    #[inline]
    pub fn is_degenerate_at(&self, p: &Point3<f64>) -> bool {
        self.min == *p && self.max == *p
    }

    /// Returns `true` if `other` lies entirely inside this box (inclusive).
    pub fn contains_box(&self, other: &Aabb) -> bool {
        other.is_empty()
            || (self.contains_inclusive(&other.min) && self.contains_inclusive(&other.max))
    }

    /// Returns the octant with index `index` (bit 0 = x, bit 1 = y, bit 2 = z).
    ///
    /// A set bit selects the upper half of that axis. Octant 0's max corner is
    /// the center of this box.
    pub fn octant(&self, index: usize) -> Aabb {
        debug_assert!(index < 8, "octant index out of range: {index}");
        let mid = self.center();
        let mut min = self.min;
        let mut max = mid;
        for axis in 0..3 {
            if index & (1 << axis) != 0 {
                min[axis] = mid[axis];
                max[axis] = self.max[axis];
            }
        }
        Aabb { min, max }
    }

    /// Returns the eight corners, indexed like [`Aabb::octant`].
    pub fn corners(&self) -> [Point3<f64>; 8] {
        std::array::from_fn(|index| {
            Point3::new(
                if index & 1 != 0 { self.max.x } else { self.min.x },
                if index & 2 != 0 { self.max.y } else { self.min.y },
                if index & 4 != 0 { self.max.z } else { self.min.z },
            )
        })
    }
}

impl Default for Aabb {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn unit_box() -> Aabb {
        Aabb::from_bounds([0.0, 1.0, 0.0, 1.0, 0.0, 1.0])
    }

    #[test]
    fn empty_box_collapses_to_first_point() {
        let mut b = Aabb::empty();
        assert!(b.is_empty());
        assert_eq!(b.diagonal(), 0.0);

        let p = Point3::new(1.0, 2.0, 3.0);
        b.expand_to_point(&p);
        assert!(!b.is_empty());
        assert!(b.is_degenerate_at(&p));
    }

    #[test]
    fn bounds_tuple_order() {
        let b = Aabb::from_bounds([1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        assert_eq!(b.min(), Point3::new(1.0, 3.0, 5.0));
        assert_eq!(b.max(), Point3::new(2.0, 4.0, 6.0));
        assert_eq!(b.to_bounds(), [1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn half_open_excludes_min_face() {
        let b = unit_box();
        assert!(!b.contains_half_open(&Point3::new(0.0, 0.5, 0.5)));
        assert!(b.contains_half_open(&Point3::new(1.0, 0.5, 0.5)));
        assert!(b.contains_inclusive(&Point3::new(0.0, 0.5, 0.5)));
    }

    #[test]
    fn octants_share_center() {
        let b = unit_box();
        assert_eq!(b.octant(0).max(), b.center());
        assert_eq!(b.octant(7).min(), b.center());
        assert_eq!(b.octant(1).min(), Point3::new(0.5, 0.0, 0.0));
        assert_eq!(b.octant(6).max(), Point3::new(0.5, 1.0, 1.0));
    }

    #[test]
    fn corners_match_octant_bits() {
        let corners = unit_box().corners();
        assert_eq!(corners[0], Point3::new(0.0, 0.0, 0.0));
        assert_eq!(corners[5], Point3::new(1.0, 0.0, 1.0));
        assert_eq!(corners[7], Point3::new(1.0, 1.0, 1.0));
    }

    #[test]
    fn union_ignores_empty() {
        let b = unit_box();
        assert_eq!(b.union(&Aabb::empty()), b);
        let other = Aabb::from_bounds([-1.0, 0.5, 0.0, 2.0, 0.0, 1.0]);
        assert_eq!(
            b.union(&other),
            Aabb::from_bounds([-1.0, 1.0, 0.0, 2.0, 0.0, 1.0])
        );
    }

    #[test]
    fn diagonal_of_unit_box() {
        assert_relative_eq!(unit_box().diagonal(), 3.0_f64.sqrt());
    }
}
