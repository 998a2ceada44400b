//! Mapping tight bounds into the region frame of the manifest.

use nalgebra::Point3;
use octree_locator::Aabb;

use crate::ProjectionError;

/// A bounding region as `[west, south, east, north, min_height, max_height]`.
pub type Region = [f64; 6];

/// Maps points from the tree's frame into the manifest's frame.
///
/// Closures `Fn(&Point3<f64>) -> Result<Point3<f64>, ProjectionError>` are
/// projections too.
pub trait Projection {
    fn project(&self, p: &Point3<f64>) -> Result<Point3<f64>, ProjectionError>;

    /// Projects all eight corners of `bounds` and returns the region
    /// spanned by the results.
    fn project_region(&self, bounds: &Aabb) -> Result<Region, ProjectionError> {
        let mut projected = Aabb::empty();
        for corner in bounds.corners() {
            projected.expand_to_point(&self.project(&corner)?);
        }
        let (min, max) = (projected.min(), projected.max());
        Ok([min.x, min.y, max.x, max.y, min.z, max.z])
    }
}

impl<F> Projection for F
where
    F: Fn(&Point3<f64>) -> Result<Point3<f64>, ProjectionError>,
{
    fn project(&self, p: &Point3<f64>) -> Result<Point3<f64>, ProjectionError> {
        self(p)
    }
}

/// Leaves coordinates unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityProjection;

impl Projection for IdentityProjection {
    fn project(&self, p: &Point3<f64>) -> Result<Point3<f64>, ProjectionError> {
        Ok(*p)
    }
}

/// Converts longitude and latitude in degrees to radians. Height passes
/// through.
#[derive(Debug, Clone, Copy, Default)]
pub struct GeodeticDegrees;

impl Projection for GeodeticDegrees {
    fn project(&self, p: &Point3<f64>) -> Result<Point3<f64>, ProjectionError> {
        if !(p.x.is_finite() && p.y.is_finite() && p.z.is_finite()) {
            return Err(ProjectionError::new(p, "non-finite coordinate"));
        }
        if !(-90.0..=90.0).contains(&p.y) {
            return Err(ProjectionError::new(p, "latitude outside [-90, 90]"));
        }
        Ok(Point3::new(p.x.to_radians(), p.y.to_radians(), p.z))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    #[test]
    fn identity_region_reorders_bounds() {
        let bounds = Aabb::from_bounds([1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let region = IdentityProjection.project_region(&bounds).unwrap();
        assert_eq!(region, [1.0, 3.0, 2.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn geodetic_converts_degrees() {
        let bounds = Aabb::from_bounds([-180.0, 180.0, -45.0, 90.0, 0.0, 120.0]);
        let region = GeodeticDegrees.project_region(&bounds).unwrap();

        assert_relative_eq!(region[0], -PI);
        assert_relative_eq!(region[1], -PI / 4.0);
        assert_relative_eq!(region[2], PI);
        assert_relative_eq!(region[3], PI / 2.0);
        assert_eq!(region[4], 0.0);
        assert_eq!(region[5], 120.0);
    }

    #[test]
    fn geodetic_rejects_bad_latitude() {
        let bounds = Aabb::from_bounds([0.0, 1.0, 80.0, 95.0, 0.0, 1.0]);
        let err = GeodeticDegrees.project_region(&bounds).unwrap_err();
        assert_eq!(err.y, 95.0);
    }

    #[test]
    fn closure_projection() {
        let shift = |p: &Point3<f64>| -> Result<Point3<f64>, ProjectionError> {
            Ok(Point3::new(p.x + 10.0, p.y, -p.z))
        };
        let region = shift
            .project_region(&Aabb::from_bounds([0.0, 1.0, 0.0, 1.0, 2.0, 3.0]))
            .unwrap();
        // Flipping z swaps which corner holds the lowest height.
        assert_eq!(region, [10.0, 0.0, 11.0, 1.0, -3.0, -2.0]);
    }
}
