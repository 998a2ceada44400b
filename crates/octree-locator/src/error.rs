//! Errors raised while setting up a point locator.

use thiserror::Error;

/// Errors from [`PointLocator`](crate::PointLocator) construction.
///
/// Insertion and queries never fail at runtime: points outside the root and
/// queries against an empty tree are caller-checked preconditions.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LocatorError {
    /// A leaf must be allowed to hold at least one point.
    #[error("max points per leaf must be at least 1, got {0}")]
    InvalidMaxPointsPerLeaf(usize),

    /// The coalescing tolerance must be finite and non-negative.
    #[error("insert tolerance must be finite and non-negative, got {0}")]
    InvalidTolerance(f64),

    /// The root box has a non-finite or inverted extent.
    #[error("invalid root bounds: {0:?}")]
    InvalidBounds([f64; 6]),
}
