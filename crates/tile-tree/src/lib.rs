//! Level-of-detail statistics over a point octree.
//!
//! Features (buildings, cloud points, mesh pieces) are indexed by their
//! centroids in an [`octree_locator::Octree`]. Once the tree is complete,
//! [`TileStatistics`] computes a tight bound and a geometric error per node,
//! and [`Tileset::build`] turns them into a nested region manifest whose
//! leaves reference externally written tile content.
//!
//! # Architecture
//!
//! - [`FeatureBounds`]: Per-feature boxes supplied by the caller
//! - [`ContentPolicy`]: Strategy for errors, chosen by [`ContentKind`]
//! - [`TileStatistics`]: The two passes over a finished tree
//! - [`Projection`]: Maps tight bounds to manifest regions
//! - [`TileContentWriter`]: Called once per non-empty leaf
//! - [`TileTree`]: Builds the tree from features and ties the above together

pub mod config;
pub mod content;
mod error;
mod features;
pub mod manifest;
mod projection;
mod statistics;
mod tiler;
pub mod writer;

pub use config::{Config, ConfigError, TilerConfig};
pub use content::{
    Buildings, ContentKind, ContentPolicy, ErrorContext, Mesh, PointCloud, Refine,
    TraversalOrder, MIN_POINTS_GEOMETRIC_ERROR,
};
pub use error::{ProjectionError, TileError, TileIssue};
pub use features::FeatureBounds;
pub use manifest::{Tile, Tileset, TilesetReport};
pub use projection::{GeodeticDegrees, IdentityProjection, Projection, Region};
pub use statistics::TileStatistics;
pub use tiler::TileTree;
pub use writer::{write_contents, CollectingWriter, FnWriter, TileContent, TileContentWriter, WriteReport};
