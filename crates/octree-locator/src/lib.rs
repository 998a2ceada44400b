//! Incremental point octree and point locator.

mod bounds;
mod config;
mod error;
pub mod octree;
mod store;

pub use bounds::Aabb;
pub use config::{LocatorConfig, DEFAULT_MAX_POINTS_PER_LEAF};
pub use error::LocatorError;
pub use octree::{
    BoundaryDistance, BoundaryFeature, BoxKind, CollectingVisitor, FnVisitor, NodeId, Octree,
    OctreeNode, OctreeVisitor, PointLocator,
};
pub use store::{InsertMode, PointId, PointStore};
