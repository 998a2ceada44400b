//! Incremental octree over an external point store.
//!
//! Points are inserted one at a time. A leaf that overflows its capacity
//! splits into eight octants and hands its points down; a leaf holding only
//! coincident points never splits, so duplicate clusters stay together
//! until a distinct point arrives.
//!
//! # Example
//!
//! ```ignore
//! use octree_locator::{Aabb, LocatorConfig, PointLocator};
//! use octree_locator::octree::CollectingVisitor;
//! use nalgebra::Point3;
//!
//! let points: Vec<Point3<f64>> = /* load a cloud */;
//! let locator = PointLocator::build_from_points(points, &LocatorConfig::default())?;
//!
//! let nearest = locator.find_closest_point(&Point3::new(0.0, 0.0, 0.0));
//!
//! // Visit parents before children
//! let mut visitor = CollectingVisitor::new();
//! locator.tree().traverse_pre_order(&mut visitor);
//! ```
//!
//! # Architecture
//!
//! - [`Octree`]: Arena of nodes; node ids are creation order, root first
//! - [`OctreeNode`]: Spatial cell, tight data box, and leaf point ids
//! - [`PointLocator`]: Owns a tree and its point store, answers queries
//! - [`OctreeVisitor`]: Visitor trait for custom traversal behavior

mod locator;
mod node;
mod tree;
mod visitor;

pub use locator::PointLocator;
pub use node::{BoundaryDistance, BoundaryFeature, BoxKind, NodeId, OctreeNode};
pub use tree::Octree;
pub use visitor::{CollectingVisitor, FnVisitor, OctreeVisitor};
