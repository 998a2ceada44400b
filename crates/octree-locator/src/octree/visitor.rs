//! Visitor pattern for octree traversal.
//!
//! Visitors allow custom processing of nodes during tree traversal
//! without coupling traversal order to specific use cases.

use super::node::{NodeId, OctreeNode};

/// Visitor for processing nodes during octree traversal.
///
/// Implement this trait to define custom behavior when walking the tree with
/// [`Octree::traverse_pre_order`](super::Octree::traverse_pre_order) or
/// [`Octree::traverse_post_order`](super::Octree::traverse_post_order).
/// Common uses include:
/// - Aggregating per-node statistics bottom-up
/// - Propagating values top-down
/// - Collecting leaves for export
pub trait OctreeVisitor {
    /// Called once for each node during traversal.
    fn visit(&mut self, node: &OctreeNode);
}

/// A simple visitor that records the ids of visited nodes.
#[derive(Debug, Default)]
pub struct CollectingVisitor {
    collected: Vec<NodeId>,
}

impl CollectingVisitor {
    /// Creates a new empty collecting visitor.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the collected ids in visit order.
    pub fn into_ids(self) -> Vec<NodeId> {
        self.collected
    }
}

impl OctreeVisitor for CollectingVisitor {
    fn visit(&mut self, node: &OctreeNode) {
        self.collected.push(node.id());
    }
}

/// A visitor that calls a closure for each node.
pub struct FnVisitor<F>
where
    F: FnMut(&OctreeNode),
{
    func: F,
}

impl<F> FnVisitor<F>
where
    F: FnMut(&OctreeNode),
{
    /// Creates a new visitor from a closure.
    pub fn new(func: F) -> Self {
        Self { func }
    }
}

impl<F> OctreeVisitor for FnVisitor<F>
where
    F: FnMut(&OctreeNode),
{
    fn visit(&mut self, node: &OctreeNode) {
        (self.func)(node);
    }
}
