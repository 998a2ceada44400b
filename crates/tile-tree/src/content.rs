//! Content policies: how each kind of content bounds and weighs a node.
//!
//! Every policy shares the tight-bound rule (the union of what lies below)
//! but measures geometric error differently:
//!
//! - [`Buildings`]: discrete features. A node's error is the largest loss
//!   from stopping above a child, i.e. the child's own error or the biggest
//!   feature stored directly in it.
//! - [`PointCloud`]: a node's error is driven by the cell size of its
//!   children, never below [`MIN_POINTS_GEOMETRIC_ERROR`].
//! - [`Mesh`]: continuous surfaces. The root takes the diagonal of its tight
//!   bound and every level below halves it.

use octree_locator::{Aabb, NodeId, Octree, OctreeNode};
use serde::{Deserialize, Serialize};

/// Lower bound on point cloud errors, so leaves never report zero.
pub const MIN_POINTS_GEOMETRIC_ERROR: f64 = 1.0;

/// What the indexed features are.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    #[default]
    Buildings,
    Points,
    Mesh,
}

impl ContentKind {
    /// Returns the policy for this kind of content.
    pub fn policy(self) -> Box<dyn ContentPolicy> {
        match self {
            ContentKind::Buildings => Box::new(Buildings),
            ContentKind::Points => Box::new(PointCloud),
            ContentKind::Mesh => Box::new(Mesh),
        }
    }
}

/// Order in which the error pass visits nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraversalOrder {
    /// Parents before children; a node's error derives from its parent.
    PreOrder,
    /// Children before parents; a node's error derives from its children.
    PostOrder,
}

/// How a renderer combines a tile with its children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Refine {
    /// Children are drawn in addition to the parent.
    Add,
    /// Children replace the parent.
    Replace,
}

/// Read-only view of the statistics while the error pass runs.
///
/// Values for nodes the pass has not reached yet are zero.
pub struct ErrorContext<'a> {
    pub(crate) tree: &'a Octree,
    pub(crate) tight_bounds: &'a [Aabb],
    pub(crate) largest_features: &'a [f64],
    pub(crate) errors: &'a [f64],
    pub(crate) non_empty: &'a [bool],
}

impl<'a> ErrorContext<'a> {
    #[inline]
    pub fn tree(&self) -> &'a Octree {
        self.tree
    }

    #[inline]
    pub fn tight_bound(&self, id: NodeId) -> &'a Aabb {
        &self.tight_bounds[id]
    }

    /// Diagonal of the largest feature stored directly in `id`.
    #[inline]
    pub fn largest_feature(&self, id: NodeId) -> f64 {
        self.largest_features[id]
    }

    #[inline]
    pub fn error(&self, id: NodeId) -> f64 {
        self.errors[id]
    }

    #[inline]
    pub fn is_empty(&self, id: NodeId) -> bool {
        !self.non_empty[id]
    }

    /// Children of `node` that hold at least one feature.
    pub fn non_empty_children(&self, node: &OctreeNode) -> impl Iterator<Item = &'a OctreeNode> {
        node.children()
            .into_iter()
            .flatten()
            .filter(|&&child| self.non_empty[child])
            .map(|&child| self.tree.node(child))
    }
}

/// Strategy for computing tight bounds and geometric errors.
///
/// Selected once per tree from a [`ContentKind`].
pub trait ContentPolicy {
    /// Order of the error pass.
    fn traversal_order(&self) -> TraversalOrder;

    /// Refinement written on the root tile.
    fn refine(&self) -> Refine;

    /// File extension of tile content, without the dot.
    fn default_extension(&self) -> &'static str;

    /// Tight bound of a node from the features it stores and the tight bounds
    /// of its non-empty children.
    fn tight_bound(&self, features: &[Aabb], children: &[Aabb]) -> Aabb {
        features
            .iter()
            .chain(children)
            .fold(Aabb::empty(), |acc, b| acc.union(b))
    }

    /// Geometric error of a non-empty node.
    fn node_error(&self, node: &OctreeNode, ctx: &ErrorContext<'_>) -> f64;

    /// Geometric error of the whole tileset, once every node has one.
    fn tileset_error(&self, ctx: &ErrorContext<'_>) -> f64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Buildings;

impl ContentPolicy for Buildings {
    fn traversal_order(&self) -> TraversalOrder {
        TraversalOrder::PostOrder
    }

    fn refine(&self) -> Refine {
        Refine::Add
    }

    fn default_extension(&self) -> &'static str {
        "b3dm"
    }

    fn node_error(&self, node: &OctreeNode, ctx: &ErrorContext<'_>) -> f64 {
        ctx.non_empty_children(node)
            .map(|child| ctx.error(child.id()).max(ctx.largest_feature(child.id())))
            .fold(0.0, f64::max)
    }

    fn tileset_error(&self, ctx: &ErrorContext<'_>) -> f64 {
        ctx.error(Octree::ROOT).max(ctx.largest_feature(Octree::ROOT))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PointCloud;

impl ContentPolicy for PointCloud {
    fn traversal_order(&self) -> TraversalOrder {
        TraversalOrder::PostOrder
    }

    fn refine(&self) -> Refine {
        Refine::Add
    }

    fn default_extension(&self) -> &'static str {
        "pnts"
    }

    fn node_error(&self, node: &OctreeNode, ctx: &ErrorContext<'_>) -> f64 {
        ctx.non_empty_children(node)
            .map(|child| ctx.error(child.id()).max(child.spatial_bounds().diagonal()))
            .fold(MIN_POINTS_GEOMETRIC_ERROR, f64::max)
    }

    fn tileset_error(&self, ctx: &ErrorContext<'_>) -> f64 {
        let root = ctx.tree().root();
        ctx.error(root.id()).max(root.spatial_bounds().diagonal())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Mesh;

impl ContentPolicy for Mesh {
    fn traversal_order(&self) -> TraversalOrder {
        TraversalOrder::PreOrder
    }

    fn refine(&self) -> Refine {
        Refine::Replace
    }

    fn default_extension(&self) -> &'static str {
        "glb"
    }

    fn node_error(&self, node: &OctreeNode, ctx: &ErrorContext<'_>) -> f64 {
        match node.parent() {
            Some(parent) => ctx.error(parent) / 2.0,
            None => ctx.tight_bound(node.id()).diagonal(),
        }
    }

    fn tileset_error(&self, ctx: &ErrorContext<'_>) -> f64 {
        ctx.error(Octree::ROOT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_select_policies() {
        assert_eq!(ContentKind::Buildings.policy().default_extension(), "b3dm");
        assert_eq!(ContentKind::Points.policy().default_extension(), "pnts");
        assert_eq!(ContentKind::Mesh.policy().traversal_order(), TraversalOrder::PreOrder);
        assert_eq!(ContentKind::Mesh.policy().refine(), Refine::Replace);
        assert_eq!(ContentKind::default(), ContentKind::Buildings);
    }

    #[test]
    fn tight_bound_is_union() {
        let features = [Aabb::from_bounds([0.0, 1.0, 0.0, 1.0, 0.0, 1.0])];
        let children = [Aabb::from_bounds([2.0, 3.0, -1.0, 0.5, 0.0, 0.0])];

        assert_eq!(
            Buildings.tight_bound(&features, &children),
            Aabb::from_bounds([0.0, 3.0, -1.0, 1.0, 0.0, 1.0])
        );
        assert!(Mesh.tight_bound(&[], &[]).is_empty());
    }

    #[test]
    fn serde_names() {
        assert_eq!(serde_json::to_string(&Refine::Add).unwrap(), "\"ADD\"");
        assert_eq!(serde_json::to_string(&ContentKind::Points).unwrap(), "\"points\"");
        let kind: ContentKind = serde_json::from_str("\"mesh\"").unwrap();
        assert_eq!(kind, ContentKind::Mesh);
    }
}
