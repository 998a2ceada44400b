//! Tight bounds and geometric errors for every node of a finished tree.

use octree_locator::{Aabb, CollectingVisitor, FnVisitor, NodeId, Octree, OctreeNode};

use crate::content::{ContentPolicy, ErrorContext, TraversalOrder};
use crate::{FeatureBounds, TileIssue};

/// Per-node statistics, indexed by node id.
///
/// Computed in two passes over an unchanging tree:
///
/// 1. Post-order: each node's tight bound is the union of the boxes of the
///    features it stores and the tight bounds of its non-empty children. A
///    node with neither is empty.
/// 2. In the policy's order: each non-empty node gets a geometric error,
///    then the tileset gets one.
///
/// Features whose bounds cannot be read are left out and recorded as issues.
#[derive(Debug)]
pub struct TileStatistics {
    tight_bounds: Vec<Aabb>,
    largest_features: Vec<f64>,
    errors: Vec<f64>,
    non_empty: Vec<bool>,
    tileset_error: f64,
    issues: Vec<TileIssue>,
}

impl TileStatistics {
    pub fn compute<F: FeatureBounds + ?Sized>(
        tree: &Octree,
        features: &F,
        policy: &dyn ContentPolicy,
    ) -> Self {
        let count = tree.number_of_nodes();
        let mut tight_bounds = vec![Aabb::empty(); count];
        let mut largest_features = vec![0.0; count];
        let mut non_empty = vec![false; count];
        let mut issues = Vec::new();

        {
            let mut bounds_pass = FnVisitor::new(|node: &OctreeNode| {
                let id = node.id();
                let mut boxes = Vec::new();
                for &feature in node.point_ids().unwrap_or(&[]) {
                    match features.feature_bounds(feature) {
                        Ok(b) => {
                            largest_features[id] = f64::max(largest_features[id], b.diagonal());
                            boxes.push(b);
                        }
                        Err(error) => {
                            log::warn!("node {id}: skipping feature {feature}: {error}");
                            issues.push(TileIssue {
                                node: Some(id),
                                error,
                            });
                        }
                    }
                }

                let children: Vec<Aabb> = node
                    .children()
                    .into_iter()
                    .flatten()
                    .filter(|&&child| non_empty[child])
                    .map(|&child| tight_bounds[child])
                    .collect();

                let bound = policy.tight_bound(&boxes, &children);
                non_empty[id] = !bound.is_empty();
                tight_bounds[id] = bound;
            });
            tree.traverse_post_order(&mut bounds_pass);
        }

        let mut order = CollectingVisitor::new();
        match policy.traversal_order() {
            TraversalOrder::PreOrder => tree.traverse_pre_order(&mut order),
            TraversalOrder::PostOrder => tree.traverse_post_order(&mut order),
        }

        let mut errors = vec![0.0; count];
        for id in order.into_ids() {
            if !non_empty[id] {
                continue;
            }
            let ctx = ErrorContext {
                tree,
                tight_bounds: &tight_bounds,
                largest_features: &largest_features,
                errors: &errors,
                non_empty: &non_empty,
            };
            errors[id] = policy.node_error(tree.node(id), &ctx);
        }

        let tileset_error = if non_empty[Octree::ROOT] {
            policy.tileset_error(&ErrorContext {
                tree,
                tight_bounds: &tight_bounds,
                largest_features: &largest_features,
                errors: &errors,
                non_empty: &non_empty,
            })
        } else {
            0.0
        };

        log::debug!(
            "tile statistics over {count} nodes: {} non-empty, tileset error {tileset_error}, {} issues",
            non_empty.iter().filter(|&&n| n).count(),
            issues.len()
        );

        Self {
            tight_bounds,
            largest_features,
            errors,
            non_empty,
            tileset_error,
            issues,
        }
    }

    #[inline]
    pub fn number_of_nodes(&self) -> usize {
        self.tight_bounds.len()
    }

    /// Union of every feature box below `id`; empty for empty nodes.
    #[inline]
    pub fn tight_bound(&self, id: NodeId) -> &Aabb {
        &self.tight_bounds[id]
    }

    #[inline]
    pub fn geometric_error(&self, id: NodeId) -> f64 {
        self.errors[id]
    }

    /// Diagonal of the largest feature stored directly in `id`.
    #[inline]
    pub fn largest_feature(&self, id: NodeId) -> f64 {
        self.largest_features[id]
    }

    #[inline]
    pub fn is_empty(&self, id: NodeId) -> bool {
        !self.non_empty[id]
    }

    #[inline]
    pub fn tileset_error(&self) -> f64 {
        self.tileset_error
    }

    /// Features left out of the bounds pass.
    #[inline]
    pub fn issues(&self) -> &[TileIssue] {
        &self.issues
    }
}
