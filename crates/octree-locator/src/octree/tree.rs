//! Octree container, incremental insertion and subdivision.

use nalgebra::Point3;

use crate::{Aabb, InsertMode, LocatorError, PointId, PointStore};

use super::node::{NodeId, OctreeNode};
use super::visitor::OctreeVisitor;

/// An incrementally built octree over points held in an external store.
///
/// Nodes live in an arena and refer to each other by [`NodeId`]. A node's id
/// is its position in the arena and is assigned when the node is created: the
/// root is `0` and each subdivision appends eight consecutive ids in octant
/// order. Ids are stable for the lifetime of the tree, so they can index
/// per-node side tables.
///
/// # Insertion
///
/// A point descends to the unique leaf whose half-open cell contains it. If
/// that leaf is full, it is split into eight octants and its points are
/// redistributed; a leaf whose points are all exact duplicates of each other
/// instead keeps accepting duplicates past the capacity limit.
///
/// ```ignore
/// use octree_locator::{Aabb, InsertMode, Octree};
/// use nalgebra::Point3;
///
/// let mut tree = Octree::new(Aabb::from_bounds([0.0, 1.0, 0.0, 1.0, 0.0, 1.0]), 8)?;
/// let mut points: Vec<Point3<f64>> = Vec::new();
/// let id = tree.insert_point(&mut points, Point3::new(0.5, 0.5, 0.5), InsertMode::Append);
/// ```
///
/// There is no deletion, and the depth of the tree is not bounded.
#[derive(Debug, Clone)]
pub struct Octree {
    nodes: Vec<OctreeNode>,
    max_points_per_leaf: usize,
    number_of_levels: usize,
}

impl Octree {
    /// Id of the root node.
    pub const ROOT: NodeId = 0;

    /// Creates a tree whose root covers `bounds` exactly.
    ///
    /// Returns an error if `max_points_per_leaf` is zero or the bounds are
    /// not finite.
    pub fn new(bounds: Aabb, max_points_per_leaf: usize) -> Result<Self, LocatorError> {
        if max_points_per_leaf < 1 {
            return Err(LocatorError::InvalidMaxPointsPerLeaf(max_points_per_leaf));
        }
        let finite = bounds.min().iter().chain(bounds.max().iter()).all(|v| v.is_finite());
        if !finite || bounds.is_empty() {
            return Err(LocatorError::InvalidBounds(bounds.to_bounds()));
        }

        Ok(Self {
            nodes: vec![OctreeNode::new(Self::ROOT, None, 0, bounds)],
            max_points_per_leaf,
            number_of_levels: 1,
        })
    }

    #[inline]
    pub fn root(&self) -> &OctreeNode {
        &self.nodes[Self::ROOT]
    }

    /// Returns the node with the given id.
    ///
    /// # Panics
    /// Panics if `id` is not a node of this tree.
    #[inline]
    pub fn node(&self, id: NodeId) -> &OctreeNode {
        &self.nodes[id]
    }

    /// Returns all nodes, indexed by id.
    #[inline]
    pub fn nodes(&self) -> &[OctreeNode] {
        &self.nodes
    }

    #[inline]
    pub fn number_of_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Number of levels, `1` for a tree that is only a root.
    #[inline]
    pub fn number_of_levels(&self) -> usize {
        self.number_of_levels
    }

    #[inline]
    pub fn max_points_per_leaf(&self) -> usize {
        self.max_points_per_leaf
    }

    /// Total number of points inserted.
    #[inline]
    pub fn number_of_points(&self) -> usize {
        self.root().number_of_points()
    }

    #[inline]
    pub fn bounds(&self) -> &Aabb {
        self.root().spatial_bounds()
    }

    /// Returns the leaf whose cell contains `p`.
    ///
    /// `p` is assumed to lie inside the root cell.
    pub fn leaf_containing(&self, p: &Point3<f64>) -> NodeId {
        let mut current = Self::ROOT;
        while let Some(children) = self.nodes[current].children() {
            current = children[self.nodes[current].child_index_for(p)];
        }
        current
    }

    /// Inserts `p` and returns its point index.
    ///
    /// `mode` decides how the coordinate reaches `store`; it is written exactly
    /// once, when the point reaches its final leaf.
    pub fn insert_point<S: PointStore + ?Sized>(
        &mut self,
        store: &mut S,
        p: Point3<f64>,
        mode: InsertMode,
    ) -> PointId {
        debug_assert!(
            self.root().contains_point(&p),
            "point {p:?} lies outside the root cell {:?}",
            self.bounds()
        );
        let leaf = self.leaf_containing(&p);
        self.insert_into_leaf(leaf, store, p, mode)
    }

    /// Inserts `p` into the leaf `leaf`, subdividing it on overflow.
    fn insert_into_leaf<S: PointStore + ?Sized>(
        &mut self,
        leaf: NodeId,
        store: &mut S,
        p: Point3<f64>,
        mode: InsertMode,
    ) -> PointId {
        let node = &self.nodes[leaf];
        debug_assert!(node.is_leaf(), "node {leaf} is not a leaf");

        let has_room = node
            .point_ids()
            .is_none_or(|ids| ids.len() < self.max_points_per_leaf);

        if has_room || node.contains_duplicate_points_only(&p) {
            let id = mode.write(store, p);
            self.nodes[leaf].push_point_id(id);
            self.propagate_up(leaf, &p, 1, None);
            return id;
        }

        let ids = self.nodes[leaf].take_point_ids().unwrap_or_default();
        self.create_child_nodes(leaf, store, ids, p, mode)
    }

    /// Splits the full leaf `node`, whose former points are `ids`, and inserts `p`.
    ///
    /// Two situations lead here:
    /// 1. the leaf holds exactly `max_points_per_leaf` points that are not all
    ///    duplicates of each other;
    /// 2. the leaf holds at least `max_points_per_leaf` exact duplicates and
    ///    `p` differs from them.
    fn create_child_nodes<S: PointStore + ?Sized>(
        &mut self,
        node: NodeId,
        store: &mut S,
        ids: Vec<PointId>,
        p: Point3<f64>,
        mode: InsertMode,
    ) -> PointId {
        let first = store.point(ids[0]);
        if self.nodes[node].contains_duplicate_points_only(&first) {
            return self.separate_duplicates(node, store, ids, first, p, mode);
        }

        let children = self.spawn_children(node);
        let mut buckets: [Vec<PointId>; 8] = Default::default();
        for id in ids {
            let q = store.point(id);
            let octant = self.nodes[node].child_index_for(&q);
            self.nodes[children[octant]].update_counter_and_data_bounds(&q, 1);
            buckets[octant].push(id);
        }

        // All former points fit in one leaf, so at most one child can be full.
        let full = buckets
            .iter()
            .position(|bucket| bucket.len() == self.max_points_per_leaf);
        let target = self.nodes[node].child_index_for(&p);

        let mut handoff = None;
        for (octant, bucket) in buckets.into_iter().enumerate() {
            if full == Some(target) && octant == target {
                handoff = Some(bucket);
            } else {
                self.nodes[children[octant]].set_point_ids(bucket);
            }
        }

        match handoff {
            Some(bucket) => self.create_child_nodes(children[target], store, bucket, p, mode),
            None => self.insert_into_leaf(children[target], store, p, mode),
        }
    }

    /// Subdivides below `node` until the duplicate cluster at `dup` and the new
    /// point `p` fall into different leaves.
    ///
    /// The cluster's index list `ids` moves to its new leaf unchanged. `node`
    /// and its ancestors already count the cluster, so only the new point is
    /// propagated through them.
    fn separate_duplicates<S: PointStore + ?Sized>(
        &mut self,
        node: NodeId,
        store: &mut S,
        ids: Vec<PointId>,
        dup: Point3<f64>,
        p: Point3<f64>,
        mode: InsertMode,
    ) -> PointId {
        let mut current = node;
        let (dup_leaf, new_leaf) = loop {
            let children = self.spawn_children(current);
            let dup_octant = self.nodes[current].child_index_for(&dup);
            let new_octant = self.nodes[current].child_index_for(&p);
            if dup_octant != new_octant {
                break (children[dup_octant], children[new_octant]);
            }
            current = children[dup_octant];
        };

        let id = mode.write(store, p);
        self.nodes[new_leaf].push_point_id(id);
        self.propagate_up(new_leaf, &p, 1, None);

        let count = ids.len();
        log::trace!("moved {count} duplicate points from node {node} to node {dup_leaf}");
        self.nodes[dup_leaf].set_point_ids(ids);
        self.propagate_up(dup_leaf, &dup, count, Some(node));

        id
    }

    /// Appends eight empty children to `parent` and returns their ids.
    fn spawn_children(&mut self, parent: NodeId) -> [NodeId; 8] {
        let base = self.nodes.len();
        let spatial = *self.nodes[parent].spatial_bounds();
        let level = self.nodes[parent].level() + 1;

        for octant in 0..8 {
            self.nodes.push(OctreeNode::new(
                base + octant,
                Some(parent),
                level,
                spatial.octant(octant),
            ));
        }

        let children = std::array::from_fn(|octant| base + octant);
        self.nodes[parent].set_children(children);
        self.number_of_levels = self.number_of_levels.max(level + 1);

        log::trace!("subdivided node {parent} into nodes {base}..{}", base + 8);
        children
    }

    /// Adds `count` copies of `p` to `from` and its ancestors, stopping before
    /// `stop` (or after the root if `stop` is `None`).
    fn propagate_up(&mut self, from: NodeId, p: &Point3<f64>, count: usize, stop: Option<NodeId>) {
        let mut current = Some(from);
        while let Some(id) = current {
            if Some(id) == stop {
                break;
            }
            let node = &mut self.nodes[id];
            node.update_counter_and_data_bounds(p, count);
            current = node.parent();
        }
    }

    /// Collects the point indices under `node`, in depth-first leaf order.
    pub fn export_point_ids(&self, node: NodeId) -> Vec<PointId> {
        let mut result = Vec::with_capacity(self.nodes[node].number_of_points());
        self.append_point_ids(node, &mut result);
        result
    }

    /// Appends the point indices under `node` to `out`, in depth-first leaf order.
    pub fn append_point_ids(&self, node: NodeId, out: &mut Vec<PointId>) {
        let node = &self.nodes[node];
        if let Some(ids) = node.point_ids() {
            out.extend_from_slice(ids);
        }
        if let Some(children) = node.children() {
            for &child in children {
                self.append_point_ids(child, out);
            }
        }
    }

    /// Writes the point indices under `node` into `dest` starting at `offset`,
    /// in the same order as [`Octree::export_point_ids`].
    ///
    /// Returns the offset one past the last index written.
    ///
    /// # Panics
    /// Panics if `dest` is too short.
    pub fn export_point_ids_into(&self, node: NodeId, dest: &mut [PointId], offset: usize) -> usize {
        let node = &self.nodes[node];
        let mut offset = offset;
        if let Some(ids) = node.point_ids() {
            dest[offset..offset + ids.len()].copy_from_slice(ids);
            offset += ids.len();
        }
        if let Some(children) = node.children() {
            for &child in children {
                offset = self.export_point_ids_into(child, dest, offset);
            }
        }
        offset
    }

    /// Visits every node, parents before children.
    pub fn traverse_pre_order<V: OctreeVisitor>(&self, visitor: &mut V) {
        traverse_pre_order_node(self, Self::ROOT, visitor);
    }

    /// Visits every node, children before parents.
    pub fn traverse_post_order<V: OctreeVisitor>(&self, visitor: &mut V) {
        traverse_post_order_node(self, Self::ROOT, visitor);
    }

    /// Returns the nodes at depth `level`, in id order.
    pub fn nodes_at_level(&self, level: usize) -> impl Iterator<Item = &OctreeNode> {
        self.nodes.iter().filter(move |n| n.level() == level)
    }

    /// Returns the leaves, in id order.
    pub fn leaves(&self) -> impl Iterator<Item = &OctreeNode> {
        self.nodes.iter().filter(|n| n.is_leaf())
    }
}

/// Traverses a node subtree parents-first.
fn traverse_pre_order_node<V: OctreeVisitor>(tree: &Octree, id: NodeId, visitor: &mut V) {
    let node = tree.node(id);
    visitor.visit(node);
    if let Some(children) = node.children() {
        for &child in children {
            traverse_pre_order_node(tree, child, visitor);
        }
    }
}

/// Traverses a node subtree children-first.
fn traverse_post_order_node<V: OctreeVisitor>(tree: &Octree, id: NodeId, visitor: &mut V) {
    let node = tree.node(id);
    if let Some(children) = node.children() {
        for &child in children {
            traverse_post_order_node(tree, child, visitor);
        }
    }
    visitor.visit(node);
}
