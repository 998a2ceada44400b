//! Incremental point locator built on the octree.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

use nalgebra::Point3;

use crate::{Aabb, InsertMode, LocatorConfig, LocatorError, PointId, PointStore};

use super::node::{BoxKind, NodeId, OctreeNode};
use super::tree::Octree;

/// A f64 wrapper that implements Ord using total_cmp.
#[derive(Debug, Clone, Copy, PartialEq)]
struct OrdF64(f64);

impl Eq for OrdF64 {}

impl PartialOrd for OrdF64 {
    #[inline]
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OrdF64 {
    #[inline]
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

/// Owns an [`Octree`] and the point store it indexes, and answers
/// proximity queries.
///
/// Points are inserted one at a time; each insertion may restructure the
/// tree, so insertion takes `&mut self` and queries take `&self`.
///
/// ```ignore
/// use octree_locator::{Aabb, PointLocator};
/// use nalgebra::Point3;
///
/// let mut locator = PointLocator::new(Aabb::from_bounds([0.0, 1.0, 0.0, 1.0, 0.0, 1.0]), 16)?;
/// locator.insert_next_point(Point3::new(0.2, 0.4, 0.6));
/// let nearest = locator.find_closest_point(&Point3::new(0.0, 0.0, 0.0));
/// ```
#[derive(Debug, Clone)]
pub struct PointLocator<S: PointStore = Vec<Point3<f64>>> {
    tree: Octree,
    points: S,
    insert_tolerance2: f64,
}

impl PointLocator<Vec<Point3<f64>>> {
    /// Creates a locator whose root covers `bounds` exactly.
    ///
    /// Points on the min faces of `bounds` are outside the half-open root
    /// cell; use [`PointLocator::with_config`] to pad the root instead.
    pub fn new(bounds: Aabb, max_points_per_leaf: usize) -> Result<Self, LocatorError> {
        Ok(Self {
            tree: Octree::new(bounds, max_points_per_leaf)?,
            points: Vec::new(),
            insert_tolerance2: 0.0,
        })
    }

    /// Creates a locator for data within `bounds`, deriving the root cell
    /// from `config`.
    pub fn with_config(bounds: Aabb, config: &LocatorConfig) -> Result<Self, LocatorError> {
        Self::with_store(bounds, config, Vec::new())
    }
}

impl<S: PointStore> PointLocator<S> {
    /// Creates an empty locator that writes coordinates into `points`.
    ///
    /// Indices already in `points` are not registered; see
    /// [`PointLocator::build_from_points`].
    pub fn with_store(bounds: Aabb, config: &LocatorConfig, points: S) -> Result<Self, LocatorError> {
        config.validate()?;
        let root = config.root_bounds(&bounds);
        let tree = Octree::new(root, config.max_points_per_leaf)?;
        log::debug!(
            "point locator root {:?}, {} points per leaf",
            root.to_bounds(),
            config.max_points_per_leaf
        );
        Ok(Self {
            tree,
            points,
            insert_tolerance2: config.insert_tolerance * config.insert_tolerance,
        })
    }

    /// Builds a locator over every point already in `points`.
    ///
    /// Equivalent to inserting the points in index order into a locator
    /// sized to their bounds.
    pub fn build_from_points(points: S, config: &LocatorConfig) -> Result<Self, LocatorError> {
        let mut bounds = Aabb::empty();
        for id in 0..points.len() {
            bounds.expand_to_point(&points.point(id));
        }
        if bounds.is_empty() {
            return Err(LocatorError::InvalidBounds(bounds.to_bounds()));
        }

        let count = points.len();
        let mut locator = Self::with_store(bounds, config, points)?;
        for id in 0..count {
            locator.register_point_index(id);
        }
        log::debug!(
            "built octree over {count} points: {} nodes, {} levels",
            locator.number_of_nodes(),
            locator.number_of_levels()
        );
        Ok(locator)
    }

    #[inline]
    pub fn tree(&self) -> &Octree {
        &self.tree
    }

    #[inline]
    pub fn points(&self) -> &S {
        &self.points
    }

    /// Consumes the locator and returns its point store.
    pub fn into_points(self) -> S {
        self.points
    }

    /// Consumes the locator and returns the tree and the point store.
    pub fn into_parts(self) -> (Octree, S) {
        (self.tree, self.points)
    }

    #[inline]
    pub fn number_of_points(&self) -> usize {
        self.tree.number_of_points()
    }

    #[inline]
    pub fn number_of_nodes(&self) -> usize {
        self.tree.number_of_nodes()
    }

    #[inline]
    pub fn number_of_levels(&self) -> usize {
        self.tree.number_of_levels()
    }

    #[inline]
    pub fn max_points_per_leaf(&self) -> usize {
        self.tree.max_points_per_leaf()
    }

    /// Returns the root cell.
    #[inline]
    pub fn bounds(&self) -> &Aabb {
        self.tree.bounds()
    }

    /// Appends `p` to the store and inserts it. Returns the new index.
    pub fn insert_next_point(&mut self, p: Point3<f64>) -> PointId {
        self.tree.insert_point(&mut self.points, p, InsertMode::Append)
    }

    /// Stores `p` at `id` and inserts it.
    pub fn insert_point(&mut self, p: Point3<f64>, id: PointId) -> PointId {
        self.tree.insert_point(&mut self.points, p, InsertMode::StoreAt(id))
    }

    /// Inserts the point already stored at `id`.
    pub fn register_point_index(&mut self, id: PointId) -> PointId {
        let p = self.points.point(id);
        self.tree
            .insert_point(&mut self.points, p, InsertMode::RegisterIndex(id))
    }

    /// Returns the index of a stored point that coincides with `p`.
    ///
    /// With a zero tolerance, only exact coordinate matches count; otherwise
    /// the closest point within the tolerance is returned.
    pub fn is_inserted_point(&self, p: &Point3<f64>) -> Option<PointId> {
        if self.tree.number_of_points() == 0 {
            return None;
        }
        if self.insert_tolerance2 > 0.0 {
            return self
                .closest_best_first(p, self.insert_tolerance2, None)
                .map(|(id, _)| id);
        }
        if !self.tree.root().contains_point(p) {
            return None;
        }
        // Exact duplicates always share a leaf.
        let leaf = self.tree.node(self.tree.leaf_containing(p));
        leaf.point_ids()?
            .iter()
            .copied()
            .find(|&id| self.points.point(id) == *p)
    }

    /// Inserts `p` unless a coinciding point is already stored.
    ///
    /// Returns the point's index and whether it was newly inserted.
    pub fn insert_unique_point(&mut self, p: Point3<f64>) -> (PointId, bool) {
        match self.is_inserted_point(&p) {
            Some(id) => (id, false),
            None => (self.insert_next_point(p), true),
        }
    }

    /// Returns the index of the stored point nearest to `p`.
    ///
    /// Returns `None` for an empty locator.
    pub fn find_closest_point(&self, p: &Point3<f64>) -> Option<PointId> {
        self.find_closest_point_with_distance(p).map(|(id, _)| id)
    }

    /// Returns the nearest stored point and its squared distance to `p`.
    ///
    /// The leaf containing `p` is searched first. If no point outside it can
    /// be as close (its inner boundary is farther than the best candidate), the
    /// search stops; otherwise nodes are expanded nearest-first by the
    /// distance to their data boxes, skipping any that cannot hold a closer
    /// point.
    pub fn find_closest_point_with_distance(&self, p: &Point3<f64>) -> Option<(PointId, f64)> {
        if self.tree.number_of_points() == 0 {
            return None;
        }

        let mut seed = None;
        if self.tree.root().contains_point(p) {
            let leaf = self.tree.node(self.tree.leaf_containing(p));
            if let Some(found) = self.closest_in_leaf(leaf, p, None) {
                if found.1 < leaf.distance2_to_inner_boundary(p, self.tree.bounds()) {
                    return Some(found);
                }
                seed = Some(found);
            }
        }

        self.closest_best_first(p, f64::INFINITY, seed)
    }

    /// Returns the nearest stored point within `radius` of `p`, with its
    /// squared distance.
    pub fn find_closest_point_within_radius(
        &self,
        radius: f64,
        p: &Point3<f64>,
    ) -> Option<(PointId, f64)> {
        if self.tree.number_of_points() == 0 || radius < 0.0 {
            return None;
        }
        self.closest_best_first(p, radius * radius, None)
    }

    /// Returns every stored point within `radius` of `p`, in depth-first
    /// leaf order.
    pub fn find_points_within_radius(&self, radius: f64, p: &Point3<f64>) -> Vec<PointId> {
        let mut result = Vec::new();
        if self.tree.number_of_points() == 0 || radius < 0.0 {
            return result;
        }
        let radius2 = radius * radius;

        let mut stack = vec![Octree::ROOT];
        while let Some(id) = stack.pop() {
            let node = self.tree.node(id);
            if node.number_of_points() == 0 || self.min_distance2(node, p) > radius2 {
                continue;
            }
            match node.children() {
                Some(children) => stack.extend(children.iter().rev()),
                None => result.extend(
                    node.point_ids()
                        .unwrap_or(&[])
                        .iter()
                        .copied()
                        .filter(|&pid| nalgebra::distance_squared(&self.points.point(pid), p) <= radius2),
                ),
            }
        }
        result
    }

    /// Returns the `n` stored points nearest to `p`, closest first.
    ///
    /// Ties are broken by point index. Fewer than `n` indices are returned if
    /// the locator holds fewer points.
    pub fn find_closest_n_points(&self, n: usize, p: &Point3<f64>) -> Vec<PointId> {
        if n == 0 || self.tree.number_of_points() == 0 {
            return Vec::new();
        }

        // Max-heap of the best candidates so far; the worst sits on top.
        let mut best: BinaryHeap<(OrdF64, PointId)> = BinaryHeap::with_capacity(n + 1);
        let mut frontier = BinaryHeap::new();
        frontier.push(Reverse((OrdF64(self.min_distance2(self.tree.root(), p)), Octree::ROOT)));

        while let Some(Reverse((OrdF64(bound), id))) = frontier.pop() {
            if best.len() == n && best.peek().is_some_and(|(worst, _)| bound > worst.0) {
                break;
            }
            let node = self.tree.node(id);
            match node.children() {
                Some(children) => self.push_children(children, p, &mut frontier),
                None => {
                    for &pid in node.point_ids().unwrap_or(&[]) {
                        let d2 = nalgebra::distance_squared(&self.points.point(pid), p);
                        best.push((OrdF64(d2), pid));
                        if best.len() > n {
                            best.pop();
                        }
                    }
                }
            }
        }

        best.into_sorted_vec().into_iter().map(|(_, pid)| pid).collect()
    }

    /// Returns the spatial cells of all nodes at depth `level`.
    pub fn node_boxes_at_level(&self, level: usize) -> Vec<Aabb> {
        self.tree
            .nodes_at_level(level)
            .map(|n| *n.spatial_bounds())
            .collect()
    }

    /// Best-first nearest search limited to squared distance `limit2`.
    ///
    /// `seed` is a candidate already found, used to prune from the start.
    fn closest_best_first(
        &self,
        p: &Point3<f64>,
        limit2: f64,
        seed: Option<(PointId, f64)>,
    ) -> Option<(PointId, f64)> {
        let mut best = seed.filter(|&(_, d2)| d2 <= limit2);
        let mut frontier = BinaryHeap::new();
        frontier.push(Reverse((OrdF64(self.min_distance2(self.tree.root(), p)), Octree::ROOT)));

        while let Some(Reverse((OrdF64(bound), id))) = frontier.pop() {
            let cutoff = best.map_or(limit2, |(_, d2)| d2);
            if bound > cutoff {
                break;
            }
            let node = self.tree.node(id);
            match node.children() {
                Some(children) => self.push_children(children, p, &mut frontier),
                None => {
                    if let Some(found) = self.closest_in_leaf(node, p, best) {
                        if found.1 <= limit2 {
                            best = Some(found);
                        }
                    }
                }
            }
        }
        best
    }

    fn push_children(
        &self,
        children: &[NodeId; 8],
        p: &Point3<f64>,
        frontier: &mut BinaryHeap<Reverse<(OrdF64, NodeId)>>,
    ) {
        for &child in children {
            let node = self.tree.node(child);
            if node.number_of_points() > 0 {
                frontier.push(Reverse((OrdF64(self.min_distance2(node, p)), child)));
            }
        }
    }

    /// Scans a leaf for a point closer than `current`, ties going to the
    /// lower index.
    fn closest_in_leaf(
        &self,
        leaf: &OctreeNode,
        p: &Point3<f64>,
        current: Option<(PointId, f64)>,
    ) -> Option<(PointId, f64)> {
        let mut best = current;
        for &pid in leaf.point_ids().unwrap_or(&[]) {
            let d2 = nalgebra::distance_squared(&self.points.point(pid), p);
            let closer = best.is_none_or(|(bid, bd2)| d2 < bd2 || (d2 == bd2 && pid < bid));
            if closer {
                best = Some((pid, d2));
            }
        }
        best
    }

    /// Lower bound of the squared distance from `p` to any point under `node`.
    fn min_distance2(&self, node: &OctreeNode, p: &Point3<f64>) -> f64 {
        if node.contains_point_by_data(p) {
            0.0
        } else {
            node.distance2_to_boundary(p, self.tree.bounds(), BoxKind::Data, false)
                .distance2
        }
    }
}
