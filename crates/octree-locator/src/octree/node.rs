//! Octree node implementation.

use nalgebra::Point3;

use crate::{Aabb, PointId};

/// Identifier of a node, also its index in the tree's node arena.
pub type NodeId = usize;

/// Which of a node's two boxes a boundary query measures against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoxKind {
    /// The fixed spatial cell (half-open on the min side).
    Spatial,
    /// The tight box around the points stored in or under the node.
    Data,
}

/// The part of a box boundary that is closest to a query point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundaryFeature {
    /// The point is inside the box; the distance is to the nearest eligible face.
    Interior,
    /// Outside along one axis.
    Face,
    /// Outside along two axes.
    Edge,
    /// Outside along all three axes.
    Corner,
}

/// Result of a boundary distance query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundaryDistance {
    /// Squared Euclidean distance, `f64::INFINITY` when no face is eligible.
    pub distance2: f64,
    /// Closest point on the boundary (the query point itself when none).
    pub closest: Point3<f64>,
    pub feature: BoundaryFeature,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AxisRelation {
    Below,
    Within,
    Above,
}

/// A node in the octree.
///
/// Each node owns a fixed axis-aligned spatial cell. A leaf stores the indices
/// of the points that fall in its cell; an internal node has exactly eight
/// children that partition the cell and stores no indices.
///
/// # Point Index Storage
///
/// A leaf's index list is optional: a leaf that never received a point, or
/// that handed its points to children during subdivision, holds `None`.
/// Leafness is therefore decided by the absence of children, not by the
/// absence of indices.
///
/// A leaf holds at most `max_points_per_leaf` indices unless every point in it
/// has exactly the same coordinates. Such duplicate clusters are allowed to
/// grow without bound, since no subdivision could ever separate them.
#[derive(Debug, Clone)]
pub struct OctreeNode {
    id: NodeId,
    parent: Option<NodeId>,
    children: Option<[NodeId; 8]>,
    level: usize,

    /// Fixed spatial cell.
    spatial: Aabb,

    /// Tight box around the points in this subtree.
    data: Aabb,

    number_of_points: usize,

    point_ids: Option<Vec<PointId>>,
}

impl OctreeNode {
    /// Creates an empty leaf covering `spatial`.
    pub(crate) fn new(id: NodeId, parent: Option<NodeId>, level: usize, spatial: Aabb) -> Self {
        Self {
            id,
            parent,
            children: None,
            level,
            spatial,
            data: Aabb::empty(),
            number_of_points: 0,
            point_ids: None,
        }
    }

    #[inline]
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Returns the parent's id, `None` for the root.
    #[inline]
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Returns the eight child ids in octant order, `None` for a leaf.
    #[inline]
    pub fn children(&self) -> Option<&[NodeId; 8]> {
        self.children.as_ref()
    }

    /// Returns the child id for octant `index`.
    #[inline]
    pub fn child(&self, index: usize) -> Option<NodeId> {
        self.children.map(|c| c[index])
    }

    /// Depth of this node, `0` for the root.
    #[inline]
    pub fn level(&self) -> usize {
        self.level
    }

    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.children.is_none()
    }

    #[inline]
    pub fn spatial_bounds(&self) -> &Aabb {
        &self.spatial
    }

    /// Returns the data box; empty until a point has been inserted below.
    #[inline]
    pub fn data_bounds(&self) -> &Aabb {
        &self.data
    }

    /// Number of points in this subtree, duplicates counted individually.
    #[inline]
    pub fn number_of_points(&self) -> usize {
        self.number_of_points
    }

    /// Point indices held by this leaf, `None` for internal and empty leaves.
    #[inline]
    pub fn point_ids(&self) -> Option<&[PointId]> {
        self.point_ids.as_deref()
    }

    /// Half-open containment against the spatial cell: `min < p <= max`.
    #[inline]
    pub fn contains_point(&self, p: &Point3<f64>) -> bool {
        self.spatial.contains_half_open(p)
    }

    /// Inclusive containment against the data box.
    #[inline]
    pub fn contains_point_by_data(&self, p: &Point3<f64>) -> bool {
        self.number_of_points > 0 && self.data.contains_inclusive(p)
    }

    /// Returns the octant of `p` relative to this node's midpoint.
    ///
    /// The midpoint is the max corner of child 0. `p` is assumed to lie in
    /// this node; no bounds check is made.
    #[inline]
    pub fn child_index_for(&self, p: &Point3<f64>) -> usize {
        let mid = self.spatial.center();
        (0..3).fold(0, |index, axis| {
            index | (usize::from(p[axis] > mid[axis]) << axis)
        })
    }

    /// Returns `true` if every point in this node coincides with `p`.
    ///
    /// This holds exactly when the data box has collapsed onto `p`.
    #[inline]
    pub fn contains_duplicate_points_only(&self, p: &Point3<f64>) -> bool {
        self.number_of_points > 0 && self.data.is_degenerate_at(p)
    }

    /// Computes the squared distance from `p` to the boundary of one of this
    /// node's boxes.
    ///
    /// Each axis of `p` is classified as below, within, or above the box. With
    /// one, two, or three axes outside, the closest boundary point lies on a
    /// face, an edge, or a corner. With all three within, the result is the
    /// distance to the nearest face; if `inner_only` is set, faces lying on the
    /// root box `root` are skipped, since no point can lie beyond them.
    ///
    /// The spatial cell is half-open, so a point on its min face counts as
    /// outside (at distance zero). An empty data box is infinitely far away.
    pub fn distance2_to_boundary(
        &self,
        p: &Point3<f64>,
        root: &Aabb,
        kind: BoxKind,
        inner_only: bool,
    ) -> BoundaryDistance {
        let bounds = match kind {
            BoxKind::Spatial => &self.spatial,
            BoxKind::Data => &self.data,
        };

        if bounds.is_empty() {
            return BoundaryDistance {
                distance2: f64::INFINITY,
                closest: *p,
                feature: BoundaryFeature::Interior,
            };
        }

        let (lo, hi) = (bounds.min(), bounds.max());
        let relations: [AxisRelation; 3] = std::array::from_fn(|axis| {
            let below = match kind {
                BoxKind::Spatial => p[axis] <= lo[axis],
                BoxKind::Data => p[axis] < lo[axis],
            };
            if below {
                AxisRelation::Below
            } else if p[axis] > hi[axis] {
                AxisRelation::Above
            } else {
                AxisRelation::Within
            }
        });

        let outside = relations
            .iter()
            .filter(|r| **r != AxisRelation::Within)
            .count();

        let feature = match outside {
            0 => return Self::distance2_to_nearest_face(p, bounds, root, inner_only),
            1 => BoundaryFeature::Face,
            2 => BoundaryFeature::Edge,
            _ => BoundaryFeature::Corner,
        };

        // Clamp each outside axis onto the box; within axes keep the query value.
        let mut closest = *p;
        for (axis, relation) in relations.iter().enumerate() {
            match relation {
                AxisRelation::Below => closest[axis] = lo[axis],
                AxisRelation::Above => closest[axis] = hi[axis],
                AxisRelation::Within => {}
            }
        }

        BoundaryDistance {
            distance2: nalgebra::distance_squared(p, &closest),
            closest,
            feature,
        }
    }

    /// Distance from `p` to the inner faces of the spatial cell.
    ///
    /// Any point of the tree closer to `p` than this value must lie inside
    /// this node, which lets nearest-point searches stop early.
    #[inline]
    pub fn distance2_to_inner_boundary(&self, p: &Point3<f64>, root: &Aabb) -> f64 {
        self.distance2_to_boundary(p, root, BoxKind::Spatial, true)
            .distance2
    }

    fn distance2_to_nearest_face(
        p: &Point3<f64>,
        bounds: &Aabb,
        root: &Aabb,
        inner_only: bool,
    ) -> BoundaryDistance {
        let (lo, hi) = (bounds.min(), bounds.max());
        let (root_lo, root_hi) = (root.min(), root.max());

        let mut best = BoundaryDistance {
            distance2: f64::INFINITY,
            closest: *p,
            feature: BoundaryFeature::Interior,
        };

        for axis in 0..3 {
            let faces = [
                (lo[axis], p[axis] - lo[axis], root_lo[axis]),
                (hi[axis], hi[axis] - p[axis], root_hi[axis]),
            ];
            for (face, gap, root_face) in faces {
                if inner_only && face == root_face {
                    continue;
                }
                let distance2 = gap * gap;
                if distance2 < best.distance2 {
                    let mut closest = *p;
                    closest[axis] = face;
                    best = BoundaryDistance {
                        distance2,
                        closest,
                        feature: BoundaryFeature::Interior,
                    };
                }
            }
        }

        best
    }

    /// Adds `count` copies of `p` to the counter and data box of this node only.
    #[inline]
    pub(crate) fn update_counter_and_data_bounds(&mut self, p: &Point3<f64>, count: usize) {
        self.number_of_points += count;
        self.data.expand_to_point(p);
    }

    pub(crate) fn set_children(&mut self, children: [NodeId; 8]) {
        debug_assert!(self.children.is_none(), "node {} already subdivided", self.id);
        self.children = Some(children);
    }

    #[inline]
    pub(crate) fn take_point_ids(&mut self) -> Option<Vec<PointId>> {
        self.point_ids.take()
    }

    /// Installs an index list; an empty list leaves the node without one.
    #[inline]
    pub(crate) fn set_point_ids(&mut self, ids: Vec<PointId>) {
        self.point_ids = (!ids.is_empty()).then_some(ids);
    }

    #[inline]
    pub(crate) fn push_point_id(&mut self, id: PointId) {
        self.point_ids.get_or_insert_with(Vec::new).push(id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn unit_node() -> OctreeNode {
        OctreeNode::new(0, None, 0, Aabb::from_bounds([0.0, 1.0, 0.0, 1.0, 0.0, 1.0]))
    }

    #[test]
    fn new_node_is_empty_leaf() {
        let node = unit_node();

        assert!(node.is_leaf());
        assert!(node.point_ids().is_none());
        assert_eq!(node.number_of_points(), 0);
        assert!(node.data_bounds().is_empty());
        assert_eq!(node.parent(), None);
    }

    #[test]
    fn contains_point_is_half_open() {
        let node = unit_node();

        assert!(node.contains_point(&Point3::new(1.0, 1.0, 1.0)));
        assert!(!node.contains_point(&Point3::new(0.0, 0.5, 0.5)));
        assert!(!node.contains_point(&Point3::new(0.5, 1.5, 0.5)));
    }

    #[test]
    fn contains_point_by_data_is_inclusive() {
        let mut node = unit_node();
        assert!(!node.contains_point_by_data(&Point3::new(0.5, 0.5, 0.5)));

        node.update_counter_and_data_bounds(&Point3::new(0.25, 0.25, 0.25), 1);
        node.update_counter_and_data_bounds(&Point3::new(0.75, 0.75, 0.75), 1);

        assert!(node.contains_point_by_data(&Point3::new(0.25, 0.25, 0.25)));
        assert!(node.contains_point_by_data(&Point3::new(0.5, 0.75, 0.3)));
        assert!(!node.contains_point_by_data(&Point3::new(0.1, 0.5, 0.5)));
    }

    #[test]
    fn child_index_bits() {
        let node = unit_node();

        assert_eq!(node.child_index_for(&Point3::new(0.25, 0.25, 0.25)), 0);
        assert_eq!(node.child_index_for(&Point3::new(0.75, 0.25, 0.25)), 1);
        assert_eq!(node.child_index_for(&Point3::new(0.25, 0.75, 0.25)), 2);
        assert_eq!(node.child_index_for(&Point3::new(0.25, 0.25, 0.75)), 4);
        assert_eq!(node.child_index_for(&Point3::new(0.75, 0.75, 0.75)), 7);
        // The midpoint itself belongs to the lower octant.
        assert_eq!(node.child_index_for(&Point3::new(0.5, 0.5, 0.5)), 0);
    }

    #[test]
    fn duplicate_detection_uses_collapsed_data_box() {
        let mut node = unit_node();
        let p = Point3::new(0.3, 0.3, 0.3);
        assert!(!node.contains_duplicate_points_only(&p));

        node.update_counter_and_data_bounds(&p, 3);
        assert!(node.contains_duplicate_points_only(&p));
        assert!(!node.contains_duplicate_points_only(&Point3::new(0.3, 0.3, 0.4)));

        node.update_counter_and_data_bounds(&Point3::new(0.4, 0.3, 0.3), 1);
        assert!(!node.contains_duplicate_points_only(&p));
    }

    #[test]
    fn boundary_distance_face_edge_corner() {
        let node = unit_node();
        let root = *node.spatial_bounds();

        let face = node.distance2_to_boundary(&Point3::new(2.0, 0.5, 0.5), &root, BoxKind::Spatial, false);
        assert_eq!(face.feature, BoundaryFeature::Face);
        assert_relative_eq!(face.distance2, 1.0);
        assert_eq!(face.closest, Point3::new(1.0, 0.5, 0.5));

        let edge = node.distance2_to_boundary(&Point3::new(2.0, -1.0, 0.5), &root, BoxKind::Spatial, false);
        assert_eq!(edge.feature, BoundaryFeature::Edge);
        assert_relative_eq!(edge.distance2, 2.0);
        assert_eq!(edge.closest, Point3::new(1.0, 0.0, 0.5));

        let corner = node.distance2_to_boundary(&Point3::new(2.0, 2.0, -2.0), &root, BoxKind::Spatial, false);
        assert_eq!(corner.feature, BoundaryFeature::Corner);
        assert_relative_eq!(corner.distance2, 1.0 + 1.0 + 4.0);
        assert_eq!(corner.closest, Point3::new(1.0, 1.0, 0.0));
    }

    #[test]
    fn boundary_distance_inside_picks_nearest_face() {
        let node = unit_node();
        let root = *node.spatial_bounds();

        let d = node.distance2_to_boundary(&Point3::new(0.9, 0.5, 0.4), &root, BoxKind::Spatial, false);
        assert_eq!(d.feature, BoundaryFeature::Interior);
        assert_relative_eq!(d.distance2, 0.01, epsilon = 1e-12);
        assert_eq!(d.closest, Point3::new(1.0, 0.5, 0.4));
    }

    #[test]
    fn inner_boundary_skips_root_faces() {
        let root_node = unit_node();
        let root = *root_node.spatial_bounds();

        // The root itself has no inner face.
        assert_eq!(
            root_node.distance2_to_inner_boundary(&Point3::new(0.5, 0.5, 0.5), &root),
            f64::INFINITY
        );

        // Octant 0 only shares its three max faces with siblings.
        let child = OctreeNode::new(1, Some(0), 1, root.octant(0));
        let p = Point3::new(0.05, 0.4, 0.3);
        assert_relative_eq!(child.distance2_to_inner_boundary(&p, &root), 0.01, epsilon = 1e-12);

        let all_faces = child.distance2_to_boundary(&p, &root, BoxKind::Spatial, false);
        assert_relative_eq!(all_faces.distance2, 0.0025, epsilon = 1e-12);
    }

    #[test]
    fn data_boundary_of_empty_node_is_infinite() {
        let node = unit_node();
        let root = *node.spatial_bounds();
        let d = node.distance2_to_boundary(&Point3::new(0.5, 0.5, 0.5), &root, BoxKind::Data, false);
        assert_eq!(d.distance2, f64::INFINITY);
    }

    #[test]
    fn set_point_ids_drops_empty_lists() {
        let mut node = unit_node();
        node.set_point_ids(Vec::new());
        assert!(node.point_ids().is_none());

        node.set_point_ids(vec![4, 2]);
        node.push_point_id(7);
        assert_eq!(node.point_ids(), Some(&[4, 2, 7][..]));
        assert_eq!(node.take_point_ids(), Some(vec![4, 2, 7]));
        assert!(node.point_ids().is_none());
    }
}
