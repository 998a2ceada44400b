//! Handing leaf contents to an external serializer.

use std::fmt::Display;

use octree_locator::{Aabb, FnVisitor, NodeId, Octree, OctreeNode, PointId};

use crate::manifest::content_uri;
use crate::statistics::TileStatistics;
use crate::{TileError, TileIssue};

/// Everything a writer needs to produce one leaf's content.
#[derive(Debug, Clone, PartialEq)]
pub struct TileContent<'a> {
    pub node: NodeId,
    /// Relative URI, as referenced by the manifest.
    pub uri: String,
    /// Ids of the features stored in the leaf.
    pub feature_ids: &'a [PointId],
    pub tight_bound: &'a Aabb,
}

/// Writes the content of one leaf, e.g. a mesh or point cloud file.
pub trait TileContentWriter {
    type Error: Display;

    fn write_tile(&mut self, content: &TileContent<'_>) -> Result<(), Self::Error>;
}

/// Outcome of [`write_contents`].
#[derive(Debug, Default)]
pub struct WriteReport {
    /// Leaves written, in call order.
    pub written: Vec<NodeId>,
    pub failures: Vec<TileIssue>,
}

impl WriteReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Calls `writer` once per non-empty leaf, in depth-first order.
///
/// A failed leaf is logged and reported; the remaining leaves are still
/// written.
pub fn write_contents<W: TileContentWriter + ?Sized>(
    tree: &Octree,
    statistics: &TileStatistics,
    extension: &str,
    writer: &mut W,
) -> WriteReport {
    let mut report = WriteReport::default();
    {
        let mut visitor = FnVisitor::new(|node: &OctreeNode| {
            let id = node.id();
            if !node.is_leaf() || statistics.is_empty(id) {
                return;
            }
            let content = TileContent {
                node: id,
                uri: content_uri(id, extension),
                feature_ids: node.point_ids().unwrap_or(&[]),
                tight_bound: statistics.tight_bound(id),
            };
            match writer.write_tile(&content) {
                Ok(()) => report.written.push(id),
                Err(e) => {
                    log::warn!("failed to write {}: {e}", content.uri);
                    report.failures.push(TileIssue {
                        node: Some(id),
                        error: TileError::Writer {
                            node: id,
                            message: e.to_string(),
                        },
                    });
                }
            }
        });
        tree.traverse_pre_order(&mut visitor);
    }
    log::debug!(
        "wrote {} tiles, {} failed",
        report.written.len(),
        report.failures.len()
    );
    report
}

/// A writer that records the contents it receives.
#[derive(Debug, Default)]
pub struct CollectingWriter {
    tiles: Vec<(NodeId, String, Vec<PointId>)>,
}

impl CollectingWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `(node, uri, feature ids)` for each written leaf.
    pub fn tiles(&self) -> &[(NodeId, String, Vec<PointId>)] {
        &self.tiles
    }
}

impl TileContentWriter for CollectingWriter {
    type Error = std::convert::Infallible;

    fn write_tile(&mut self, content: &TileContent<'_>) -> Result<(), Self::Error> {
        self.tiles
            .push((content.node, content.uri.clone(), content.feature_ids.to_vec()));
        Ok(())
    }
}

/// A writer that calls a closure for each leaf.
pub struct FnWriter<F> {
    func: F,
}

impl<F, E> FnWriter<F>
where
    F: FnMut(&TileContent<'_>) -> Result<(), E>,
    E: Display,
{
    pub fn new(func: F) -> Self {
        Self { func }
    }
}

impl<F, E> TileContentWriter for FnWriter<F>
where
    F: FnMut(&TileContent<'_>) -> Result<(), E>,
    E: Display,
{
    type Error = E;

    fn write_tile(&mut self, content: &TileContent<'_>) -> Result<(), E> {
        (self.func)(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::PointCloud;
    use nalgebra::Point3;
    use octree_locator::PointLocator;

    fn clustered_tree() -> (Octree, Vec<Point3<f64>>) {
        let mut locator =
            PointLocator::new(Aabb::from_bounds([0.0, 1.0, 0.0, 1.0, 0.0, 1.0]), 2).unwrap();
        for p in [
            Point3::new(0.1, 0.1, 0.1),
            Point3::new(0.2, 0.2, 0.2),
            Point3::new(0.9, 0.1, 0.1),
            Point3::new(0.9, 0.9, 0.9),
        ] {
            locator.insert_next_point(p);
        }
        locator.into_parts()
    }

    #[test]
    fn writes_non_empty_leaves_depth_first() {
        let (tree, points) = clustered_tree();
        let stats = TileStatistics::compute(&tree, &points, &PointCloud);
        let mut writer = CollectingWriter::new();

        let report = write_contents(&tree, &stats, "pnts", &mut writer);

        assert!(report.is_complete());
        assert_eq!(report.written, vec![1, 2, 8]);
        assert_eq!(writer.tiles()[0], (1, "1/1.pnts".to_string(), vec![0, 1]));
        assert_eq!(writer.tiles()[1].2, vec![2]);
        assert_eq!(writer.tiles()[2].2, vec![3]);
    }

    #[test]
    fn failures_do_not_stop_the_walk() {
        let (tree, points) = clustered_tree();
        let stats = TileStatistics::compute(&tree, &points, &PointCloud);
        let mut seen = Vec::new();
        let mut writer = FnWriter::new(|content: &TileContent<'_>| {
            seen.push(content.node);
            if content.node == 2 {
                Err(format!("disk full at {}", content.uri))
            } else {
                Ok(())
            }
        });

        let report = write_contents(&tree, &stats, "pnts", &mut writer);

        assert_eq!(seen, vec![1, 2, 8]);
        assert_eq!(report.written, vec![1, 8]);
        assert_eq!(report.failures.len(), 1);
        match &report.failures[0].error {
            TileError::Writer { node, message } => {
                assert_eq!(*node, 2);
                assert_eq!(message, "disk full at 2/2.pnts");
            }
            other => panic!("unexpected error {other}"),
        }
    }
}
