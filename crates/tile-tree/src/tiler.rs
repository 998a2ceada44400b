//! Builds a tile tree from feature boxes and emits its manifest and contents.

use nalgebra::Point3;
use octree_locator::{Aabb, LocatorConfig, Octree, PointId, PointLocator};

use crate::manifest::{Tileset, TilesetReport};
use crate::projection::Projection;
use crate::statistics::TileStatistics;
use crate::writer::{TileContentWriter, WriteReport};
use crate::{ContentPolicy, FeatureBounds, TileError, TileIssue, TilerConfig};

/// An octree over feature centroids together with its tile statistics.
///
/// Each feature is inserted at the center of its box under its own id, so
/// leaf point ids are feature ids.
///
/// ```ignore
/// let tiles = TileTree::build(&building_boxes, &TilerConfig::new(ContentKind::Buildings))?;
/// let report = tiles.tileset(&GeodeticDegrees)?;
/// std::fs::write("tileset.json", report.tileset.to_json()?)?;
/// tiles.write_contents(&mut my_b3dm_writer);
/// ```
pub struct TileTree {
    tree: Octree,
    centroids: Vec<Option<Point3<f64>>>,
    statistics: TileStatistics,
    policy: Box<dyn ContentPolicy>,
    extension: String,
    issues: Vec<TileIssue>,
}

impl TileTree {
    /// Indexes every feature and computes the statistics.
    ///
    /// Features without geometry are left out and recorded in
    /// [`TileTree::issues`]. Fails if `config` does not validate or no
    /// feature remains.
    pub fn build<F: FeatureBounds + ?Sized>(
        features: &F,
        config: &TilerConfig,
    ) -> Result<Self, TileError> {
        config.validate()?;

        let mut issues = Vec::new();
        let mut centroids = vec![None; features.feature_count()];
        let mut placed = Vec::with_capacity(features.feature_count());
        for (id, centroid) in centroids.iter_mut().enumerate() {
            match features.feature_center(id) {
                Ok(center) => {
                    *centroid = Some(center);
                    placed.push((id, center));
                }
                Err(error) => {
                    log::warn!("feature {id} left out of the tree: {error}");
                    issues.push(TileIssue { node: None, error });
                }
            }
        }
        if placed.is_empty() {
            return Err(TileError::EmptyTree);
        }

        // Centroids on the min faces of their own bounds must land inside the root.
        let locator_config = LocatorConfig {
            pad_root_bounds: true,
            ..config.locator.clone()
        };
        let bounds = Aabb::from_points(placed.iter().map(|(_, center)| center));
        let mut locator = PointLocator::with_config(bounds, &locator_config)?;
        for (id, center) in placed {
            locator.insert_point(center, id);
        }
        let tree = locator.into_parts().0;

        let policy = config.content.policy();
        let statistics = TileStatistics::compute(&tree, features, policy.as_ref());
        log::debug!(
            "tile tree over {} features: {} nodes, {} levels",
            tree.number_of_points(),
            tree.number_of_nodes(),
            tree.number_of_levels()
        );

        Ok(Self {
            tree,
            centroids,
            statistics,
            extension: config.extension(),
            policy,
            issues,
        })
    }

    #[inline]
    pub fn tree(&self) -> &Octree {
        &self.tree
    }

    /// Centroid of each feature, indexed by feature id. `None` for features
    /// left out of the tree.
    #[inline]
    pub fn centroids(&self) -> &[Option<Point3<f64>>] {
        &self.centroids
    }

    /// Centroid of feature `id`, if it was indexed.
    #[inline]
    pub fn centroid(&self, id: PointId) -> Option<Point3<f64>> {
        self.centroids.get(id).copied().flatten()
    }

    #[inline]
    pub fn statistics(&self) -> &TileStatistics {
        &self.statistics
    }

    #[inline]
    pub fn policy(&self) -> &dyn ContentPolicy {
        self.policy.as_ref()
    }

    #[inline]
    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Features left out while building, followed by those the statistics
    /// skipped.
    pub fn issues(&self) -> impl Iterator<Item = &TileIssue> {
        self.issues.iter().chain(self.statistics.issues())
    }

    /// Emits the manifest through `projection`.
    pub fn tileset<P: Projection + ?Sized>(&self, projection: &P) -> Result<TilesetReport, TileError> {
        Tileset::build(
            &self.tree,
            &self.statistics,
            projection,
            self.policy.refine(),
            &self.extension,
        )
    }

    /// Calls `writer` for each non-empty leaf, depth-first.
    pub fn write_contents<W: TileContentWriter + ?Sized>(&self, writer: &mut W) -> WriteReport {
        crate::write_contents(&self.tree, &self.statistics, &self.extension, writer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{MIN_POINTS_GEOMETRIC_ERROR, Refine};
    use crate::writer::CollectingWriter;
    use crate::{ConfigError, ContentKind, GeodeticDegrees, IdentityProjection};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn init_logger() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn city(rng: &mut StdRng, count: usize) -> Vec<Aabb> {
        (0..count)
            .map(|_| {
                let lon = rng.gen_range(4.0..5.0);
                let lat = rng.gen_range(52.0..53.0);
                let footprint = rng.gen_range(0.0001..0.001);
                let height = rng.gen_range(3.0..60.0);
                Aabb::from_bounds([lon, lon + footprint, lat, lat + footprint, 0.0, height])
            })
            .collect()
    }

    #[test]
    fn buildings_end_to_end() {
        init_logger();
        let mut rng = StdRng::seed_from_u64(42);
        let features = city(&mut rng, 500);
        let config = TilerConfig {
            locator: LocatorConfig::with_max_points_per_leaf(20),
            ..TilerConfig::new(ContentKind::Buildings)
        };

        let tiles = TileTree::build(&features, &config).unwrap();
        assert_eq!(tiles.tree().number_of_points(), 500);
        assert_eq!(tiles.centroids().len(), 500);
        assert_eq!(tiles.issues().count(), 0);
        assert!(tiles.tree().number_of_levels() > 1);

        let report = tiles.tileset(&GeodeticDegrees).unwrap();
        assert!(report.issues.is_empty());
        let tileset = report.tileset;
        assert_eq!(tileset.root.refine, Some(Refine::Add));
        let region = tileset.root.bounding_volume.region;
        assert!(region[0] >= 4.0_f64.to_radians() && region[2] <= 5.001_f64.to_radians());
        assert!(region[4] == 0.0 && region[5] < 60.0);

        let mut writer = CollectingWriter::new();
        let written = tiles.write_contents(&mut writer);
        assert!(written.is_complete());
        let mut all_ids: Vec<usize> = writer.tiles().iter().flat_map(|t| t.2.iter().copied()).collect();
        all_ids.sort_unstable();
        assert_eq!(all_ids, (0..500).collect::<Vec<_>>());
        assert!(writer.tiles().iter().all(|t| t.1.ends_with(".b3dm")));
    }

    #[test]
    fn points_use_custom_extension() {
        let mut rng = StdRng::seed_from_u64(9);
        let points: Vec<Point3<f64>> = (0..300)
            .map(|_| Point3::new(rng.gen_range(0.0..100.0), rng.gen_range(0.0..100.0), rng.gen_range(0.0..10.0)))
            .collect();
        let config = TilerConfig {
            extension: Some("bin".to_string()),
            locator: LocatorConfig::with_max_points_per_leaf(32),
            ..TilerConfig::new(ContentKind::Points)
        };

        let tiles = TileTree::build(&points, &config).unwrap();
        let tileset = tiles.tileset(&IdentityProjection).unwrap().tileset;

        assert!(tileset.geometric_error >= tileset.root.geometric_error);
        assert!(tileset.root.geometric_error >= MIN_POINTS_GEOMETRIC_ERROR);
        let json = tileset.to_json().unwrap();
        assert!(json.contains(".bin\""));
        assert!(!json.contains(".pnts"));
    }

    #[test]
    fn features_without_geometry_are_reported() {
        let features = vec![
            Aabb::from_bounds([0.0, 1.0, 0.0, 1.0, 0.0, 1.0]),
            Aabb::empty(),
            Aabb::from_bounds([5.0, 6.0, 5.0, 6.0, 0.0, 2.0]),
        ];
        let tiles = TileTree::build(&features, &TilerConfig::new(ContentKind::Mesh)).unwrap();

        assert_eq!(tiles.tree().number_of_points(), 2);
        let issues: Vec<&TileIssue> = tiles.issues().collect();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].node, None);
        assert!(matches!(issues[0].error, TileError::MissingGeometry(1)));
        assert_eq!(tiles.extension(), "glb");
    }

    #[test]
    fn no_usable_features_is_an_error() {
        let features = vec![Aabb::empty()];
        let result = TileTree::build(&features, &TilerConfig::default());
        assert!(matches!(result, Err(TileError::EmptyTree)));

        let none: Vec<Aabb> = Vec::new();
        assert!(matches!(
            TileTree::build(&none, &TilerConfig::default()),
            Err(TileError::EmptyTree)
        ));
    }

    #[test]
    fn invalid_locator_config_is_rejected() {
        let features = vec![Aabb::from_bounds([0.0, 1.0, 0.0, 1.0, 0.0, 1.0])];
        let config = TilerConfig {
            locator: LocatorConfig::with_max_points_per_leaf(0),
            ..TilerConfig::default()
        };
        assert!(matches!(
            TileTree::build(&features, &config),
            Err(TileError::Config(ConfigError::Invalid(_)))
        ));
    }

    #[test]
    fn path_like_extensions_are_rejected() {
        let features = vec![Aabb::from_bounds([0.0, 1.0, 0.0, 1.0, 0.0, 1.0])];
        for ext in ["../x", "../../etc/x", "a/b", ".glb", ""] {
            let config = TilerConfig {
                extension: Some(ext.to_string()),
                ..TilerConfig::new(ContentKind::Mesh)
            };
            assert!(
                matches!(
                    TileTree::build(&features, &config),
                    Err(TileError::Config(ConfigError::Invalid(_)))
                ),
                "extension {ext:?} accepted"
            );
        }
    }

    #[test]
    fn centroids_keep_feature_ids_for_skipped_features() {
        let features = vec![
            Aabb::empty(),
            Aabb::from_bounds([0.0, 1.0, 0.0, 1.0, 0.0, 1.0]),
            Aabb::from_bounds([2.0, 4.0, 2.0, 4.0, 0.0, 2.0]),
            Aabb::empty(),
        ];
        let tiles = TileTree::build(&features, &TilerConfig::new(ContentKind::Buildings)).unwrap();

        assert_eq!(tiles.centroids().len(), 4);
        assert_eq!(tiles.centroid(0), None);
        assert_eq!(tiles.centroid(1), Some(Point3::new(0.5, 0.5, 0.5)));
        assert_eq!(tiles.centroid(2), Some(Point3::new(3.0, 3.0, 1.0)));
        assert_eq!(tiles.centroid(3), None);
        assert_eq!(tiles.centroid(4), None);
        assert_eq!(tiles.issues().count(), 2);

        let mut ids = tiles.tree().export_point_ids(Octree::ROOT);
        ids.sort_unstable();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn single_feature_tree() {
        let features = vec![Aabb::from_bounds([2.0, 4.0, 2.0, 4.0, 2.0, 4.0])];
        let tiles = TileTree::build(&features, &TilerConfig::new(ContentKind::Mesh)).unwrap();
        let tileset = tiles.tileset(&IdentityProjection).unwrap().tileset;

        assert_eq!(tileset.number_of_tiles(), 1);
        assert_eq!(tileset.root.content.as_ref().map(|c| c.uri.as_str()), Some("0/0.glb"));
        assert_eq!(tileset.root.bounding_volume.region, [2.0, 2.0, 4.0, 4.0, 2.0, 4.0]);
        approx::assert_relative_eq!(tileset.geometric_error, features[0].diagonal());
    }
}
