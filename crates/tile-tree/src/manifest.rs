//! Nested region manifest.
//!
//! Serializes to a 3D Tiles style `tileset.json`: each tile carries a
//! bounding region, its geometric error, and either a content URI (leaves)
//! or its non-empty children.

use octree_locator::{NodeId, Octree};
use serde::{Deserialize, Serialize};

use crate::content::Refine;
use crate::projection::{Projection, Region};
use crate::statistics::TileStatistics;
use crate::{TileError, TileIssue};

/// Manifest format version written to `asset.version`.
pub const TILESET_VERSION: &str = "1.0";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tileset {
    pub asset: Asset,
    pub geometric_error: f64,
    pub root: Tile,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    pub version: String,
}

impl Default for Asset {
    fn default() -> Self {
        Self {
            version: TILESET_VERSION.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tile {
    pub bounding_volume: BoundingVolume,
    pub geometric_error: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refine: Option<Refine>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<Content>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Tile>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingVolume {
    /// `[west, south, east, north, min_height, max_height]`.
    pub region: Region,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Content {
    pub uri: String,
}

/// Relative URI of a leaf's content: `"{id}/{id}.{extension}"`.
pub fn content_uri(node: NodeId, extension: &str) -> String {
    format!("{node}/{node}.{extension}")
}

/// A manifest and the nodes that had to be left out of it.
#[derive(Debug)]
pub struct TilesetReport {
    pub tileset: Tileset,
    pub issues: Vec<TileIssue>,
}

impl Tileset {
    /// Builds the manifest depth-first from finished statistics.
    ///
    /// Empty nodes are omitted. A node whose region cannot be projected is
    /// omitted together with its subtree and reported. Fails only if the
    /// whole tree is empty or the root cannot be projected.
    pub fn build<P: Projection + ?Sized>(
        tree: &Octree,
        statistics: &TileStatistics,
        projection: &P,
        refine: Refine,
        extension: &str,
    ) -> Result<TilesetReport, TileError> {
        if statistics.is_empty(Octree::ROOT) {
            return Err(TileError::EmptyTree);
        }

        let builder = TileBuilder {
            tree,
            statistics,
            projection,
            extension,
        };
        let region = projection
            .project_region(statistics.tight_bound(Octree::ROOT))
            .map_err(|source| TileError::Projection {
                node: Octree::ROOT,
                source,
            })?;

        let mut issues = Vec::new();
        let mut root = builder.tile(Octree::ROOT, region, &mut issues);
        root.refine = Some(refine);

        Ok(TilesetReport {
            tileset: Tileset {
                asset: Asset::default(),
                geometric_error: statistics.tileset_error(),
                root,
            },
            issues,
        })
    }

    pub fn to_json(&self) -> Result<String, TileError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, TileError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Number of tiles in the manifest, root included.
    pub fn number_of_tiles(&self) -> usize {
        fn count(tile: &Tile) -> usize {
            1 + tile.children.iter().map(count).sum::<usize>()
        }
        count(&self.root)
    }
}

struct TileBuilder<'a, P: ?Sized> {
    tree: &'a Octree,
    statistics: &'a TileStatistics,
    projection: &'a P,
    extension: &'a str,
}

impl<P: Projection + ?Sized> TileBuilder<'_, P> {
    fn tile(&self, id: NodeId, region: Region, issues: &mut Vec<TileIssue>) -> Tile {
        let node = self.tree.node(id);
        let mut tile = Tile {
            bounding_volume: BoundingVolume { region },
            geometric_error: self.statistics.geometric_error(id),
            refine: None,
            content: None,
            children: Vec::new(),
        };

        match node.children() {
            None => {
                tile.content = Some(Content {
                    uri: content_uri(id, self.extension),
                });
            }
            Some(children) => {
                for &child in children {
                    if let Some(child_tile) = self.child_tile(child, issues) {
                        tile.children.push(child_tile);
                    }
                }
            }
        }
        tile
    }

    fn child_tile(&self, id: NodeId, issues: &mut Vec<TileIssue>) -> Option<Tile> {
        if self.statistics.is_empty(id) {
            return None;
        }
        match self.projection.project_region(self.statistics.tight_bound(id)) {
            Ok(region) => Some(self.tile(id, region, issues)),
            Err(source) => {
                log::warn!("omitting node {id} from the manifest: {source}");
                issues.push(TileIssue {
                    node: Some(id),
                    error: TileError::Projection { node: id, source },
                });
                None
            }
        }
    }
}
