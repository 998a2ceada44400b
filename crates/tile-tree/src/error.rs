//! Errors raised while computing tile statistics and emitting manifests.

use octree_locator::{LocatorError, NodeId, PointId};
use thiserror::Error;

use crate::ConfigError;

/// A point could not be mapped into the target frame.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("cannot project ({x}, {y}, {z}): {reason}")]
pub struct ProjectionError {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub reason: String,
}

impl ProjectionError {
    pub fn new(p: &nalgebra::Point3<f64>, reason: impl Into<String>) -> Self {
        Self {
            x: p.x,
            y: p.y,
            z: p.z,
            reason: reason.into(),
        }
    }
}

#[derive(Error, Debug)]
pub enum TileError {
    /// A feature has no usable bounding box.
    #[error("feature {0} has no geometry")]
    MissingGeometry(PointId),

    #[error("projection of node {node} failed: {source}")]
    Projection {
        node: NodeId,
        #[source]
        source: ProjectionError,
    },

    /// No feature could be placed in the tree.
    #[error("tree holds no features")]
    EmptyTree,

    #[error(transparent)]
    Locator(#[from] LocatorError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("manifest serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),

    /// The tile content writer failed for a leaf.
    #[error("writing content for node {node} failed: {message}")]
    Writer { node: NodeId, message: String },
}

/// A recoverable failure recorded while walking the tree.
///
/// The affected feature or node is left out; the rest of the output is
/// still produced.
#[derive(Debug)]
pub struct TileIssue {
    /// Node being processed when the failure happened, if the tree existed
    /// yet.
    pub node: Option<NodeId>,
    pub error: TileError,
}

impl std::fmt::Display for TileIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.node {
            Some(node) => write!(f, "node {node}: {}", self.error),
            None => write!(f, "{}", self.error),
        }
    }
}
