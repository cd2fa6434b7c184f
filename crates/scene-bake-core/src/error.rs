use std::io;
use thiserror::Error;

/// Error types for scene loading, mesh baking and export
#[derive(Error, Debug)]
pub enum BakeError {
    /// I/O error while reading a scene or writing baked output
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The scene document is structurally unusable
    #[error("Invalid scene: {0}")]
    InvalidScene(String),

    /// Geometry that cannot be associated with its node; the mesh is skipped
    #[error("Invalid mesh on node '{node}': {reason}")]
    InvalidMesh { node: String, reason: String },

    /// A normal or UV channel uses a mapping mode the packer cannot lay out
    #[error("Unsupported {channel} mapping mode: {mode}")]
    UnsupportedMapping { channel: &'static str, mode: String },

    /// A skin cluster has nothing to bind to
    #[error("Missing bind data for cluster {cluster}: {reason}")]
    MissingBindData { cluster: usize, reason: String },

    /// Submesh ranges, polygon sizes or channel indices are inconsistent
    #[error("Corrupt topology in mesh '{mesh}': {reason}")]
    CorruptTopology { mesh: String, reason: String },
}

impl BakeError {
    /// Build a [`BakeError::CorruptTopology`] for the named mesh
    pub fn corrupt(mesh: &str, reason: impl Into<String>) -> Self {
        Self::CorruptTopology {
            mesh: mesh.to_string(),
            reason: reason.into(),
        }
    }

    /// Whether the orchestrator recovers from this error without failing a mesh
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::InvalidMesh { .. } | Self::UnsupportedMapping { .. } | Self::MissingBindData { .. }
        )
    }
}

/// Result type using BakeError
pub type Result<T> = std::result::Result<T, BakeError>;
