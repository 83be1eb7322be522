//! Error types used by the crate.

use mapsync_types::DescriptorError;
use thiserror::Error;

/// Mapsync error type.
///
/// All variants except [`SyncError::Json`] are local precondition violations. They are never
/// retried: the desired state that caused them must be fixed by the caller.
#[derive(Debug, Error)]
pub enum SyncError {
    /// A source with this id is already on the surface.
    #[error("source `{0}` already exists")]
    DuplicateSource(String),
    /// A layer with this id is already on the surface.
    #[error("layer `{0}` already exists")]
    DuplicateLayer(String),
    /// Referenced source is not on the surface.
    #[error("source `{0}` does not exist")]
    UnknownSource(String),
    /// Referenced layer is not on the surface.
    #[error("layer `{0}` does not exist")]
    UnknownLayer(String),
    /// A source cannot be removed because something still draws from it.
    #[error("source `{source_id}` is still referenced by `{referenced_by}`")]
    DanglingReference {
        /// Id of the source to be removed.
        source_id: String,
        /// Id of the layer (or `terrain`) that references it.
        referenced_by: String,
    },
    /// Descriptor is malformed for its type.
    #[error("invalid descriptor: {0}")]
    InvalidDescriptor(#[from] DescriptorError),
    /// Structural mutation was requested before the surface signalled it is ready.
    #[error("surface is not ready for structural changes")]
    NotReady,
    /// Configuration values are inconsistent.
    #[error("{0}")]
    Configuration(String),
    /// Error decoding JSON input.
    #[error("failed to decode json: {0}")]
    Json(#[from] serde_json::Error),
}
