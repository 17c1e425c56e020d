use thiserror::Error;
use uuid::Uuid;

/// Errors surfaced across the crate's public API.
///
/// Invalid operations are rejected synchronously and leave the document
/// untouched; nothing in the public surface panics on bad input.
#[derive(Debug, Error)]
pub enum EditorError {
    /// The operation is not allowed in the current document state
    /// (removing the last layer, merging a locked layer, ...).
    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    /// No layer with the given id exists in the document.
    #[error("unknown layer {0}")]
    UnknownLayer(Uuid),

    /// Image encode/decode failure. Existing document state is unaffected.
    #[error("image codec error: {0}")]
    Codec(String),

    /// A stored history snapshot could not be restored. Only that restore
    /// attempt fails; the history guard is released and the editor stays
    /// usable.
    #[error("corrupt snapshot: {0}")]
    CorruptSnapshot(String),

    /// Malformed project file.
    #[error("project file error: {0}")]
    ProjectFile(String),
}
