//! Sync error types.

use std::path::PathBuf;

use crate::db::StoreError;

/// Errors that abort an import or export run.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// The requested definition file does not exist
    #[error("Unable to find file: {}", .0.display())]
    FileNotFound(PathBuf),
    /// Malformed JSON, or a top-level value that is not an object
    #[error("json parse error in {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },
    #[error("Failed to access '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Field value is an array or object
    #[error("Field '{field}' on {module} with id {id} must be a scalar value")]
    UnsupportedValue {
        module: String,
        id: String,
        field: String,
    },
    /// The document's `id` key names a different record than its file or map key
    #[error("{module} with id {id} has a mismatched id field: {found}")]
    IdMismatch {
        module: String,
        id: String,
        found: String,
    },
    /// Link value is not a map of child id to field object
    #[error("Link '{link}' on record with id {id} must map child ids to field objects")]
    InvalidLink { link: String, id: String },
    #[error("{module} with id {id} not found")]
    RecordNotFound { module: String, id: String },
    #[error(transparent)]
    Store(#[from] StoreError),
}
