//! Definition files on disk: one `<id>.json` object per workflow.

use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};

use super::error::SyncError;

/// A definition document: field and link names mapped to their values.
pub type Document = Map<String, Value>;

pub const EXTENSION: &str = "json";

pub fn path_for(directory: &Path, id: &str) -> PathBuf {
    directory.join(format!("{}.{}", id, EXTENSION))
}

/// Creates the directory (and parents) if it does not exist yet.
pub fn ensure_directory(directory: &Path) -> Result<(), SyncError> {
    if directory.is_dir() {
        return Ok(());
    }

    let mut builder = fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(0o755);
    }

    builder.create(directory).map_err(|source| SyncError::Io {
        path: directory.to_path_buf(),
        source,
    })?;
    tracing::debug!("Created directory {}", directory.display());
    Ok(())
}

/// Base names of the `*.json` files in `directory`, sorted.
pub fn list_ids(directory: &Path) -> Result<Vec<String>, SyncError> {
    let io_err = |source: std::io::Error| SyncError::Io {
        path: directory.to_path_buf(),
        source,
    };

    let mut ids = Vec::new();
    for entry in fs::read_dir(directory).map_err(io_err)? {
        let path = entry.map_err(io_err)?.path();
        if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some(EXTENSION) {
            continue;
        }
        if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
            ids.push(stem.to_string());
        }
    }

    ids.sort();
    Ok(ids)
}

pub fn read_file(path: &Path) -> Result<Document, SyncError> {
    let content = fs::read_to_string(path).map_err(|source| SyncError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let value: Value = serde_json::from_str(&content).map_err(|e| SyncError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    match value {
        Value::Object(doc) => Ok(doc),
        _ => Err(SyncError::Parse {
            path: path.to_path_buf(),
            message: "expected a JSON object at the top level".to_string(),
        }),
    }
}

pub fn write_file(path: &Path, doc: &Document) -> Result<(), SyncError> {
    let io_err = |source: std::io::Error| SyncError::Io {
        path: path.to_path_buf(),
        source,
    };

    let mut content = serde_json::to_string_pretty(doc).map_err(|e| io_err(e.into()))?;
    content.push('\n');
    fs::write(path, content).map_err(io_err)
}
