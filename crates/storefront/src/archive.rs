//! JSON files that carry store collections from one session to the next.
//!
//! The document store lives in process memory. Orders placed and catalog
//! edits made in one session are written here and put back into the fresh
//! store the next session builds.

use std::fs;
use std::path::Path;

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::cart::storage::write_atomic;
use crate::query::{MemoryStoreError, QueryError};

/// Errors reading, writing or restoring an archive file.
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The file does not hold what the archive expects.
    #[error("corrupt archive {path}: {source}")]
    Corrupt {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("serialization error: {0}")]
    Serialization(#[source] serde_json::Error),

    /// A stored document could not be read back for archiving.
    #[error(transparent)]
    Decode(#[from] QueryError),

    /// An archived document could not be written to the store.
    #[error(transparent)]
    Store(#[from] MemoryStoreError),
}

/// Read `path`. `Ok(None)` means the file does not exist yet.
pub(crate) fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, ArchiveError> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    serde_json::from_str(&raw)
        .map(Some)
        .map_err(|source| ArchiveError::Corrupt {
            path: path.display().to_string(),
            source,
        })
}

/// Replace `path` with `value` as pretty-printed JSON.
pub(crate) fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), ArchiveError> {
    let raw = serde_json::to_string_pretty(value).map_err(ArchiveError::Serialization)?;
    write_atomic(path, &raw)?;
    Ok(())
}
