//! Durable cart persistence.
//!
//! The cart store talks to a [`CartStorage`] port holding one serialized
//! line list. [`FileCartStorage`] keeps it in a JSON file named after the
//! storage key; [`MemoryCartStorage`] keeps it in process memory.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use thiserror::Error;
use tracing::{debug, instrument};

use super::line::CartLine;

/// Errors reading or writing the persisted cart.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Filesystem operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Stored data is not a valid line list.
    #[error("corrupt cart data: {0}")]
    Corrupt(#[source] serde_json::Error),

    /// Line list could not be serialized.
    #[error("serialization error: {0}")]
    Serialization(#[source] serde_json::Error),

    /// Storage key cannot be used as a slot name.
    #[error("invalid storage key: {0}")]
    InvalidKey(String),
}

/// Persistence port for the cart line list.
pub trait CartStorage: Send + Sync {
    /// Read the saved lines. `Ok(None)` means nothing was saved yet.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the slot cannot be read or decoded.
    fn load(&self) -> Result<Option<Vec<CartLine>>, StorageError>;

    /// Replace the saved lines.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the slot cannot be written.
    fn save(&self, lines: &[CartLine]) -> Result<(), StorageError>;
}

fn decode(raw: &str) -> Result<Vec<CartLine>, StorageError> {
    serde_json::from_str(raw).map_err(StorageError::Corrupt)
}

fn encode(lines: &[CartLine]) -> Result<String, StorageError> {
    serde_json::to_string(lines).map_err(StorageError::Serialization)
}

/// Validate that a storage key is usable as a file name.
fn validate_key(key: &str) -> Result<(), StorageError> {
    let valid = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        && !key.starts_with('.');
    if valid {
        Ok(())
    } else {
        Err(StorageError::InvalidKey(key.to_string()))
    }
}

/// Replace the file at `path`, creating its directory if needed.
///
/// Writes a sibling `.tmp` file and renames it over `path`, so a crash
/// never leaves a half-written file.
pub(crate) fn write_atomic(path: &Path, contents: &str) -> std::io::Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    fs::write(&tmp, contents)?;
    fs::rename(&tmp, path)
}

/// Cart slot stored as `<dir>/<key>.json`.
#[derive(Debug, Clone)]
pub struct FileCartStorage {
    path: PathBuf,
}

impl FileCartStorage {
    /// Create storage for `key` inside `dir`. The directory is created on
    /// first save.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::InvalidKey` if `key` is empty, starts with a
    /// dot, or contains characters other than ASCII letters, digits, `-`,
    /// `_` and `.`.
    pub fn new(dir: impl AsRef<Path>, key: &str) -> Result<Self, StorageError> {
        validate_key(key)?;
        Ok(Self {
            path: dir.as_ref().join(format!("{key}.json")),
        })
    }

    /// Location of the cart file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CartStorage for FileCartStorage {
    #[instrument(skip(self), fields(path = %self.path.display()))]
    fn load(&self) -> Result<Option<Vec<CartLine>>, StorageError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        decode(&raw).map(Some)
    }

    #[instrument(skip(self, lines), fields(path = %self.path.display(), lines = lines.len()))]
    fn save(&self, lines: &[CartLine]) -> Result<(), StorageError> {
        write_atomic(&self.path, &encode(lines)?)?;
        debug!("cart saved");
        Ok(())
    }
}

/// Cart slot held in memory.
///
/// Clones share the same slot, so a test can keep a handle to inspect or
/// corrupt what the store wrote.
#[derive(Debug, Clone, Default)]
pub struct MemoryCartStorage {
    slot: Arc<Mutex<Option<String>>>,
}

impl MemoryCartStorage {
    /// An empty slot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A slot pre-filled with raw serialized data.
    #[must_use]
    pub fn with_contents(raw: impl Into<String>) -> Self {
        Self {
            slot: Arc::new(Mutex::new(Some(raw.into()))),
        }
    }

    /// The raw serialized data currently in the slot.
    #[must_use]
    pub fn contents(&self) -> Option<String> {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Overwrite the raw slot contents.
    pub fn set_contents(&self, raw: impl Into<String>) {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(raw.into());
    }
}

impl CartStorage for MemoryCartStorage {
    fn load(&self) -> Result<Option<Vec<CartLine>>, StorageError> {
        self.contents().as_deref().map(decode).transpose()
    }

    fn save(&self, lines: &[CartLine]) -> Result<(), StorageError> {
        let raw = encode(lines)?;
        self.set_contents(raw);
        Ok(())
    }
}
