//! Placed orders kept on disk.
//!
//! Every order placed through [`crate::AppState::checkout`] is appended to
//! `<dir>/orders.json` and put back into a fresh store with
//! [`OrderArchive::restore`].

use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument};

use super::{Order, store_order};
use crate::archive::{ArchiveError, read_json, write_json};
use crate::query::MemoryStore;

const ARCHIVE_FILE: &str = "orders.json";

/// JSON file of every order placed through this storefront.
#[derive(Debug, Clone)]
pub struct OrderArchive {
    path: PathBuf,
}

impl OrderArchive {
    /// Archive stored inside `dir`. The directory is created on first write.
    #[must_use]
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            path: dir.as_ref().join(ARCHIVE_FILE),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All archived orders, oldest first. A missing file is an empty archive.
    ///
    /// # Errors
    ///
    /// Returns `ArchiveError` if the file cannot be read or is corrupt.
    pub fn load(&self) -> Result<Vec<Order>, ArchiveError> {
        Ok(read_json(&self.path)?.unwrap_or_default())
    }

    /// Add `order` to the archive.
    ///
    /// # Errors
    ///
    /// Returns `ArchiveError` if the existing archive cannot be read or the
    /// file cannot be written.
    #[instrument(skip(self, order), fields(order_id = %order.id))]
    pub fn append(&self, order: &Order) -> Result<(), ArchiveError> {
        let mut orders = self.load()?;
        orders.push(order.clone());
        write_json(&self.path, &orders)?;
        debug!(orders = orders.len(), "order archived");
        Ok(())
    }

    /// Write every archived order into `store`. Returns how many were
    /// restored.
    ///
    /// # Errors
    ///
    /// Returns `ArchiveError` if the archive cannot be loaded or an order
    /// cannot be stored.
    pub fn restore(&self, store: &MemoryStore) -> Result<usize, ArchiveError> {
        let orders = self.load()?;
        for order in &orders {
            store_order(store, order)?;
        }
        if !orders.is_empty() {
            info!(orders = orders.len(), path = %self.path.display(), "Orders restored");
        }
        Ok(orders.len())
    }
}
