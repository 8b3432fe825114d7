//! The edited catalog kept on disk.
//!
//! Once a product has been created, edited or deleted, the whole catalog is
//! saved to `<dir>/products.json`. A later session restores it in place of
//! the seeded products.

use std::path::{Path, PathBuf};

use tracing::info;

use super::inventory::write_product;
use super::{Product, products_path};
use crate::archive::{ArchiveError, read_json, write_json};
use crate::query::MemoryStore;

const ARCHIVE_FILE: &str = "products.json";

/// JSON file holding the catalog as last edited.
#[derive(Debug, Clone)]
pub struct ProductArchive {
    path: PathBuf,
}

impl ProductArchive {
    /// Archive stored inside `dir`. The directory is created on first save.
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

    /// The saved catalog, or `None` if it was never edited.
    ///
    /// # Errors
    ///
    /// Returns `ArchiveError` if the file cannot be read or is corrupt.
    pub fn load(&self) -> Result<Option<Vec<Product>>, ArchiveError> {
        read_json(&self.path)
    }

    /// Save every product currently in `store`.
    ///
    /// # Errors
    ///
    /// Returns `ArchiveError` if a stored product cannot be decoded or the
    /// file cannot be written.
    pub fn save(&self, store: &MemoryStore) -> Result<(), ArchiveError> {
        let products = store
            .documents(&products_path())
            .iter()
            .map(|doc| doc.decode::<Product>())
            .collect::<Result<Vec<_>, _>>()?;
        write_json(&self.path, &products)
    }

    /// Replace the products in `store` with the saved catalog. Returns how
    /// many were restored, or `None` if nothing was saved and the store was
    /// left alone.
    ///
    /// # Errors
    ///
    /// Returns `ArchiveError` if the file is unreadable or a product cannot
    /// be stored.
    pub fn restore(&self, store: &MemoryStore) -> Result<Option<usize>, ArchiveError> {
        let Some(products) = self.load()? else {
            return Ok(None);
        };

        let path = products_path();
        for doc in store.documents(&path) {
            store.delete(&path, &doc.id);
        }
        for product in &products {
            write_product(store, product)?;
        }
        info!(products = products.len(), path = %self.path.display(), "Catalog restored");
        Ok(Some(products.len()))
    }
}
