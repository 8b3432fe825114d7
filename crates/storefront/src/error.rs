//! Unified error handling with Sentry integration.
//!
//! Each module owns its error enum; [`StorefrontError`] wraps them for
//! callers that drive several modules at once, such as the CLI.

use thiserror::Error;

use crate::archive::ArchiveError;
use crate::cart::StorageError;
use crate::catalog::InventoryError;
use crate::config::ConfigError;
use crate::orders::CheckoutError;
use crate::query::{MemoryStoreError, QueryError};

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum StorefrontError {
    /// Configuration could not be loaded.
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Cart persistence failed.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// A collection query failed.
    #[error("Query error: {0}")]
    Query(#[from] QueryError),

    /// A direct document read or write failed.
    #[error("Document store error: {0}")]
    Store(#[from] MemoryStoreError),

    /// The order was rejected at checkout.
    #[error("Checkout error: {0}")]
    Checkout(#[from] CheckoutError),

    /// Placed orders could not be saved or restored.
    #[error("Archive error: {0}")]
    Archive(#[from] ArchiveError),

    /// A catalog change was rejected or could not be written.
    #[error("Inventory error: {0}")]
    Inventory(#[from] InventoryError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),
}

impl StorefrontError {
    /// Whether the error points at a fault in the system rather than in
    /// what the shopper asked for.
    #[must_use]
    pub const fn is_internal(&self) -> bool {
        matches!(
            self,
            Self::Storage(_)
                | Self::Store(_)
                | Self::Query(_)
                | Self::Archive(_)
                | Self::Inventory(InventoryError::Store(_))
        )
    }

    /// Report internal errors to Sentry. Shopper mistakes are not reported.
    pub fn capture(&self) {
        if self.is_internal() {
            let event_id = sentry::capture_error(self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Storefront error"
            );
        }
    }
}

/// Result type alias for `StorefrontError`.
pub type Result<T> = std::result::Result<T, StorefrontError>;

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of user actions
/// leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("cart", "add_to_cart", Some(&[("product_id", "123")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storefront_error_display() {
        let err = StorefrontError::NotFound("product classic-white-tee".to_string());
        assert_eq!(err.to_string(), "Not found: product classic-white-tee");

        let err = StorefrontError::from(CheckoutError::EmptyCart);
        assert_eq!(err.to_string(), "Checkout error: cart is empty");
    }

    #[test]
    fn test_internal_classification() {
        assert!(StorefrontError::from(QueryError::Remote("unavailable".to_string())).is_internal());
        assert!(!StorefrontError::from(CheckoutError::EmptyCart).is_internal());
        assert!(!StorefrontError::NotFound("x".to_string()).is_internal());
    }

    #[test]
    fn test_add_breadcrumb_without_client() {
        // No Sentry client is bound in tests; this must not panic.
        add_breadcrumb("cart", "add_to_cart", Some(&[("item_count", "2")]));
    }
}
