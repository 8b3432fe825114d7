//! Session state shared across storefront operations.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use tracing::instrument;

use modaverse_core::{ProductId, UserId};

use crate::archive::ArchiveError;
use crate::cart::{CartStore, StorageError};
use crate::catalog::{
    Product, ProductArchive, ProductDraft, create_product, delete_product, update_product,
};
use crate::config::StorefrontConfig;
use crate::error::StorefrontError;
use crate::orders::{
    Order, OrderArchive, PaymentDetails, ShippingDetails, place_order, record_order,
};
use crate::query::{CollectionQuerySpec, LiveQuery, MemoryStore, RemoteStore, observe};

/// Session state shared across all storefront operations.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// the configuration and the document store.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    store: MemoryStore,
}

impl AppState {
    /// Create a new session state.
    #[must_use]
    pub fn new(config: StorefrontConfig, store: MemoryStore) -> Self {
        Self {
            inner: Arc::new(AppStateInner { config, store }),
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the document store.
    #[must_use]
    pub fn store(&self) -> &MemoryStore {
        &self.inner.store
    }

    /// The document store behind the query port.
    #[must_use]
    pub fn remote(&self) -> Arc<dyn RemoteStore> {
        Arc::new(self.inner.store.clone())
    }

    /// Open the configured cart slot.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::InvalidKey` if the configured key is unusable.
    /// A missing or corrupt saved cart is not an error.
    pub fn open_cart(&self) -> Result<CartStore, StorageError> {
        let cart = &self.inner.config.cart;
        Ok(CartStore::open(Box::new(cart.storage()?), cart.settings()))
    }

    /// Archive of placed orders, kept next to the saved cart.
    #[must_use]
    pub fn order_archive(&self) -> OrderArchive {
        OrderArchive::new(&self.inner.config.cart.dir)
    }

    /// Archive of the edited catalog, kept next to the saved cart.
    #[must_use]
    pub fn product_archive(&self) -> ProductArchive {
        ProductArchive::new(&self.inner.config.cart.dir)
    }

    /// Put back what earlier sessions changed: the edited catalog, if any,
    /// then every archived order.
    ///
    /// # Errors
    ///
    /// Returns `ArchiveError` if an archive is unreadable or cannot be
    /// written into the store.
    pub fn restore_session(&self) -> Result<(), ArchiveError> {
        self.product_archive().restore(self.store())?;
        self.order_archive().restore(self.store())?;
        Ok(())
    }

    /// Add a product to the catalog and save the catalog.
    ///
    /// # Errors
    ///
    /// Returns `StorefrontError::Inventory` if the product is rejected, or
    /// `StorefrontError::Archive` if the catalog cannot be saved.
    pub fn create_product(&self, draft: &ProductDraft) -> Result<Product, StorefrontError> {
        let product = create_product(self.store(), draft)?;
        self.product_archive().save(self.store())?;
        Ok(product)
    }

    /// Replace a product's editable fields and save the catalog.
    ///
    /// # Errors
    ///
    /// Returns `StorefrontError::Inventory` if the product is missing or
    /// the change is rejected, or `StorefrontError::Archive` if the catalog
    /// cannot be saved.
    pub fn update_product(
        &self,
        id: &ProductId,
        draft: &ProductDraft,
    ) -> Result<Product, StorefrontError> {
        let product = update_product(self.store(), id, draft)?;
        self.product_archive().save(self.store())?;
        Ok(product)
    }

    /// Remove a product and save the catalog.
    ///
    /// # Errors
    ///
    /// Returns `StorefrontError::Inventory` if the product is missing, or
    /// `StorefrontError::Archive` if the catalog cannot be saved.
    pub fn delete_product(&self, id: &ProductId) -> Result<(), StorefrontError> {
        delete_product(self.store(), id)?;
        self.product_archive().save(self.store())?;
        Ok(())
    }

    /// Place an order for the saved cart.
    ///
    /// The order is recorded in the store and the archive before the cart
    /// is cleared, so a failure at any step leaves the cart as it was.
    ///
    /// # Errors
    ///
    /// Returns `StorefrontError::Checkout` if the order is rejected, or a
    /// storage error if it cannot be recorded or archived.
    #[instrument(skip(self, shipping, payment), fields(user_id = user.map(UserId::as_str)))]
    pub fn checkout(
        &self,
        user: Option<&UserId>,
        shipping: ShippingDetails,
        payment: &PaymentDetails,
    ) -> Result<Order, StorefrontError> {
        let mut cart = self.open_cart()?;
        let order = place_order(&cart, user, shipping, payment)?;
        let id = record_order(self.store(), &order)?;
        let order = order.into_order(id);
        self.order_archive().append(&order)?;
        cart.clear_cart();
        Ok(order)
    }

    /// Start observing `spec` against the document store.
    pub fn observe<T>(&self, spec: CollectionQuerySpec) -> LiveQuery<T>
    where
        T: DeserializeOwned + Send + Sync + 'static,
    {
        observe(self.remote(), spec)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::catalog::{Product, all_products, products_path};
    use crate::config::CartConfig;

    #[test]
    fn test_observe_through_state() {
        let state = AppState::new(StorefrontConfig::default(), MemoryStore::new());
        state
            .store()
            .set(
                &products_path(),
                "1",
                json!({"slug": "classic-white-tee", "name": "Classic White Tee", "category": "Tops", "price": 29.99})
                    .as_object()
                    .unwrap()
                    .clone(),
            )
            .unwrap();

        let products = state.observe::<Product>(all_products());
        let result = products.result();
        assert!(!result.loading);
        assert_eq!(result.data.unwrap().first().unwrap().id.as_str(), "1");
    }

    #[test]
    fn test_open_cart_rejects_bad_key() {
        let config = StorefrontConfig {
            cart: CartConfig {
                key: "../../etc/passwd".to_string(),
                ..CartConfig::default()
            },
            ..StorefrontConfig::default()
        };
        let state = AppState::new(config, MemoryStore::new());
        assert!(matches!(state.open_cart(), Err(StorageError::InvalidKey(_))));
    }
}
