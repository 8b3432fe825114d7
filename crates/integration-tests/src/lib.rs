//! Integration tests for Moda Verse.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p modaverse-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `cart_persistence` - Cart store against file storage across reopen
//! - `live_queries` - Live observations against the in-memory store
//! - `checkout_flow` - Cart to order to customer history
//! - `inventory` - Admin product changes reaching live listings
//!
//! Every test builds its own [`TestContext`]: a fresh document store
//! seeded with a small catalog and a cart directory of its own.

use std::path::PathBuf;

use rust_decimal::Decimal;
use serde_json::{Map, Value, json};

use modaverse_storefront::AppState;
use modaverse_storefront::cart::CartStore;
use modaverse_storefront::catalog::products_path;
use modaverse_storefront::config::{CartConfig, StorefrontConfig};
use modaverse_storefront::query::MemoryStore;

/// Isolated store, config and cart directory for one test.
pub struct TestContext {
    pub state: AppState,
    pub cart_dir: PathBuf,
}

impl TestContext {
    /// A context with the sample catalog loaded.
    ///
    /// # Panics
    ///
    /// Panics if the sample catalog cannot be written.
    #[must_use]
    pub fn new() -> Self {
        let cart_dir = std::env::temp_dir().join(format!("modaverse-it-{}", uuid::Uuid::new_v4()));
        let config = StorefrontConfig {
            cart: CartConfig {
                dir: cart_dir.clone(),
                ..CartConfig::default()
            },
            ..StorefrontConfig::default()
        };
        Self {
            state: AppState::new(config, seeded_store()),
            cart_dir,
        }
    }

    /// State for a later session: a fresh store with the sample catalog,
    /// then the catalog edits and orders archived so far, over the same
    /// cart directory.
    ///
    /// # Panics
    ///
    /// Panics if an archive cannot be restored.
    #[must_use]
    pub fn new_session(&self) -> AppState {
        let state = AppState::new(self.state.config().clone(), seeded_store());
        state.restore_session().expect("archives are readable");
        state
    }

    #[must_use]
    pub fn store(&self) -> &MemoryStore {
        self.state.store()
    }

    /// Open the cart slot the way a new session would.
    ///
    /// # Panics
    ///
    /// Panics if the cart key is invalid.
    #[must_use]
    pub fn open_cart(&self) -> CartStore {
        self.state.open_cart().expect("default cart key is valid")
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for TestContext {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.cart_dir);
    }
}

fn seeded_store() -> MemoryStore {
    let store = MemoryStore::new();
    for (id, fields) in sample_products() {
        store
            .set(&products_path(), id, fields)
            .expect("sample product is valid");
    }
    store
}

/// Convert a `json!` object literal to document fields.
#[must_use]
pub fn fields(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

/// Four products across three categories.
#[must_use]
pub fn sample_products() -> Vec<(&'static str, Map<String, Value>)> {
    vec![
        (
            "1",
            fields(json!({
                "slug": "classic-white-tee",
                "name": "Classic White Tee",
                "category": "Tops",
                "price": 19.99,
                "originalPrice": 29.99,
                "images": [{"id": "product-1-a", "url": "https://cdn.moda-verse.pe/tee.jpg", "alt": "White tee"}]
            })),
        ),
        (
            "2",
            fields(json!({
                "slug": "slim-dark-denim",
                "name": "Slim Dark Denim",
                "category": "Jeans",
                "price": 89.99
            })),
        ),
        (
            "3",
            fields(json!({
                "slug": "leather-biker-jacket",
                "name": "Leather Biker Jacket",
                "category": "Jackets",
                "price": 249.99
            })),
        ),
        (
            "4",
            fields(json!({
                "slug": "linen-shirt",
                "name": "Linen Shirt",
                "category": "Tops",
                "price": 69.99
            })),
        ),
    ]
}

/// An amount given in cents.
#[must_use]
pub fn amount(cents: i64) -> Decimal {
    Decimal::new(cents, 2)
}
