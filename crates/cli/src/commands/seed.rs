//! Catalog seed data.
//!
//! The CLI runs against an in-process document store that is filled from a
//! YAML seed on every start: the built-in one, or the file named by
//! `MODAVERSE_CATALOG_SEED`.

use std::collections::HashSet;
use std::path::Path;

use serde::Deserialize;
use tracing::{error, info};

use modaverse_storefront::catalog::{Product, duplicate_slugs, products_path};
use modaverse_storefront::orders::{Order, store_order};
use modaverse_storefront::query::{MemoryStore, MemoryStoreError};

const BUILTIN_SEED: &str = include_str!("../../seed/catalog.yaml");

/// Products and orders to load into a fresh store.
#[derive(Debug, Deserialize)]
pub struct SeedCatalog {
    #[serde(default)]
    pub products: Vec<Product>,
    #[serde(default)]
    pub orders: Vec<Order>,
}

/// Parse seed YAML.
///
/// # Errors
///
/// Returns an error if the YAML does not describe products and orders.
pub fn parse(content: &str) -> Result<SeedCatalog, serde_yaml::Error> {
    serde_yaml::from_str(content)
}

/// Read the seed at `path`, or the built-in seed when no path is given.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, or fails
/// validation.
pub async fn load(path: Option<&Path>) -> Result<SeedCatalog, Box<dyn std::error::Error>> {
    let catalog = match path {
        Some(path) => {
            info!(path = %path.display(), "Loading catalog seed from file");
            let content = tokio::fs::read_to_string(path).await?;
            parse(&content)?
        }
        None => parse(BUILTIN_SEED)?,
    };

    let errors = validate(&catalog);
    if !errors.is_empty() {
        for err in &errors {
            error!("  - {err}");
        }
        return Err(format!("{} seed validation errors found", errors.len()).into());
    }
    Ok(catalog)
}

/// Check seed data for problems the store would not catch. Products
/// follow the same rules as admin catalog changes.
#[must_use]
pub fn validate(catalog: &SeedCatalog) -> Vec<String> {
    let mut errors = Vec::new();
    let mut ids = HashSet::new();

    for product in &catalog.products {
        if product.id.as_str().is_empty() {
            errors.push(format!("product '{}' has an empty id", product.name));
        }
        if !ids.insert(product.id.as_str()) {
            errors.push(format!("duplicate product id '{}'", product.id));
        }
        for problem in product.problems() {
            errors.push(format!("product '{}': {problem}", product.slug));
        }
    }
    for slug in duplicate_slugs(&catalog.products) {
        errors.push(format!("duplicate product slug '{slug}'"));
    }

    let mut order_ids = HashSet::new();
    for order in &catalog.orders {
        if !order_ids.insert(order.id.as_str()) {
            errors.push(format!("duplicate order id '{}'", order.id));
        }
        if order.items.iter().any(|item| item.quantity == 0) {
            errors.push(format!("order '{}' has an item with quantity 0", order.id));
        }
    }

    errors
}

/// Write the seed into `store`. Orders with a customer are also added to
/// that customer's history.
///
/// # Errors
///
/// Returns `MemoryStoreError` if a document cannot be written.
pub fn apply(store: &MemoryStore, catalog: &SeedCatalog) -> Result<(), MemoryStoreError> {
    for product in &catalog.products {
        store.insert(&products_path(), product)?;
    }
    for order in &catalog.orders {
        store_order(store, order)?;
    }
    info!(
        products = catalog.products.len(),
        orders = catalog.orders.len(),
        "Catalog seeded"
    );
    Ok(())
}

/// Validate a seed file and report what it contains.
///
/// # Errors
///
/// Returns an error if the file is missing, unparseable or invalid.
pub async fn check(file_path: &str) -> Result<(), Box<dyn std::error::Error>> {
    let path = Path::new(file_path);
    if !path.exists() {
        return Err(format!("File not found: {file_path}").into());
    }

    let catalog = load(Some(path)).await?;
    info!(
        products = catalog.products.len(),
        orders = catalog.orders.len(),
        "Seed file is valid"
    );
    Ok(())
}
