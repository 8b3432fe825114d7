//! Admin changes to the product catalog.
//!
//! Products are written straight into the `products` collection, so every
//! live listing over it sees a change as soon as it is made.

use std::collections::HashSet;

use rust_decimal::Decimal;
use serde_json::Value;
use thiserror::Error;
use tracing::{info, instrument};
use uuid::Uuid;

use modaverse_core::ProductId;

use super::{Product, ProductImage, products_path};
use crate::error::add_breadcrumb;
use crate::query::{MemoryStore, MemoryStoreError, QueryError};

/// Reasons a catalog change is rejected or fails.
#[derive(Debug, Error)]
pub enum InventoryError {
    /// A required text field is blank.
    #[error("product {0} must not be blank")]
    BlankField(&'static str),

    #[error("invalid slug '{0}', use lowercase letters, digits and hyphens")]
    InvalidSlug(String),

    #[error("price must be greater than zero, got {0}")]
    NonPositivePrice(Decimal),

    #[error("review rating {0} is outside 1-5")]
    RatingOutOfRange(u8),

    #[error("slug '{slug}' is already used by product {owner}")]
    DuplicateSlug { slug: String, owner: String },

    #[error("product {0} not found")]
    NotFound(ProductId),

    /// A stored product could not be read back.
    #[error(transparent)]
    Decode(#[from] QueryError),

    #[error(transparent)]
    Store(#[from] MemoryStoreError),
}

/// The editable fields of a product. Reviews belong to shoppers and are
/// kept as they are on update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductDraft {
    pub slug: String,
    pub name: String,
    pub category: String,
    pub price: Decimal,
    pub original_price: Option<Decimal>,
    pub images: Vec<ProductImage>,
    pub description: String,
    pub details: Vec<String>,
    pub badge: Option<String>,
}

impl From<&Product> for ProductDraft {
    fn from(product: &Product) -> Self {
        Self {
            slug: product.slug.clone(),
            name: product.name.clone(),
            category: product.category.clone(),
            price: product.price,
            original_price: product.original_price,
            images: product.images.clone(),
            description: product.description.clone(),
            details: product.details.clone(),
            badge: product.badge.clone(),
        }
    }
}

impl ProductDraft {
    /// Every rule the draft breaks on its own. Slug uniqueness depends on
    /// the rest of the catalog and is checked when the draft is written.
    #[must_use]
    pub fn problems(&self) -> Vec<InventoryError> {
        let mut problems = Vec::new();
        if self.name.trim().is_empty() {
            problems.push(InventoryError::BlankField("name"));
        }
        if self.category.trim().is_empty() {
            problems.push(InventoryError::BlankField("category"));
        }
        if !is_valid_slug(&self.slug) {
            problems.push(InventoryError::InvalidSlug(self.slug.clone()));
        }
        if self.price <= Decimal::ZERO {
            problems.push(InventoryError::NonPositivePrice(self.price));
        }
        problems
    }

    /// The first rule the draft breaks, if any.
    ///
    /// # Errors
    ///
    /// Returns the first of [`ProductDraft::problems`].
    pub fn validate(&self) -> Result<(), InventoryError> {
        match self.problems().into_iter().next() {
            Some(problem) => Err(problem),
            None => Ok(()),
        }
    }

    fn into_product(self, id: ProductId, reviews: Vec<super::Review>) -> Product {
        Product {
            id,
            slug: self.slug,
            name: self.name,
            category: self.category,
            price: self.price,
            original_price: self.original_price,
            images: self.images,
            description: self.description,
            details: self.details,
            reviews,
            badge: self.badge.filter(|badge| !badge.trim().is_empty()),
        }
    }
}

impl Product {
    /// Every rule this product breaks, including its review ratings.
    #[must_use]
    pub fn problems(&self) -> Vec<InventoryError> {
        let mut problems = ProductDraft::from(self).problems();
        problems.extend(
            self.reviews
                .iter()
                .filter(|review| !(1..=5).contains(&review.rating))
                .map(|review| InventoryError::RatingOutOfRange(review.rating)),
        );
        problems
    }
}

/// Lowercase ASCII letters, digits and single inner hyphens.
fn is_valid_slug(slug: &str) -> bool {
    slug.split('-').all(|part| {
        !part.is_empty()
            && part
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
    })
}

/// Slugs used more than once in `products`, each reported once.
#[must_use]
pub fn duplicate_slugs(products: &[Product]) -> Vec<&str> {
    let mut seen = HashSet::new();
    let mut reported = HashSet::new();
    products
        .iter()
        .map(|product| product.slug.as_str())
        .filter(|slug| !seen.insert(*slug) && reported.insert(*slug))
        .collect()
}

/// The stored product with `slug`, if any.
///
/// # Errors
///
/// Returns `InventoryError::Decode` if the matching document is not a
/// product.
pub fn find_product(store: &MemoryStore, slug: &str) -> Result<Option<Product>, InventoryError> {
    store
        .documents(&products_path())
        .iter()
        .find(|doc| doc.get("slug").and_then(Value::as_str) == Some(slug))
        .map(|doc| doc.decode::<Product>())
        .transpose()
        .map_err(InventoryError::from)
}

fn ensure_unique_slug(
    store: &MemoryStore,
    slug: &str,
    except: Option<&ProductId>,
) -> Result<(), InventoryError> {
    let owner = store.documents(&products_path()).into_iter().find(|doc| {
        doc.get("slug").and_then(Value::as_str) == Some(slug)
            && except.is_none_or(|id| id.as_str() != doc.id)
    });
    match owner {
        Some(doc) => Err(InventoryError::DuplicateSlug {
            slug: slug.to_string(),
            owner: doc.id,
        }),
        None => Ok(()),
    }
}

/// Store `product` under its id, replacing any previous version.
pub(crate) fn write_product(store: &MemoryStore, product: &Product) -> Result<(), MemoryStoreError> {
    let Value::Object(mut fields) = serde_json::to_value(product)? else {
        return Err(MemoryStoreError::NotAnObject);
    };
    fields.remove("id");
    store.set(&products_path(), product.id.as_str(), fields)
}

/// Add a product under a fresh id.
///
/// # Errors
///
/// Returns `InventoryError` if the draft breaks a rule, its slug is taken,
/// or the store rejects the write.
#[instrument(skip(store, draft), fields(slug = %draft.slug))]
pub fn create_product(store: &MemoryStore, draft: &ProductDraft) -> Result<Product, InventoryError> {
    draft.validate()?;
    ensure_unique_slug(store, &draft.slug, None)?;

    let product = draft
        .clone()
        .into_product(ProductId::new(Uuid::new_v4().to_string()), Vec::new());
    write_product(store, &product)?;

    add_breadcrumb("inventory", "Product created", Some(&[("slug", product.slug.as_str())]));
    info!(product_id = %product.id, "product created");
    Ok(product)
}

/// Replace the editable fields of product `id`. Its reviews are kept.
///
/// # Errors
///
/// Returns `InventoryError::NotFound` if there is no such product, or
/// another `InventoryError` if the draft breaks a rule or its slug belongs
/// to a different product.
#[instrument(skip(store, draft), fields(product_id = %id))]
pub fn update_product(
    store: &MemoryStore,
    id: &ProductId,
    draft: &ProductDraft,
) -> Result<Product, InventoryError> {
    draft.validate()?;
    let current = store
        .documents(&products_path())
        .into_iter()
        .find(|doc| doc.id == id.as_str())
        .ok_or_else(|| InventoryError::NotFound(id.clone()))?
        .decode::<Product>()?;
    ensure_unique_slug(store, &draft.slug, Some(id))?;

    let product = draft.clone().into_product(id.clone(), current.reviews);
    write_product(store, &product)?;

    add_breadcrumb("inventory", "Product updated", Some(&[("slug", product.slug.as_str())]));
    info!("product updated");
    Ok(product)
}

/// Remove product `id` from the catalog.
///
/// Saved carts keep their own copy of a product, so lines for it survive.
///
/// # Errors
///
/// Returns `InventoryError::NotFound` if there is no such product.
#[instrument(skip(store), fields(product_id = %id))]
pub fn delete_product(store: &MemoryStore, id: &ProductId) -> Result<(), InventoryError> {
    if !store.delete(&products_path(), id.as_str()) {
        return Err(InventoryError::NotFound(id.clone()));
    }
    add_breadcrumb("inventory", "Product deleted", Some(&[("product_id", id.as_str())]));
    info!("product deleted");
    Ok(())
}
