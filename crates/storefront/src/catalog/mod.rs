//! Product catalog documents, listing queries and admin changes.

pub mod archive;
pub mod inventory;
pub mod product;
pub mod query;

pub use archive::ProductArchive;
pub use inventory::{
    InventoryError, ProductDraft, create_product, delete_product, duplicate_slugs, find_product,
    update_product,
};
pub use product::{Product, ProductImage, Review};
pub use query::{
    PRODUCTS_COLLECTION, ProductQuery, ProductSort, all_products, product_by_slug, products_path,
};
