//! Integration tests for admin catalog changes.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use modaverse_core::ProductId;
use modaverse_integration_tests::{TestContext, amount};
use modaverse_storefront::StorefrontError;
use modaverse_storefront::catalog::{
    InventoryError, Product, ProductDraft, ProductImage, ProductQuery, ProductSort,
    all_products,
};

fn scarf() -> ProductDraft {
    ProductDraft {
        slug: "wool-scarf".to_string(),
        name: "Wool Scarf".to_string(),
        category: "Accessories".to_string(),
        price: amount(3999),
        original_price: None,
        images: vec![ProductImage {
            id: "wool-scarf-1".to_string(),
            url: "https://cdn.moda-verse.pe/scarf.jpg".to_string(),
            alt: "Wool Scarf".to_string(),
            hint: None,
        }],
        description: "Bufanda de lana de alpaca.".to_string(),
        details: vec!["100% alpaca".to_string()],
        badge: Some("Nuevo".to_string()),
    }
}

fn find<'a>(products: &'a [Product], slug: &str) -> Option<&'a Product> {
    products.iter().find(|product| product.slug == slug)
}

#[tokio::test]
async fn test_live_listing_follows_each_change() {
    let ctx = TestContext::new();
    let listing = ctx.state.observe::<Product>(all_products());
    assert_eq!(listing.settled().await.data.unwrap().len(), 4);

    let created = ctx.state.create_product(&scarf()).unwrap();
    let products = listing.result().data.unwrap();
    assert_eq!(products.len(), 5);
    assert_eq!(find(&products, "wool-scarf"), Some(&created));

    let mut markdown = scarf();
    markdown.price = amount(2999);
    markdown.original_price = Some(amount(3999));
    ctx.state.update_product(&created.id, &markdown).unwrap();
    let products = listing.result().data.unwrap();
    let updated = find(&products, "wool-scarf").unwrap();
    assert_eq!(updated.price, amount(2999));
    assert_eq!(updated.discount_percent(), Some(25));

    ctx.state.delete_product(&created.id).unwrap();
    let products = listing.result().data.unwrap();
    assert_eq!(products.len(), 4);
    assert!(find(&products, "wool-scarf").is_none());
}

#[tokio::test]
async fn test_sorted_listing_moves_repriced_product() {
    let ctx = TestContext::new();
    let by_price = ctx.state.observe::<Product>(
        ProductQuery {
            sort: Some(ProductSort::PriceAsc),
            ..ProductQuery::default()
        }
        .spec(),
    );
    let first = by_price.settled().await.data.unwrap();
    assert_eq!(first[0].slug, "classic-white-tee");

    let jacket = find(&first, "leather-biker-jacket").unwrap().clone();
    let mut cheaper = ProductDraft::from(&jacket);
    cheaper.price = amount(999);
    ctx.state.update_product(&jacket.id, &cheaper).unwrap();

    let products = by_price.result().data.unwrap();
    assert_eq!(products[0].slug, "leather-biker-jacket");
    assert_eq!(products.len(), 4);
}

#[tokio::test]
async fn test_rejected_changes_leave_listing_alone() {
    let ctx = TestContext::new();
    let listing = ctx.state.observe::<Product>(all_products());
    let before = listing.settled().await.data.unwrap();

    let mut taken = scarf();
    taken.slug = "linen-shirt".to_string();
    assert!(matches!(
        ctx.state.create_product(&taken),
        Err(StorefrontError::Inventory(InventoryError::DuplicateSlug { .. }))
    ));

    let mut free = scarf();
    free.price = amount(0);
    assert!(matches!(
        ctx.state.create_product(&free),
        Err(StorefrontError::Inventory(InventoryError::NonPositivePrice(_)))
    ));

    assert!(matches!(
        ctx.state.delete_product(&ProductId::new("missing")),
        Err(StorefrontError::Inventory(InventoryError::NotFound(_)))
    ));

    assert_eq!(listing.result().data.unwrap(), before);
    assert!(ctx.state.product_archive().load().unwrap().is_none());
}

#[tokio::test]
async fn test_catalog_changes_survive_a_new_session() {
    let ctx = TestContext::new();
    let created = ctx.state.create_product(&scarf()).unwrap();
    ctx.state.delete_product(&ProductId::new("2")).unwrap();

    let later = ctx.new_session();
    let products = later
        .observe::<Product>(all_products())
        .settled()
        .await
        .data
        .unwrap();

    assert_eq!(products.len(), 4);
    assert_eq!(find(&products, "wool-scarf"), Some(&created));
    assert!(find(&products, "slim-dark-denim").is_none());
}
