//! Integration tests for live collection queries against the in-memory store.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use serde_json::json;

use modaverse_integration_tests::{TestContext, amount, fields};
use modaverse_storefront::catalog::{
    Product, ProductQuery, ProductSort, all_products, product_by_slug, products_path,
};
use modaverse_storefront::query::{ObservationStatus, QueryError};

fn slugs(products: &[Product]) -> Vec<&str> {
    products.iter().map(|p| p.slug.as_str()).collect()
}

fn tops_by_price() -> ProductQuery {
    ProductQuery {
        category: Some("Tops".to_string()),
        sort: Some(ProductSort::PriceAsc),
        ..ProductQuery::default()
    }
}

// =============================================================================
// Snapshots
// =============================================================================

#[tokio::test]
async fn test_listing_follows_store_changes() {
    let ctx = TestContext::new();
    let tops = ctx.state.observe::<Product>(tops_by_price().spec());

    let first = tops.settled().await;
    assert_eq!(first.status(), ObservationStatus::Live);
    assert_eq!(
        slugs(first.data.as_ref().unwrap()),
        vec!["classic-white-tee", "linen-shirt"]
    );

    ctx.store()
        .set(
            &products_path(),
            "5",
            fields(json!({
                "slug": "striped-polo",
                "name": "Striped Polo",
                "category": "Tops",
                "price": 39.99
            })),
        )
        .unwrap();
    assert_eq!(
        slugs(tops.result().data.as_ref().unwrap()),
        vec!["classic-white-tee", "striped-polo", "linen-shirt"]
    );

    assert!(ctx.store().delete(&products_path(), "1"));
    assert_eq!(
        slugs(tops.result().data.as_ref().unwrap()),
        vec!["striped-polo", "linen-shirt"]
    );
}

#[tokio::test]
async fn test_receivers_are_notified() {
    let ctx = TestContext::new();
    let products = ctx.state.observe::<Product>(all_products());
    let mut rx = products.subscribe();
    rx.borrow_and_update();

    ctx.store()
        .update(&products_path(), "2", fields(json!({"price": 79.99})))
        .unwrap();

    assert!(rx.has_changed().unwrap());
    let jeans = rx
        .borrow_and_update()
        .data
        .clone()
        .unwrap()
        .into_iter()
        .find(|p| p.slug == "slim-dark-denim")
        .unwrap();
    assert_eq!(jeans.price, amount(7999));
}

#[tokio::test]
async fn test_product_by_slug() {
    let ctx = TestContext::new();
    let query = ctx
        .state
        .observe::<Product>(product_by_slug(Some("leather-biker-jacket")));

    let result = query.settled().await;
    let data = result.data.unwrap();
    assert_eq!(data.len(), 1);
    assert_eq!(data[0].id.as_str(), "3");
}

// =============================================================================
// Lifecycle
// =============================================================================

#[test]
fn test_disabled_query_opens_nothing() {
    let ctx = TestContext::new();
    let query = ctx.state.observe::<Product>(product_by_slug(None));

    let result = query.result();
    assert!(result.data.is_none());
    assert!(!result.loading);
    assert!(result.error.is_none());
    assert_eq!(ctx.store().listener_count(), 0);
}

#[test]
fn test_spec_change_replaces_observation() {
    let ctx = TestContext::new();
    let mut query = ctx.state.observe::<Product>(tops_by_price().spec());
    let before = query.generation();

    query.set_spec(
        ProductQuery {
            category: Some("Jeans".to_string()),
            ..ProductQuery::default()
        }
        .spec(),
    );
    assert!(query.generation() > before);
    assert_eq!(ctx.store().listener_count(), 1);

    // Changes to the old listing no longer reach this observation.
    ctx.store()
        .update(&products_path(), "4", fields(json!({"price": 9.99})))
        .unwrap();
    assert_eq!(
        slugs(query.result().data.as_ref().unwrap()),
        vec!["slim-dark-denim"]
    );
}

#[test]
fn test_drop_releases_listener() {
    let ctx = TestContext::new();
    let query = ctx.state.observe::<Product>(all_products());
    assert_eq!(ctx.store().listener_count(), 1);

    drop(query);
    assert_eq!(ctx.store().listener_count(), 0);
}

// =============================================================================
// Errors
// =============================================================================

#[test]
fn test_rejected_composition_fails_immediately() {
    let ctx = TestContext::new();
    let query = ProductQuery {
        max_price: Some(amount(10_000)),
        sort: Some(ProductSort::Name),
        ..ProductQuery::default()
    };
    let observation = ctx.state.observe::<Product>(query.spec());

    let result = observation.result();
    assert!(matches!(result.error, Some(QueryError::InvalidQuery(_))));
    assert!(!result.loading);
    assert!(result.data.is_none());
    assert!(!observation.is_subscribed());
    assert_eq!(ctx.store().listener_count(), 0);
}

#[test]
fn test_delivery_error_is_terminal() {
    let ctx = TestContext::new();
    let query = ctx.state.observe::<Product>(all_products());
    assert_eq!(query.result().data.unwrap().len(), 4);

    ctx.store().fail_listeners(
        &products_path(),
        &QueryError::Remote("permission denied".to_string()),
    );
    ctx.store().delete(&products_path(), "1");

    let result = query.result();
    assert_eq!(query.status(), ObservationStatus::Failed);
    assert_eq!(
        result.error,
        Some(QueryError::Remote("permission denied".to_string()))
    );
    // The last good snapshot stays visible.
    assert_eq!(result.data.unwrap().len(), 4);
}

#[test]
fn test_malformed_document_is_a_delivery_error() {
    let ctx = TestContext::new();
    let query = ctx.state.observe::<Product>(all_products());

    ctx.store()
        .set(
            &products_path(),
            "9",
            fields(json!({"slug": "mystery", "name": "Mystery", "category": "Tops"})),
        )
        .unwrap();

    assert!(matches!(
        query.result().error,
        Some(QueryError::Decode { ref id, .. }) if id == "9"
    ));
}
