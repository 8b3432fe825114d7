//! Integration tests for the cart store against file storage.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use modaverse_core::ProductId;
use modaverse_integration_tests::{TestContext, amount};
use modaverse_storefront::catalog::{Product, all_products};

async fn catalog(ctx: &TestContext) -> Vec<Product> {
    ctx.state
        .observe::<Product>(all_products())
        .settled()
        .await
        .data
        .unwrap()
}

#[tokio::test]
async fn test_cart_survives_new_session() {
    let ctx = TestContext::new();
    let products = catalog(&ctx).await;

    let mut cart = ctx.open_cart();
    cart.add_to_cart(products[0].to_snapshot(), 2);
    cart.add_to_cart(products[2].to_snapshot(), 1);
    let saved = cart.lines().to_vec();
    drop(cart);

    let reopened = ctx.open_cart();
    assert_eq!(reopened.lines(), saved.as_slice());
    assert_eq!(reopened.item_count(), 3);
    assert_eq!(reopened.total_price(), amount(1999 * 2 + 24999));
}

#[tokio::test]
async fn test_snapshot_is_kept_after_catalog_change() {
    let ctx = TestContext::new();
    let products = catalog(&ctx).await;
    let tee = products.iter().find(|p| p.slug == "classic-white-tee").unwrap();

    let mut cart = ctx.open_cart();
    cart.add_one(tee.to_snapshot());

    ctx.store()
        .update(
            &modaverse_storefront::catalog::products_path(),
            "1",
            modaverse_integration_tests::fields(serde_json::json!({"price": 24.99})),
        )
        .unwrap();

    let line = ctx.open_cart().line(&ProductId::new("1")).cloned().unwrap();
    assert_eq!(line.product.price, amount(1999));
    assert_eq!(
        line.product.image.as_deref(),
        Some("https://cdn.moda-verse.pe/tee.jpg")
    );
}

#[test]
fn test_corrupt_cart_file_opens_empty() {
    let ctx = TestContext::new();
    let storage = ctx.state.config().cart.storage().unwrap();
    std::fs::create_dir_all(&ctx.cart_dir).unwrap();
    std::fs::write(storage.path(), "[{\"product\": 42}]").unwrap();

    let cart = ctx.open_cart();
    assert!(cart.is_empty());
    assert_eq!(cart.total_price(), amount(0));
}

#[tokio::test]
async fn test_cart_scenario_across_sessions() {
    let ctx = TestContext::new();
    let products = catalog(&ctx).await;
    let tee = products.iter().find(|p| p.slug == "classic-white-tee").unwrap();
    let id = tee.id.clone();

    ctx.open_cart().add_to_cart(tee.to_snapshot(), 2);
    ctx.open_cart().add_to_cart(tee.to_snapshot(), 1);
    {
        let cart = ctx.open_cart();
        assert_eq!(cart.lines().len(), 1);
        assert_eq!(cart.item_count(), 3);
    }

    ctx.open_cart().update_quantity(&id, 1);
    assert_eq!(ctx.open_cart().total_price(), amount(1999));

    ctx.open_cart().remove_from_cart(&id);
    assert!(ctx.open_cart().is_empty());
}
