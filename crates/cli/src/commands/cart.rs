//! Cart management.
//!
//! Lines are addressed by product slug on the command line and by product
//! id in the cart.

use tracing::info;

use modaverse_core::ProductId;
use modaverse_storefront::cart::CartStore;
use modaverse_storefront::{AppState, StorefrontError};

use super::catalog::find_by_slug;
use super::money;

fn line_id(cart: &CartStore, slug: &str) -> Result<ProductId, StorefrontError> {
    cart.lines()
        .iter()
        .find(|line| line.product.slug == slug)
        .map(|line| line.product.id.clone())
        .ok_or_else(|| StorefrontError::NotFound(format!("'{slug}' in cart")))
}

fn print(state: &AppState, cart: &CartStore) {
    if cart.is_empty() {
        info!("Cart is empty");
        return;
    }
    for line in cart.lines() {
        info!(
            "{:<24} x{:<3} {:>10}",
            line.product.slug,
            line.quantity,
            money(state, line.product.price).times(line.quantity).to_string()
        );
    }
    info!("Items: {}  Total: {}", cart.item_count(), cart.total());
}

/// Print the saved cart.
///
/// # Errors
///
/// Returns an error if the cart slot is misconfigured.
pub fn show(state: &AppState) -> Result<(), StorefrontError> {
    let cart = state.open_cart()?;
    print(state, &cart);
    Ok(())
}

/// Add `quantity` of the product with `slug`.
///
/// # Errors
///
/// Returns an error if the product does not exist or the cart slot is
/// misconfigured.
pub async fn add(state: &AppState, slug: &str, quantity: i64) -> Result<(), StorefrontError> {
    let product = find_by_slug(state, slug).await?;
    let mut cart = state.open_cart()?;
    cart.add_to_cart(product.to_snapshot(), quantity);
    print(state, &cart);
    Ok(())
}

/// Set the quantity of a line.
///
/// # Errors
///
/// Returns an error if the product is not in the cart.
pub fn update(state: &AppState, slug: &str, quantity: i64) -> Result<(), StorefrontError> {
    let mut cart = state.open_cart()?;
    let id = line_id(&cart, slug)?;
    cart.update_quantity(&id, quantity);
    print(state, &cart);
    Ok(())
}

/// Remove a line.
///
/// # Errors
///
/// Returns an error if the product is not in the cart.
pub fn remove(state: &AppState, slug: &str) -> Result<(), StorefrontError> {
    let mut cart = state.open_cart()?;
    let id = line_id(&cart, slug)?;
    cart.remove_from_cart(&id);
    print(state, &cart);
    Ok(())
}

/// Empty the cart.
///
/// # Errors
///
/// Returns an error if the cart slot is misconfigured.
pub fn clear(state: &AppState) -> Result<(), StorefrontError> {
    let mut cart = state.open_cart()?;
    cart.clear_cart();
    info!("Cart cleared");
    Ok(())
}
