//! Checkout.

use tracing::info;

use modaverse_core::UserId;
use modaverse_storefront::orders::{Order, PaymentDetails, ShippingDetails, user_orders};
use modaverse_storefront::{AppState, StorefrontError};

use super::{fetch, money};
use crate::CheckoutArgs;

/// Place an order for the saved cart.
///
/// # Errors
///
/// Returns an error if the cart is empty, the details are invalid or the
/// order cannot be recorded. A rejected order leaves the cart as it was.
pub async fn run(state: &AppState, args: CheckoutArgs) -> Result<(), StorefrontError> {
    let user = args.user.map(UserId::new);
    let shipping = ShippingDetails {
        first_name: args.first_name,
        last_name: args.last_name,
        address: args.address,
        city: args.city,
        state: args.state,
        zip: args.zip,
    };
    let payment = PaymentDetails {
        card_number: args.card_number,
        expiry: args.expiry,
        cvc: args.cvc,
    };

    let order = state.checkout(user.as_ref(), shipping, &payment)?;

    info!(
        "Order {} placed: {} for {} items, paid with {}",
        order.id,
        money(state, order.total),
        order.item_count(),
        order.payment_method.as_deref().unwrap_or_default()
    );

    if let Some(user) = &user {
        let history = fetch::<Order>(state, user_orders(Some(user))).await?;
        info!("{} orders in {user}'s history", history.len());
    }
    Ok(())
}
