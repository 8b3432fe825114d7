//! Checkout: validate shipping and payment, turn the cart into an order.
//!
//! Payment is simulated. Card details are checked for shape only and
//! nothing but the last four digits leaves this module.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{info, instrument};

use modaverse_core::{OrderId, OrderStatus, UserId};

use super::{Order, OrderItem, ShippingDetails, orders_path, user_orders_path};
use crate::cart::CartStore;
use crate::error::add_breadcrumb;
use crate::query::{MemoryStore, MemoryStoreError};

const MIN_CARD_DIGITS: usize = 12;
const MAX_CARD_DIGITS: usize = 19;

/// Reasons an order cannot be placed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CheckoutError {
    #[error("cart is empty")]
    EmptyCart,

    /// A required shipping field is blank.
    #[error("missing shipping field: {0}")]
    MissingField(&'static str),

    #[error("card number must be 12 to 19 digits")]
    InvalidCardNumber,

    #[error("invalid card expiry '{0}', expected MM/YY")]
    InvalidExpiry(String),

    #[error("card security code must be 3 or 4 digits")]
    InvalidSecurityCode,
}

/// Card details as typed at checkout.
#[derive(Clone, Default)]
pub struct PaymentDetails {
    pub card_number: String,
    /// `MM/YY`.
    pub expiry: String,
    pub cvc: String,
}

impl std::fmt::Debug for PaymentDetails {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaymentDetails")
            .field("card_number", &"[REDACTED]")
            .field("expiry", &self.expiry)
            .field("cvc", &"[REDACTED]")
            .finish()
    }
}

impl PaymentDetails {
    /// Check the card shape and return its last four digits.
    fn validate(&self) -> Result<String, CheckoutError> {
        let digits: String = self
            .card_number
            .chars()
            .filter(|c| !matches!(c, ' ' | '-'))
            .collect();
        if !(MIN_CARD_DIGITS..=MAX_CARD_DIGITS).contains(&digits.len())
            || !digits.chars().all(|c| c.is_ascii_digit())
        {
            return Err(CheckoutError::InvalidCardNumber);
        }

        let expiry = self.expiry.replace(' ', "");
        let valid_expiry = expiry
            .split_once('/')
            .and_then(|(month, year)| {
                let month: u8 = month.parse().ok()?;
                (year.len() == 2 && year.chars().all(|c| c.is_ascii_digit()))
                    .then_some(month)
            })
            .is_some_and(|month| (1..=12).contains(&month));
        if !valid_expiry {
            return Err(CheckoutError::InvalidExpiry(self.expiry.clone()));
        }

        let cvc = self.cvc.trim();
        if !(3..=4).contains(&cvc.len()) || !cvc.chars().all(|c| c.is_ascii_digit()) {
            return Err(CheckoutError::InvalidSecurityCode);
        }

        Ok(digits.chars().skip(digits.len() - 4).collect())
    }
}

impl ShippingDetails {
    /// Every field is required.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::MissingField` naming the first blank field.
    pub fn validate(&self) -> Result<(), CheckoutError> {
        let fields = [
            ("first name", &self.first_name),
            ("last name", &self.last_name),
            ("address", &self.address),
            ("city", &self.city),
            ("state", &self.state),
            ("zip", &self.zip),
        ];
        match fields.iter().find(|(_, value)| value.trim().is_empty()) {
            Some((name, _)) => Err(CheckoutError::MissingField(*name)),
            None => Ok(()),
        }
    }
}

/// An order ready to be written. Its id is assigned by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOrder {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
    #[serde(serialize_with = "super::serialize_created_at")]
    pub created_at: DateTime<Utc>,
    pub status: OrderStatus,
    #[serde(with = "rust_decimal::serde::float")]
    pub total: Decimal,
    pub items: Vec<OrderItem>,
    pub payment_method: String,
    pub shipping: ShippingDetails,
}

impl NewOrder {
    /// The stored order under the id the store assigned.
    #[must_use]
    pub fn into_order(self, id: OrderId) -> Order {
        Order {
            id,
            user_id: self.user_id,
            created_at: self.created_at,
            status: self.status,
            total: self.total,
            items: self.items,
            payment_method: Some(self.payment_method),
            shipping: Some(self.shipping),
        }
    }
}

/// Turn the cart into a pending order.
///
/// The cart is not touched. Clear it once the order has been recorded,
/// as [`crate::AppState::checkout`] does.
///
/// # Errors
///
/// Returns `CheckoutError` if the cart is empty, a shipping field is blank
/// or the card details are malformed.
#[instrument(skip(cart, shipping, payment), fields(user_id = user.map(UserId::as_str)))]
pub fn place_order(
    cart: &CartStore,
    user: Option<&UserId>,
    shipping: ShippingDetails,
    payment: &PaymentDetails,
) -> Result<NewOrder, CheckoutError> {
    if cart.is_empty() {
        return Err(CheckoutError::EmptyCart);
    }
    shipping.validate()?;
    let last4 = payment.validate()?;

    let order = NewOrder {
        user_id: user.cloned(),
        created_at: Utc::now(),
        status: OrderStatus::Pending,
        total: cart.total_price(),
        items: cart
            .lines()
            .iter()
            .map(|line| OrderItem {
                product_name: line.product.name.clone(),
                quantity: line.quantity,
                price: line.product.price,
            })
            .collect(),
        payment_method: format!("Card ending in {last4}"),
        shipping,
    };

    add_breadcrumb("checkout", "Order placed", None);
    info!(total = %order.total, items = order.items.len(), "order placed");
    Ok(order)
}

/// Write `order` to the shop-wide collection and, for signed-in customers,
/// to their order history under the same id.
///
/// # Errors
///
/// Returns `MemoryStoreError` if the customer's history path is malformed,
/// in which case nothing is written, or if a write fails.
#[instrument(skip(store, order))]
pub fn record_order(store: &MemoryStore, order: &NewOrder) -> Result<OrderId, MemoryStoreError> {
    let history = order.user_id.as_ref().map(user_orders_path);
    if let Some(path) = &history {
        path.validate()?;
    }

    let id = store.insert(&orders_path(), order)?;
    if let Some(path) = &history {
        let Value::Object(fields) = serde_json::to_value(order)? else {
            return Err(MemoryStoreError::NotAnObject);
        };
        store.set(path, &id, fields)?;
    }
    info!(order_id = %id, "order recorded");
    Ok(OrderId::new(id))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use modaverse_core::ProductId;

    use super::*;
    use crate::cart::{CartSettings, MemoryCartStorage, ProductSnapshot};

    fn cart_with_items() -> CartStore {
        let mut cart = CartStore::open(Box::new(MemoryCartStorage::new()), CartSettings::default());
        cart.add_to_cart(
            ProductSnapshot {
                id: ProductId::new("1"),
                name: "Classic White Tee".to_string(),
                price: Decimal::new(2999, 2),
                slug: "classic-white-tee".to_string(),
                image: None,
            },
            2,
        );
        cart
    }

    fn shipping() -> ShippingDetails {
        ShippingDetails {
            first_name: "Ana".to_string(),
            last_name: "Quispe".to_string(),
            address: "Av. Larco 123".to_string(),
            city: "Lima".to_string(),
            state: "Lima".to_string(),
            zip: "15074".to_string(),
        }
    }

    fn card() -> PaymentDetails {
        PaymentDetails {
            card_number: "4242 4242 4242 4242".to_string(),
            expiry: "08 / 29".to_string(),
            cvc: "123".to_string(),
        }
    }

    #[test]
    fn test_place_order_builds_pending_order_and_keeps_cart() {
        let cart = cart_with_items();
        let user = UserId::new("u-1");
        let order = place_order(&cart, Some(&user), shipping(), &card()).unwrap();

        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.total, Decimal::new(5998, 2));
        assert_eq!(order.items.len(), 1);
        assert_eq!(order.items.first().unwrap().quantity, 2);
        assert_eq!(order.payment_method, "Card ending in 4242");
        assert_eq!(order.user_id, Some(user));
        assert_eq!(cart.item_count(), 2);
    }

    #[test]
    fn test_empty_cart_is_rejected() {
        let cart = CartStore::open(Box::new(MemoryCartStorage::new()), CartSettings::default());
        assert_eq!(
            place_order(&cart, None, shipping(), &card()),
            Err(CheckoutError::EmptyCart)
        );
    }

    #[test]
    fn test_blank_shipping_field_keeps_cart() {
        let cart = cart_with_items();
        let mut details = shipping();
        details.city = "   ".to_string();

        assert_eq!(
            place_order(&cart, None, details, &card()),
            Err(CheckoutError::MissingField("city"))
        );
        assert_eq!(cart.item_count(), 2);
    }

    #[test]
    fn test_card_validation() {
        let mut short = card();
        short.card_number = "4242 4242".to_string();
        assert_eq!(short.validate(), Err(CheckoutError::InvalidCardNumber));

        let mut letters = card();
        letters.card_number = "4242-4242-4242-abcd".to_string();
        assert_eq!(letters.validate(), Err(CheckoutError::InvalidCardNumber));

        let mut expiry = card();
        expiry.expiry = "13/29".to_string();
        assert!(matches!(expiry.validate(), Err(CheckoutError::InvalidExpiry(_))));

        let mut cvc = card();
        cvc.cvc = "12".to_string();
        assert_eq!(cvc.validate(), Err(CheckoutError::InvalidSecurityCode));

        assert_eq!(card().validate().unwrap(), "4242");
    }

    #[test]
    fn test_payment_debug_redacts_card() {
        let output = format!("{:?}", card());
        assert!(!output.contains("4242"));
        assert!(output.contains("[REDACTED]"));
    }

    #[test]
    fn test_record_order_writes_both_collections() {
        let store = MemoryStore::new();
        let user = UserId::new("u-1");
        let order = place_order(&cart_with_items(), Some(&user), shipping(), &card()).unwrap();

        let id = record_order(&store, &order).unwrap();

        let shop = store.documents(&orders_path());
        let history = store.documents(&user_orders_path(&user));
        assert_eq!(shop.len(), 1);
        assert_eq!(history.len(), 1);
        assert_eq!(history.first().unwrap().id, id.as_str());

        let decoded: Order = history.first().unwrap().decode().unwrap();
        assert_eq!(decoded.total, Decimal::new(5998, 2));
        assert_eq!(decoded.shipping, Some(shipping()));
    }

    #[test]
    fn test_record_order_with_malformed_history_writes_nothing() {
        let store = MemoryStore::new();
        let user = UserId::new("");
        let order = place_order(&cart_with_items(), Some(&user), shipping(), &card()).unwrap();

        assert!(matches!(
            record_order(&store, &order),
            Err(MemoryStoreError::Path(_))
        ));
        assert!(store.documents(&orders_path()).is_empty());
    }

    #[test]
    fn test_into_order_keeps_checkout_details() {
        let order = place_order(&cart_with_items(), None, shipping(), &card()).unwrap();
        let stored = order.clone().into_order(OrderId::new("MV-2000"));

        assert_eq!(stored.id.as_str(), "MV-2000");
        assert_eq!(stored.created_at, order.created_at);
        assert_eq!(stored.payment_method.as_deref(), Some("Card ending in 4242"));
        assert_eq!(stored.item_count(), 2);
    }
}
