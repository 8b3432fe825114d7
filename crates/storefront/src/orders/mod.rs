//! Customer orders.
//!
//! Orders live in the shop-wide `orders` collection (admin views) and in
//! each customer's `users/{uid}/orders` sub-collection (order history).
//!
//! - [`archive`] - Placed orders kept on disk between sessions
//! - [`checkout`] - Turning a cart into a new order
//! - [`dashboard`] - Admin summary figures

pub mod archive;
pub mod checkout;
pub mod dashboard;

pub use archive::OrderArchive;
pub use checkout::{CheckoutError, NewOrder, PaymentDetails, place_order, record_order};
pub use dashboard::DashboardSummary;

use chrono::{DateTime, SecondsFormat, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

use modaverse_core::{OrderId, OrderStatus, UserId};

use crate::query::{
    CollectionPath, CollectionQuerySpec, FilterOp, MemoryStore, MemoryStoreError, SortDirection,
};

/// Shop-wide orders collection.
pub const ORDERS_COLLECTION: &str = "orders";

const USERS_COLLECTION: &str = "users";

#[must_use]
pub fn orders_path() -> CollectionPath {
    CollectionPath::new(ORDERS_COLLECTION)
}

/// `users/{uid}/orders`.
#[must_use]
pub fn user_orders_path(user_id: &UserId) -> CollectionPath {
    CollectionPath::new(USERS_COLLECTION).sub_collection(user_id.as_str(), ORDERS_COLLECTION)
}

/// An order document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
    #[serde(serialize_with = "serialize_created_at")]
    pub created_at: DateTime<Utc>,
    pub status: OrderStatus,
    #[serde(with = "rust_decimal::serde::float")]
    pub total: Decimal,
    #[serde(default)]
    pub items: Vec<OrderItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shipping: Option<ShippingDetails>,
}

impl Order {
    /// Total units across all items.
    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.items.iter().map(|item| u64::from(item.quantity)).sum()
    }
}

/// One purchased product, captured at checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub product_name: String,
    pub quantity: u32,
    /// Unit price at the time of purchase.
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
}

/// Where an order ships.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingDetails {
    pub first_name: String,
    pub last_name: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub zip: String,
}

/// Write an existing order under its own id, in the shop-wide collection
/// and in its customer's history.
///
/// # Errors
///
/// Returns `MemoryStoreError` if the history path is malformed or a write
/// fails.
pub fn store_order(store: &MemoryStore, order: &Order) -> Result<(), MemoryStoreError> {
    let history = order.user_id.as_ref().map(user_orders_path);
    if let Some(path) = &history {
        path.validate()?;
    }
    let Value::Object(mut fields) = serde_json::to_value(order)? else {
        return Err(MemoryStoreError::NotAnObject);
    };
    fields.remove("id");
    store.set(&orders_path(), order.id.as_str(), fields.clone())?;
    if let Some(path) = &history {
        store.set(path, order.id.as_str(), fields)?;
    }
    Ok(())
}

/// Write a timestamp as RFC 3339 with nanoseconds, so that the stored
/// strings sort in time order.
#[allow(clippy::trivially_copy_pass_by_ref)]
pub(crate) fn serialize_created_at<S: Serializer>(
    at: &DateTime<Utc>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&at.to_rfc3339_opts(SecondsFormat::Nanos, true))
}

/// Orders in one status, newest first.
#[must_use]
pub fn orders_by_status(status: OrderStatus) -> CollectionQuerySpec {
    CollectionQuerySpec::collection(orders_path())
        .filter("status", FilterOp::Eq, status.to_string())
        .order_by("createdAt", SortDirection::Desc)
}

/// A customer's order history, newest first. Disabled while signed out.
#[must_use]
pub fn user_orders(user_id: Option<&UserId>) -> CollectionQuerySpec {
    CollectionQuerySpec::maybe(user_id.map(user_orders_path))
        .order_by("createdAt", SortDirection::Desc)
}

/// The latest orders across the shop, newest first.
#[must_use]
pub fn recent_orders(limit: Option<usize>) -> CollectionQuerySpec {
    let spec = CollectionQuerySpec::collection(orders_path()).order_by("createdAt", SortDirection::Desc);
    match limit {
        Some(limit) => spec.limit(limit),
        None => spec,
    }
}
