//! Cart line types.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use modaverse_core::ProductId;

/// The catalog fields a cart keeps about a product, captured when it was
/// added. Later catalog edits do not change lines already in the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSnapshot {
    pub id: ProductId,
    pub name: String,
    /// Unit price in the store currency.
    pub price: Decimal,
    pub slug: String,
    /// Primary image URL.
    #[serde(default)]
    pub image: Option<String>,
}

/// One product and how many of it the shopper wants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub product: ProductSnapshot,
    /// Always at least 1 inside a cart.
    pub quantity: u32,
}

impl CartLine {
    #[must_use]
    pub const fn product_id(&self) -> &ProductId {
        &self.product.id
    }

    /// Unit price times quantity.
    #[must_use]
    pub fn subtotal(&self) -> Decimal {
        self.product.price * Decimal::from(self.quantity)
    }
}
