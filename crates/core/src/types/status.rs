//! Status enums for various entities.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A status label that is neither an English nor a Spanish status name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid order status: {0}")]
pub struct ParseStatusError(String);

/// Order lifecycle status.
///
/// Older order documents store the Spanish labels shown in the shop, so
/// those are accepted as aliases when decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum OrderStatus {
    #[default]
    #[serde(alias = "Pendiente")]
    Pending,
    #[serde(alias = "Enviado")]
    Shipped,
    #[serde(alias = "Entregado")]
    Delivered,
    #[serde(alias = "Cancelado")]
    Cancelled,
}

impl OrderStatus {
    /// Whether the order can no longer change status.
    #[must_use]
    pub const fn is_final(&self) -> bool {
        matches!(self, Self::Delivered | Self::Cancelled)
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "Pending"),
            Self::Shipped => write!(f, "Shipped"),
            Self::Delivered => write!(f, "Delivered"),
            Self::Cancelled => write!(f, "Cancelled"),
        }
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pending" | "pendiente" => Ok(Self::Pending),
            "shipped" | "enviado" => Ok(Self::Shipped),
            "delivered" | "entregado" => Ok(Self::Delivered),
            "cancelled" | "cancelado" => Ok(Self::Cancelled),
            _ => Err(ParseStatusError(s.to_string())),
        }
    }
}
