//! Product documents.

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

use modaverse_core::ProductId;

use crate::cart::ProductSnapshot;

/// A catalog product as stored in the `products` collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub slug: String,
    pub name: String,
    pub category: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    /// Price before a markdown. Shown struck through when set.
    #[serde(
        default,
        with = "rust_decimal::serde::float_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub original_price: Option<Decimal>,
    #[serde(default)]
    pub images: Vec<ProductImage>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub details: Vec<String>,
    #[serde(default)]
    pub reviews: Vec<Review>,
    /// Short label such as "Nuevo" or "Oferta".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub badge: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductImage {
    pub id: String,
    pub url: String,
    #[serde(default)]
    pub alt: String,
    /// Search hint for placeholder imagery.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    pub id: String,
    pub author: String,
    /// 1 to 5 stars.
    pub rating: u8,
    pub comment: String,
    pub date: String,
}

impl Product {
    /// The fields a cart line keeps about this product.
    #[must_use]
    pub fn to_snapshot(&self) -> ProductSnapshot {
        ProductSnapshot {
            id: self.id.clone(),
            name: self.name.clone(),
            price: self.price,
            slug: self.slug.clone(),
            image: self.images.first().map(|image| image.url.clone()),
        }
    }

    /// Case-insensitive match of `term` against name, description and
    /// category. A blank term matches everything.
    #[must_use]
    pub fn matches_search(&self, term: &str) -> bool {
        let term = term.trim().to_lowercase();
        if term.is_empty() {
            return true;
        }
        [&self.name, &self.description, &self.category]
            .iter()
            .any(|field| field.to_lowercase().contains(&term))
    }

    /// Whole-number discount relative to `original_price`, if marked down.
    #[must_use]
    pub fn discount_percent(&self) -> Option<u32> {
        let original = self.original_price?;
        if original <= Decimal::ZERO || original <= self.price {
            return None;
        }
        ((original - self.price) / original * Decimal::ONE_HUNDRED)
            .round()
            .to_u32()
    }

    /// Mean star rating rounded to one decimal, if reviewed.
    #[must_use]
    pub fn average_rating(&self) -> Option<Decimal> {
        if self.reviews.is_empty() {
            return None;
        }
        let sum: u32 = self.reviews.iter().map(|review| u32::from(review.rating)).sum();
        Some((Decimal::from(sum) / Decimal::from(self.reviews.len())).round_dp(1))
    }
}
