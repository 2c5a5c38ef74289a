//! `products/{productId}` documents.

use serde::{Deserialize, Serialize};

use owldoor_core::{ProductId, Won};

/// Collection holding the catalog.
pub const PRODUCTS: &str = "products";

/// A catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub category: String,
    pub price: Won,
    pub original_price: Won,
    #[serde(default)]
    pub description: String,
    /// Empty when the product has no badge.
    #[serde(default)]
    pub badge: String,
    #[serde(default)]
    pub image: String,
    /// Position in listings, ascending.
    pub order: u32,
}

impl Product {
    /// The badge label, if any.
    #[must_use]
    pub fn badge(&self) -> Option<&str> {
        Some(self.badge.as_str()).filter(|b| !b.is_empty())
    }

    /// Percentage off the original price, rounded down.
    #[must_use]
    pub const fn discount_percent(&self) -> Option<u8> {
        self.price.discount_percent_from(self.original_price)
    }
}
