//! Success payloads of the facade operations.
//!
//! Field names are what the page reads next to `success`.

use serde::Serialize;

use owldoor_core::{InquiryId, OrderId, QuoteId};

use crate::models::{Order, Product, UserProfile};
use crate::session::AuthUser;

#[derive(Debug, Clone, Serialize)]
pub struct SignedIn {
    pub user: AuthUser,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderCreated {
    pub order_id: OrderId,
    pub order: Order,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderList {
    pub orders: Vec<Order>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InquiryCreated {
    pub inquiry_id: InquiryId,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteCreated {
    pub quote_id: QuoteId,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProductList {
    pub products: Vec<Product>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProductDetail {
    pub product: Product,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProfileDetail {
    pub profile: UserProfile,
}

/// Number of products written by a seed run.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct CatalogSeeded {
    pub seeded: usize,
}
