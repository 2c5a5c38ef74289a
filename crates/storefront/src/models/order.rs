//! `orders/{orderId}` documents.
//!
//! Orders carry whatever the page submitted, so reading one never fails:
//! a known field whose stored value has an unexpected type stays in
//! [`Order::details`] under its own name instead of being dropped.

use serde::Serialize;
use serde_json::Value;

use owldoor_core::{OrderId, OrderStatus};

use super::Owner;
use crate::backend::{Document, Fields};

/// Collection holding orders.
pub const ORDERS: &str = "orders";

/// An order as stored, with whatever fields the page submitted.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    /// Document ID.
    pub id: String,
    /// Identifier assigned at creation.
    pub order_id: OrderId,
    /// Owning user, or guest.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<Owner>,
    /// Signed-in user's email, or the email the guest entered.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_email: Option<String>,
    /// Lifecycle status.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<OrderStatus>,
    /// Payment details from the last status update.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_info: Option<Fields>,
    /// Server time of creation; unset until the write is read back.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    /// Server time of the last change.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    /// Every other stored field (items, shipping address, amounts, ...).
    #[serde(flatten)]
    pub details: Fields,
}

impl From<Document> for Order {
    fn from(document: Document) -> Self {
        let Document { path, mut fields } = document;

        let id = take(&mut fields, "id", string).unwrap_or_else(|| path.id().to_string());
        let order_id = take(&mut fields, "orderId", string)
            .map_or_else(|| OrderId::new(path.id()), OrderId::new);

        Self {
            id,
            order_id,
            user_id: take(&mut fields, "userId", string).map(Owner::from),
            user_email: take(&mut fields, "userEmail", string),
            status: take(&mut fields, "status", |v| v.as_str()?.parse().ok()),
            payment_info: take(&mut fields, "paymentInfo", |v| v.as_object().cloned()),
            created_at: take(&mut fields, "createdAt", string),
            updated_at: take(&mut fields, "updatedAt", string),
            details: fields,
        }
    }
}

fn string(value: &Value) -> Option<String> {
    value.as_str().map(str::to_string)
}

/// Remove `key` if `parse` accepts its value; otherwise leave it in place.
fn take<T>(fields: &mut Fields, key: &str, parse: impl FnOnce(&Value) -> Option<T>) -> Option<T> {
    let parsed = fields.get(key).and_then(parse)?;
    fields.remove(key);
    Some(parsed)
}
