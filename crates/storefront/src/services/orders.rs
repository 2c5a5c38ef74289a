//! Order creation, status updates, and per-user listing.

use serde_json::Value;
use tracing::{info, instrument};

use owldoor_core::{OrderId, OrderStatus, UserId};

use crate::backend::{
    Direction, Document, DocumentPath, DocumentStore, DocumentWrite, Fields, IdToken, Query,
};
use crate::error::{Result, StorefrontError};
use crate::models::order::ORDERS;
use crate::models::{Order, Owner};
use crate::session::AuthUser;

/// Order operations on behalf of the current caller.
pub struct OrderService<'a> {
    documents: &'a dyn DocumentStore,
    auth: Option<&'a IdToken>,
}

impl<'a> OrderService<'a> {
    /// Create an order service; `auth` is the signed-in user's token.
    #[must_use]
    pub const fn new(documents: &'a dyn DocumentStore, auth: Option<&'a IdToken>) -> Self {
        Self { documents, auth }
    }

    /// Store a new order built from the page's payload.
    ///
    /// The owner is the signed-in user, or `guest` with the payload's
    /// `email` as contact address. Payload fields may override `userId` and
    /// `userEmail`; `orderId`, `status`, and the timestamps are always ours.
    ///
    /// # Errors
    ///
    /// Returns `StorefrontError::Write` if the write is rejected.
    #[instrument(skip(self, user, payload))]
    pub async fn create(&self, user: Option<&AuthUser>, payload: Fields) -> Result<Order> {
        let order_id = OrderId::generate();
        let path = DocumentPath::new(ORDERS, order_id.as_str());

        let user_email = match user {
            Some(user) => user.email.clone().map_or(Value::Null, Value::String),
            None => payload.get("email").cloned().unwrap_or(Value::Null),
        };

        let mut fields = Fields::new();
        fields.insert("orderId".into(), order_id.as_str().into());
        fields.insert(
            "userId".into(),
            Owner::from_user(user.map(|u| &u.uid)).as_str().into(),
        );
        fields.insert("userEmail".into(), user_email);
        fields.extend(payload);
        fields.insert("orderId".into(), order_id.as_str().into());
        fields.insert("status".into(), OrderStatus::Pending.as_str().into());

        let write = DocumentWrite::new(fields)
            .with_server_timestamp("createdAt")
            .with_server_timestamp("updatedAt");

        self.documents
            .set(self.auth, &path, &write)
            .await
            .map_err(StorefrontError::Write)?;

        let order = Order::from(Document {
            path,
            fields: write.fields,
        });
        info!(order_id = %order_id, owner = ?order.user_id, "Order created");
        Ok(order)
    }

    /// Set an order's status and payment details.
    ///
    /// With `enforce_order` set, the stored status is read first and a
    /// backwards move is rejected.
    ///
    /// # Errors
    ///
    /// Returns `StorefrontError::Write` if the order does not exist or the
    /// write is rejected, and `StorefrontError::StatusRegression` for a
    /// rejected backwards move.
    #[instrument(skip(self, payment_info), fields(order_id = %id, status = %status))]
    pub async fn update_status(
        &self,
        id: &OrderId,
        status: OrderStatus,
        payment_info: Option<Fields>,
        enforce_order: bool,
    ) -> Result<()> {
        let path = DocumentPath::new(ORDERS, id.as_str());

        if enforce_order {
            self.check_transition(&path, id, status).await?;
        }

        let mut fields = Fields::new();
        fields.insert("status".into(), status.as_str().into());
        fields.insert(
            "paymentInfo".into(),
            Value::Object(payment_info.unwrap_or_default()),
        );
        let write = DocumentWrite::new(fields).with_server_timestamp("updatedAt");

        self.documents
            .update(self.auth, &path, &write)
            .await
            .map_err(StorefrontError::Write)?;

        info!("Order status updated");
        Ok(())
    }

    /// Reject a status that would move the stored order backwards.
    ///
    /// A missing order passes; the update itself reports it.
    async fn check_transition(
        &self,
        path: &DocumentPath,
        id: &OrderId,
        next: OrderStatus,
    ) -> Result<()> {
        let Some(document) = self
            .documents
            .get(self.auth, path)
            .await
            .map_err(StorefrontError::Write)?
        else {
            return Ok(());
        };

        let current = match document.fields.get("status") {
            Some(Value::String(s)) => s.parse::<OrderStatus>().ok(),
            _ => None,
        };
        match current {
            Some(current) if !current.can_advance_to(next) => {
                Err(StorefrontError::StatusRegression {
                    id: id.to_string(),
                    from: current.to_string(),
                    to: next.to_string(),
                })
            }
            _ => Ok(()),
        }
    }

    /// Every order owned by `user_id`, newest first.
    ///
    /// # Errors
    ///
    /// Returns `StorefrontError::Read` if the query fails.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn list_for_user(&self, user_id: &UserId) -> Result<Vec<Order>> {
        let query = Query::collection(ORDERS)
            .where_eq("userId", user_id.as_str())
            .order_by("createdAt", Direction::Descending);

        self.documents
            .query(self.auth, &query)
            .await
            .map(|docs| docs.into_iter().map(Order::from).collect())
            .map_err(StorefrontError::Read)
    }
}
