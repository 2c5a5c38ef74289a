//! Order administration commands.

use serde_json::Value;

use owldoor_core::OrderStatus;
use owldoor_storefront::Storefront;
use owldoor_storefront::backend::Fields;

use super::print_outcome;
use crate::CliError;

/// Print a user's orders, newest first.
pub async fn list(storefront: &Storefront, user_id: &str) -> Result<bool, CliError> {
    print_outcome(&storefront.list_user_orders(user_id).await)
}

/// Change an order's status.
///
/// # Errors
///
/// Returns `CliError::Json` or `CliError::PaymentNotObject` if
/// `payment_json` is not a JSON object.
pub async fn set_status(
    storefront: &Storefront,
    id: &str,
    status: OrderStatus,
    payment_json: Option<&str>,
) -> Result<bool, CliError> {
    let payment_info = payment_json.map(parse_payment).transpose()?;

    tracing::info!(order_id = %id, status = %status, "Updating order status...");
    print_outcome(&storefront.update_order_status(id, status, payment_info).await)
}

fn parse_payment(raw: &str) -> Result<Fields, CliError> {
    match serde_json::from_str::<Value>(raw)? {
        Value::Object(fields) => Ok(fields),
        other => Err(CliError::PaymentNotObject(other.to_string())),
    }
}
