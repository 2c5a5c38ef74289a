//! Product catalog commands.

use owldoor_storefront::Storefront;

use super::print_outcome;
use crate::CliError;

/// Write the seed catalog.
pub async fn seed(storefront: &Storefront) -> Result<bool, CliError> {
    tracing::info!("Seeding product catalog...");
    print_outcome(&storefront.seed_products().await)
}

/// Print every product in display order.
pub async fn list(storefront: &Storefront) -> Result<bool, CliError> {
    print_outcome(&storefront.list_products().await)
}

/// Print one product.
pub async fn get(storefront: &Storefront, id: &str) -> Result<bool, CliError> {
    print_outcome(&storefront.get_product(id).await)
}
