//! Command implementations.

pub mod catalog;
pub mod orders;

use serde::Serialize;

use owldoor_storefront::Outcome;

use crate::CliError;

/// Print an outcome as pretty JSON and report whether it succeeded.
#[allow(clippy::print_stdout)]
fn print_outcome<T: Serialize>(outcome: &Outcome<T>) -> Result<bool, CliError> {
    println!("{}", serde_json::to_string_pretty(outcome)?);
    Ok(outcome.is_success())
}
