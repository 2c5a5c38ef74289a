//! Owldoor CLI - Catalog seeding and order administration.
//!
//! Every command runs one storefront operation and prints its JSON
//! outcome. The process exits non-zero when the outcome is a failure.
//!
//! # Usage
//!
//! ```bash
//! # Write the seed catalog to Firestore
//! owldoor seed-products
//!
//! # Read the catalog
//! owldoor products list
//! owldoor products get product_1
//!
//! # Orders of one user, newest first
//! owldoor orders list --user 8f3kQ2...
//!
//! # Mark an order paid
//! owldoor orders set-status ORD_1714550400000_ab12cd34e paid --payment-json '{"method":"card"}'
//!
//! # Any command against a throwaway in-memory backend
//! owldoor --memory products list
//! ```
//!
//! # Environment Variables
//!
//! - `FIREBASE_API_KEY`, `FIREBASE_PROJECT_ID` - required unless `--memory`
//! - `FIREBASE_AUTH_EMULATOR_HOST`, `FIRESTORE_EMULATOR_HOST` - local emulators
//! - `SENTRY_DSN` - error reporting
//! - `RUST_LOG` - log filter

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use sentry::integrations::tracing as sentry_tracing;
use thiserror::Error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use owldoor_core::OrderStatus;
use owldoor_storefront::backend::memory::MemoryBackend;
use owldoor_storefront::config::ConfigError;
use owldoor_storefront::{FacadeOptions, InitError, Storefront, StorefrontConfig};

mod commands;

#[derive(Parser)]
#[command(name = "owldoor")]
#[command(author, version, about = "Owldoor storefront CLI tools")]
struct Cli {
    /// Run against a fresh in-memory backend preloaded with the seed catalog
    #[arg(long, global = true)]
    memory: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write the seed catalog (idempotent)
    SeedProducts,
    /// Read the product catalog
    Products {
        #[command(subcommand)]
        action: ProductsAction,
    },
    /// Inspect and update orders
    Orders {
        #[command(subcommand)]
        action: OrdersAction,
    },
}

#[derive(Subcommand)]
enum ProductsAction {
    /// List all products in display order
    List,
    /// Show one product
    Get {
        /// Product document ID
        id: String,
    },
}

#[derive(Subcommand)]
enum OrdersAction {
    /// List a user's orders, newest first
    List {
        /// User ID (Firebase uid)
        #[arg(short, long)]
        user: String,
    },
    /// Change an order's status
    SetStatus {
        /// Order ID
        id: String,

        /// New status (`pending`, `paid`, `confirmed`, `shipping`, `completed`, `cancelled`)
        status: OrderStatus,

        /// Payment details as a JSON object
        #[arg(long)]
        payment_json: Option<String>,
    },
}

/// Errors that stop a command before it produces an outcome.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The backend client could not be built.
    #[error(transparent)]
    Init(#[from] InitError),

    /// Output or argument JSON was invalid.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// `--payment-json` was valid JSON but not an object.
    #[error("--payment-json must be a JSON object, got: {0}")]
    PaymentNotObject(String),
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &StorefrontConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR => sentry_tracing::EventFilter::Event,
        tracing::Level::WARN | tracing::Level::INFO => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Missing Firebase settings only matter when talking to Firebase
    let config = StorefrontConfig::from_env();
    let _sentry_guard = config.as_ref().ok().and_then(init_sentry);

    // Logs go to stderr; stdout carries the JSON outcome
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "owldoor_storefront=info,owldoor_cli=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    match run(cli, config).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            tracing::error!("Command failed: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Run the command; `Ok(false)` means the operation reported a failure.
async fn run(cli: Cli, config: Result<StorefrontConfig, ConfigError>) -> Result<bool, CliError> {
    let storefront = if cli.memory {
        let options = config
            .as_ref()
            .map(FacadeOptions::from)
            .unwrap_or_default();
        let storefront = Storefront::in_memory(&MemoryBackend::new(), options);
        // The seed run is part of `--memory` setup, not of the command
        let seeded = storefront.seed_products().await;
        tracing::debug!(seeded = ?seeded.success().map(|s| s.seeded), "In-memory catalog seeded");
        storefront
    } else {
        Storefront::connect(&config?)?
    };

    match cli.command {
        Commands::SeedProducts => commands::catalog::seed(&storefront).await,
        Commands::Products { action } => match action {
            ProductsAction::List => commands::catalog::list(&storefront).await,
            ProductsAction::Get { id } => commands::catalog::get(&storefront, &id).await,
        },
        Commands::Orders { action } => match action {
            OrdersAction::List { user } => commands::orders::list(&storefront, &user).await,
            OrdersAction::SetStatus {
                id,
                status,
                payment_json,
            } => {
                commands::orders::set_status(&storefront, &id, status, payment_json.as_deref())
                    .await
            }
        },
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_set_status_parses_status() {
        let cli = Cli::try_parse_from([
            "owldoor",
            "orders",
            "set-status",
            "ORD_1",
            "shipping",
            "--payment-json",
            r#"{"method":"card"}"#,
        ])
        .unwrap();

        let Commands::Orders {
            action: OrdersAction::SetStatus { status, payment_json, .. },
        } = cli.command
        else {
            panic!("expected orders set-status");
        };
        assert_eq!(status, OrderStatus::Shipping);
        assert_eq!(payment_json.as_deref(), Some(r#"{"method":"card"}"#));
    }

    #[test]
    fn test_unknown_status_is_rejected() {
        assert!(Cli::try_parse_from(["owldoor", "orders", "set-status", "ORD_1", "lost"]).is_err());
    }

    #[test]
    fn test_memory_flag_is_global() {
        let cli = Cli::try_parse_from(["owldoor", "products", "list", "--memory"]).unwrap();
        assert!(cli.memory);
    }
}
