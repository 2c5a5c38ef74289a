//! Integration tests for the Owldoor storefront facade.
//!
//! Every facade operation is exercised end to end against the in-memory
//! backend, so no Firebase project or emulator is needed.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p owldoor-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `auth` - Sign-up, sign-in, federated sign-in, sign-out, profile
//! - `orders` - Order creation, status updates, per-user listing
//! - `requests` - Inquiries and quote requests
//! - `catalog` - Product listing, lookup, seeding, caching
//! - `presentation` - Header widget state driven by the session

#![cfg_attr(not(test), forbid(unsafe_code))]

use serde_json::Value;

use owldoor_storefront::backend::memory::MemoryBackend;
use owldoor_storefront::backend::{FederatedCredential, FederatedProvider, Fields};
use owldoor_storefront::{FacadeOptions, Storefront};

/// A facade wired to a fresh in-memory backend.
pub struct TestContext {
    pub backend: MemoryBackend,
    pub storefront: Storefront,
}

impl TestContext {
    /// Default options: no catalog cache, no status enforcement.
    #[must_use]
    pub fn new() -> Self {
        Self::with_options(FacadeOptions::default())
    }

    #[must_use]
    pub fn with_options(options: FacadeOptions) -> Self {
        let backend = MemoryBackend::new();
        let storefront = Storefront::in_memory(&backend, options);
        Self {
            backend,
            storefront,
        }
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Turn a `json!({...})` literal into document fields.
///
/// # Panics
///
/// Panics if `value` is not an object.
#[must_use]
#[allow(clippy::panic)]
pub fn payload(value: Value) -> Fields {
    match value {
        Value::Object(fields) => fields,
        other => panic!("payload must be a JSON object, got {other}"),
    }
}

/// A Google credential as the page would hand it over after the popup.
#[must_use]
pub fn google_credential(id_token: &str) -> FederatedCredential {
    FederatedCredential {
        provider: FederatedProvider::Google,
        id_token: Some(id_token.to_string()),
        access_token: None,
        request_uri: "http://127.0.0.1:5500/login.html".to_string(),
    }
}
