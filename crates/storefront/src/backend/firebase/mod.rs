//! Firebase implementation of the backend traits.
//!
//! Talks to Firebase Authentication (Identity Toolkit) and Cloud Firestore
//! over their public REST APIs with the project's web API key. Emulator
//! hosts from the configuration replace the production endpoints.

mod firestore;
mod identity;
pub mod value;

pub use firestore::FirestoreClient;
pub use identity::IdentityToolkitClient;

use crate::config::FirebaseConfig;

const IDENTITY_TOOLKIT_URL: &str = "https://identitytoolkit.googleapis.com/v1/";
const FIRESTORE_URL: &str = "https://firestore.googleapis.com/v1/";

/// Both Firebase clients, sharing one HTTP connection pool.
#[derive(Clone)]
pub struct FirebaseBackend {
    /// Authentication client.
    pub identity: IdentityToolkitClient,
    /// Document database client.
    pub firestore: FirestoreClient,
}

impl FirebaseBackend {
    /// Build the clients for a project.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &FirebaseConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("owldoor-storefront/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let identity_url = config.auth_emulator_host.as_ref().map_or_else(
            || IDENTITY_TOOLKIT_URL.to_string(),
            |host| format!("http://{host}/identitytoolkit.googleapis.com/v1/"),
        );
        let firestore_url = config.firestore_emulator_host.as_ref().map_or_else(
            || FIRESTORE_URL.to_string(),
            |host| format!("http://{host}/v1/"),
        );

        Ok(Self {
            identity: IdentityToolkitClient::new(
                client.clone(),
                &identity_url,
                config.api_key.clone(),
            ),
            firestore: FirestoreClient::new(
                client,
                &firestore_url,
                &config.project_id,
                &config.database_id,
                config.api_key.clone(),
            ),
        })
    }
}
