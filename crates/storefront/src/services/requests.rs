//! Customer inquiries and quote requests.
//!
//! Both are write-only from the storefront: a time-based ID, the page's
//! payload, a `pending` status, and a server creation time.

use tracing::{info, instrument};

use owldoor_core::{InquiryId, InquiryStatus, QuoteId, QuoteStatus, UserId};

use crate::backend::{DocumentPath, DocumentStore, DocumentWrite, Fields, IdToken};
use crate::error::{Result, StorefrontError};
use crate::models::Owner;

/// Collection holding inquiries.
pub const INQUIRIES: &str = "inquiries";

/// Collection holding quote requests.
pub const QUOTES: &str = "quotes";

/// Inquiry and quote operations on behalf of the current caller.
pub struct RequestService<'a> {
    documents: &'a dyn DocumentStore,
    auth: Option<&'a IdToken>,
}

impl<'a> RequestService<'a> {
    /// Create a request service; `auth` is the signed-in user's token.
    #[must_use]
    pub const fn new(documents: &'a dyn DocumentStore, auth: Option<&'a IdToken>) -> Self {
        Self { documents, auth }
    }

    /// Store an inquiry owned by `user` (or `guest`).
    ///
    /// # Errors
    ///
    /// Returns `StorefrontError::Write` if the write is rejected.
    #[instrument(skip(self, user, payload))]
    pub async fn create_inquiry(&self, user: Option<&UserId>, payload: Fields) -> Result<InquiryId> {
        let inquiry_id = InquiryId::generate();

        let mut fields = Fields::new();
        fields.insert("inquiryId".into(), inquiry_id.as_str().into());
        fields.insert("userId".into(), Owner::from_user(user).as_str().into());
        fields.extend(payload);
        fields.insert("inquiryId".into(), inquiry_id.as_str().into());
        fields.insert("status".into(), InquiryStatus::Pending.as_str().into());

        self.store(INQUIRIES, inquiry_id.as_str(), fields).await?;

        info!(inquiry_id = %inquiry_id, "Inquiry created");
        Ok(inquiry_id)
    }

    /// Store a quote request.
    ///
    /// # Errors
    ///
    /// Returns `StorefrontError::Write` if the write is rejected.
    #[instrument(skip(self, payload))]
    pub async fn create_quote(&self, payload: Fields) -> Result<QuoteId> {
        let quote_id = QuoteId::generate();

        let mut fields = Fields::new();
        fields.insert("quoteId".into(), quote_id.as_str().into());
        fields.extend(payload);
        fields.insert("quoteId".into(), quote_id.as_str().into());
        fields.insert("status".into(), QuoteStatus::Pending.as_str().into());

        self.store(QUOTES, quote_id.as_str(), fields).await?;

        info!(quote_id = %quote_id, "Quote request created");
        Ok(quote_id)
    }

    async fn store(&self, collection: &str, id: &str, fields: Fields) -> Result<()> {
        let write = DocumentWrite::new(fields).with_server_timestamp("createdAt");
        self.documents
            .set(self.auth, &DocumentPath::new(collection, id), &write)
            .await
            .map_err(StorefrontError::Write)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::backend::memory::MemoryBackend;
    use crate::backend::{DocumentError, DocumentErrorKind};

    #[tokio::test]
    async fn test_inquiry_document() {
        let backend = MemoryBackend::new();
        let requests = RequestService::new(&backend, None);
        let payload = json!({ "title": "설치 문의", "status": "answered" })
            .as_object()
            .cloned()
            .unwrap();

        let id = requests
            .create_inquiry(Some(&UserId::new("uid-1")), payload)
            .await
            .unwrap();

        let stored = backend.document(&DocumentPath::new(INQUIRIES, id.as_str())).unwrap();
        assert!(id.as_str().starts_with("INQ_"));
        assert_eq!(stored["userId"], json!("uid-1"));
        assert_eq!(stored["status"], json!("pending"));
        assert_eq!(stored["title"], json!("설치 문의"));
        assert!(stored["createdAt"].is_string());
    }

    #[tokio::test]
    async fn test_quote_ids_are_unique_back_to_back() {
        let backend = MemoryBackend::new();
        let requests = RequestService::new(&backend, None);

        let a = requests.create_quote(Fields::new()).await.unwrap();
        let b = requests.create_quote(Fields::new()).await.unwrap();

        assert_ne!(a, b);
        assert_eq!(backend.collection_len(QUOTES), 2);
        let stored = backend.document(&DocumentPath::new(QUOTES, a.as_str())).unwrap();
        assert!(stored.get("userId").is_none());
    }

    #[tokio::test]
    async fn test_rejected_write_surfaces_backend_message() {
        let backend = MemoryBackend::new();
        backend.fail_next_document(DocumentError::new(
            DocumentErrorKind::PermissionDenied,
            "Missing or insufficient permissions.",
        ));
        let requests = RequestService::new(&backend, None);

        let err = requests.create_quote(Fields::new()).await.unwrap_err();
        assert_eq!(err.to_string(), "Missing or insufficient permissions.");
    }
}
