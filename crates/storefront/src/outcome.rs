//! The uniform result shape every facade operation returns.
//!
//! ```json
//! {"success": true, "orderId": "ORD_1767225600000_k3j9x0a2b", "order": {...}}
//! {"success": false, "error": "EMAIL_EXISTS"}
//! ```

use std::fmt;

use serde::{Serialize, Serializer};

/// Success with a payload, or failure with a message.
///
/// The payload's fields are flattened next to `success`, so payload types
/// must serialize as maps (structs) or as `()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T> {
    /// The operation completed.
    Success(T),
    /// The operation failed; `error` is shown to the user as-is.
    Failure {
        /// Human-readable message.
        error: String,
    },
}

impl<T> Outcome<T> {
    /// A failure with `error` as its message.
    pub fn failure(error: impl Into<String>) -> Self {
        Self::Failure {
            error: error.into(),
        }
    }

    /// Convert a result, using the error's `Display` as the message.
    pub fn from_result<E: fmt::Display>(result: Result<T, E>) -> Self {
        match result {
            Ok(value) => Self::Success(value),
            Err(err) => Self::failure(err.to_string()),
        }
    }

    /// Whether the operation completed.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// The payload, if successful.
    #[must_use]
    pub const fn success(&self) -> Option<&T> {
        match self {
            Self::Success(value) => Some(value),
            Self::Failure { .. } => None,
        }
    }

    /// Take the payload, if successful.
    #[must_use]
    pub fn into_success(self) -> Option<T> {
        match self {
            Self::Success(value) => Some(value),
            Self::Failure { .. } => None,
        }
    }

    /// The failure message, if any.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Success(_) => None,
            Self::Failure { error } => Some(error),
        }
    }
}

impl<T: Serialize> Serialize for Outcome<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct Succeeded<'a, T> {
            success: bool,
            #[serde(flatten)]
            payload: &'a T,
        }

        #[derive(Serialize)]
        struct Failed<'a> {
            success: bool,
            error: &'a str,
        }

        match self {
            Self::Success(payload) => Succeeded {
                success: true,
                payload,
            }
            .serialize(serializer),
            Self::Failure { error } => Failed {
                success: false,
                error,
            }
            .serialize(serializer),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[derive(Serialize)]
    #[serde(rename_all = "camelCase")]
    struct Created {
        inquiry_id: String,
    }

    #[test]
    fn test_success_flattens_payload() {
        let outcome = Outcome::Success(Created {
            inquiry_id: "INQ_1767225600000".into(),
        });
        assert_eq!(
            serde_json::to_value(&outcome).unwrap(),
            json!({ "success": true, "inquiryId": "INQ_1767225600000" })
        );
    }

    #[test]
    fn test_unit_success_is_just_the_flag() {
        let outcome = Outcome::Success(());
        assert_eq!(
            serde_json::to_value(&outcome).unwrap(),
            json!({ "success": true })
        );
    }

    #[test]
    fn test_failure_shape() {
        let outcome: Outcome<()> = Outcome::failure("상품을 찾을 수 없습니다.");
        assert_eq!(
            serde_json::to_value(&outcome).unwrap(),
            json!({ "success": false, "error": "상품을 찾을 수 없습니다." })
        );
        assert_eq!(outcome.error(), Some("상품을 찾을 수 없습니다."));
        assert!(!outcome.is_success());
    }

    #[test]
    fn test_from_result() {
        let ok: Outcome<u8> = Outcome::from_result(Ok::<_, String>(3));
        assert_eq!(ok.success(), Some(&3));

        let err: Outcome<u8> = Outcome::from_result(Err("EMAIL_EXISTS"));
        assert_eq!(err.error(), Some("EMAIL_EXISTS"));
    }
}
