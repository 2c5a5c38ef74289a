//! Status enums for orders, inquiries, and quote requests.
//!
//! Statuses are stored as lowercase strings. Each enum exposes its position
//! in the lifecycle through `rank()` and a `can_advance_to()` check; the
//! backend itself accepts any write, so whether the check is applied is up
//! to the caller.

use serde::{Deserialize, Serialize};

/// Error returned when a status string is not part of the enum.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {kind} status: {value}")]
pub struct StatusParseError {
    /// Which status enum was being parsed.
    pub kind: &'static str,
    /// The rejected input.
    pub value: String,
}

/// Order lifecycle status.
///
/// `pending -> paid -> confirmed -> shipping -> completed`, with
/// `cancelled` reachable from any state that is not yet final.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    #[default]
    Pending,
    Paid,
    Confirmed,
    Shipping,
    Completed,
    Cancelled,
}

impl OrderStatus {
    /// All statuses in lifecycle order.
    pub const ALL: [Self; 6] = [
        Self::Pending,
        Self::Paid,
        Self::Confirmed,
        Self::Shipping,
        Self::Completed,
        Self::Cancelled,
    ];

    /// Stored string form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
            Self::Confirmed => "confirmed",
            Self::Shipping => "shipping",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Position in the forward lifecycle.
    #[must_use]
    pub const fn rank(self) -> u8 {
        match self {
            Self::Pending => 0,
            Self::Paid => 1,
            Self::Confirmed => 2,
            Self::Shipping => 3,
            Self::Completed => 4,
            Self::Cancelled => 5,
        }
    }

    /// Whether no further transition is expected.
    #[must_use]
    pub const fn is_final(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// Whether moving from `self` to `next` keeps the lifecycle forward-only.
    ///
    /// Rewriting the same status is allowed (payment info may change).
    #[must_use]
    pub const fn can_advance_to(self, next: Self) -> bool {
        if self.rank() == next.rank() {
            return true;
        }
        if self.is_final() {
            return false;
        }
        matches!(next, Self::Cancelled) || next.rank() > self.rank()
    }
}

/// Customer inquiry status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum InquiryStatus {
    #[default]
    Pending,
    Answered,
}

impl InquiryStatus {
    /// Stored string form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Answered => "answered",
        }
    }

    /// Position in the forward lifecycle.
    #[must_use]
    pub const fn rank(self) -> u8 {
        match self {
            Self::Pending => 0,
            Self::Answered => 1,
        }
    }

    /// Whether moving from `self` to `next` keeps the lifecycle forward-only.
    #[must_use]
    pub const fn can_advance_to(self, next: Self) -> bool {
        next.rank() >= self.rank()
    }
}

/// Quote request status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum QuoteStatus {
    #[default]
    Pending,
    Contacted,
    Completed,
}

impl QuoteStatus {
    /// Stored string form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Contacted => "contacted",
            Self::Completed => "completed",
        }
    }

    /// Position in the forward lifecycle.
    #[must_use]
    pub const fn rank(self) -> u8 {
        match self {
            Self::Pending => 0,
            Self::Contacted => 1,
            Self::Completed => 2,
        }
    }

    /// Whether moving from `self` to `next` keeps the lifecycle forward-only.
    #[must_use]
    pub const fn can_advance_to(self, next: Self) -> bool {
        next.rank() >= self.rank()
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::fmt::Display for InquiryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::fmt::Display for QuoteStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = StatusParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| StatusParseError {
                kind: "order",
                value: s.to_string(),
            })
    }
}

impl std::str::FromStr for InquiryStatus {
    type Err = StatusParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "answered" => Ok(Self::Answered),
            _ => Err(StatusParseError {
                kind: "inquiry",
                value: s.to_string(),
            }),
        }
    }
}

impl std::str::FromStr for QuoteStatus {
    type Err = StatusParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "contacted" => Ok(Self::Contacted),
            "completed" => Ok(Self::Completed),
            _ => Err(StatusParseError {
                kind: "quote",
                value: s.to_string(),
            }),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_order_status_roundtrips_through_str() {
        for status in OrderStatus::ALL {
            assert_eq!(status.as_str().parse::<OrderStatus>().unwrap(), status);
        }
        assert!("refunded".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn test_order_status_serde_lowercase() {
        assert_eq!(
            serde_json::to_value(OrderStatus::Shipping).unwrap(),
            serde_json::json!("shipping")
        );
    }

    #[test]
    fn test_order_forward_transitions() {
        assert!(OrderStatus::Pending.can_advance_to(OrderStatus::Paid));
        assert!(OrderStatus::Paid.can_advance_to(OrderStatus::Shipping));
        assert!(OrderStatus::Paid.can_advance_to(OrderStatus::Paid));
        assert!(OrderStatus::Shipping.can_advance_to(OrderStatus::Cancelled));
    }

    #[test]
    fn test_order_backward_transitions_rejected() {
        assert!(!OrderStatus::Paid.can_advance_to(OrderStatus::Pending));
        assert!(!OrderStatus::Completed.can_advance_to(OrderStatus::Cancelled));
        assert!(!OrderStatus::Cancelled.can_advance_to(OrderStatus::Paid));
    }

    #[test]
    fn test_inquiry_and_quote_transitions() {
        assert!(InquiryStatus::Pending.can_advance_to(InquiryStatus::Answered));
        assert!(!InquiryStatus::Answered.can_advance_to(InquiryStatus::Pending));
        assert!(QuoteStatus::Contacted.can_advance_to(QuoteStatus::Completed));
        assert!(!QuoteStatus::Completed.can_advance_to(QuoteStatus::Contacted));
    }

    #[test]
    fn test_parse_error_message() {
        let err = "closed".parse::<QuoteStatus>().unwrap_err();
        assert_eq!(err.to_string(), "invalid quote status: closed");
    }
}
