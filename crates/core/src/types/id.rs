//! Newtype document IDs for type-safe entity references.
//!
//! Every document in the backend is addressed by a string ID. The
//! `define_id!` macro creates wrappers that keep user, order, inquiry, quote,
//! and product IDs from being mixed up.
//!
//! Orders, inquiries, and quotes mint their own IDs from the current time
//! (see [`OrderId::generate`], [`InquiryId::generate`], [`QuoteId::generate`]).

use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, Utc};
use rand::Rng;

/// Macro to define a type-safe string ID wrapper.
///
/// Creates a newtype wrapper around `String` with:
/// - `Serialize`/`Deserialize` with `#[serde(transparent)]`
/// - `Debug`, `Clone`, `PartialEq`, `Eq`, `Hash`, `PartialOrd`, `Ord`
/// - Conversion methods: `new()`, `as_str()`, `into_inner()`
/// - `From<String>`, `From<&str>` and `Into<String>` implementations
///
/// # Example
///
/// ```rust
/// # use owldoor_core::define_id;
/// define_id!(CouponId);
/// define_id!(ReviewId);
///
/// let coupon = CouponId::new("WELCOME10");
/// assert_eq!(coupon.as_str(), "WELCOME10");
///
/// // These are different types, so this won't compile:
/// // let _: ReviewId = coupon;
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            PartialEq,
            Eq,
            Hash,
            PartialOrd,
            Ord,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wrap an existing document ID.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Get the ID as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume the wrapper and return the inner string.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl ::core::convert::AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_owned())
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id!(UserId);
define_id!(OrderId);
define_id!(InquiryId);
define_id!(QuoteId);
define_id!(ProductId);

/// Length of the random base-36 suffix on order IDs.
const ORDER_SUFFIX_LEN: usize = 9;

/// Last millisecond handed out by [`next_id_millis`].
static LAST_ISSUED_MILLIS: AtomicI64 = AtomicI64::new(0);

/// Millisecond timestamp for a new time-based ID.
///
/// Returns `now` in epoch milliseconds, bumped forward when needed so that
/// every value handed out in this process is strictly greater than the last.
/// Two inquiries created in the same millisecond therefore still get
/// distinct IDs.
pub fn next_id_millis(now: DateTime<Utc>) -> i64 {
    let candidate = now.timestamp_millis();
    let mut last = LAST_ISSUED_MILLIS.load(Ordering::Relaxed);
    loop {
        let next = candidate.max(last.saturating_add(1));
        match LAST_ISSUED_MILLIS.compare_exchange_weak(
            last,
            next,
            Ordering::AcqRel,
            Ordering::Relaxed,
        ) {
            Ok(_) => return next,
            Err(actual) => last = actual,
        }
    }
}

fn random_base36(rng: &mut impl Rng, len: usize) -> String {
    (0..len)
        .map(|_| char::from_digit(rng.random_range(0..36), 36).unwrap_or('0'))
        .collect()
}

impl OrderId {
    /// Prefix shared by all order IDs.
    pub const PREFIX: &'static str = "ORD_";

    /// Generate a composite order ID: `ORD_<millis>_<9 base-36 chars>`.
    #[must_use]
    pub fn generate() -> Self {
        Self::generate_at(Utc::now(), &mut rand::rng())
    }

    /// Generate an order ID for a given instant and random source.
    #[must_use]
    pub fn generate_at(now: DateTime<Utc>, rng: &mut impl Rng) -> Self {
        let millis = next_id_millis(now);
        let suffix = random_base36(rng, ORDER_SUFFIX_LEN);
        Self(format!("{}{millis}_{suffix}", Self::PREFIX))
    }
}

impl InquiryId {
    /// Prefix shared by all inquiry IDs.
    pub const PREFIX: &'static str = "INQ_";

    /// Generate a time-based inquiry ID: `INQ_<millis>`.
    #[must_use]
    pub fn generate() -> Self {
        Self::generate_at(Utc::now())
    }

    /// Generate an inquiry ID for a given instant.
    #[must_use]
    pub fn generate_at(now: DateTime<Utc>) -> Self {
        Self(format!("{}{}", Self::PREFIX, next_id_millis(now)))
    }
}

impl QuoteId {
    /// Prefix shared by all quote request IDs.
    pub const PREFIX: &'static str = "QT_";

    /// Generate a time-based quote request ID: `QT_<millis>`.
    #[must_use]
    pub fn generate() -> Self {
        Self::generate_at(Utc::now())
    }

    /// Generate a quote request ID for a given instant.
    #[must_use]
    pub fn generate_at(now: DateTime<Utc>) -> Self {
        Self(format!("{}{}", Self::PREFIX, next_id_millis(now)))
    }
}
