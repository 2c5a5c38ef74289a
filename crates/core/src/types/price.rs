//! Korean won amounts.
//!
//! The catalog is priced in whole won (KRW has no minor unit), and the
//! backend stores prices as plain integers, so `Won` serializes as a bare
//! number.

use core::fmt;

use serde::{Deserialize, Serialize};

/// An amount in Korean won.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Won(i64);

impl Won {
    /// Create an amount from whole won.
    #[must_use]
    pub const fn new(amount: i64) -> Self {
        Self(amount)
    }

    /// The amount in whole won.
    #[must_use]
    pub const fn amount(self) -> i64 {
        self.0
    }

    /// Percentage discount of `self` relative to `original`, rounded down.
    ///
    /// Returns `None` when `original` is not positive or `self` is not
    /// below it.
    #[must_use]
    pub const fn discount_percent_from(self, original: Self) -> Option<u8> {
        if original.0 <= 0 || self.0 >= original.0 || self.0 < 0 {
            return None;
        }
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)] // 0 < off <= 100
        let off = ((original.0 - self.0) * 100 / original.0) as u8;
        Some(off)
    }
}

impl fmt::Display for Won {
    /// Formats with thousands separators and the won sign, e.g. `1,200,000원`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let digits = self.0.unsigned_abs().to_string();
        let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
        for (i, c) in digits.chars().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                grouped.push(',');
            }
            grouped.push(c);
        }
        if self.0 < 0 {
            write!(f, "-{grouped}원")
        } else {
            write!(f, "{grouped}원")
        }
    }
}

impl From<i64> for Won {
    fn from(amount: i64) -> Self {
        Self(amount)
    }
}
