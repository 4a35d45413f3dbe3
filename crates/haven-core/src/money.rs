//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In floating point:                                                     │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                           │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Cents                                            │
//! │    KES 4,500.00 = 450000 cents, all arithmetic stays exact             │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The push-payment provider wants whole shillings on the wire; the
//! conversion truncates, matching the provider's own integer amounts.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Sub};

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit (cents).
///
/// ## Design Decisions
/// - **i64 (signed)**: Allows negative values for refunds and adjustments
/// - **Single field tuple struct**: Zero-cost abstraction over i64
/// - **Derives**: Full serde support for JSON serialization
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents (the smallest currency unit).
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Creates a Money value from whole currency units (shillings).
    #[inline]
    pub const fn from_whole_units(units: i64) -> Self {
        Money(units * 100)
    }

    /// Returns the value in cents.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the value in whole currency units, truncating cents.
    ///
    /// This is the amount the push-payment provider receives: the gateway
    /// API takes integer shillings.
    #[inline]
    pub const fn to_whole_units(&self) -> i64 {
        self.0 / 100
    }

    /// Zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the value is strictly positive.
    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Multiplies by a quantity, returning None on overflow.
    ///
    /// Cart totals are Σ price × quantity; a poisoned quantity must not
    /// wrap around into a plausible-looking total.
    #[inline]
    pub fn checked_mul_qty(&self, qty: i64) -> Option<Money> {
        self.0.checked_mul(qty).map(Money)
    }

    /// Sums an iterator of Money values, returning None on overflow.
    pub fn checked_sum<I: IntoIterator<Item = Money>>(iter: I) -> Option<Money> {
        iter.into_iter()
            .try_fold(Money::zero(), |acc, m| acc.0.checked_add(m.0).map(Money))
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Money {
        Money(self.0 + rhs.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Money) {
        self.0 += rhs.0;
    }
}

impl Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Money) -> Money {
        Money(self.0 - rhs.0)
    }
}

impl fmt::Display for Money {
    /// Formats as "KES 4,500.00"-less plain form: `KES 4500.00`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.abs();
        write!(f, "{}KES {}.{:02}", sign, abs / 100, abs % 100)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_cents_roundtrip() {
        let m = Money::from_cents(450000);
        assert_eq!(m.cents(), 450000);
        assert_eq!(m.to_whole_units(), 4500);
    }

    #[test]
    fn test_whole_units_truncate() {
        // 4500.99 → 4500 shillings on the wire
        assert_eq!(Money::from_cents(450099).to_whole_units(), 4500);
    }

    #[test]
    fn test_checked_mul_qty() {
        let price = Money::from_cents(450000);
        assert_eq!(price.checked_mul_qty(3), Some(Money::from_cents(1350000)));
        assert_eq!(Money::from_cents(i64::MAX).checked_mul_qty(2), None);
    }

    #[test]
    fn test_checked_sum() {
        let total = Money::checked_sum([
            Money::from_cents(100),
            Money::from_cents(250),
            Money::from_cents(50),
        ]);
        assert_eq!(total, Some(Money::from_cents(400)));
    }

    #[test]
    fn test_display() {
        assert_eq!(Money::from_cents(450099).to_string(), "KES 4500.99");
        assert_eq!(Money::from_cents(-550).to_string(), "-KES 5.50");
        assert_eq!(Money::from_cents(5).to_string(), "KES 0.05");
    }
}
