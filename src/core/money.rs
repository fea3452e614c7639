//! Monetary amounts as integer cents.
//!
//! Every balance, share and payment flows through [`Money`] so that sums and
//! comparisons are exact. Amounts are persisted as `*_cents` integer columns and
//! always displayed with exactly two decimal places.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Sub, SubAssign};

/// A signed amount of money in cents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    /// Zero dollars.
    pub const ZERO: Self = Self(0);

    /// Largest magnitude accepted from user input or as a purchase total
    /// ($10,000,000,000.00). Sums of many such amounts still fit in an `i64`.
    pub const LIMIT: Self = Self(1_000_000_000_000);

    /// Creates an amount from a number of cents.
    #[must_use]
    pub const fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    /// Returns the raw number of cents.
    #[must_use]
    pub const fn cents(self) -> i64 {
        self.0
    }

    /// Converts a user-supplied decimal amount (e.g. `25.5`) to cents, rounding to
    /// the nearest cent. Returns `None` for NaN, infinities and values beyond
    /// [`Money::LIMIT`].
    #[must_use]
    pub fn from_major(amount: f64) -> Option<Self> {
        if !amount.is_finite() {
            return None;
        }
        Self::from_cents_f64((amount * 100.0).round())
    }

    /// Converts a whole number of cents held in an `f64`, rejecting anything
    /// outside [`Money::LIMIT`].
    #[must_use]
    pub fn from_cents_f64(cents: f64) -> Option<Self> {
        #[allow(clippy::cast_precision_loss)]
        let limit = Self::LIMIT.0 as f64;
        if !cents.is_finite() || cents.abs() > limit {
            return None;
        }
        #[allow(clippy::cast_possible_truncation)]
        let cents = cents as i64;
        Some(Self(cents))
    }

    /// Adds, returning `None` if the sum would exceed [`Money::LIMIT`].
    #[must_use]
    pub fn checked_add(self, other: Self) -> Option<Self> {
        self.0
            .checked_add(other.0)
            .filter(|sum| sum.unsigned_abs() <= Self::LIMIT.0.unsigned_abs())
            .map(Self)
    }

    /// True when the amount is strictly greater than zero.
    #[must_use]
    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }

    /// True when the amount is exactly zero.
    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Subtracts, clamping at zero.
    #[must_use]
    pub const fn saturating_sub_to_zero(self, other: Self) -> Self {
        if self.0 > other.0 {
            Self(self.0 - other.0)
        } else {
            Self::ZERO
        }
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}${}.{:02}", abs / 100, abs % 100)
    }
}

impl Add for Money {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl Sub for Money {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self(self.0 - rhs.0)
    }
}

impl SubAssign for Money {
    fn sub_assign(&mut self, rhs: Self) {
        self.0 -= rhs.0;
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl<'a> Sum<&'a Self> for Money {
    fn sum<I: Iterator<Item = &'a Self>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_two_decimals() {
        assert_eq!(Money::from_cents(650).to_string(), "$6.50");
        assert_eq!(Money::from_cents(5).to_string(), "$0.05");
        assert_eq!(Money::ZERO.to_string(), "$0.00");
        assert_eq!(Money::from_cents(-1234).to_string(), "-$12.34");
    }

    #[test]
    fn test_from_major_rounds_to_cent() {
        assert_eq!(Money::from_major(25.5), Some(Money::from_cents(2550)));
        assert_eq!(Money::from_major(0.1 + 0.2), Some(Money::from_cents(30)));
        assert_eq!(Money::from_major(19.999), Some(Money::from_cents(2000)));
        assert_eq!(Money::from_major(-3.0), Some(Money::from_cents(-300)));
    }

    #[test]
    fn test_from_major_rejects_non_finite() {
        assert_eq!(Money::from_major(f64::NAN), None);
        assert_eq!(Money::from_major(f64::INFINITY), None);
        assert_eq!(Money::from_major(f64::NEG_INFINITY), None);
        assert_eq!(Money::from_major(1e300), None);
    }

    #[test]
    fn test_from_major_rejects_beyond_limit() {
        assert_eq!(Money::from_major(10_000_000_000.0), Some(Money::LIMIT));
        assert_eq!(Money::from_major(10_000_000_000.01), None);
        assert_eq!(Money::from_major(90_000_000_000_000_000.0), None);
    }

    #[test]
    fn test_checked_add_stops_at_limit() {
        let half = Money::from_cents(Money::LIMIT.cents() / 2);
        assert_eq!(half.checked_add(half), Some(Money::LIMIT));
        assert_eq!(Money::LIMIT.checked_add(Money::from_cents(1)), None);
        assert_eq!(
            Money::from_cents(i64::MAX).checked_add(Money::from_cents(1)),
            None
        );
    }

    #[test]
    fn test_arithmetic_and_sum() {
        let amounts = [Money::from_cents(1000), Money::from_cents(2000), Money::from_cents(3000)];
        assert_eq!(amounts.iter().sum::<Money>(), Money::from_cents(6000));
        assert_eq!(
            Money::from_cents(1000) - Money::from_cents(2500),
            Money::from_cents(-1500)
        );
        assert_eq!(
            Money::from_cents(1000).saturating_sub_to_zero(Money::from_cents(2500)),
            Money::ZERO
        );
    }
}
