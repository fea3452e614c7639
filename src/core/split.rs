//! Purchase splitting policy.
//!
//! Every purchase has exactly one implicit admin share that is never stored as a
//! debt, so a purchase with `n` participating friends is split `n + 1` ways. The
//! resulting share is computed once when a purchase is created or edited and then
//! stored verbatim on each debt row.

use crate::core::money::Money;
use serde::Deserialize;

/// How a purchase total is divided into per-participant shares.
///
/// A deployment picks one policy in `config.toml` and keeps it; switching later
/// would make historical shares irreproducible.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SplitPolicy {
    /// `ceil(total / n)` to the cent; the group never under-covers the purchase
    #[default]
    CeilingCent,
    /// `round(total / n)` to whole currency units, halves rounded up
    NearestUnit,
}

/// Number of ways a purchase is split: the friends plus the admin.
#[must_use]
pub const fn participant_count(friend_count: usize) -> usize {
    friend_count + 1
}

/// Computes each participant's share of `total` for a purchase with
/// `friend_count` participating friends.
#[must_use]
pub fn per_person_share(policy: SplitPolicy, total: Money, friend_count: usize) -> Money {
    let n = i128::try_from(participant_count(friend_count)).unwrap_or(i128::MAX);
    let cents = i128::from(total.cents());

    let share = match policy {
        SplitPolicy::CeilingCent => cents.div_euclid(n) + i128::from(cents.rem_euclid(n) != 0),
        SplitPolicy::NearestUnit => {
            let unit = n.saturating_mul(100);
            (cents + unit / 2).div_euclid(unit) * 100
        }
    };
    // A share never exceeds the total it was divided from, plus rounding.
    Money::from_cents(i64::try_from(share).unwrap_or(i64::MAX))
}

/// Subtotal of a line item: `quantity × unit_price`, rounded to the nearest cent.
///
/// Returns `None` when the product is beyond [`Money::LIMIT`].
#[must_use]
pub fn line_subtotal(quantity: f64, unit_price: Money) -> Option<Money> {
    #[allow(clippy::cast_precision_loss)]
    let exact = quantity * unit_price.cents() as f64;
    Money::from_cents_f64(exact.round())
}
