//! Money helpers.
//!
//! Amounts are `Decimal` in the domain and integer cents at rest, so the
//! store can apply `col = col + n` increments without float drift.

use rust_decimal::{Decimal, RoundingStrategy};

/// Round to whole cents, half away from zero.
pub fn round_cents(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Convert an amount to integer cents. `None` if it does not fit in `i64`.
pub fn to_cents(amount: Decimal) -> Option<i64> {
    let mut rounded = round_cents(amount);
    rounded.rescale(2);
    i64::try_from(rounded.mantissa()).ok()
}

/// Convert integer cents back to an amount with two decimal places.
pub fn from_cents(cents: i64) -> Decimal {
    Decimal::new(cents, 2)
}

/// Commission owed for `value` at `rate`, rounded to cents.
pub fn commission_for(rate: Decimal, value: Decimal) -> Decimal {
    round_cents(rate * value)
}
