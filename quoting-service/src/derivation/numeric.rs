//! Decimal helpers shared by the derivation rules.
//!
//! Every helper is total: absent values count as zero, a zero base yields a
//! zero percentage and arithmetic overflow degrades to zero instead of
//! panicking. Derived values are stored with exactly three decimal places.

use rust_decimal::prelude::*;

/// Number of decimal places every derived value is stored with.
pub const DECIMAL_PLACES: u32 = 3;

/// Tolerance below which a recomputed value is considered unchanged (0.001).
pub const TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 3);

/// Value used for computation: `None` counts as zero.
#[inline]
pub fn value_of(value: Option<Decimal>) -> Decimal {
    value.unwrap_or(Decimal::ZERO)
}

/// Round half away from zero to three places and pin the scale, so the
/// value renders as a fixed-point string such as `"200.000"`.
pub fn to_fixed(value: Decimal) -> Decimal {
    let mut rounded =
        value.round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(DECIMAL_PLACES);
    rounded
}

/// Whether `next` may be skipped because the stored value already matches it.
///
/// An absent stored value never matches, so derived fields are filled in on
/// the first pass that computes them.
pub fn within_tolerance(current: Option<Decimal>, next: Decimal) -> bool {
    match current {
        Some(current) => current
            .checked_sub(next)
            .map(|diff| diff.abs() < TOLERANCE)
            .unwrap_or(false),
        None => false,
    }
}

pub fn add(a: Decimal, b: Decimal) -> Decimal {
    a.checked_add(b).unwrap_or_else(|| overflow("add", a, b))
}

pub fn sub(a: Decimal, b: Decimal) -> Decimal {
    a.checked_sub(b).unwrap_or_else(|| overflow("sub", a, b))
}

pub fn mul(a: Decimal, b: Decimal) -> Decimal {
    a.checked_mul(b).unwrap_or_else(|| overflow("mul", a, b))
}

/// `base × percent / 100`.
pub fn percent_of(base: Decimal, percent: Decimal) -> Decimal {
    mul(base, percent)
        .checked_div(Decimal::ONE_HUNDRED)
        .unwrap_or(Decimal::ZERO)
}

/// `amount / base × 100`, or zero when the base is not positive.
pub fn percent_from(amount: Decimal, base: Decimal) -> Decimal {
    if base <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    amount
        .checked_div(base)
        .map(|ratio| mul(ratio, Decimal::ONE_HUNDRED))
        .unwrap_or(Decimal::ZERO)
}

/// Parse user-entered text.
///
/// Blank input means "nothing entered" and stays `None`. Text that is not a
/// number is also stored as `None`, which the rules then treat as zero.
pub fn parse_input(raw: &str) -> Option<Decimal> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    Decimal::from_str(trimmed)
        .or_else(|_| Decimal::from_scientific(trimmed))
        .ok()
}

fn overflow(op: &str, a: Decimal, b: Decimal) -> Decimal {
    tracing::warn!(op, lhs = %a, rhs = %b, "Decimal overflow in quote line derivation, defaulting to zero");
    Decimal::ZERO
}
