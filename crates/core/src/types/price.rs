//! Type-safe price representation using decimal arithmetic.
//!
//! The catalog is priced in US dollars only. Display formatting follows the
//! en-US currency convention: a dollar sign, comma thousands separators and
//! exactly two fraction digits (`$12,500.00`).

use core::fmt;
use core::ops::{Add, Mul};

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// A price in US dollars.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(Decimal);

impl Price {
    /// Zero dollars.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Create a price from a dollar amount.
    #[must_use]
    pub const fn new(amount: Decimal) -> Self {
        Self(amount)
    }

    /// Create a price from a whole number of cents.
    #[must_use]
    pub fn from_cents(cents: i64) -> Self {
        Self(Decimal::new(cents, 2))
    }

    /// The dollar amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Format for display, e.g. `$12,500.00`.
    #[must_use]
    pub fn display(&self) -> String {
        format_usd(self.0)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display())
    }
}

impl From<Decimal> for Price {
    fn from(amount: Decimal) -> Self {
        Self(amount)
    }
}

impl Add for Price {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl Mul<Decimal> for Price {
    type Output = Self;

    fn mul(self, rhs: Decimal) -> Self {
        Self(self.0 * rhs)
    }
}

impl core::iter::Sum for Price {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

/// Format a dollar amount the way en-US currency formatting does.
///
/// Rounds half away from zero to cents.
#[must_use]
pub fn format_usd(amount: Decimal) -> String {
    let rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    let negative = rounded.is_sign_negative() && !rounded.is_zero();
    let text = format!("{:.2}", rounded.abs());
    let (whole, cents) = text.split_once('.').unwrap_or((text.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    if negative {
        format!("-${grouped}.{cents}")
    } else {
        format!("${grouped}.{cents}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_thousands() {
        assert_eq!(format_usd(Decimal::new(12_500, 0)), "$12,500.00");
        assert_eq!(format_usd(Decimal::new(1_234_567_89, 2)), "$1,234,567.89");
    }

    #[test]
    fn test_format_small_amounts() {
        assert_eq!(format_usd(Decimal::ZERO), "$0.00");
        assert_eq!(format_usd(Decimal::new(999, 0)), "$999.00");
        assert_eq!(format_usd(Decimal::new(5, 1)), "$0.50");
    }

    #[test]
    fn test_format_rounds_half_away_from_zero() {
        assert_eq!(format_usd(Decimal::new(1_005, 3)), "$1.01");
    }

    #[test]
    fn test_format_negative() {
        assert_eq!(format_usd(Decimal::new(-1_500, 0)), "-$1,500.00");
    }

    #[test]
    fn test_price_sum_and_multiply() {
        let total: Price = [Price::from_cents(1_000), Price::from_cents(250)]
            .into_iter()
            .sum();
        assert_eq!(total, Price::from_cents(1_250));
        assert_eq!(Price::from_cents(1_000) * Decimal::new(3, 0), Price::from_cents(3_000));
    }

    #[test]
    fn test_display_matches_format() {
        assert_eq!(Price::from_cents(899_900).to_string(), "$8,999.00");
    }
}
