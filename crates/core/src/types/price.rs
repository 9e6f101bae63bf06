//! Type-safe price representation using decimal arithmetic.

use core::fmt;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// A price in pounds sterling.
///
/// Stored orders carry the final price as a JSON number, so the serde
/// representation is a float rather than the decimal string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(#[serde(with = "rust_decimal::serde::float")] Decimal);

impl Price {
    /// Create a price from pence.
    #[must_use]
    pub fn from_pence(pence: i64) -> Self {
        Self(Decimal::new(pence, 2))
    }

    /// Create a price from a decimal amount in pounds.
    #[must_use]
    pub const fn new(amount: Decimal) -> Self {
        Self(amount)
    }

    /// The amount in pounds.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Apply a fractional discount (`0.05` is 5 % off), rounded to pence.
    ///
    /// Midpoints round away from zero so `£1.80 × 0.95 = £1.71` and
    /// `£6.17 × 0.95 = £5.8615 → £5.86`.
    #[must_use]
    pub fn discounted(&self, rate: Decimal) -> Self {
        let factor = Decimal::ONE - rate;
        Self(
            (self.0 * factor).round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero),
        )
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "£{:.2}", self.0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn test_from_pence_display() {
        assert_eq!(Price::from_pence(180).to_string(), "£1.80");
        assert_eq!(Price::from_pence(617).to_string(), "£6.17");
    }

    #[test]
    fn test_discount_rounds_to_pence() {
        let rate = Decimal::from_str("0.05").unwrap();
        assert_eq!(Price::from_pence(180).discounted(rate), Price::from_pence(171));
        assert_eq!(Price::from_pence(617).discounted(rate), Price::from_pence(586));
    }

    #[test]
    fn test_serializes_as_number() {
        let json = serde_json::to_value(Price::from_pence(180)).unwrap();
        assert_eq!(json, serde_json::json!(1.8));
        let parsed: Price = serde_json::from_value(serde_json::json!(1.71)).unwrap();
        assert_eq!(parsed, Price::from_pence(171));
    }
}
