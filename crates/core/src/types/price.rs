//! Minor-unit price representation.
//!
//! Cart line items arrive priced in the smallest currency unit (kuruş for
//! TRY). The commerce platform wants decimal strings in the major unit, so
//! this type owns that conversion in one place.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// An amount of money in the smallest currency unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct MinorUnits(i64);

impl MinorUnits {
    /// A zero amount.
    pub const ZERO: Self = Self(0);

    /// Create an amount from minor units (e.g. kuruş, cents).
    #[must_use]
    pub const fn new(amount: i64) -> Self {
        Self(amount)
    }

    /// Get the raw minor-unit value.
    #[must_use]
    pub const fn as_i64(&self) -> i64 {
        self.0
    }

    /// Convert to the major unit as a decimal with two fractional digits.
    #[must_use]
    pub fn to_decimal(&self) -> Decimal {
        Decimal::new(self.0, 2)
    }

    /// Format in the major unit with exactly two decimal places, as the
    /// commerce platform expects (e.g. `2500` → `"25.00"`).
    #[must_use]
    pub fn to_major_string(&self) -> String {
        format!("{:.2}", self.to_decimal())
    }

    /// Multiply by a quantity, saturating at the numeric bounds.
    #[must_use]
    pub const fn saturating_mul(&self, quantity: i64) -> Self {
        Self(self.0.saturating_mul(quantity))
    }

    /// Add another amount, saturating at the numeric bounds.
    #[must_use]
    pub const fn saturating_add(&self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0))
    }
}

impl From<i64> for MinorUnits {
    fn from(amount: i64) -> Self {
        Self(amount)
    }
}

impl From<MinorUnits> for i64 {
    fn from(amount: MinorUnits) -> Self {
        amount.0
    }
}

impl core::fmt::Display for MinorUnits {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.to_major_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_major_string() {
        assert_eq!(MinorUnits::new(1000).to_major_string(), "10.00");
        assert_eq!(MinorUnits::new(500).to_major_string(), "5.00");
        assert_eq!(MinorUnits::new(2500).to_major_string(), "25.00");
        assert_eq!(MinorUnits::new(99).to_major_string(), "0.99");
        assert_eq!(MinorUnits::new(5).to_major_string(), "0.05");
        assert_eq!(MinorUnits::ZERO.to_major_string(), "0.00");
    }

    #[test]
    fn test_negative_amounts() {
        // Refund-style amounts keep the sign
        assert_eq!(MinorUnits::new(-150).to_major_string(), "-1.50");
    }

    #[test]
    fn test_arithmetic() {
        let unit = MinorUnits::new(1000);
        assert_eq!(unit.saturating_mul(2).as_i64(), 2000);
        assert_eq!(
            unit.saturating_add(MinorUnits::new(500)).as_i64(),
            1500
        );
    }

    #[test]
    fn test_display_matches_major_string() {
        let amount = MinorUnits::new(1234);
        assert_eq!(amount.to_string(), "12.34");
    }
}
