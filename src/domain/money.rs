//! Money types
//!
//! Domain primitives for monetary values. All amounts are integer minor
//! units (kobo), validated at construction time, so invalid values cannot
//! exist in the system and no floating-point rounding ever occurs.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Minor units per major currency unit (kobo per naira).
pub const MINOR_UNITS_PER_MAJOR: i64 = 100;

/// Errors that can occur when constructing a money value
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MoneyError {
    #[error("Amount must be positive (got {0})")]
    NotPositive(i64),

    #[error("Amount has sub-minor-unit precision: {0}")]
    SubMinorPrecision(Decimal),

    #[error("Amount exceeds representable range")]
    Overflow,

    #[error("Balance would become negative")]
    NegativeBalance,
}

/// A positive transfer amount in minor units.
///
/// # Invariants
/// - Value is always positive (> 0)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Kobo(i64);

impl Kobo {
    /// Create a new amount with validation.
    pub fn new(value: i64) -> Result<Self, MoneyError> {
        if value <= 0 {
            return Err(MoneyError::NotPositive(value));
        }
        Ok(Self(value))
    }

    /// Convert a major-unit amount (e.g. "500.00" naira) into minor units.
    ///
    /// Rejects non-positive values and values with more precision than one
    /// minor unit (e.g. fractional kobo).
    pub fn from_major(amount: Decimal) -> Result<Self, MoneyError> {
        let minor = amount * Decimal::from(MINOR_UNITS_PER_MAJOR);
        if !minor.fract().is_zero() {
            return Err(MoneyError::SubMinorPrecision(amount));
        }
        let value = minor.to_i64().ok_or(MoneyError::Overflow)?;
        Self::new(value)
    }

    /// Get the underlying minor-unit value.
    pub fn value(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for Kobo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A wallet balance in minor units (zero or positive).
///
/// Unlike [`Kobo`], a balance can be zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Balance(i64);

impl Balance {
    /// Create a new balance (zero or positive)
    pub fn new(value: i64) -> Result<Self, MoneyError> {
        if value < 0 {
            return Err(MoneyError::NegativeBalance);
        }
        Ok(Self(value))
    }

    /// Create a zero balance
    pub fn zero() -> Self {
        Self(0)
    }

    /// Get the underlying value
    pub fn value(&self) -> i64 {
        self.0
    }

    /// Check if the balance covers an amount
    pub fn is_sufficient_for(&self, amount: Kobo) -> bool {
        self.0 >= amount.value()
    }

    /// Add an amount to the balance
    pub fn credit(&self, amount: Kobo) -> Result<Balance, MoneyError> {
        let value = self
            .0
            .checked_add(amount.value())
            .ok_or(MoneyError::Overflow)?;
        Balance::new(value)
    }

    /// Subtract an amount from the balance
    pub fn debit(&self, amount: Kobo) -> Result<Balance, MoneyError> {
        Balance::new(self.0 - amount.value())
    }
}

impl Default for Balance {
    fn default() -> Self {
        Self::zero()
    }
}

impl fmt::Display for Balance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_kobo_positive() {
        let amount = Kobo::new(50_000);
        assert!(amount.is_ok());
        assert_eq!(amount.unwrap().value(), 50_000);
    }

    #[test]
    fn test_kobo_zero_rejected() {
        assert!(matches!(Kobo::new(0), Err(MoneyError::NotPositive(0))));
    }

    #[test]
    fn test_kobo_negative_rejected() {
        assert!(matches!(Kobo::new(-100), Err(MoneyError::NotPositive(_))));
    }

    #[test]
    fn test_from_major_whole() {
        let amount = Kobo::from_major(dec!(500)).unwrap();
        assert_eq!(amount.value(), 50_000);
    }

    #[test]
    fn test_from_major_two_decimals() {
        let amount = Kobo::from_major(dec!(499.99)).unwrap();
        assert_eq!(amount.value(), 49_999);
    }

    #[test]
    fn test_from_major_sub_kobo_rejected() {
        let result = Kobo::from_major(dec!(500.123));
        assert!(matches!(result, Err(MoneyError::SubMinorPrecision(_))));
    }

    #[test]
    fn test_from_major_non_positive_rejected() {
        assert!(Kobo::from_major(dec!(0)).is_err());
        assert!(Kobo::from_major(dec!(-10)).is_err());
    }

    #[test]
    fn test_balance_credit_debit() {
        let balance = Balance::zero();
        let amount = Kobo::new(100_000).unwrap();

        let balance = balance.credit(amount).unwrap();
        assert_eq!(balance.value(), 100_000);

        let withdraw = Kobo::new(30_000).unwrap();
        let balance = balance.debit(withdraw).unwrap();
        assert_eq!(balance.value(), 70_000);
    }

    #[test]
    fn test_balance_underflow_rejected() {
        let balance = Balance::new(10_000).unwrap();
        let amount = Kobo::new(50_000).unwrap();

        assert!(!balance.is_sufficient_for(amount));
        assert!(matches!(
            balance.debit(amount),
            Err(MoneyError::NegativeBalance)
        ));
    }

    #[test]
    fn test_balance_overflow_rejected() {
        let balance = Balance::new(i64::MAX).unwrap();
        let result = balance.credit(Kobo::new(1).unwrap());
        assert!(matches!(result, Err(MoneyError::Overflow)));
    }
}
