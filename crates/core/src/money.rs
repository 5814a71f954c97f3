//! Non-negative decimal money amounts with at most two fractional digits.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};
use crate::quantity::Quantity;

/// A non-negative decimal amount in the store's single currency.
///
/// Serialized as a decimal string (`"10.00"`) so prices never pass through
/// binary floating point.
#[derive(
    Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Money(Decimal);

impl Money {
    pub const ZERO: Money = Money(Decimal::ZERO);

    /// Fractional digits kept, matching the `NUMERIC(14,2)` price columns.
    pub const SCALE: u32 = 2;

    pub fn new(amount: Decimal) -> DomainResult<Self> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(DomainError::validation(format!(
                "amount must be non-negative, got {amount}"
            )));
        }
        if amount.normalize().scale() > Self::SCALE {
            return Err(DomainError::validation(format!(
                "amount must have at most {} decimal places, got {amount}",
                Self::SCALE
            )));
        }
        // Trailing zeros past the cent are dropped so "1.500" stores as "1.50".
        Ok(Self(amount.round_dp(Self::SCALE)))
    }

    /// Build from an integer count of minor units (cents).
    pub fn from_minor(minor: i64) -> DomainResult<Self> {
        Self::new(Decimal::new(minor, 2))
    }

    pub fn amount(&self) -> Decimal {
        self.0
    }

    /// `self × quantity`, failing instead of overflowing.
    pub fn checked_times(self, quantity: Quantity) -> DomainResult<Self> {
        self.0
            .checked_mul(Decimal::from(quantity.get()))
            .map(Self)
            .ok_or_else(|| DomainError::invariant("line total overflows"))
    }

    pub fn checked_add(self, other: Money) -> DomainResult<Self> {
        self.0
            .checked_add(other.0)
            .map(Self)
            .ok_or_else(|| DomainError::invariant("amount overflows"))
    }
}

impl TryFrom<Decimal> for Money {
    type Error = DomainError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Money> for Decimal {
    fn from(value: Money) -> Self {
        value.0
    }
}

impl core::fmt::Display for Money {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_negative_amounts() {
        assert!(Money::new(Decimal::new(-1, 2)).is_err());
        assert!(Money::new(Decimal::ZERO).is_ok());
    }

    #[test]
    fn rejects_sub_cent_amounts() {
        let err = Money::new(Decimal::new(9999, 3)).unwrap_err();
        assert!(matches!(err, DomainError::Validation(ref msg) if msg.contains("9.999")));

        let padded = Money::new(Decimal::new(1500, 3)).unwrap();
        assert_eq!(padded, Money::from_minor(150).unwrap());
        assert_eq!(padded.to_string(), "1.50");

        let parsed: Result<Money, _> = serde_json::from_value(serde_json::json!("0.001"));
        assert!(parsed.is_err());
    }

    #[test]
    fn multiplies_by_quantity_exactly() {
        let price = Money::from_minor(1999).unwrap();
        let qty = Quantity::new(3).unwrap();
        assert_eq!(price.checked_times(qty).unwrap().amount(), Decimal::new(5997, 2));
    }

    #[test]
    fn serializes_as_decimal_string() {
        let price = Money::from_minor(1000).unwrap();
        assert_eq!(serde_json::to_value(price).unwrap(), serde_json::json!("10.00"));

        let parsed: Money = serde_json::from_value(serde_json::json!("5.50")).unwrap();
        assert_eq!(parsed.amount(), Decimal::new(550, 2));

        let negative: Result<Money, _> = serde_json::from_value(serde_json::json!("-1.00"));
        assert!(negative.is_err());
    }
}
