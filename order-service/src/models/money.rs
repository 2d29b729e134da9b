//! Fixed-point money amounts.
//!
//! Every amount crossing a read/write boundary goes through [`Money`], so the
//! value handed to the gateway and the value persisted are rounded the same
//! way, exactly once.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MoneyError {
    #[error("invalid amount '{0}'")]
    Invalid(String),
    #[error("amount must not be negative")]
    Negative,
    #[error("amount is too large")]
    Overflow,
}

/// A non-negative amount with exactly two fractional digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Money(Decimal);

impl Money {
    pub const SCALE: u32 = 2;

    /// Largest accepted amount, in major units.
    pub const MAX_UNITS: i64 = 1_000_000_000_000;

    /// Round half-up (away from zero at the midpoint) to two decimals.
    pub fn new(value: Decimal) -> Result<Self, MoneyError> {
        let mut rounded =
            value.round_dp_with_strategy(Self::SCALE, RoundingStrategy::MidpointAwayFromZero);
        if rounded.is_zero() {
            // -0.001 rounds to -0.00; store it as plain zero.
            rounded.set_sign_positive(true);
        }
        if rounded.is_sign_negative() {
            return Err(MoneyError::Negative);
        }
        if rounded > Decimal::from(Self::MAX_UNITS) {
            return Err(MoneyError::Overflow);
        }
        rounded.rescale(Self::SCALE);
        Ok(Self(rounded))
    }

    pub fn zero() -> Self {
        Self(Decimal::new(0, Self::SCALE))
    }

    pub fn parse(input: &str) -> Result<Self, MoneyError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(MoneyError::Invalid(input.to_string()));
        }
        let value = Decimal::from_str(trimmed)
            .or_else(|_| Decimal::from_scientific(trimmed))
            .map_err(|_| MoneyError::Invalid(input.to_string()))?;
        Self::new(value)
    }

    pub fn from_f64(value: f64) -> Result<Self, MoneyError> {
        if !value.is_finite() {
            return Err(MoneyError::Invalid(value.to_string()));
        }
        // Display gives the shortest decimal that round-trips, so 0.1 stays 0.1.
        Self::parse(&value.to_string())
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Amount in the smallest currency unit (paise for INR).
    pub fn to_minor_units(&self) -> Result<u64, MoneyError> {
        (self.0 * Decimal::ONE_HUNDRED)
            .to_u64()
            .ok_or(MoneyError::Overflow)
    }

    pub fn checked_add(self, other: Money) -> Result<Money, MoneyError> {
        let sum = self.0.checked_add(other.0).ok_or(MoneyError::Overflow)?;
        Self::new(sum)
    }

    pub fn checked_mul(self, quantity: u32) -> Result<Money, MoneyError> {
        let product = self
            .0
            .checked_mul(Decimal::from(quantity))
            .ok_or(MoneyError::Overflow)?;
        Self::new(product)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Money {
    type Err = MoneyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct MoneyVisitor;

        impl<'de> de::Visitor<'de> for MoneyVisitor {
            type Value = Money;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a non-negative decimal amount as a string or number")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Money, E> {
                Money::parse(v).map_err(E::custom)
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> Result<Money, E> {
                Money::from_f64(v).map_err(E::custom)
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Money, E> {
                Money::new(Decimal::from(v)).map_err(E::custom)
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Money, E> {
                Money::new(Decimal::from(v)).map_err(E::custom)
            }
        }

        deserializer.deserialize_any(MoneyVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_to_two_decimals() {
        assert_eq!(Money::parse("500").unwrap().to_string(), "500.00");
        assert_eq!(Money::parse("250.5").unwrap().to_string(), "250.50");
        assert_eq!(Money::parse(" 12.345 ").unwrap().to_string(), "12.35");
    }

    #[test]
    fn rounds_half_up() {
        assert_eq!(Money::parse("0.005").unwrap().to_string(), "0.01");
        assert_eq!(Money::parse("2.675").unwrap().to_string(), "2.68");
        assert_eq!(Money::parse("2.674999").unwrap().to_string(), "2.67");
        // A float like 2.675 is 2.67499.. in binary; shortest display keeps the intent.
        assert_eq!(Money::from_f64(2.675).unwrap().to_string(), "2.68");
    }

    #[test]
    fn normalization_is_idempotent() {
        for raw in ["0", "0.1", "500.00", "999.999", "1234567.891", "0.005"] {
            let once = Money::parse(raw).unwrap();
            let twice = Money::parse(&once.to_string()).unwrap();
            assert_eq!(once, twice);
            assert_eq!(Money::new(once.0).unwrap(), once);
        }
    }

    #[test]
    fn rejects_bad_input() {
        assert_eq!(Money::parse("-1"), Err(MoneyError::Negative));
        assert!(matches!(Money::parse("abc"), Err(MoneyError::Invalid(_))));
        assert!(matches!(Money::parse(""), Err(MoneyError::Invalid(_))));
        assert!(Money::from_f64(f64::NAN).is_err());
        assert_eq!(Money::parse("1000000000000.01"), Err(MoneyError::Overflow));
        assert!(Money::parse("1000000000000").is_ok());
    }

    #[test]
    fn negative_zero_becomes_zero() {
        let money = Money::parse("-0.001").unwrap();
        assert!(money.is_zero());
        assert_eq!(money.to_string(), "0.00");
    }

    #[test]
    fn converts_to_minor_units() {
        assert_eq!(Money::parse("500.00").unwrap().to_minor_units().unwrap(), 50_000);
        assert_eq!(Money::parse("0.07").unwrap().to_minor_units().unwrap(), 7);
    }

    #[test]
    fn arithmetic_stays_at_two_decimals() {
        let price = Money::parse("250.00").unwrap();
        let line = price.checked_mul(2).unwrap();
        assert_eq!(line.to_string(), "500.00");
        let total = line.checked_add(Money::parse("0.5").unwrap()).unwrap();
        assert_eq!(total.to_string(), "500.50");
        assert_eq!(Money::zero().to_string(), "0.00");
    }

    #[test]
    fn serde_accepts_strings_and_numbers() {
        let from_str: Money = serde_json::from_str("\"99.999\"").unwrap();
        let from_float: Money = serde_json::from_str("99.999").unwrap();
        let from_int: Money = serde_json::from_str("100").unwrap();
        assert_eq!(from_str.to_string(), "100.00");
        assert_eq!(from_float, from_str);
        assert_eq!(from_int, from_str);
        assert_eq!(serde_json::to_string(&from_int).unwrap(), "\"100.00\"");
        assert!(serde_json::from_str::<Money>("-5").is_err());
        assert!(serde_json::from_str::<Money>("true").is_err());
    }
}
