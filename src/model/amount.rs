//! Amount type for monetary values exchanged with the backend.
//!
//! The backend stores amounts as fixed-point decimals and, depending on the endpoint, renders them
//! as JSON numbers (`12.5`) or as strings (`"12.50"`). `Amount` wraps `Decimal` and accepts either.
//! User input may additionally carry a dollar sign and thousands separators.

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::error::Error;
use std::fmt;
use std::fmt::{Debug, Display, Formatter};
use std::str::FromStr;

/// The largest amount the backend accepts for a single expense.
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(1_410_065_407, 2, 0, false, 2);

/// Represents a monetary amount.
///
/// # Examples
///
/// ```
/// # use expense_client::model::Amount;
/// # use std::str::FromStr;
/// let a = Amount::from_str("$1,250.5").unwrap();
/// assert_eq!(a.to_string(), "1250.50");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Amount(Decimal);

impl Amount {
    pub const ZERO: Amount = Amount(Decimal::ZERO);

    pub const fn new(value: Decimal) -> Self {
        Self(value)
    }

    /// Returns the underlying Decimal value.
    pub fn value(&self) -> Decimal {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Returns true if the amount is strictly greater than zero.
    pub fn is_positive(&self) -> bool {
        !self.is_zero() && self.0.is_sign_positive()
    }

    pub fn is_negative(&self) -> bool {
        !self.is_zero() && self.0.is_sign_negative()
    }
}

/// An error that can occur when parsing strings into `Amount` values.
pub struct AmountError(rust_decimal::Error);

impl Debug for AmountError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Debug::fmt(&self.0, f)
    }
}

impl Display for AmountError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl std::error::Error for AmountError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&self.0)
    }
}

impl FromStr for Amount {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Ok(Amount::default());
        }

        // "-$50.00", "$50.00" and "50.00" are all accepted
        let without_dollar = if let Some(after_minus) = trimmed.strip_prefix('-') {
            match after_minus.strip_prefix('$') {
                Some(after_dollar) => format!("-{after_dollar}"),
                None => trimmed.to_string(),
            }
        } else {
            trimmed.strip_prefix('$').unwrap_or(trimmed).to_string()
        };

        let without_commas = without_dollar.replace(',', "");
        let value = Decimal::from_str(&without_commas).map_err(AmountError)?;
        Ok(Amount(value))
    }
}

impl Display for Amount {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl Serialize for Amount {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        // The API validates amounts as numerics, so send a JSON number.
        serializer.serialize_f64(self.0.to_f64().unwrap_or_default())
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(AmountVisitor)
    }
}

struct AmountVisitor;

impl Visitor<'_> for AmountVisitor {
    type Value = Amount;

    fn expecting(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str("a decimal amount as a number or a string")
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Amount, E> {
        Ok(Amount(Decimal::from(v)))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Amount, E> {
        Ok(Amount(Decimal::from(v)))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Amount, E> {
        Decimal::from_f64(v)
            .map(|d| Amount(d.round_dp(2)))
            .ok_or_else(|| E::custom(format!("amount {v} is out of range")))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Amount, E> {
        Amount::from_str(v).map_err(E::custom)
    }
}

impl From<Decimal> for Amount {
    fn from(value: Decimal) -> Self {
        Amount(value)
    }
}

impl From<Amount> for Decimal {
    fn from(value: Amount) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_parse_with_dollar_sign() {
        let amount = Amount::from_str("$50.00").unwrap();
        assert_eq!(amount.value(), dec("50.00"));
    }

    #[test]
    fn test_parse_negative_with_dollar_sign() {
        let amount = Amount::from_str("-$50.00").unwrap();
        assert_eq!(amount.value(), dec("-50.00"));
        assert!(amount.is_negative());
    }

    #[test]
    fn test_parse_commas() {
        let amount = Amount::from_str("1,000,000.25").unwrap();
        assert_eq!(amount.value(), dec("1000000.25"));
    }

    #[test]
    fn test_parse_empty_string() {
        let amount = Amount::from_str("   ").unwrap();
        assert!(amount.is_zero());
        assert!(!amount.is_positive());
    }

    #[test]
    fn test_parse_garbage() {
        assert!(Amount::from_str("twelve").is_err());
    }

    #[test]
    fn test_display_two_places() {
        assert_eq!(Amount::new(dec("7")).to_string(), "7.00");
        assert_eq!(Amount::new(dec("7.5")).to_string(), "7.50");
    }

    #[test]
    fn test_deserialize_number_and_string() {
        let a: Amount = serde_json::from_str("12.5").unwrap();
        let b: Amount = serde_json::from_str("\"12.50\"").unwrap();
        let c: Amount = serde_json::from_str("12").unwrap();
        assert_eq!(a.value(), dec("12.50"));
        assert_eq!(a.value(), b.value());
        assert_eq!(c.value(), dec("12"));
    }

    #[test]
    fn test_serialize_as_number() {
        let json = serde_json::to_string(&Amount::new(dec("87.43"))).unwrap();
        assert_eq!(json, "87.43");
    }

    #[test]
    fn test_max_amount() {
        assert_eq!(MAX_AMOUNT, dec("99999999.99"));
    }
}
