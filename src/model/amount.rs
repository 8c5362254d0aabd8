//! Amount type for handling monetary values.
//!
//! `Amount` wraps `Decimal` so that totals are exact. It parses text the way an operator types it
//! into a journal grid: with or without a rupee sign, with or without thousands separators.

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::fmt::{Debug, Display, Formatter};
use std::iter::Sum;
use std::ops::{Add, AddAssign, Neg, Sub};
use std::str::FromStr;

/// The currency symbol printed by the alternate (`{:#}`) format.
pub const CURRENCY_SYMBOL: char = '₹';

/// The largest magnitude, in whole rupees, that an `Amount` may hold.
///
/// Summing fewer than 10^13 amounts of this size cannot overflow a `Decimal`.
pub const MAX_RUPEES: i64 = 1_000_000_000_000_000;

/// Represents a monetary amount in rupees.
///
/// # Examples
///
/// ```
/// # use battwheels_journal::model::Amount;
/// # use std::str::FromStr;
/// let amount = Amount::from_str("₹5,000.50").unwrap();
/// assert_eq!(amount.to_string(), "5,000.50");
/// assert_eq!(format!("{amount:#}"), "₹5,000.50");
/// ```
///
/// Text that is not a number is an error for `from_str` but zero for `parse_lenient`:
/// ```
/// # use battwheels_journal::model::Amount;
/// # use std::str::FromStr;
/// assert!(Amount::from_str("abc").is_err());
/// assert!(Amount::parse_lenient("abc").is_zero());
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

    /// Parses `s`, treating empty, non-numeric or out-of-range text as zero.
    pub fn parse_lenient(s: &str) -> Self {
        Amount::from_str(s).unwrap_or_default()
    }

    /// Wraps `value` unless its magnitude is above `MAX_RUPEES`.
    pub fn bounded(value: Decimal) -> Option<Self> {
        (value.abs() <= Decimal::from(MAX_RUPEES)).then_some(Self(value))
    }

    pub fn abs(&self) -> Self {
        Self(self.0.abs())
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn is_positive(&self) -> bool {
        !self.is_zero() && self.0.is_sign_positive()
    }

    pub fn is_negative(&self) -> bool {
        !self.is_zero() && self.0.is_sign_negative()
    }
}

/// An error that can occur when parsing strings into `Amount` values.
pub struct AmountError {
    input: String,
    source: Option<rust_decimal::Error>,
}

impl AmountError {
    /// True if the input was a number, but above `MAX_RUPEES`.
    pub fn is_too_large(&self) -> bool {
        self.source.is_none()
    }
}

impl Debug for AmountError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "AmountError({:?}, {:?})", self.input, self.source)
    }
}

impl Display for AmountError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match &self.source {
            Some(source) => write!(f, "'{}' is not an amount: {}", self.input, source),
            None => write!(
                f,
                "'{}' is larger than the largest allowed amount {}",
                self.input,
                Amount(Decimal::from(MAX_RUPEES))
            ),
        }
    }
}

impl std::error::Error for AmountError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

impl FromStr for Amount {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Ok(Amount::default());
        }

        // "-₹50.00", "₹-50.00" and "-50.00" are all accepted
        let (negative, rest) = match trimmed.strip_prefix('-') {
            Some(after_minus) => (true, after_minus.trim_start()),
            None => (false, trimmed),
        };
        let rest = rest.strip_prefix(CURRENCY_SYMBOL).unwrap_or(rest).trim_start();
        let without_commas = rest.replace(',', "");

        let value = Decimal::from_str(&without_commas).map_err(|source| AmountError {
            input: s.to_string(),
            source: Some(source),
        })?;
        Amount::bounded(if negative { -value } else { value }).ok_or_else(|| AmountError {
            input: s.to_string(),
            source: None,
        })
    }
}

impl Display for Amount {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let sign = if self.is_negative() { "-" } else { "" };
        let symbol = if f.alternate() {
            CURRENCY_SYMBOL.to_string()
        } else {
            String::new()
        };
        let num = self.0.abs();
        write!(
            f,
            "{sign}{symbol}{}",
            format_num::format_num!(",.2", num.to_f64().unwrap_or_default())
        )
    }
}

/// Amounts go over the wire as JSON numbers; whole values have no fraction (`5000`, not
/// `5000.0`).
impl Serialize for Amount {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if self.0.fract().is_zero() {
            if let Some(whole) = self.0.to_i64() {
                return serializer.serialize_i64(whole);
            }
        }
        match self.0.to_f64() {
            Some(f) => serializer.serialize_f64(f),
            None => Err(serde::ser::Error::custom(format!(
                "amount {} cannot be represented as a JSON number",
                self.0
            ))),
        }
    }
}

/// Accepts JSON numbers and numeric strings.
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
        f.write_str("a number or a numeric string")
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Amount, E> {
        Amount::bounded(Decimal::from(v)).ok_or_else(|| too_large(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Amount, E> {
        Amount::bounded(Decimal::from(v)).ok_or_else(|| too_large(v))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Amount, E> {
        Decimal::from_f64(v)
            .ok_or_else(|| E::custom(format!("{v} is not a valid amount")))
            .and_then(|d| Amount::bounded(d.normalize()).ok_or_else(|| too_large(v)))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Amount, E> {
        Amount::from_str(v).map_err(E::custom)
    }

    fn visit_unit<E: de::Error>(self) -> Result<Amount, E> {
        Ok(Amount::ZERO)
    }

    fn visit_none<E: de::Error>(self) -> Result<Amount, E> {
        Ok(Amount::ZERO)
    }
}

fn too_large<E: de::Error>(v: impl Display) -> E {
    E::custom(format!("{v} is larger than the largest allowed amount"))
}

impl From<Decimal> for Amount {
    fn from(value: Decimal) -> Self {
        Amount::new(value)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.value()
    }
}

impl Add for Amount {
    type Output = Amount;

    fn add(self, rhs: Amount) -> Amount {
        Amount(self.0 + rhs.0)
    }
}

impl AddAssign for Amount {
    fn add_assign(&mut self, rhs: Amount) {
        self.0 += rhs.0;
    }
}

impl Sub for Amount {
    type Output = Amount;

    fn sub(self, rhs: Amount) -> Amount {
        Amount(self.0 - rhs.0)
    }
}

impl Neg for Amount {
    type Output = Amount;

    fn neg(self) -> Amount {
        Amount(-self.0)
    }
}

impl Sum for Amount {
    fn sum<I: Iterator<Item = Amount>>(iter: I) -> Amount {
        iter.fold(Amount::ZERO, Add::add)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_parse_plain() {
        let amount = Amount::from_str("5000").unwrap();
        assert_eq!(amount.value(), dec!(5000));
    }

    #[test]
    fn test_parse_with_symbol_and_commas() {
        let amount = Amount::from_str("₹5,000.00").unwrap();
        assert_eq!(amount.value(), dec!(5000));
    }

    #[test]
    fn test_parse_whitespace() {
        let amount = Amount::from_str("  5000  ").unwrap();
        assert_eq!(amount.value(), dec!(5000));
    }

    #[test]
    fn test_parse_negative_forms() {
        assert_eq!(Amount::from_str("-₹50.25").unwrap().value(), dec!(-50.25));
        assert_eq!(Amount::from_str("-50.25").unwrap().value(), dec!(-50.25));
    }

    #[test]
    fn test_parse_empty_string_is_zero() {
        assert!(Amount::from_str("").unwrap().is_zero());
        assert!(Amount::from_str("   ").unwrap().is_zero());
    }

    #[test]
    fn test_parse_garbage_is_error() {
        let err = Amount::from_str("12abc").unwrap_err();
        assert!(err.to_string().contains("'12abc' is not an amount"));
    }

    #[test]
    fn test_parse_lenient_garbage_is_zero() {
        assert_eq!(Amount::parse_lenient("abc"), Amount::ZERO);
        assert_eq!(Amount::parse_lenient("NaN"), Amount::ZERO);
        assert_eq!(Amount::parse_lenient("1,250.5").value(), dec!(1250.5));
    }

    #[test]
    fn test_display() {
        assert_eq!(Amount::new(dec!(1234567.891)).to_string(), "1,234,567.89");
        assert_eq!(Amount::new(dec!(-50)).to_string(), "-50.00");
        assert_eq!(Amount::ZERO.to_string(), "0.00");
    }

    #[test]
    fn test_display_alternate_has_symbol() {
        assert_eq!(format!("{:#}", Amount::new(dec!(5000))), "₹5,000.00");
        assert_eq!(format!("{:#}", Amount::new(dec!(-7.5))), "-₹7.50");
    }

    #[test]
    fn test_parse_above_max_is_error() {
        let err = Amount::from_str("79228162514264337593543950335").unwrap_err();
        assert!(err.is_too_large());
        assert!(err.to_string().contains("larger than the largest allowed amount"));
        assert!(Amount::from_str("-₹1,000,000,000,000,001").unwrap_err().is_too_large());
        assert!(!Amount::from_str("12abc").unwrap_err().is_too_large());
    }

    #[test]
    fn test_parse_max_is_accepted() {
        let amount = Amount::from_str("1,000,000,000,000,000").unwrap();
        assert_eq!(amount.value(), Decimal::from(MAX_RUPEES));
        assert!(Amount::parse_lenient("1000000000000000.01").is_zero());
    }

    #[test]
    fn test_deserialize_above_max_is_error() {
        assert!(serde_json::from_str::<Amount>("9000000000000000000").is_err());
        assert!(serde_json::from_str::<Amount>("\"79228162514264337593543950335\"").is_err());
    }

    #[test]
    fn test_serialize_whole_number_has_no_fraction() {
        let json = serde_json::to_string(&Amount::new(dec!(5000.00))).unwrap();
        assert_eq!(json, "5000");
    }

    #[test]
    fn test_serialize_fraction() {
        let json = serde_json::to_string(&Amount::new(dec!(12.5))).unwrap();
        assert_eq!(json, "12.5");
    }

    #[test]
    fn test_deserialize_number_and_string() {
        let a: Amount = serde_json::from_str("1500.25").unwrap();
        assert_eq!(a.value(), dec!(1500.25));
        let b: Amount = serde_json::from_str("\"1500.25\"").unwrap();
        assert_eq!(b.value(), dec!(1500.25));
        let c: Amount = serde_json::from_str("42").unwrap();
        assert_eq!(c.value(), dec!(42));
        let d: Amount = serde_json::from_str("null").unwrap();
        assert!(d.is_zero());
    }

    #[test]
    fn test_sign_predicates() {
        assert!(Amount::new(dec!(1)).is_positive());
        assert!(Amount::new(dec!(-1)).is_negative());
        assert!(!Amount::ZERO.is_positive());
        assert!(!Amount::ZERO.is_negative());
    }

    #[test]
    fn test_sum() {
        let total: Amount = ["100", "250.50", ""]
            .iter()
            .map(|s| Amount::parse_lenient(s))
            .sum();
        assert_eq!(total.value(), dec!(350.50));
    }
}
