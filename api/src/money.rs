//! Euro amounts held in integer cents.
//!
//! The venue API speaks decimal euros (`15`, `2.5`, `4.35`). Amounts are
//! rounded to the nearest cent on the way in and never go negative.

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::iter::Sum;
use std::ops::Add;

/// A non-negative euro amount in cents
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Money(u64);

impl Money {
    /// Zero euros
    pub const ZERO: Self = Self(0);

    /// Creates a `Money` value from cents
    #[must_use]
    pub const fn from_cents(cents: u64) -> Self {
        Self(cents)
    }

    /// Creates a `Money` value from whole euros
    #[must_use]
    pub const fn from_euros(euros: u64) -> Self {
        Self(euros.saturating_mul(100))
    }

    /// Rounds a decimal euro amount to the nearest cent
    ///
    /// Negative and non-finite inputs become zero.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn from_decimal(euros: f64) -> Self {
        if !euros.is_finite() || euros <= 0.0 {
            return Self::ZERO;
        }
        Self((euros * 100.0).round() as u64)
    }

    /// Returns the amount in cents
    #[must_use]
    pub const fn cents(self) -> u64 {
        self.0
    }

    /// Returns the amount as decimal euros
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_decimal(self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Checks if the amount is zero
    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Adds two amounts, saturating at `u64::MAX` cents
    #[must_use]
    pub const fn saturating_add(self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0))
    }

    /// Subtracts, stopping at zero
    #[must_use]
    pub const fn saturating_sub(self, other: Self) -> Self {
        Self(self.0.saturating_sub(other.0))
    }

    /// Unit price times a quantity
    #[must_use]
    pub const fn times(self, quantity: u32) -> Self {
        Self(self.0.saturating_mul(quantity as u64))
    }

    /// `percent`% of this amount, rounded to the nearest cent
    ///
    /// `percent` is clamped to `[0, 100]`, so the result never exceeds `self`.
    #[must_use]
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn percent(self, percent: f64) -> Self {
        let percent = if percent.is_nan() { 0.0 } else { percent.clamp(0.0, 100.0) };
        let cents = (self.0 as f64 * percent / 100.0).round() as u64;
        Self(cents.min(self.0))
    }
}

impl Add for Money {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        self.saturating_add(rhs)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "€{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if self.0 % 100 == 0 {
            serializer.serialize_u64(self.0 / 100)
        } else {
            serializer.serialize_f64(self.as_decimal())
        }
    }
}

struct MoneyVisitor;

impl Visitor<'_> for MoneyVisitor {
    type Value = Money;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a euro amount as a number or numeric string")
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Money, E> {
        Ok(Money::from_euros(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Money, E> {
        Ok(u64::try_from(v).map_or(Money::ZERO, Money::from_euros))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Money, E> {
        Ok(Money::from_decimal(v))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Money, E> {
        let trimmed = v.trim();
        if trimmed.is_empty() {
            return Ok(Money::ZERO);
        }
        trimmed
            .parse::<f64>()
            .map(Money::from_decimal)
            .map_err(|_| E::invalid_value(de::Unexpected::Str(v), &self))
    }

    fn visit_unit<E: de::Error>(self) -> Result<Money, E> {
        Ok(Money::ZERO)
    }

    fn visit_none<E: de::Error>(self) -> Result<Money, E> {
        Ok(Money::ZERO)
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(MoneyVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decimal_rounds_to_cents() {
        assert_eq!(Money::from_decimal(4.35).cents(), 435);
        assert_eq!(Money::from_decimal(2.5).cents(), 250);
        assert_eq!(Money::from_decimal(-3.0), Money::ZERO);
        assert_eq!(Money::from_decimal(f64::NAN), Money::ZERO);
    }

    #[test]
    fn percent_is_clamped() {
        let fifty = Money::from_euros(50);
        assert_eq!(fifty.percent(20.0), Money::from_euros(10));
        assert_eq!(fifty.percent(150.0), fifty);
        assert_eq!(fifty.percent(-5.0), Money::ZERO);
    }

    #[test]
    fn subtraction_never_goes_negative() {
        assert_eq!(Money::from_euros(1).saturating_sub(Money::from_euros(2)), Money::ZERO);
    }

    #[test]
    fn display_uses_two_decimals() {
        assert_eq!(Money::from_cents(4350).to_string(), "€43.50");
        assert_eq!(Money::from_cents(5).to_string(), "€0.05");
    }

    #[test]
    fn wire_format_accepts_numbers_and_strings() {
        let parsed: Vec<Money> = serde_json::from_str(r#"[15, 2.5, "4.35", null, ""]"#)
            .unwrap_or_default();
        assert_eq!(
            parsed,
            vec![
                Money::from_euros(15),
                Money::from_cents(250),
                Money::from_cents(435),
                Money::ZERO,
                Money::ZERO,
            ]
        );
        assert_eq!(serde_json::to_string(&Money::from_cents(4350)).ok().as_deref(), Some("43.5"));
        assert_eq!(serde_json::to_string(&Money::from_euros(15)).ok().as_deref(), Some("15"));
    }
}
