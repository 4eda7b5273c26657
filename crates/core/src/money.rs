//! Monetary value objects.
//!
//! `Money` is a fixed two-decimal-place wrapper over `rust_decimal::Decimal`.
//! Amounts are signed (negative = debit, positive = credit) and always carry
//! exactly currency precision; floating point never represents money.

use core::fmt;
use core::ops::{Add, AddAssign, Neg, Sub, SubAssign};
use core::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::DomainError;

/// A signed monetary amount with exactly two decimal places.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Money(Decimal);

impl Money {
    /// Currency precision in decimal places.
    pub const SCALE: u32 = 2;

    pub const ZERO: Self = Money(Decimal::ZERO);

    /// Round an arbitrary-precision decimal to currency precision.
    ///
    /// Midpoints round away from zero (commercial rounding).
    pub fn new(value: Decimal) -> Self {
        Money(value.round_dp_with_strategy(Self::SCALE, RoundingStrategy::MidpointAwayFromZero))
    }

    /// Whole currency units, e.g. `Money::from_major(100)` == 100.00.
    pub fn from_major(units: i64) -> Self {
        Money(Decimal::from(units))
    }

    pub fn as_decimal(&self) -> Decimal {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn is_negative(&self) -> bool {
        self.0.is_sign_negative() && !self.0.is_zero()
    }

    pub fn is_positive(&self) -> bool {
        self.0.is_sign_positive() && !self.0.is_zero()
    }

    /// Magnitude of the amount (debits become positive).
    pub fn abs(&self) -> Self {
        Money(self.0.abs())
    }
}

impl FromStr for Money {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let decimal = Decimal::from_str(s.trim())
            .map_err(|e| DomainError::validation(format!("amount: {e}")))?;
        Ok(Money::new(decimal))
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl Add for Money {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Money(self.0 + rhs.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl Sub for Money {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Money(self.0 - rhs.0)
    }
}

impl SubAssign for Money {
    fn sub_assign(&mut self, rhs: Self) {
        self.0 -= rhs.0;
    }
}

impl Neg for Money {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Money(-self.0)
    }
}

impl Serialize for Money {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format!("{:.2}", self.0))
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Money::from_str(&s).map_err(serde::de::Error::custom)
    }
}

/// Three-letter uppercase currency code (ISO-4217 style, e.g. "RUB", "EUR").
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Currency(String);

impl Currency {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for Currency {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim();
        if code.len() != 3 || !code.bytes().all(|b| b.is_ascii_uppercase()) {
            return Err(DomainError::validation(format!(
                "currency must be a 3-letter uppercase code, got {code:?}"
            )));
        }
        Ok(Currency(code.to_string()))
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_rounds_to_currency_precision() {
        let third = Decimal::from(100) / Decimal::from(3);
        assert_eq!(Money::new(third).to_string(), "33.33");

        let midpoint = Decimal::from_str("0.005").unwrap();
        assert_eq!(Money::new(midpoint).to_string(), "0.01");
    }

    #[test]
    fn from_str_accepts_signed_amounts() {
        assert_eq!(Money::from_str("10.5").unwrap().to_string(), "10.50");
        assert_eq!(Money::from_str("  -3.20 ").unwrap().to_string(), "-3.20");
        assert!(Money::from_str("ten").is_err());
    }

    #[test]
    fn sign_predicates() {
        let credit = Money::from_major(5);
        let debit = -credit;

        assert!(credit.is_positive());
        assert!(debit.is_negative());
        assert!(!Money::ZERO.is_negative());
        assert_eq!(debit.abs(), credit);
    }

    #[test]
    fn arithmetic_stays_exact() {
        let mut total = Money::ZERO;
        for _ in 0..10 {
            total += Money::from_str("0.10").unwrap();
        }
        assert_eq!(total, Money::from_major(1));
    }

    #[test]
    fn serializes_as_string() {
        let m = Money::from_str("42.5").unwrap();
        assert_eq!(serde_json::to_string(&m).unwrap(), "\"42.50\"");
        let back: Money = serde_json::from_str("\"42.50\"").unwrap();
        assert_eq!(back, m);
    }

    #[test]
    fn currency_code_is_validated() {
        assert!(Currency::from_str("RUB").is_ok());
        assert!(Currency::from_str("rub").is_err());
        assert!(Currency::from_str("RUBL").is_err());
        assert!(Currency::from_str("R1B").is_err());
    }
}
