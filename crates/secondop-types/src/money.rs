//! Currency amounts with two-place decimal precision.
//!
//! The marketplace has a single currency. Amounts are signed so the same type
//! carries wallet balances (never negative) and ledger amounts (negative =
//! debit, positive = credit). Floating point never touches money.

use std::fmt;
use std::iter::Sum;
use std::ops::{Add, Neg, Sub};
use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::error::MarketError;

/// A currency amount with exactly two decimal places.
///
/// # Examples
///
/// ```
/// use secondop_types::Money;
///
/// let balance = Money::parse("100").unwrap();
/// let fee = Money::from_cents(4000);
/// assert_eq!((balance - fee).to_string(), "60.00");
/// assert!(Money::parse("1.005").is_err());
/// ```
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Money(Decimal);

impl Money {
    /// Zero.
    pub const ZERO: Self = Money(Decimal::from_parts(0, 0, 0, false, 2));

    /// Number of decimal places.
    pub const SCALE: u32 = 2;

    /// Create from a whole number of cents (non-negative).
    pub const fn from_cents(cents: u32) -> Self {
        Money(Decimal::from_parts(cents, 0, 0, false, Self::SCALE))
    }

    /// Exclusive bound on the magnitude of any amount: 10^12, the ceiling of
    /// a `NUMERIC(14, 2)` column.
    pub const LIMIT: Decimal = Decimal::from_parts(0xD4A5_1000, 0xE8, 0, false, 0);

    /// Create from a decimal, rejecting more than two decimal places and
    /// magnitudes at or above [`Money::LIMIT`].
    pub fn new(value: Decimal) -> Result<Self, MarketError> {
        if value.abs() >= Self::LIMIT {
            return Err(MarketError::InvalidAmount(format!(
                "'{}' is out of range",
                value
            )));
        }
        if value.round_dp(Self::SCALE) != value {
            return Err(MarketError::InvalidAmount(format!(
                "'{}' has more than {} decimal places",
                value,
                Self::SCALE
            )));
        }
        let mut value = value;
        value.rescale(Self::SCALE);
        Ok(Money(value))
    }

    /// Parse a decimal string like `"40"` or `"40.25"`.
    pub fn parse(s: &str) -> Result<Self, MarketError> {
        let value = Decimal::from_str(s.trim())
            .map_err(|_| MarketError::InvalidAmount(format!("invalid amount: '{}'", s)))?;
        Self::new(value)
    }

    /// The underlying decimal value.
    pub fn amount(&self) -> Decimal {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    pub fn is_negative(&self) -> bool {
        self.0 < Decimal::ZERO
    }

    /// Absolute value.
    pub fn abs(&self) -> Self {
        Money(self.0.abs())
    }

    /// Checked addition - `None` when the result leaves the valid range.
    pub fn checked_add(&self, rhs: Money) -> Option<Self> {
        self.0.checked_add(rhs.0).and_then(|v| Money::new(v).ok())
    }

    /// Checked subtraction - `None` when the result leaves the valid range.
    pub fn checked_sub(&self, rhs: Money) -> Option<Self> {
        self.0.checked_sub(rhs.0).and_then(|v| Money::new(v).ok())
    }

    /// Multiply by a ratio, rounding half away from zero back to two places.
    pub fn mul_ratio(&self, ratio: Decimal) -> Self {
        let mut value = (self.0 * ratio)
            .round_dp_with_strategy(Self::SCALE, RoundingStrategy::MidpointAwayFromZero);
        value.rescale(Self::SCALE);
        Money(value)
    }
}

impl TryFrom<Decimal> for Money {
    type Error = MarketError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Money::new(value)
    }
}

impl From<Money> for Decimal {
    fn from(money: Money) -> Self {
        money.0
    }
}

impl FromStr for Money {
    type Err = MarketError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Money::parse(s)
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Money {
        Money(self.0 + rhs.0)
    }
}

impl Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Money) -> Money {
        Money(self.0 - rhs.0)
    }
}

impl Neg for Money {
    type Output = Money;

    fn neg(self) -> Money {
        Money(-self.0)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::ZERO, |acc, m| acc + m)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}
