//! Exact fixed-scale monetary amounts.
//!
//! CRITICAL: Never use floating-point for money calculations.
//! `Money` wraps `rust_decimal::Decimal` and always carries exactly
//! [`SCALE`] fractional digits. Amounts enter the system as decimal text and
//! leave it as decimal text; rounding happens only in [`Money::multiply`],
//! [`Money::percentage`] and [`Money::round_for_display`].

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::MoneyError;

/// Canonical number of fractional digits carried by every amount.
pub const SCALE: u32 = 8;

/// Exclusive upper bound on the magnitude of an amount (10^20).
///
/// Keeps the mantissa of an 8-digit-scale value inside the 96 bits
/// `Decimal` provides.
const LIMIT: Decimal = Decimal::from_parts(0x6310_0000, 0x6BC7_5E2D, 0x5, false, 0);

const ONE_HUNDRED: Decimal = Decimal::ONE_HUNDRED;

/// A monetary amount held at a fixed scale of 8 fractional digits.
///
/// Arithmetic is checked: anything that would exceed the representable range
/// fails with [`MoneyError::ArithmeticOverflow`] instead of wrapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Money(Decimal);

impl Money {
    /// The zero amount.
    pub const ZERO: Self = Self(Decimal::from_parts(0, 0, 0, false, SCALE));

    /// Creates a zero amount.
    #[must_use]
    pub const fn zero() -> Self {
        Self::ZERO
    }

    /// Creates an amount from a decimal without rounding.
    ///
    /// # Errors
    ///
    /// - `ExcessPrecision` if the value needs more than 8 fractional digits
    /// - `ArithmeticOverflow` if the value is out of range
    pub fn from_decimal(value: Decimal) -> Result<Self, MoneyError> {
        let normalized = value.normalize();
        if normalized.scale() > SCALE {
            return Err(MoneyError::ExcessPrecision(value.to_string()));
        }
        Self::fit(normalized)
    }

    /// Parses an amount from exact decimal text such as `"10000.00"`.
    ///
    /// Surrounding whitespace is ignored. The input is never rounded:
    /// text with more than 8 significant fractional digits is rejected.
    ///
    /// # Errors
    ///
    /// - `InvalidAmount` if the text is not a finite decimal
    /// - `ExcessPrecision` if it carries more than 8 fractional digits
    /// - `ArithmeticOverflow` if the value is out of range
    pub fn parse(text: &str) -> Result<Self, MoneyError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(MoneyError::InvalidAmount(text.to_string()));
        }
        let value = Decimal::from_str_exact(trimmed)
            .map_err(|_| MoneyError::InvalidAmount(text.to_string()))?;
        Self::from_decimal(value)
    }

    /// Returns the underlying decimal at scale 8.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Returns true if the amount is zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Returns true if the amount is strictly below zero.
    #[must_use]
    pub fn is_negative(&self) -> bool {
        self.0 < Decimal::ZERO
    }

    /// Returns true if the amount is strictly above zero.
    #[must_use]
    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    /// Adds two amounts.
    ///
    /// # Errors
    ///
    /// Returns `ArithmeticOverflow` if the sum is out of range.
    pub fn checked_add(self, other: Self) -> Result<Self, MoneyError> {
        self.0
            .checked_add(other.0)
            .ok_or(MoneyError::ArithmeticOverflow)
            .and_then(Self::fit)
    }

    /// Subtracts `other` from this amount.
    ///
    /// # Errors
    ///
    /// Returns `ArithmeticOverflow` if the difference is out of range.
    pub fn checked_sub(self, other: Self) -> Result<Self, MoneyError> {
        self.0
            .checked_sub(other.0)
            .ok_or(MoneyError::ArithmeticOverflow)
            .and_then(Self::fit)
    }

    /// Multiplies the amount by a quantity.
    ///
    /// The exact product is computed first. If it needs more than 8
    /// fractional digits it is rounded to 8 with banker's rounding
    /// (round half to even).
    ///
    /// # Errors
    ///
    /// Returns `ArithmeticOverflow` if the product is out of range.
    pub fn multiply(self, quantity: Decimal) -> Result<Self, MoneyError> {
        let product = self
            .0
            .checked_mul(quantity)
            .ok_or(MoneyError::ArithmeticOverflow)?;
        Self::fit(product.round_dp_with_strategy(SCALE, RoundingStrategy::MidpointNearestEven))
    }

    /// Returns `rate` percent of this amount (`rate = 15` is 15%).
    ///
    /// Rounds like [`Money::multiply`].
    ///
    /// # Errors
    ///
    /// Returns `ArithmeticOverflow` if the result is out of range.
    pub fn percentage(self, rate: Decimal) -> Result<Self, MoneyError> {
        let product = self
            .0
            .checked_mul(rate)
            .and_then(|p| p.checked_div(ONE_HUNDRED))
            .ok_or(MoneyError::ArithmeticOverflow)?;
        Self::fit(product.round_dp_with_strategy(SCALE, RoundingStrategy::MidpointNearestEven))
    }

    /// Returns the amount with its sign flipped.
    #[must_use]
    pub fn negate(self) -> Self {
        // The range is symmetric, so negation always fits.
        Self(-self.0)
    }

    /// Returns the absolute value.
    #[must_use]
    pub fn abs(self) -> Self {
        Self(self.0.abs())
    }

    /// Rounds for presentation with banker's rounding.
    ///
    /// The result is a plain decimal on purpose: a display value must not
    /// flow back into ledger arithmetic.
    #[must_use]
    pub fn round_for_display(&self, decimal_places: u32) -> Decimal {
        self.0
            .round_dp_with_strategy(decimal_places, RoundingStrategy::MidpointNearestEven)
    }

    /// Sums amounts with overflow checking.
    ///
    /// # Errors
    ///
    /// Returns `ArithmeticOverflow` if any partial sum is out of range.
    pub fn try_sum<I>(amounts: I) -> Result<Self, MoneyError>
    where
        I: IntoIterator<Item = Self>,
    {
        amounts
            .into_iter()
            .try_fold(Self::ZERO, Self::checked_add)
    }

    /// Compares two amounts at full scale.
    #[must_use]
    pub fn compare(&self, other: &Self) -> Ordering {
        self.cmp(other)
    }

    fn fit(value: Decimal) -> Result<Self, MoneyError> {
        if value.abs() >= LIMIT {
            return Err(MoneyError::ArithmeticOverflow);
        }
        let mut scaled = value;
        scaled.rescale(SCALE);
        Ok(Self(scaled))
    }
}

impl Default for Money {
    fn default() -> Self {
        Self::ZERO
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

impl TryFrom<Decimal> for Money {
    type Error = MoneyError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::from_decimal(value)
    }
}

impl From<Money> for Decimal {
    fn from(value: Money) -> Self {
        value.0
    }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Self::parse(&text).map_err(serde::de::Error::custom)
    }
}
