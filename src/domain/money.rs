use crate::error::ShopError;
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of decimal places every monetary amount is kept at.
pub const CENT_SCALE: u32 = 2;

/// Rounds to cents, half away from zero, and pins the scale to two places.
pub fn round_cents(value: Decimal) -> Decimal {
    let mut rounded = value.round_dp_with_strategy(CENT_SCALE, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(CENT_SCALE);
    rounded
}

/// A monetary amount in the shop currency, always held at cent precision.
///
/// Wraps `rust_decimal::Decimal` so arithmetic stays exact and every value
/// that enters the type has already been rounded half away from zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(Decimal);

/// Largest unit net price a catalog may carry.
///
/// Keeps `price * u32::MAX` and the order totals built from it well inside
/// the range of `Decimal`.
pub const MAX_UNIT_PRICE: Decimal = dec!(1000000000.00);

fn out_of_range() -> ShopError {
    ShopError::validation("Amount out of range")
}

impl Money {
    pub const ZERO: Self = Self(Decimal::from_parts(0, 0, 0, false, CENT_SCALE));

    pub fn new(amount: Decimal) -> Self {
        Self(round_cents(amount))
    }

    /// A catalog unit price: non-negative, at most [`MAX_UNIT_PRICE`], and
    /// already in whole cents. Nothing is rounded here.
    pub fn unit_price(amount: Decimal) -> Result<Self, ShopError> {
        if amount < Decimal::ZERO {
            return Err(ShopError::validation("Price must not be negative"));
        }
        if amount > MAX_UNIT_PRICE {
            return Err(out_of_range());
        }
        if amount.normalize().scale() > CENT_SCALE {
            return Err(ShopError::validation(format!(
                "Price {amount} has more than {CENT_SCALE} decimal places"
            )));
        }
        Ok(Self::new(amount))
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    /// Multiplies by a quantity and rounds the product to cents.
    pub fn times(self, quantity: u32) -> Result<Self, ShopError> {
        self.0
            .checked_mul(Decimal::from(quantity))
            .map(Self::new)
            .ok_or_else(out_of_range)
    }

    /// Applies a fractional rate (e.g. 0.20) and rounds the result to cents.
    pub fn apply_rate(self, rate: Decimal) -> Result<Self, ShopError> {
        self.0
            .checked_mul(rate)
            .map(Self::new)
            .ok_or_else(out_of_range)
    }

    pub fn checked_add(self, rhs: Self) -> Result<Self, ShopError> {
        self.0
            .checked_add(rhs.0)
            .map(Self)
            .ok_or_else(out_of_range)
    }

    /// Sums amounts, failing instead of overflowing.
    pub fn total<I: IntoIterator<Item = Self>>(amounts: I) -> Result<Self, ShopError> {
        amounts
            .into_iter()
            .try_fold(Self::ZERO, |acc, amount| acc.checked_add(amount))
    }
}

impl From<Money> for Decimal {
    fn from(money: Money) -> Self {
        money.0
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A strictly positive number of units on an order line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Quantity(u32);

impl Quantity {
    pub fn new(value: i64) -> Result<Self, ShopError> {
        match u32::try_from(value) {
            Ok(units) if units > 0 => Ok(Self(units)),
            _ => Err(ShopError::validation(
                "Item quantity must be greater than zero",
            )),
        }
    }

    pub fn get(&self) -> u32 {
        self.0
    }
}

impl TryFrom<i64> for Quantity {
    type Error = ShopError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}
