//! # Quantity Module
//!
//! Fixed-point quantities for document lines and matches.
//!
//! Goods are received in fractional units (2.5 kg, 0.125 m³), so quantities
//! carry three decimal places. Like [`Money`](crate::money::Money) they are
//! stored as an integer: `2.5` is held as `2500` thousandths.
//!
//! ```rust
//! use lanna_core::quantity::Quantity;
//!
//! let q: Quantity = "2.5".parse().unwrap();
//! assert_eq!(q.milli(), 2_500);
//! assert_eq!(q.to_string(), "2.5");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Sub};
use std::str::FromStr;
use thiserror::Error;
use ts_rs::TS;

/// Thousandths per whole unit.
pub const MILLI_PER_UNIT: i64 = 1_000;

/// A quantity in thousandths of a unit.
///
/// Serialized as the raw thousandths integer, the same way money travels as
/// satang.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(transparent))]
#[serde(transparent)]
#[ts(export)]
pub struct Quantity(i64);

impl Quantity {
    #[inline]
    pub const fn from_milli(milli: i64) -> Self {
        Quantity(milli)
    }

    #[inline]
    pub const fn from_units(units: i64) -> Self {
        Quantity(units * MILLI_PER_UNIT)
    }

    #[inline]
    pub const fn milli(&self) -> i64 {
        self.0
    }

    #[inline]
    pub const fn zero() -> Self {
        Quantity(0)
    }

    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Subtraction that stops at zero. Used for "remaining" amounts.
    #[inline]
    pub fn saturating_remaining(&self, used: Quantity) -> Quantity {
        Quantity((self.0 - used.0).max(0))
    }
}

/// Failure to parse a decimal quantity string.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseQuantityError {
    #[error("quantity is empty")]
    Empty,

    #[error("'{0}' is not a decimal number")]
    NotANumber(String),

    #[error("'{0}' has more than 3 decimal places")]
    TooPrecise(String),

    #[error("'{0}' is too large")]
    Overflow(String),
}

impl FromStr for Quantity {
    type Err = ParseQuantityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ParseQuantityError::Empty);
        }

        let (negative, body) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s),
        };

        let (whole, frac) = match body.split_once('.') {
            Some((w, f)) => (w, f),
            None => (body, ""),
        };

        let is_digits = |part: &str| part.chars().all(|c| c.is_ascii_digit());
        if (whole.is_empty() && frac.is_empty()) || !is_digits(whole) || !is_digits(frac) {
            return Err(ParseQuantityError::NotANumber(s.to_string()));
        }
        if frac.len() > 3 {
            return Err(ParseQuantityError::TooPrecise(s.to_string()));
        }

        let overflow = || ParseQuantityError::Overflow(s.to_string());
        let whole_value: i64 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| overflow())?
        };
        let frac_value: i64 = if frac.is_empty() {
            0
        } else {
            // "5" → 500, "25" → 250, "125" → 125
            format!("{:0<3}", frac).parse().map_err(|_| overflow())?
        };

        let milli = whole_value
            .checked_mul(MILLI_PER_UNIT)
            .and_then(|v| v.checked_add(frac_value))
            .ok_or_else(overflow)?;

        Ok(Quantity(if negative { -milli } else { milli }))
    }
}

/// Shortest decimal form: `10`, `2.5`, `0.125`.
impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let whole = abs / MILLI_PER_UNIT as u64;
        let frac = abs % MILLI_PER_UNIT as u64;
        if frac == 0 {
            write!(f, "{}{}", sign, whole)
        } else {
            let digits = format!("{:03}", frac);
            write!(f, "{}{}.{}", sign, whole, digits.trim_end_matches('0'))
        }
    }
}

impl Default for Quantity {
    fn default() -> Self {
        Quantity::zero()
    }
}

impl Add for Quantity {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Quantity(self.0 + other.0)
    }
}

impl AddAssign for Quantity {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Quantity {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Quantity(self.0 - other.0)
    }
}

impl Sum for Quantity {
    fn sum<I: Iterator<Item = Quantity>>(iter: I) -> Self {
        iter.fold(Quantity::zero(), |acc, q| acc + q)
    }
}
