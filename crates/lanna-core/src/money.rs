//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In JavaScript/floating point:                                          │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                           │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Satang (1 baht = 100 satang)                     │
//! │    ฿12.50 is stored as 1250                                             │
//! │    Every multiplication by a quantity or rate rounds exactly once      │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use lanna_core::money::Money;
//!
//! let cost = Money::from_satang(1250); // ฿12.50
//! let doubled = cost * 2;              // ฿25.00
//! assert_eq!(doubled.to_string(), "฿25.00");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};
use ts_rs::TS;

use crate::quantity::{Quantity, MILLI_PER_UNIT};
use crate::types::TaxRate;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in satang (the smallest unit of the Thai baht).
///
/// ## Design Decisions
/// - **i64 (signed)**: differences (remaining amounts, adjustments) can be negative
/// - **Single field tuple struct**: zero-cost wrapper, stored as INTEGER
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(transparent))]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from satang.
    ///
    /// ```rust
    /// use lanna_core::money::Money;
    ///
    /// let cost = Money::from_satang(1250);
    /// assert_eq!(cost.satang(), 1250);
    /// ```
    #[inline]
    pub const fn from_satang(satang: i64) -> Self {
        Money(satang)
    }

    /// Creates a Money value from whole baht and satang.
    ///
    /// For negative amounts only the baht part carries the sign:
    /// `from_baht_satang(-5, 50)` is -฿5.50.
    #[inline]
    pub const fn from_baht_satang(baht: i64, satang: i64) -> Self {
        if baht < 0 {
            Money(baht * 100 - satang)
        } else {
            Money(baht * 100 + satang)
        }
    }

    /// Returns the value in satang.
    #[inline]
    pub const fn satang(&self) -> i64 {
        self.0
    }

    /// Returns the whole-baht portion.
    #[inline]
    pub const fn baht(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the satang portion (always 0-99).
    #[inline]
    pub const fn satang_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Multiplies a unit amount by a fixed-point quantity.
    ///
    /// The product is rounded once, half away from zero, to whole satang.
    ///
    /// ```rust
    /// use lanna_core::{Money, Quantity};
    ///
    /// let unit = Money::from_satang(333);          // ฿3.33
    /// let qty = Quantity::from_milli(1_500);       // 1.5
    /// assert_eq!(unit.times_quantity(qty).satang(), 500); // 499.5 → 500
    /// ```
    ///
    /// Saturates at the `i64` limits; use
    /// [`checked_times_quantity`](Self::checked_times_quantity) where an
    /// out-of-range product must be reported.
    pub fn times_quantity(&self, qty: Quantity) -> Money {
        self.checked_times_quantity(qty).unwrap_or_else(|| {
            if self.is_negative() != (qty.milli() < 0) {
                Money(i64::MIN)
            } else {
                Money(i64::MAX)
            }
        })
    }

    /// Like [`times_quantity`](Self::times_quantity), `None` when the
    /// rounded product does not fit in satang.
    pub fn checked_times_quantity(&self, qty: Quantity) -> Option<Money> {
        let product = self.0 as i128 * qty.milli() as i128;
        i64::try_from(round_div(product, MILLI_PER_UNIT as i128))
            .ok()
            .map(Money)
    }

    /// Calculates tax at the given rate, rounded half away from zero.
    ///
    /// ```rust
    /// use lanna_core::money::Money;
    /// use lanna_core::types::TaxRate;
    ///
    /// let net = Money::from_satang(1050);         // ฿10.50
    /// let vat = net.calculate_tax(TaxRate::THAI_VAT);
    /// assert_eq!(vat.satang(), 74);               // 73.5 → 74
    /// ```
    pub fn calculate_tax(&self, rate: TaxRate) -> Money {
        // Saturates; a rate above 100% is the only way to leave the i64 range.
        let product = self.0 as i128 * rate.bps() as i128;
        let tax = round_div(product, 10_000);
        Money(i64::try_from(tax).unwrap_or(if tax < 0 { i64::MIN } else { i64::MAX }))
    }

    #[inline]
    pub const fn checked_add(self, other: Money) -> Option<Money> {
        match self.0.checked_add(other.0) {
            Some(v) => Some(Money(v)),
            None => None,
        }
    }

    #[inline]
    pub const fn checked_sub(self, other: Money) -> Option<Money> {
        match self.0.checked_sub(other.0) {
            Some(v) => Some(Money(v)),
            None => None,
        }
    }
}

/// Integer division rounding half away from zero.
fn round_div(numerator: i128, denominator: i128) -> i128 {
    let half = denominator / 2;
    if numerator >= 0 {
        (numerator + half) / denominator
    } else {
        (numerator - half) / denominator
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Displays baht with thousands separators: `฿1,234.50`, `-฿5.50`.
///
/// The UI localises its own output; this form is for logs and messages.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let digits = self.baht().abs().to_string();
        let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
        for (i, c) in digits.chars().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                grouped.push(',');
            }
            grouped.push(c);
        }
        write!(f, "{}฿{}.{:02}", sign, grouped, self.satang_part())
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, factor: i64) -> Self {
        Money(self.0 * factor)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
