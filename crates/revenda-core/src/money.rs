//! # Money Module
//!
//! `Money`: Brazilian reais held as integer centavos.
//!
//! ## Why Integer Centavos?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  With native floats:                                                    │
//! │    14285.72 * 0.7 = 10000.003999999999  ❌ which side of the tier?      │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Centavos                                         │
//! │    1_428_572 centavos, 30% off = 428_572 off → 1_000_000 exactly        │
//! │    Every discount is rounded to the centavo, once, per line             │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use revenda_core::money::Money;
//! use revenda_core::types::Rate;
//!
//! let price = Money::from_cents(1099); // R$ 10,99
//! let total = price * 2;               // R$ 21,98
//! let discounted = total.apply_discount(Rate::from_bps(3000));
//! assert_eq!(discounted.cents(), 1539);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};
use ts_rs::TS;

use crate::error::ValidationError;
use crate::types::Rate;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in centavos (1/100 of a real).
///
/// ## Design Decisions
/// - **i64 (signed)**: credits and coupon discounts are subtracted freely,
///   clamping happens where the business rule says so
/// - **Single field tuple struct**: serializes as a plain integer, which is
///   also the minor-unit amount the payment gateway expects
///
/// ## Where Money Flows
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  LineItem.table_price ──► line total ──► tier discount ──► summary      │
/// │                                                                         │
/// │  summary.total_with_discount + kit − coupon − credit ──► ChargeQuote    │
/// │                                                                         │
/// │  ChargeQuote.card_amount / pix_amount ──► PaymentRequest.amount         │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from centavos.
    ///
    /// ## Example
    /// ```rust
    /// use revenda_core::money::Money;
    ///
    /// let creme = Money::from_cents(12_990);
    /// assert_eq!(creme.to_string(), "R$ 129,90");
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Creates a Money value from reais and centavos.
    ///
    /// For negative amounts only the major unit carries the sign:
    /// `from_reais(-5, 50)` is -R$ 5,50.
    #[inline]
    pub const fn from_reais(reais: i64, centavos: i64) -> Self {
        if reais < 0 {
            Money(reais * 100 - centavos)
        } else {
            Money(reais * 100 + centavos)
        }
    }

    /// Parses a decimal amount in reais, accepting `.` or `,` as separator.
    ///
    /// ## Example
    /// ```rust
    /// use revenda_core::money::Money;
    ///
    /// assert_eq!(Money::parse_reais("14285.72").unwrap().cents(), 1_428_572);
    /// assert_eq!(Money::parse_reais("10,5").unwrap().cents(), 1050);
    /// assert_eq!(Money::parse_reais("300").unwrap().cents(), 30_000);
    /// assert!(Money::parse_reais("1.234").is_err());
    /// ```
    pub fn parse_reais(input: &str) -> Result<Self, ValidationError> {
        let invalid = |reason: &str| ValidationError::InvalidFormat {
            field: "amount".to_string(),
            reason: reason.to_string(),
        };

        let trimmed = input.trim();
        let (negative, digits) = match trimmed.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, trimmed),
        };

        let (whole, fraction) = match digits.split_once(['.', ',']) {
            Some((whole, fraction)) => (whole, fraction),
            None => (digits, ""),
        };

        if whole.is_empty() || !whole.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid("expected digits before the decimal separator"));
        }
        if fraction.len() > 2 || !fraction.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid("at most two decimal places are allowed"));
        }

        let reais: i64 = whole
            .parse()
            .map_err(|_| invalid("amount is too large"))?;
        let centavos: i64 = match fraction.len() {
            0 => 0,
            1 => fraction.parse::<i64>().map_err(|_| invalid("bad decimals"))? * 10,
            _ => fraction.parse().map_err(|_| invalid("bad decimals"))?,
        };

        let cents = reais
            .checked_mul(100)
            .and_then(|c| c.checked_add(centavos))
            .ok_or_else(|| invalid("amount is too large"))?;

        Ok(Money(if negative { -cents } else { cents }))
    }

    /// Returns the value in centavos.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the whole reais portion (truncated toward zero).
    #[inline]
    pub const fn reais(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the centavos portion (always 0-99).
    #[inline]
    pub const fn cents_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    /// R$ 0,00
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

    /// Clamps negative values to zero.
    #[inline]
    pub const fn non_negative(&self) -> Self {
        if self.0 < 0 {
            Money(0)
        } else {
            *self
        }
    }

    /// Returns the smaller of two amounts.
    #[inline]
    pub fn min(self, other: Money) -> Money {
        if self.0 <= other.0 {
            self
        } else {
            other
        }
    }

    /// Line total for `qty` units.
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0 * qty)
    }

    /// Returns `rate` of this amount, rounded half away from zero.
    ///
    /// ## Implementation
    /// Integer math in i128: `(cents * bps ± 5000) / 10000`.
    ///
    /// ## Example
    /// ```rust
    /// use revenda_core::money::Money;
    /// use revenda_core::types::Rate;
    ///
    /// // 3% of R$ 100,00
    /// let pix = Money::from_cents(10_000).portion(Rate::from_bps(300));
    /// assert_eq!(pix.cents(), 300);
    /// ```
    pub fn portion(&self, rate: Rate) -> Money {
        let raw = self.0 as i128 * rate.bps() as i128;
        let rounded = if raw >= 0 {
            (raw + 5000) / 10000
        } else {
            (raw - 5000) / 10000
        };
        Money(rounded as i64)
    }

    /// Applies a percentage discount and returns the discounted amount.
    ///
    /// ## Example
    /// ```rust
    /// use revenda_core::money::Money;
    /// use revenda_core::types::Rate;
    ///
    /// let line = Money::from_cents(10_000);
    /// assert_eq!(line.apply_discount(Rate::from_bps(3500)).cents(), 6500);
    /// ```
    pub fn apply_discount(&self, rate: Rate) -> Money {
        *self - self.portion(rate)
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Brazilian display format: `R$ 1.234,56`.
///
/// For logs and the CLI. Frontends format with their own locale rules.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let whole = self.reais().abs().to_string();

        let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
        for (i, c) in whole.chars().enumerate() {
            if i > 0 && (whole.len() - i) % 3 == 0 {
                grouped.push('.');
            }
            grouped.push(c);
        }

        write!(f, "{}R$ {},{:02}", sign, grouped, self.cents_part())
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
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), Add::add)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_cents() {
        let money = Money::from_cents(1099);
        assert_eq!(money.cents(), 1099);
        assert_eq!(money.reais(), 10);
        assert_eq!(money.cents_part(), 99);
    }

    #[test]
    fn test_from_reais() {
        assert_eq!(Money::from_reais(10, 99).cents(), 1099);
        assert_eq!(Money::from_reais(-5, 50).cents(), -550);
    }

    #[test]
    fn test_display() {
        assert_eq!(Money::from_cents(1099).to_string(), "R$ 10,99");
        assert_eq!(Money::from_cents(123_456).to_string(), "R$ 1.234,56");
        assert_eq!(Money::from_cents(100_000_000).to_string(), "R$ 1.000.000,00");
        assert_eq!(Money::from_cents(-550).to_string(), "-R$ 5,50");
        assert_eq!(Money::zero().to_string(), "R$ 0,00");
    }

    #[test]
    fn test_parse_reais() {
        assert_eq!(Money::parse_reais("14285.72").unwrap().cents(), 1_428_572);
        assert_eq!(Money::parse_reais(" 0,01 ").unwrap().cents(), 1);
        assert_eq!(Money::parse_reais("-2.5").unwrap().cents(), -250);
        assert!(Money::parse_reais("").is_err());
        assert!(Money::parse_reais("abc").is_err());
        assert!(Money::parse_reais("10.999").is_err());
        assert!(Money::parse_reais(".50").is_err());
    }

    #[test]
    fn test_arithmetic() {
        let a = Money::from_cents(1000);
        let b = Money::from_cents(500);

        assert_eq!((a + b).cents(), 1500);
        assert_eq!((a - b).cents(), 500);
        assert_eq!((a * 3).cents(), 3000);
        assert_eq!([a, b].iter().sum::<Money>().cents(), 1500);
    }

    #[test]
    fn test_portion_rounds_half_up() {
        // 3% of R$ 0,50 = 1.5 centavos -> 2
        assert_eq!(Money::from_cents(50).portion(Rate::from_bps(300)).cents(), 2);
        // 3% of R$ 0,49 = 1.47 centavos -> 1
        assert_eq!(Money::from_cents(49).portion(Rate::from_bps(300)).cents(), 1);
        assert_eq!(Money::from_cents(-50).portion(Rate::from_bps(300)).cents(), -2);
    }

    #[test]
    fn test_apply_discount() {
        let line = Money::from_cents(1_428_572);
        assert_eq!(line.apply_discount(Rate::from_bps(3000)).cents(), 1_000_000);
        assert_eq!(line.apply_discount(Rate::zero()), line);
    }

    #[test]
    fn test_non_negative_and_min() {
        assert_eq!(Money::from_cents(-10).non_negative(), Money::zero());
        assert_eq!(Money::from_cents(10).non_negative().cents(), 10);
        assert_eq!(Money::from_cents(10).min(Money::from_cents(3)).cents(), 3);
    }
}
