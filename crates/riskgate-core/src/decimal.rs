//! Precision-safe decimal types for risk arithmetic.
//!
//! Uses `rust_decimal` for exact decimal arithmetic, avoiding
//! floating-point rounding errors in position sizing and drawdown math.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Div, Mul, Sub};
use std::str::FromStr;

/// Price with exact decimal precision.
///
/// Wraps `Decimal` to provide type safety and prevent mixing
/// prices with sizes in calculations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(pub Decimal);

impl Price {
    pub const ZERO: Self = Self(Decimal::ZERO);
    pub const ONE: Self = Self(Decimal::ONE);

    #[inline]
    pub fn new(value: Decimal) -> Self {
        Self(value)
    }

    #[inline]
    pub fn inner(&self) -> Decimal {
        self.0
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    #[inline]
    pub fn is_positive(&self) -> bool {
        self.0.is_sign_positive() && !self.0.is_zero()
    }

    /// Fractional distance to a stop price: `|self - stop| / self`.
    ///
    /// Returns `None` when the entry price is zero (no meaningful ratio).
    #[inline]
    pub fn stop_distance_ratio(&self, stop: Price) -> Option<Decimal> {
        if self.is_zero() {
            return None;
        }
        Some((self.0 - stop.0).abs() / self.0)
    }

    /// Fractional decline from a peak: `(peak - self) / peak`, floored at 0.
    ///
    /// Returns `None` when the peak is zero.
    #[inline]
    pub fn drawdown_from(&self, peak: Price) -> Option<Decimal> {
        if peak.is_zero() {
            return None;
        }
        let dd = (peak.0 - self.0) / peak.0;
        Some(dd.max(Decimal::ZERO))
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Price {
    type Err = crate::error::CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value: Decimal = s.parse()?;
        Ok(Self(value))
    }
}

impl From<Decimal> for Price {
    fn from(d: Decimal) -> Self {
        Self(d)
    }
}

impl Add for Price {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Sub for Price {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

impl Mul<Decimal> for Price {
    type Output = Self;

    fn mul(self, rhs: Decimal) -> Self::Output {
        Self(self.0 * rhs)
    }
}

impl Div<Decimal> for Price {
    type Output = Self;

    fn div(self, rhs: Decimal) -> Self::Output {
        Self(self.0 / rhs)
    }
}

/// Size/quantity with exact decimal precision.
///
/// Sizes are base-asset quantities; `notional` converts to quote
/// currency at a given price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Size(pub Decimal);

impl Size {
    pub const ZERO: Self = Self(Decimal::ZERO);

    #[inline]
    pub fn new(value: Decimal) -> Self {
        Self(value)
    }

    #[inline]
    pub fn inner(&self) -> Decimal {
        self.0
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    #[inline]
    pub fn is_positive(&self) -> bool {
        self.0.is_sign_positive() && !self.0.is_zero()
    }

    /// Return the smaller of two sizes. Used for shrink-only clamping.
    #[inline]
    pub fn min(self, other: Size) -> Self {
        if self.0 <= other.0 {
            self
        } else {
            other
        }
    }

    /// Notional value in quote currency: size * price.
    #[inline]
    pub fn notional(&self, price: Price) -> Decimal {
        self.0 * price.0
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Size {
    type Err = crate::error::CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value: Decimal = s.parse()?;
        Ok(Self(value))
    }
}

impl From<Decimal> for Size {
    fn from(d: Decimal) -> Self {
        Self(d)
    }
}

impl Add for Size {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Sub for Size {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

impl Mul<Decimal> for Size {
    type Output = Self;

    fn mul(self, rhs: Decimal) -> Self::Output {
        Self(self.0 * rhs)
    }
}

impl Div<Decimal> for Size {
    type Output = Self;

    fn div(self, rhs: Decimal) -> Self::Output {
        Self(self.0 / rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_stop_distance_ratio() {
        let entry = Price::new(dec!(100));
        let stop = Price::new(dec!(95));

        let ratio = entry.stop_distance_ratio(stop).unwrap();
        assert_eq!(ratio, dec!(0.05));
    }

    #[test]
    fn test_stop_distance_ratio_zero_entry() {
        let entry = Price::ZERO;
        assert!(entry.stop_distance_ratio(Price::new(dec!(95))).is_none());
    }

    #[test]
    fn test_drawdown_from_peak() {
        let current = Price::new(dec!(9000));
        let peak = Price::new(dec!(10000));

        let dd = current.drawdown_from(peak).unwrap();
        assert_eq!(dd, dec!(0.10));
    }

    #[test]
    fn test_drawdown_floored_at_zero() {
        let current = Price::new(dec!(11000));
        let peak = Price::new(dec!(10000));

        let dd = current.drawdown_from(peak).unwrap();
        assert_eq!(dd, Decimal::ZERO);
    }

    #[test]
    fn test_notional_calculation() {
        let size = Size::new(dec!(0.5));
        let price = Price::new(dec!(50000));

        assert_eq!(size.notional(price), dec!(25000));
    }

    #[test]
    fn test_size_min_shrinks_only() {
        let requested = Size::new(dec!(100));
        let cap = Size::new(dec!(40));

        assert_eq!(requested.min(cap), cap);
        assert_eq!(cap.min(requested), cap);
    }
}
