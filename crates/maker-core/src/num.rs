//! Typed f64 wrappers for prices and sizes.
//!
//! All engine arithmetic is double-precision float. The wrappers exist so
//! prices and sizes cannot mix silently; tick and step rounding is explicit
//! and happens exactly once, right before an order leaves the engine.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Div, Mul, Sub};

/// Price in quote-currency units.
#[derive(Debug, Clone, Copy, Default, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(pub f64);

impl Price {
    pub const ZERO: Self = Self(0.0);

    #[inline]
    pub fn new(value: f64) -> Self {
        Self(value)
    }

    #[inline]
    pub fn inner(&self) -> f64 {
        self.0
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0 == 0.0
    }

    #[inline]
    pub fn is_positive(&self) -> bool {
        self.0 > 0.0
    }

    /// Round to the nearest multiple of `tick`.
    ///
    /// A zero tick leaves the price untouched.
    #[inline]
    pub fn round_to_tick(&self, tick: Price) -> Self {
        if tick.is_zero() {
            return *self;
        }
        Self((self.0 / tick.0).round() * tick.0)
    }

    /// Absolute fractional change relative to `other`.
    ///
    /// Returns `None` when `other` is zero.
    #[inline]
    pub fn frac_change_from(&self, other: Price) -> Option<f64> {
        if other.is_zero() {
            return None;
        }
        Some(((self.0 - other.0) / other.0).abs())
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Size/quantity in base units.
#[derive(Debug, Clone, Copy, Default, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Size(pub f64);

impl Size {
    pub const ZERO: Self = Self(0.0);

    #[inline]
    pub fn new(value: f64) -> Self {
        Self(value)
    }

    #[inline]
    pub fn inner(&self) -> f64 {
        self.0
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0 == 0.0
    }

    #[inline]
    pub fn is_positive(&self) -> bool {
        self.0 > 0.0
    }

    /// Round for order emission: sizes below `min_size` are lifted to the
    /// minimum, everything else is floored to a multiple of `step`.
    #[inline]
    pub fn round_for_order(&self, min_size: Size, step: Size) -> Self {
        if self.0 < min_size.0 {
            return min_size;
        }
        if step.is_zero() {
            return *self;
        }
        Self((self.0 / step.0).floor() * step.0)
    }

    /// Notional value at `price`, in quote-currency units.
    #[inline]
    pub fn notional(&self, price: Price) -> f64 {
        self.0 * price.0
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

macro_rules! impl_arith {
    ($t:ident) => {
        impl Add for $t {
            type Output = Self;
            fn add(self, rhs: Self) -> Self {
                Self(self.0 + rhs.0)
            }
        }

        impl Sub for $t {
            type Output = Self;
            fn sub(self, rhs: Self) -> Self {
                Self(self.0 - rhs.0)
            }
        }

        impl Mul<f64> for $t {
            type Output = Self;
            fn mul(self, rhs: f64) -> Self {
                Self(self.0 * rhs)
            }
        }

        impl Div<f64> for $t {
            type Output = Self;
            fn div(self, rhs: f64) -> Self {
                Self(self.0 / rhs)
            }
        }

        impl From<f64> for $t {
            fn from(v: f64) -> Self {
                Self(v)
            }
        }
    };
}

impl_arith!(Price);
impl_arith!(Size);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_to_tick_nearest() {
        let tick = Price::new(0.01);
        // 99.996 / 0.01 = 9999.6 → rounds to 10000 → 100.00
        assert!((Price::new(99.996).round_to_tick(tick).inner() - 100.0).abs() < 1e-9);
        // 99.994 rounds down to 99.99
        assert!((Price::new(99.994).round_to_tick(tick).inner() - 99.99).abs() < 1e-9);
    }

    #[test]
    fn test_round_to_tick_zero_tick_passthrough() {
        let p = Price::new(123.456);
        assert_eq!(p.round_to_tick(Price::ZERO), p);
    }

    #[test]
    fn test_frac_change() {
        let prev = Price::new(100.0);
        let next = Price::new(100.03);
        // |100.03 - 100| / 100 = 0.0003
        assert!((next.frac_change_from(prev).unwrap() - 0.0003).abs() < 1e-12);
        assert!(next.frac_change_from(Price::ZERO).is_none());
    }

    #[test]
    fn test_size_round_lifts_to_minimum() {
        let rounded = Size::new(0.004).round_for_order(Size::new(0.1), Size::new(0.01));
        assert_eq!(rounded, Size::new(0.1));
    }

    #[test]
    fn test_size_round_floors_to_step() {
        // 1.238 floors to 1.23 on a 0.01 step
        let rounded = Size::new(1.238).round_for_order(Size::new(0.1), Size::new(0.01));
        assert!((rounded.inner() - 1.23).abs() < 1e-9);
    }

    #[test]
    fn test_notional() {
        assert_eq!(Size::new(0.5).notional(Price::new(50_000.0)), 25_000.0);
    }
}
