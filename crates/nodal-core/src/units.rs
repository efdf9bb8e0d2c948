//! Unit newtypes for dispatch quantities.
//!
//! Dispatch mixes three kinds of numbers that are easy to confuse when they
//! are all `f64`: power (MW), prices (currency/MWh) and emission intensities
//! (tCO₂/MWh). The wrappers below keep them apart at compile time and only
//! allow the cross-unit products that make physical sense:
//!
//! - `PricePerMwh * Megawatts` → `CostRate` (currency/h)
//! - `EmissionIntensity * Megawatts` → `EmissionRate` (tCO₂/h)
//!
//! All types are `#[repr(transparent)]` and serialize as plain numbers.
//!
//! ```
//! use nodal_core::units::{Megawatts, PricePerMwh};
//!
//! let output = Megawatts(120.0);
//! let price = PricePerMwh(10.0);
//! assert_eq!((price * output).value(), 1200.0);
//! ```

use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub};

macro_rules! impl_unit_ops {
    ($type:ty, $unit_name:literal) => {
        impl Add for $type {
            type Output = Self;
            fn add(self, rhs: Self) -> Self::Output {
                Self(self.0 + rhs.0)
            }
        }

        impl AddAssign for $type {
            fn add_assign(&mut self, rhs: Self) {
                self.0 += rhs.0;
            }
        }

        impl Sub for $type {
            type Output = Self;
            fn sub(self, rhs: Self) -> Self::Output {
                Self(self.0 - rhs.0)
            }
        }

        impl Neg for $type {
            type Output = Self;
            fn neg(self) -> Self::Output {
                Self(-self.0)
            }
        }

        impl Mul<f64> for $type {
            type Output = Self;
            fn mul(self, rhs: f64) -> Self::Output {
                Self(self.0 * rhs)
            }
        }

        impl Div<f64> for $type {
            type Output = Self;
            fn div(self, rhs: f64) -> Self::Output {
                Self(self.0 / rhs)
            }
        }

        impl Div<$type> for $type {
            type Output = f64;
            fn div(self, rhs: $type) -> Self::Output {
                self.0 / rhs.0
            }
        }

        impl std::fmt::Display for $type {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match f.precision() {
                    Some(p) => write!(f, "{:.*} {}", p, self.0, $unit_name),
                    None => write!(f, "{:.2} {}", self.0, $unit_name),
                }
            }
        }

        impl $type {
            /// Unit label used in reports.
            pub const UNIT: &'static str = $unit_name;

            #[inline]
            pub const fn new(value: f64) -> Self {
                Self(value)
            }

            /// Raw numeric value.
            #[inline]
            pub const fn value(self) -> f64 {
                self.0
            }

            #[inline]
            pub fn abs(self) -> Self {
                Self(self.0.abs())
            }

            #[inline]
            pub fn is_finite(self) -> bool {
                self.0.is_finite()
            }

            #[inline]
            pub fn min(self, other: Self) -> Self {
                Self(self.0.min(other.0))
            }

            #[inline]
            pub fn max(self, other: Self) -> Self {
                Self(self.0.max(other.0))
            }
        }

        impl std::iter::Sum for $type {
            fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
                Self(iter.map(|x| x.0).sum())
            }
        }

        impl<'a> std::iter::Sum<&'a $type> for $type {
            fn sum<I: Iterator<Item = &'a Self>>(iter: I) -> Self {
                Self(iter.map(|x| x.0).sum())
            }
        }
    };
}

/// Active power in megawatts.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
#[repr(transparent)]
pub struct Megawatts(pub f64);

impl_unit_ops!(Megawatts, "MW");

/// Energy price in currency per MWh (marginal costs and shadow prices).
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
#[repr(transparent)]
pub struct PricePerMwh(pub f64);

impl_unit_ops!(PricePerMwh, "/MWh");

/// Cost rate in currency per hour (objective value of a single-period dispatch).
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
#[repr(transparent)]
pub struct CostRate(pub f64);

impl_unit_ops!(CostRate, "/h");

/// Emission intensity of a technology in tonnes CO₂ per MWh.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
#[repr(transparent)]
pub struct EmissionIntensity(pub f64);

impl_unit_ops!(EmissionIntensity, "t/MWh");

/// Emission rate in tonnes CO₂ per hour.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
#[repr(transparent)]
pub struct EmissionRate(pub f64);

impl_unit_ops!(EmissionRate, "t/h");

impl Mul<Megawatts> for PricePerMwh {
    type Output = CostRate;
    fn mul(self, rhs: Megawatts) -> CostRate {
        CostRate(self.0 * rhs.0)
    }
}

impl Mul<PricePerMwh> for Megawatts {
    type Output = CostRate;
    fn mul(self, rhs: PricePerMwh) -> CostRate {
        CostRate(self.0 * rhs.0)
    }
}

impl Mul<Megawatts> for EmissionIntensity {
    type Output = EmissionRate;
    fn mul(self, rhs: Megawatts) -> EmissionRate {
        EmissionRate(self.0 * rhs.0)
    }
}
