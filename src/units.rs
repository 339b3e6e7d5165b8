// This file is part of Metropolis-Calibration.
// Copyright © 2022, 2023, 2024, 2025 André de Palma, Lucas Javaudin
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Definition of types representing values expressed in a given unit.
//!
//! The types assume the following units:
//!
//! - [NonNegativeSeconds], [PositiveSeconds]: in seconds
//! - [NonNegativeMeters]: in meters
//! - [MetersPerSecond]: in meters per second
//!
//! Other units can be assumed but the coherence between units must be kept.
//! For example, if lengths are expressed in miles, then speeds must be expressed in miles per
//! second.
use std::cmp::Ordering;
use std::fmt;
use std::iter;
use std::ops::*;

use anyhow::{bail, Result};
use num_traits::{ConstOne, ConstZero, One, Zero};
use serde_derive::{Deserialize, Serialize};

const MARGIN: f64 = 1e-8;

/// Implements some useful traits and functions for unit types that can hold positive values.
macro_rules! impl_traits_on_positive_unit(
    ( $( $t:ident ),* ) => {
        $(
            impl Add for $t {
                type Output = Self;
                fn add(self, rhs: Self) -> Self::Output {
                    Self(self.0 + rhs.0)
                }
            }

            impl AddAssign for $t {
                fn add_assign(&mut self, rhs: Self) {
                    self.0 += rhs.0;
                }
            }

            impl Mul for $t {
                type Output = Self;
                fn mul(self, rhs: Self) -> Self::Output {
                    Self(self.0 * rhs.0)
                }
            }

            impl Div<usize> for $t {
                type Output = Self;
                fn div(self, rhs: usize) -> Self::Output {
                    Self(self.0 / rhs as f64)
                }
            }

            impl One for $t {
                fn one() -> Self {
                    Self(1.0)
                }
                fn is_one(&self) -> bool {
                    self.0 == 1.0
                }
            }

            impl ConstOne for $t {
                const ONE: Self = Self(1.0);
            }

            impl Eq for $t {}

            #[allow(clippy::derive_ord_xor_partial_ord)]
            impl Ord for $t {
                fn cmp(&self, other: &Self) -> Ordering {
                    self.0.total_cmp(&other.0)
                }
            }

            impl TryFrom<f64> for $t {
                type Error = anyhow::Error;
                fn try_from(value: f64) -> Result<Self> {
                    if value.is_nan() || value < $t::lower_bound().0 || value > $t::upper_bound().0 {
                        bail!("Invalid value for {}: {value}", stringify!($t))
                    }
                    Ok(Self(value))
                }
            }

            impl From<$t> for f64 {
                fn from(value: $t) -> f64 {
                    value.0
                }
            }

            impl From<&$t> for f64 {
                fn from(value: &$t) -> f64 {
                    value.0
                }
            }

            impl $t {
                /// Returns the largest value that can be represented.
                pub const MAX: Self = $t::upper_bound();

                /// Returns the value as a `f64`.
                pub const fn value(self) -> f64 {
                    self.0
                }

                /// Returns `self` raised to an integer power.
                pub fn powi(self, expo: i32) -> Self {
                    Self(self.0.powi(expo))
                }

                /// Returns the square root of `self`.
                pub fn sqrt(self) -> Self {
                    Self(self.0.sqrt())
                }
            }
        )*
    };
);

/// Implements some useful traits on units that can take the value zero.
macro_rules! impl_traits_on_non_negative_unit(
    ( $( $t:ident ),* ) => {
        $(
            impl iter::Sum for $t {
                fn sum<I>(iter: I) -> Self
                    where I: Iterator<Item = $t>
                {
                    iter.fold($t::ZERO, |a, b| a + b)
                }
            }

            impl Zero for $t {
                fn zero() -> Self {
                    Self(0.0)
                }
                fn is_zero(&self) -> bool {
                    self.0 == 0.0
                }
            }

            impl ConstZero for $t {
                const ZERO: Self = Self(0.0);
            }

            impl $t {
                /// Subtracts `other` from `self` when `self` is larger than `other`.
                ///
                /// Small negative differences due to roundings are truncated to zero.
                pub fn sub_unchecked(self, other: Self) -> Self {
                    debug_assert!(self.0 + MARGIN >= other.0);
                    Self((self.0 - other.0).max(0.0))
                }
            }
        )*
    };
);

/// Representation of a non-negative value with no unit.
#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Default, Clone, Copy, Debug, PartialEq, PartialOrd, Deserialize, Serialize)]
#[serde(try_from = "f64")]
pub struct NonNegativeNum(f64);

impl NonNegativeNum {
    pub(crate) fn new_unchecked(value: f64) -> Self {
        debug_assert!(value.is_finite());
        debug_assert!(value >= 0.0);
        Self(value)
    }

    const fn lower_bound() -> Self {
        Self(0.0)
    }

    const fn upper_bound() -> Self {
        Self(f64::MAX)
    }

    /// Returns the absolute difference between `self` and one.
    ///
    /// For a ratio, this is the relative deviation from a perfect fit.
    pub fn deviation_from_one(self) -> Self {
        Self((self.0 - 1.0).abs())
    }
}

impl fmt::Display for NonNegativeNum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.4}", self.0)
    }
}

impl From<ZeroOneNum> for NonNegativeNum {
    fn from(value: ZeroOneNum) -> Self {
        Self(value.0)
    }
}

impl From<PositiveNum> for NonNegativeNum {
    fn from(value: PositiveNum) -> Self {
        Self(value.0)
    }
}

/// Representation of a positive value with no unit.
#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Default, Clone, Copy, Debug, PartialEq, PartialOrd, Deserialize, Serialize)]
#[serde(try_from = "f64")]
pub struct PositiveNum(f64);

impl PositiveNum {
    pub(crate) fn new_unchecked(value: f64) -> Self {
        debug_assert!(value.is_finite());
        debug_assert!(value > 0.0);
        Self(value)
    }

    const fn lower_bound() -> Self {
        Self(f64::MIN_POSITIVE)
    }

    const fn upper_bound() -> Self {
        Self(f64::MAX)
    }
}

impl fmt::Display for PositiveNum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Representation of a value between zero and one (both included).
#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Default, Clone, Copy, Debug, PartialEq, PartialOrd, Deserialize, Serialize)]
#[serde(try_from = "f64")]
pub struct ZeroOneNum(f64);

impl ZeroOneNum {
    pub(crate) fn new_unchecked(value: f64) -> Self {
        debug_assert!((0.0..=1.0).contains(&value));
        Self(value)
    }

    const fn lower_bound() -> Self {
        Self(0.0)
    }

    const fn upper_bound() -> Self {
        Self(1.0)
    }

    /// Returns `1 - self`.
    pub fn one_minus(self) -> Self {
        Self(1.0 - self.0)
    }
}

/// Representation of a non-negative time duration or timestamp, expressed in seconds.
#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Default, Clone, Copy, Debug, PartialEq, PartialOrd, Deserialize, Serialize)]
#[serde(try_from = "f64")]
pub struct NonNegativeSeconds(f64);

impl NonNegativeSeconds {
    pub(crate) fn new_unchecked(value: f64) -> Self {
        debug_assert!(value.is_finite());
        debug_assert!(value >= 0.0);
        Self(value)
    }

    const fn lower_bound() -> Self {
        Self(0.0)
    }

    const fn upper_bound() -> Self {
        Self(f64::MAX)
    }
}

impl fmt::Display for NonNegativeSeconds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let seconds = self.0.round() as u64;
        let hour = seconds / 3600;
        let minute = seconds % 3600 / 60;
        let second = seconds % 60;
        write!(f, "{hour:02}:{minute:02}:{second:02}")
    }
}

impl From<PositiveSeconds> for NonNegativeSeconds {
    fn from(value: PositiveSeconds) -> Self {
        Self(value.0)
    }
}

/// Representation of a positive time duration, expressed in seconds.
#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Default, Clone, Copy, Debug, PartialEq, PartialOrd, Deserialize, Serialize)]
#[serde(try_from = "f64")]
pub struct PositiveSeconds(f64);

impl PositiveSeconds {
    pub(crate) fn new_unchecked(value: f64) -> Self {
        debug_assert!(value.is_finite());
        debug_assert!(value > 0.0);
        Self(value)
    }

    const fn lower_bound() -> Self {
        Self(f64::MIN_POSITIVE)
    }

    const fn upper_bound() -> Self {
        Self(f64::MAX)
    }
}

impl fmt::Display for PositiveSeconds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}s", self.0)
    }
}

/// Representation of a non-negative distance, expressed in meters.
#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Default, Clone, Copy, Debug, PartialEq, PartialOrd, Deserialize, Serialize)]
#[serde(try_from = "f64")]
pub struct NonNegativeMeters(f64);

impl NonNegativeMeters {
    pub(crate) fn new_unchecked(value: f64) -> Self {
        debug_assert!(value.is_finite());
        debug_assert!(value >= 0.0);
        Self(value)
    }

    const fn lower_bound() -> Self {
        Self(0.0)
    }

    const fn upper_bound() -> Self {
        Self(f64::MAX)
    }
}

impl fmt::Display for NonNegativeMeters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}m", self.0)
    }
}

/// Representation of a positive speed, expressed in meters per second.
#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Default, Clone, Copy, Debug, PartialEq, PartialOrd, Deserialize, Serialize)]
#[serde(try_from = "f64")]
pub struct MetersPerSecond(f64);

impl MetersPerSecond {
    pub(crate) fn new_unchecked(value: f64) -> Self {
        debug_assert!(value.is_finite());
        debug_assert!(value > 0.0);
        Self(value)
    }

    const fn lower_bound() -> Self {
        Self(f64::MIN_POSITIVE)
    }

    const fn upper_bound() -> Self {
        Self(f64::MAX)
    }
}

impl fmt::Display for MetersPerSecond {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}m/s", self.0)
    }
}

impl_traits_on_positive_unit!(
    NonNegativeNum,
    PositiveNum,
    ZeroOneNum,
    NonNegativeSeconds,
    PositiveSeconds,
    NonNegativeMeters,
    MetersPerSecond
);

impl_traits_on_non_negative_unit!(NonNegativeNum, NonNegativeSeconds, NonNegativeMeters);

macro_rules! impl_ops(
    ( $l_type:ident * $r_type:ident = $o_type:ident ) => {
        impl Mul<$r_type> for $l_type {
            type Output = $o_type;
            fn mul(self, other: $r_type) -> Self::Output {
                $o_type(self.0 * other.0)
            }
        }
        impl Mul<$l_type> for $r_type {
            type Output = $o_type;
            fn mul(self, other: $l_type) -> Self::Output {
                $o_type(self.0 * other.0)
            }
        }
    };
    ( $l_type:ident / $r_type:ident = $o_type:ident ) => {
        impl Div<$r_type> for $l_type {
            type Output = $o_type;
            fn div(self, other: $r_type) -> Self::Output {
                $o_type(self.0 / other.0)
            }
        }
    };
    ( $l_type:ident + $r_type:ident = $o_type:ident ) => {
        impl Add<$r_type> for $l_type {
            type Output = $o_type;
            fn add(self, other: $r_type) -> Self::Output {
                $o_type(self.0 + other.0)
            }
        }
    };
);

impl_ops!(MetersPerSecond * PositiveSeconds = NonNegativeMeters);
impl_ops!(NonNegativeNum * ZeroOneNum = NonNegativeNum);
impl_ops!(NonNegativeMeters / MetersPerSecond = NonNegativeSeconds);
impl_ops!(NonNegativeSeconds / PositiveSeconds = NonNegativeNum);
impl_ops!(NonNegativeSeconds + PositiveSeconds = NonNegativeSeconds);

/// Struct to describe statistics on a distribution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Distribution<T> {
    mean: T,
    std: T,
    min: T,
    max: T,
}

impl Distribution<NonNegativeNum> {
    /// Returns a `Distribution` from an iterator of elements of the distribution.
    ///
    /// Returns `None` if the iterator is empty.
    pub fn from_iterator(iter: impl Iterator<Item = NonNegativeNum>) -> Option<Self> {
        let mut sum = 0.0;
        let mut sum_squared = 0.0;
        let mut min = NonNegativeNum::MAX;
        let mut max = NonNegativeNum::ZERO;
        let mut count = 0;
        for value in iter {
            sum += value.0;
            sum_squared += value.0.powi(2);
            min = min.min(value);
            max = max.max(value);
            count += 1;
        }
        if count == 0 {
            return None;
        }
        let mean = sum / count as f64;
        let var = sum_squared / count as f64 - mean.powi(2);
        // All values are equal but, because of roundings, var might be negative.
        let std = if var > 0.0 { var.sqrt() } else { 0.0 };
        Some(Distribution {
            mean: NonNegativeNum::new_unchecked(mean),
            std: NonNegativeNum::new_unchecked(std),
            min,
            max,
        })
    }
}

impl<T: Copy> Distribution<T> {
    /// Returns the mean of the distribution.
    pub const fn mean(&self) -> T {
        self.mean
    }

    /// Returns the standard-deviation of the distribution.
    pub const fn std(&self) -> T {
        self.std
    }

    /// Returns the minimum of the distribution.
    pub const fn min(&self) -> T {
        self.min
    }

    /// Returns the maximum of the distribution.
    pub const fn max(&self) -> T {
        self.max
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn try_from_test() {
        assert!(MetersPerSecond::try_from(0.0).is_err());
        assert!(MetersPerSecond::try_from(-1.0).is_err());
        assert!(MetersPerSecond::try_from(f64::NAN).is_err());
        assert_eq!(MetersPerSecond::try_from(10.0).unwrap().value(), 10.0);
        assert!(ZeroOneNum::try_from(1.5).is_err());
        assert!(NonNegativeSeconds::try_from(0.0).is_ok());
        assert!(PositiveSeconds::try_from(0.0).is_err());
    }

    #[test]
    fn ops_test() {
        let tt = NonNegativeMeters(1000.) / MetersPerSecond(25.);
        assert_eq!(tt, NonNegativeSeconds(40.));
        let ratio = NonNegativeSeconds(660.) / PositiveSeconds(600.);
        assert!((ratio.value() - 1.1).abs() < 1e-12);
        assert!((ratio.deviation_from_one().value() - 0.1).abs() < 1e-12);
        assert_eq!(
            NonNegativeSeconds(10.) + PositiveSeconds(5.),
            NonNegativeSeconds(15.)
        );
    }

    #[test]
    fn distribution_test() {
        let values = vec![
            NonNegativeNum(1.),
            NonNegativeNum(2.),
            NonNegativeNum(3.),
            NonNegativeNum(4.),
            NonNegativeNum(5.),
        ];
        let d = Distribution::from_iterator(values.into_iter()).unwrap();
        assert_eq!(d.mean(), NonNegativeNum(3.));
        assert!((d.std().value() - 2.0f64.sqrt()).abs() < 1e-12);
        assert_eq!(d.min(), NonNegativeNum(1.));
        assert_eq!(d.max(), NonNegativeNum(5.));
        assert!(Distribution::from_iterator(std::iter::empty()).is_none());
    }

    #[test]
    fn display_seconds_test() {
        assert_eq!(format!("{}", NonNegativeSeconds(3723.)), "01:02:03");
    }
}
