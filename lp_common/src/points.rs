use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, AddAssign, Neg, Sub, SubAssign},
};

use serde::{Deserialize, Serialize};
use sqlx::Type;
use thiserror::Error;

use crate::op;

/// The number of `Points` units that make up one whole bonus point.
pub const POINTS_SCALE: i64 = 100;

//--------------------------------------       Points        ---------------------------------------------------------
/// A fixed-point amount of bonus points, stored as hundredths of a point.
///
/// The accrual service and the public API speak in decimal numbers (e.g. `729.98`), so `Points` (de)serializes as a
/// JSON number, while the database stores the raw integer value.
#[derive(Debug, Clone, Copy, Default, Type, PartialEq, Eq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(try_from = "f64", into = "f64")]
pub struct Points(i64);

op!(binary Points, Add, add);
op!(binary Points, Sub, sub);
op!(inplace Points, AddAssign, add_assign);
op!(inplace Points, SubAssign, sub_assign);
op!(unary Points, Neg, neg);

impl Sum for Points {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

#[derive(Debug, Clone, Error)]
#[error("Value cannot be represented as points: {0}")]
pub struct PointsConversionError(String);

impl From<i64> for Points {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl TryFrom<f64> for Points {
    type Error = PointsConversionError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        if !value.is_finite() {
            return Err(PointsConversionError(format!("{value} is not a finite number")));
        }
        if value < 0.0 {
            return Err(PointsConversionError(format!("{value} is negative")));
        }
        let scaled = (value * POINTS_SCALE as f64).round();
        if scaled > i64::MAX as f64 {
            return Err(PointsConversionError(format!("{value} is too large")));
        }
        #[allow(clippy::cast_possible_truncation)]
        Ok(Self(scaled as i64))
    }
}

impl From<Points> for f64 {
    fn from(value: Points) -> Self {
        value.0 as f64 / POINTS_SCALE as f64
    }
}

impl Display for Points {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let scale = POINTS_SCALE.unsigned_abs();
        write!(f, "{sign}{}.{:02}pts", abs / scale, abs % scale)
    }
}

impl Points {
    pub fn value(&self) -> i64 {
        self.0
    }

    pub fn from_whole(points: i64) -> Self {
        Self(points * POINTS_SCALE)
    }

    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }
}
