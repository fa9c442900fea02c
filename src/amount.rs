use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Fixed-point money value with 2 decimal places, stored as a scaled integer.
///
/// Serialized as a plain JSON number so stored files stay human-editable.
/// Numbers that do not fit are rejected on the way in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Amount(i64);

impl Amount {
    const SCALE: i64 = 100;

    pub const ZERO: Amount = Amount(0);

    /// Round to cents. `None` for NaN, infinities and values outside the `i64` range.
    pub fn try_from_float(value: f64) -> Option<Self> {
        let scaled = (value * Self::SCALE as f64).round();
        // `i64::MAX as f64` is 2^63, one past the largest representable value
        if scaled.is_finite() && scaled >= i64::MIN as f64 && scaled < i64::MAX as f64 {
            Some(Amount(scaled as i64))
        } else {
            None
        }
    }

    pub fn from_scaled(value: i64) -> Self {
        Amount(value)
    }

    pub fn to_float(self) -> f64 {
        self.0 as f64 / Self::SCALE as f64
    }

    pub fn is_negative(self) -> bool {
        self.0 < 0
    }

    pub fn is_positive(self) -> bool {
        self.0 > 0
    }

    /// `self * quantity`, or `None` on overflow.
    pub fn checked_mul(self, quantity: u32) -> Option<Self> {
        self.0.checked_mul(i64::from(quantity)).map(Amount)
    }

    pub fn checked_add(self, rhs: Self) -> Option<Self> {
        self.0.checked_add(rhs.0).map(Amount)
    }
}

#[cfg(test)]
impl Amount {
    pub(crate) fn from_float(value: f64) -> Self {
        Amount::try_from_float(value).expect("amount out of range")
    }

    /// Whole currency units, e.g. `Amount::from_units(2000)` is `2000.00`.
    pub(crate) fn from_units(units: i64) -> Self {
        Amount(units.checked_mul(Self::SCALE).expect("amount out of range"))
    }
}

#[derive(Debug, Error, PartialEq)]
#[error("'{0}' is not a valid amount")]
pub struct ParseAmountError(String);

impl TryFrom<f64> for Amount {
    type Error = ParseAmountError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Amount::try_from_float(value).ok_or_else(|| ParseAmountError(value.to_string()))
    }
}

impl From<Amount> for f64 {
    fn from(value: Amount) -> Self {
        value.to_float()
    }
}

impl FromStr for Amount {
    type Err = ParseAmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        trimmed
            .parse::<f64>()
            .ok()
            .and_then(Amount::try_from_float)
            .ok_or_else(|| ParseAmountError(trimmed.to_string()))
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let whole = abs / Self::SCALE as u64;
        let frac = abs % Self::SCALE as u64;
        write!(f, "{sign}{whole}.{frac:02}")
    }
}

impl std::ops::SubAssign for Amount {
    fn sub_assign(&mut self, rhs: Self) {
        self.0 -= rhs.0;
    }
}
