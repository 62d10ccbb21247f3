use std::{
    fmt,
    ops::{Add, AddAssign},
    str::FromStr,
};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::EngineError;

/// Non-negative taka amount represented as **integer poisha** (1/100 BDT).
///
/// Every monetary value the engine handles (amounts, fees, balances, expense
/// counters) goes through this type so nothing is ever stored as a float.
///
/// # Examples
///
/// ```rust
/// use engine::Money;
///
/// let amount: Money = "1,022.94".parse().unwrap();
/// assert_eq!(amount.minor(), 102_294);
/// assert_eq!(amount.to_string(), "1022.94");
/// ```
///
/// Signs and more than two decimals are rejected:
///
/// ```rust
/// use engine::Money;
///
/// assert!("-5.00".parse::<Money>().is_err());
/// assert!("12.345".parse::<Money>().is_err());
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);

    /// Creates an amount from poisha. Negative input is clamped to zero.
    #[must_use]
    pub const fn from_minor(minor: i64) -> Self {
        if minor < 0 { Self(0) } else { Self(minor) }
    }

    /// Returns the raw value in poisha.
    #[must_use]
    pub const fn minor(self) -> i64 {
        self.0
    }

    /// Saturating addition, used by the expense counters.
    #[must_use]
    pub fn saturating_add(self, rhs: Money) -> Money {
        Money(self.0.saturating_add(rhs.0))
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Self::Output {
        self.saturating_add(rhs)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Money) {
        *self = self.saturating_add(rhs);
    }
}

impl FromStr for Money {
    type Err = EngineError;

    /// Parses a decimal string into poisha.
    ///
    /// Validation rules:
    /// - `,` is a thousands separator and is dropped (`1,000.00`)
    /// - `.` is the decimal separator, max 2 fractional digits
    /// - no sign, no empty strings
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || EngineError::InvalidAmount(format!("invalid amount: {s:?}"));
        let overflow = || EngineError::InvalidAmount(format!("amount too large: {s:?}"));

        let cleaned: String = s.trim().chars().filter(|c| *c != ',').collect();
        if cleaned.is_empty() {
            return Err(EngineError::InvalidAmount("empty amount".to_string()));
        }

        let (whole, frac) = match cleaned.split_once('.') {
            Some((whole, frac)) => (whole, frac),
            None => (cleaned.as_str(), ""),
        };

        if whole.is_empty() || !whole.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }
        if !frac.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }

        let frac_minor: i64 = match frac.len() {
            0 => 0,
            1 => frac.parse::<i64>().map_err(|_| invalid())? * 10,
            2 => frac.parse::<i64>().map_err(|_| invalid())?,
            _ => return Err(EngineError::InvalidAmount(format!("too many decimals: {s:?}"))),
        };

        let whole: i64 = whole.parse().map_err(|_| overflow())?;
        let total = whole
            .checked_mul(100)
            .and_then(|v| v.checked_add(frac_minor))
            .ok_or_else(overflow)?;

        Ok(Money(total))
    }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
