//! Validated monetary values.
//!
//! Money is handled as [Decimal] at the edges and persisted as integer minor
//! units (cents), which lets the database apply totals as atomic deltas.

use std::{fmt::Display, str::FromStr};

use rust_decimal::{Decimal, prelude::ToPrimitive};
use serde::{Deserialize, Serialize, Serializer};

use crate::Error;

/// The number of decimal places kept for monetary values.
pub const MINOR_UNIT_SCALE: u32 = 2;

/// The largest amount or limit accepted, in minor units, i.e. one trillion.
///
/// Keeps single values far enough below `i64::MAX` that totals can absorb many
/// of them before the database refuses the sum.
pub const MAX_MINOR_UNITS: i64 = 100_000_000_000_000;

/// Convert `value` to minor units, or `None` if it has too many decimal
/// places or does not fit in an `i64`.
pub(crate) fn to_minor_units(value: Decimal) -> Option<i64> {
    let normalized = value.normalize();
    if normalized.scale() > MINOR_UNIT_SCALE {
        return None;
    }

    normalized.checked_mul(Decimal::ONE_HUNDRED)?.to_i64()
}

/// Convert minor units read from the database back into a decimal.
pub(crate) fn from_minor_units(units: i64) -> Decimal {
    Decimal::new(units, MINOR_UNIT_SCALE)
}

/// A strictly positive amount of money, e.g. the value of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Amount {
    minor_units: i64,
}

impl Amount {
    /// Create an amount from a decimal value.
    ///
    /// # Errors
    /// Returns [Error::InvalidAmount] if `value` is not greater than zero, is
    /// larger than [MAX_MINOR_UNITS] or has more than two decimal places.
    pub fn new(value: Decimal) -> Result<Self, Error> {
        match to_minor_units(value) {
            Some(minor_units) if (1..=MAX_MINOR_UNITS).contains(&minor_units) => {
                Ok(Self { minor_units })
            }
            _ => Err(Error::InvalidAmount(value.to_string())),
        }
    }

    /// Create an amount from minor units stored in the database.
    pub(crate) fn from_minor_units(minor_units: i64) -> Self {
        Self { minor_units }
    }

    /// The amount as a decimal number.
    pub fn value(&self) -> Decimal {
        from_minor_units(self.minor_units)
    }

    /// The amount in minor units (cents).
    pub fn minor_units(&self) -> i64 {
        self.minor_units
    }
}

impl FromStr for Amount {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = parse_decimal(s).ok_or_else(|| Error::InvalidAmount(s.to_owned()))?;

        Amount::new(value)
    }
}

impl TryFrom<NumberInput> for Amount {
    type Error = Error;

    fn try_from(input: NumberInput) -> Result<Self, Self::Error> {
        input.to_string().parse()
    }
}

impl Display for Amount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.value().fmt(f)
    }
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        Serialize::serialize(&self.value(), serializer)
    }
}

/// A non-negative spending limit for one period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct SpendingLimit {
    minor_units: i64,
}

impl SpendingLimit {
    /// Create a limit from a decimal value.
    ///
    /// # Errors
    /// Returns [Error::InvalidLimit] if `value` is negative, is larger than
    /// [MAX_MINOR_UNITS] or has more than two decimal places.
    pub fn new(value: Decimal) -> Result<Self, Error> {
        match to_minor_units(value) {
            Some(minor_units) if (0..=MAX_MINOR_UNITS).contains(&minor_units) => {
                Ok(Self { minor_units })
            }
            _ => Err(Error::InvalidLimit(value.to_string())),
        }
    }

    /// The limit as a decimal number.
    pub fn value(&self) -> Decimal {
        from_minor_units(self.minor_units)
    }

    /// The limit in minor units (cents).
    pub fn minor_units(&self) -> i64 {
        self.minor_units
    }
}

impl FromStr for SpendingLimit {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = parse_decimal(s).ok_or_else(|| Error::InvalidLimit(s.to_owned()))?;

        SpendingLimit::new(value)
    }
}

impl TryFrom<NumberInput> for SpendingLimit {
    type Error = Error;

    fn try_from(input: NumberInput) -> Result<Self, Self::Error> {
        input.to_string().parse()
    }
}

/// A number as supplied by a client, either a JSON number or a string
/// containing one.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum NumberInput {
    /// A JSON number, e.g. `12.5`.
    Number(serde_json::Number),
    /// A string, e.g. `"12.50"`.
    Text(String),
}

impl Display for NumberInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NumberInput::Number(number) => number.fmt(f),
            NumberInput::Text(text) => text.fmt(f),
        }
    }
}

/// Parse plain (`12.50`) or scientific (`1.25e1`) notation.
fn parse_decimal(text: &str) -> Option<Decimal> {
    let text = text.trim();

    Decimal::from_str(text)
        .or_else(|_| Decimal::from_scientific(text))
        .ok()
}
