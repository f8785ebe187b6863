//! Calendar month labels used to key archive entries, e.g. "2025-10".

use std::{fmt::Display, str::FromStr};

use rusqlite::{
    ToSql,
    types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef},
};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use time::{Date, Month};

use crate::Error;

/// A calendar month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PeriodLabel {
    year: i32,
    month: u8,
}

impl PeriodLabel {
    /// Create the label for `month` of `year`.
    pub const fn new(year: i32, month: Month) -> Self {
        Self {
            year,
            month: month as u8,
        }
    }

    /// The label of the month that contains `date`.
    pub fn containing(date: Date) -> Self {
        Self::new(date.year(), date.month())
    }

    /// The calendar year.
    pub fn year(&self) -> i32 {
        self.year
    }

    /// The calendar month.
    pub fn month(&self) -> Month {
        // `month` is always in 1..=12, see `new` and `from_str`.
        Month::try_from(self.month).unwrap_or(Month::January)
    }

    /// The month before this one.
    pub fn previous(&self) -> Self {
        Self::new(
            if self.month == 1 { self.year - 1 } else { self.year },
            self.month().previous(),
        )
    }

    /// The month after this one.
    pub fn next(&self) -> Self {
        Self::new(
            if self.month == 12 { self.year + 1 } else { self.year },
            self.month().next(),
        )
    }

    /// The first day of the month.
    ///
    /// # Errors
    /// Returns [Error::InvalidPeriod] if the year is outside the range that
    /// [Date] supports.
    pub fn first_day(&self) -> Result<Date, Error> {
        Date::from_calendar_date(self.year, self.month(), 1)
            .map_err(|_| Error::InvalidPeriod(self.to_string()))
    }
}

impl Display for PeriodLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for PeriodLabel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || Error::InvalidPeriod(s.to_owned());

        let (year, month) = s.trim().split_once('-').ok_or_else(invalid)?;
        if year.len() != 4 || month.len() != 2 {
            return Err(invalid());
        }

        let year: i32 = year.parse().map_err(|_| invalid())?;
        let month: u8 = month.parse().map_err(|_| invalid())?;
        let month = Month::try_from(month).map_err(|_| invalid())?;

        Ok(Self::new(year, month))
    }
}

impl Serialize for PeriodLabel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for PeriodLabel {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;

        text.parse().map_err(serde::de::Error::custom)
    }
}

impl ToSql for PeriodLabel {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(self.to_string().into())
    }
}

impl FromSql for PeriodLabel {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|error: Error| FromSqlError::Other(Box::new(error)))
    }
}
