use crate::error::{FichaFinanceiraError, Result};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// A calendar month of a specific year, the time axis of every ledger series.
///
/// Ordering is chronological: by year first, then month. Rendered as `MM/YYYY`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Period {
    year: i32,
    month: u32,
}

impl Period {
    pub fn new(year: i32, month: u32) -> Result<Self> {
        if !(1..=12).contains(&month) {
            return Err(FichaFinanceiraError::InvalidPeriod(format!(
                "month {} out of range 1..=12 (year {})",
                month, year
            )));
        }
        Ok(Self { year, month })
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn next(&self) -> Self {
        if self.month == 12 {
            Self {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }

    /// Every period from `start` to `end`, both inclusive. Empty when `end < start`.
    pub fn range(start: Period, end: Period) -> Vec<Period> {
        let mut periods = Vec::new();
        let mut current = start;
        while current <= end {
            periods.push(current);
            current = current.next();
        }
        periods
    }

    pub fn is_within(&self, start: Option<Period>, end: Option<Period>) -> bool {
        if let Some(start) = start {
            if *self < start {
                return false;
            }
        }
        if let Some(end) = end {
            if *self > end {
                return false;
            }
        }
        true
    }
}

impl From<NaiveDate> for Period {
    fn from(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}/{:04}", self.month, self.year)
    }
}

/// Accepts `MM/YYYY` (the rendered form) and `YYYY-MM`.
impl FromStr for Period {
    type Err = FichaFinanceiraError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let invalid = || {
            FichaFinanceiraError::InvalidPeriod(format!(
                "'{}'. Expected MM/YYYY or YYYY-MM",
                s
            ))
        };

        let (year, month) = if let Some((month, year)) = s.split_once('/') {
            (year, month)
        } else if let Some((year, month)) = s.split_once('-') {
            (year, month)
        } else {
            return Err(invalid());
        };

        if year.len() != 4 || month.is_empty() || month.len() > 2 {
            return Err(invalid());
        }

        let year: i32 = year.parse().map_err(|_| invalid())?;
        let month: u32 = month.parse().map_err(|_| invalid())?;
        Period::new(year, month)
    }
}

impl Serialize for Period {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Period {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
