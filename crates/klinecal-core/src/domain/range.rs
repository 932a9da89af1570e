use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use time::{Date, Duration, Month};

use super::iso_date;
use crate::{UtcDateTime, ValidationError};

/// Inclusive span of UTC calendar days.
///
/// Deserialization goes through [`TimeRange::new`], so `start <= end` holds
/// for every decoded range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RangeBounds")]
pub struct TimeRange {
    #[serde(with = "iso_date")]
    pub start: Date,
    #[serde(with = "iso_date")]
    pub end: Date,
}

#[derive(Deserialize)]
struct RangeBounds {
    #[serde(with = "iso_date")]
    start: Date,
    #[serde(with = "iso_date")]
    end: Date,
}

impl TryFrom<RangeBounds> for TimeRange {
    type Error = ValidationError;

    fn try_from(bounds: RangeBounds) -> Result<Self, Self::Error> {
        Self::new(bounds.start, bounds.end)
    }
}

impl TimeRange {
    pub fn new(start: Date, end: Date) -> Result<Self, ValidationError> {
        if start > end {
            return Err(ValidationError::InvertedRange {
                start: start.to_string(),
                end: end.to_string(),
            });
        }
        Ok(Self { start, end })
    }

    /// The full calendar month `year`-`month`.
    pub fn month(year: i32, month: Month) -> Result<Self, ValidationError> {
        let invalid = || ValidationError::InvalidMonth {
            value: format!("{year:04}-{:02}", u8::from(month)),
        };
        let start = Date::from_calendar_date(year, month, 1).map_err(|_| invalid())?;
        let end =
            Date::from_calendar_date(year, month, month.length(year)).map_err(|_| invalid())?;
        Ok(Self { start, end })
    }

    /// Parses a `YYYY-MM` key into the month it names.
    pub fn parse_month(key: &str) -> Result<Self, ValidationError> {
        let invalid = || ValidationError::InvalidMonth {
            value: key.to_owned(),
        };
        let (year, month) = key.trim().split_once('-').ok_or_else(invalid)?;
        if year.len() != 4 || month.len() != 2 {
            return Err(invalid());
        }
        let year: i32 = year.parse().map_err(|_| invalid())?;
        let month: u8 = month.parse().map_err(|_| invalid())?;
        let month = Month::try_from(month).map_err(|_| invalid())?;
        Self::month(year, month)
    }

    /// Number of calendar days covered, both ends included.
    pub fn days(&self) -> i64 {
        (self.end - self.start).whole_days() + 1
    }

    pub fn contains(&self, date: Date) -> bool {
        self.start <= date && date <= self.end
    }

    /// Raises `start` to `floor`; `None` when the whole range lies before it.
    pub fn clamp_start(&self, floor: Date) -> Option<Self> {
        if self.end < floor {
            return None;
        }
        Some(Self {
            start: self.start.max(floor),
            end: self.end,
        })
    }

    /// First instant of the range in epoch milliseconds.
    pub fn start_millis(&self) -> i64 {
        UtcDateTime::start_of_day(self.start).unix_millis()
    }

    /// Last instant of the range in epoch milliseconds.
    pub fn end_millis(&self) -> i64 {
        UtcDateTime::end_of_day(self.end).unix_millis()
    }

    /// Range covering the `count` months that precede this range's first month.
    pub fn preceding_months(&self, count: u8) -> Result<Option<Self>, ValidationError> {
        if count == 0 {
            return Ok(None);
        }
        let end = self.start - Duration::days(1);
        let mut year = self.start.year();
        let mut month = self.start.month();
        for _ in 0..count {
            if month == Month::January {
                year -= 1;
            }
            month = month.previous();
        }
        let start = Self::month(year, month)?.start;
        Self::new(start, end).map(Some)
    }
}

impl Display for TimeRange {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}..={}", self.start, self.end)
    }
}
