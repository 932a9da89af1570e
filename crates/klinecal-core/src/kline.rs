//! Positional kline rows and the row-level validation pipeline.
//!
//! Wire layout, one JSON array per day:
//!
//! ```text
//! [openTime, open, high, low, close, volume, closeTime, quoteVolume,
//!  tradeCount, takerBuyBase, takerBuyQuote, ignore]
//! ```
//!
//! Prices and volume arrive as decimal strings; plain JSON numbers are
//! accepted too. Only the first six fields are read.

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use time::Date;

use crate::{DailyRecord, UtcDateTime, ValidationError};

const MIN_ROW_FIELDS: usize = 6;

/// Why a raw row was dropped. Row defects never fail a fetch.
#[derive(Debug, Error, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RowDefect {
    #[error("malformed row: {reason}")]
    Malformed { reason: String },
    #[error("field '{field}' is not numeric")]
    NonNumeric { field: &'static str },
    #[error("price field '{field}' must be strictly positive")]
    NonPositivePrice { field: &'static str },
    #[error("volume must be non-negative")]
    NegativeVolume,
    #[error("open time is missing, non-positive, or out of range")]
    InvalidTimestamp,
    #[error("price relationship violated: {reason}")]
    PriceRelationship { reason: String },
    #[error("day {date} precedes provider launch")]
    BeforeLaunch { date: String },
    #[error("day {date} is not after the previous accepted day")]
    OutOfOrder { date: String },
}

/// Numeric candidate fields of one raw row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KlineRow {
    pub open_time: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl KlineRow {
    /// Extracts numeric fields from a raw positional row.
    pub fn parse(raw: &Value) -> Result<Self, RowDefect> {
        let fields = raw.as_array().ok_or_else(|| RowDefect::Malformed {
            reason: String::from("row is not an array"),
        })?;
        if fields.len() < MIN_ROW_FIELDS {
            return Err(RowDefect::Malformed {
                reason: format!("expected at least {MIN_ROW_FIELDS} fields, got {}", fields.len()),
            });
        }

        let open_time = parse_millis(&fields[0]).ok_or(RowDefect::InvalidTimestamp)?;
        if open_time <= 0 {
            return Err(RowDefect::InvalidTimestamp);
        }

        Ok(Self {
            open_time,
            open: parse_price("open", &fields[1])?,
            high: parse_price("high", &fields[2])?,
            low: parse_price("low", &fields[3])?,
            close: parse_price("close", &fields[4])?,
            volume: parse_volume(&fields[5])?,
        })
    }

    /// UTC day the row opens on.
    pub fn date(&self) -> Result<Date, RowDefect> {
        UtcDateTime::from_unix_millis(self.open_time)
            .map(UtcDateTime::date)
            .map_err(|_| RowDefect::InvalidTimestamp)
    }

    /// Applies the price and launch-date checks and builds the record.
    pub fn into_record(self, launch_date: Date) -> Result<DailyRecord, RowDefect> {
        let date = self.date()?;
        if date < launch_date {
            return Err(RowDefect::BeforeLaunch {
                date: date.to_string(),
            });
        }

        DailyRecord::new(date, self.open, self.high, self.low, self.close, self.volume).map_err(
            |error| match error {
                ValidationError::HighBelowBody | ValidationError::LowAboveBody => {
                    RowDefect::PriceRelationship {
                        reason: error.to_string(),
                    }
                }
                other => RowDefect::Malformed {
                    reason: other.to_string(),
                },
            },
        )
    }
}

/// Best-effort open time of a raw row, used to advance pagination even past
/// rows that fail validation.
pub fn open_time_of(raw: &Value) -> Option<i64> {
    raw.as_array()
        .and_then(|fields| fields.first())
        .and_then(parse_millis)
}

fn parse_millis(value: &Value) -> Option<i64> {
    match value {
        Value::Number(number) => number.as_i64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

fn parse_number(field: &'static str, value: &Value) -> Result<f64, RowDefect> {
    let parsed = match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    };
    match parsed {
        Some(number) if number.is_finite() => Ok(number),
        _ => Err(RowDefect::NonNumeric { field }),
    }
}

fn parse_price(field: &'static str, value: &Value) -> Result<f64, RowDefect> {
    let price = parse_number(field, value)?;
    if price <= 0.0 {
        return Err(RowDefect::NonPositivePrice { field });
    }
    Ok(price)
}

fn parse_volume(value: &Value) -> Result<f64, RowDefect> {
    let volume = parse_number("volume", value)?;
    if volume < 0.0 {
        return Err(RowDefect::NegativeVolume);
    }
    Ok(volume)
}
