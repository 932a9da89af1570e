use serde::{Deserialize, Serialize};
use time::Date;

use super::iso_date;
use crate::ValidationError;

/// One UTC trading day for one symbol.
///
/// Construction through [`DailyRecord::new`] enforces positive prices,
/// non-negative volume, and `low <= min(open, close) <= max(open, close) <= high`.
/// `volatility` starts as the raw intraday range and may later be replaced by
/// [`crate::volatility::enhance_volatility`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyRecord {
    #[serde(with = "iso_date")]
    pub date: Date,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub volatility: f64,
}

impl DailyRecord {
    pub fn new(
        date: Date,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
    ) -> Result<Self, ValidationError> {
        validate_positive("open", open)?;
        validate_positive("high", high)?;
        validate_positive("low", low)?;
        validate_positive("close", close)?;
        validate_non_negative("volume", volume)?;

        if high < open.max(close) {
            return Err(ValidationError::HighBelowBody);
        }
        if low > open.min(close) {
            return Err(ValidationError::LowAboveBody);
        }

        let mut record = Self {
            date,
            open,
            high,
            low,
            close,
            volume,
            volatility: 0.0,
        };
        record.volatility = record.intraday_range();
        Ok(record)
    }

    /// Returns a copy carrying `volatility`, floored at zero.
    pub fn with_volatility(mut self, volatility: f64) -> Self {
        self.volatility = non_negative_or_zero(volatility);
        self
    }

    /// `(high - low) / open` as a percentage, floored at zero.
    pub fn intraday_range(&self) -> f64 {
        non_negative_or_zero((self.high - self.low) / self.open * 100.0)
    }

    /// Signed open-to-close return as a percentage.
    pub fn performance(&self) -> f64 {
        if self.open == 0.0 {
            return 0.0;
        }
        (self.close - self.open) / self.open * 100.0
    }

    pub fn absolute_performance(&self) -> f64 {
        self.performance().abs()
    }
}

/// Clamps NaN, infinities, and negatives to zero.
pub(crate) fn non_negative_or_zero(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}

fn validate_positive(field: &'static str, value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() {
        return Err(ValidationError::NonFiniteValue { field });
    }
    if value <= 0.0 {
        return Err(ValidationError::NonPositiveValue { field });
    }
    Ok(())
}

fn validate_non_negative(field: &'static str, value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() {
        return Err(ValidationError::NonFiniteValue { field });
    }
    if value < 0.0 {
        return Err(ValidationError::NegativeValue { field });
    }
    Ok(())
}
