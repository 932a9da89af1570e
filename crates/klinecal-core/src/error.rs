use thiserror::Error;

/// Validation and contract errors exposed by `klinecal-core`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("symbol cannot be empty")]
    EmptySymbol,
    #[error("symbol '{value}' must match [A-Z]{{2,10}}USDT?")]
    InvalidSymbol { value: String },

    #[error("timestamp must be RFC3339 UTC (suffix Z): '{value}'")]
    TimestampNotUtc { value: String },
    #[error("epoch milliseconds {value} are out of range")]
    TimestampOutOfRange { value: i64 },

    #[error("time range start {start} is after end {end}")]
    InvertedRange { start: String, end: String },
    #[error("time range spans {days} days, max is {max}")]
    RangeTooLong { days: i64, max: i64 },
    #[error("date must be YYYY-MM-DD: '{value}'")]
    InvalidDate { value: String },
    #[error("month key must be YYYY-MM: '{value}'")]
    InvalidMonth { value: String },

    #[error("field '{field}' must be finite")]
    NonFiniteValue { field: &'static str },
    #[error("field '{field}' must be non-negative")]
    NegativeValue { field: &'static str },
    #[error("field '{field}' must be strictly positive")]
    NonPositiveValue { field: &'static str },

    #[error("record high must be >= max(open, close)")]
    HighBelowBody,
    #[error("record low must be <= min(open, close)")]
    LowAboveBody,
}
