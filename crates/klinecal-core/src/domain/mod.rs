//! # Domain Models
//!
//! Value objects shared by every stage of the pipeline.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`DailyRecord`] | One validated UTC trading day (OHLCV + volatility) |
//! | [`TimeRange`] | Inclusive span of calendar days |
//! | [`Symbol`] | Validated USD-quoted pair (`BTCUSDT`) |
//! | [`UtcDateTime`] | UTC timestamp |
//!
//! All types enforce their invariants at construction time and serialize
//! dates as `YYYY-MM-DD`.

mod range;
mod record;
mod symbol;
mod timestamp;

pub use range::TimeRange;
pub use record::DailyRecord;
pub(crate) use record::non_negative_or_zero;
pub use symbol::Symbol;
pub use timestamp::UtcDateTime;

/// Serde adapter writing [`time::Date`] as `YYYY-MM-DD`.
pub(crate) mod iso_date {
    use serde::de::Error as DeError;
    use serde::ser::Error as SerError;
    use serde::{Deserialize, Deserializer, Serializer};
    use time::format_description::BorrowedFormatItem;
    use time::macros::format_description;
    use time::Date;

    const FORMAT: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day]");

    pub fn serialize<S>(date: &Date, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let formatted = date.format(FORMAT).map_err(S::Error::custom)?;
        serializer.serialize_str(&formatted)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Date, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        parse(&value).map_err(D::Error::custom)
    }

    pub fn parse(value: &str) -> Result<Date, time::error::Parse> {
        Date::parse(value.trim(), FORMAT)
    }
}

/// Parses a `YYYY-MM-DD` day.
pub fn parse_date(value: &str) -> Result<time::Date, crate::ValidationError> {
    iso_date::parse(value).map_err(|_| crate::ValidationError::InvalidDate {
        value: value.to_owned(),
    })
}
