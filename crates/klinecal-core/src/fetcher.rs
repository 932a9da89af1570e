//! Paginated, rate-limited daily record acquisition.
//!
//! [`KlineFetcher::get_daily_records`] validates the request, clamps it to
//! the provider launch date, walks the provider's pages, and runs every raw
//! row through [`KlineRow`] validation. Row defects are logged and recorded
//! on the [`FetchOutcome`]; only request, transport, and response-shape
//! failures surface as [`SourceError`].

use std::sync::Arc;

use serde::Serialize;
use time::Date;
use tracing::{info, warn};

use crate::adapters::BinanceKlineSource;
use crate::config::FetchConfig;
use crate::data_source::{KlinePageRequest, KlineSource, SourceError};
use crate::kline::{open_time_of, KlineRow, RowDefect};
use crate::throttling::RateLimiter;
use crate::{DailyRecord, Symbol, TimeRange, ValidationError};

/// Why a fetch produced no records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyReason {
    /// The whole range predates the provider's first daily kline.
    BeforeProviderLaunch,
    /// The provider returned no rows for the range.
    NoDataInRange,
    /// Rows came back but every one failed validation.
    AllRowsRejected,
}

impl EmptyReason {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::BeforeProviderLaunch => "before_provider_launch",
            Self::NoDataInRange => "no_data_in_range",
            Self::AllRowsRejected => "all_rows_rejected",
        }
    }
}

/// Diagnostic for one dropped row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowDiagnostic {
    /// Position of the row across all pages, starting at zero.
    pub index: usize,
    pub open_time: Option<i64>,
    pub defect: RowDefect,
}

/// Result of one [`KlineFetcher::get_daily_records`] call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FetchOutcome {
    pub symbol: Symbol,
    pub requested: TimeRange,
    /// `requested` after clamping to the launch date.
    pub effective: Option<TimeRange>,
    pub records: Vec<DailyRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub empty_reason: Option<EmptyReason>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub dropped: Vec<RowDiagnostic>,
}

impl FetchOutcome {
    fn before_launch(symbol: Symbol, requested: TimeRange) -> Self {
        Self {
            symbol,
            requested,
            effective: None,
            records: Vec::new(),
            empty_reason: Some(EmptyReason::BeforeProviderLaunch),
            dropped: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Fetches validated daily records through a shared [`RateLimiter`].
#[derive(Clone)]
pub struct KlineFetcher {
    source: Arc<dyn KlineSource>,
    limiter: Arc<RateLimiter>,
    config: FetchConfig,
}

impl KlineFetcher {
    pub fn new(source: Arc<dyn KlineSource>, limiter: Arc<RateLimiter>) -> Self {
        Self {
            source,
            limiter,
            config: FetchConfig::default(),
        }
    }

    /// Fetcher over the live Binance REST API.
    pub fn binance(config: FetchConfig, limiter: Arc<RateLimiter>) -> Self {
        let source = Arc::new(BinanceKlineSource::from_config(&config));
        Self::new(source, limiter).with_config(config)
    }

    pub fn with_config(mut self, config: FetchConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    /// Fetches the ordered, validated daily records of `symbol` over `range`.
    ///
    /// # Errors
    ///
    /// - [`crate::SourceErrorKind::InvalidRequest`] for a malformed symbol, an
    ///   inverted range, or a range longer than the configured maximum, before
    ///   any network call or rate-limit slot.
    /// - Transport, upstream-status, and malformed-response errors from the
    ///   source, unchanged.
    pub async fn get_daily_records(
        &self,
        symbol: &str,
        range: TimeRange,
    ) -> Result<FetchOutcome, SourceError> {
        let symbol = Symbol::parse(symbol)?;
        let range = TimeRange::new(range.start, range.end)?;
        if range.days() > self.config.max_range_days {
            return Err(ValidationError::RangeTooLong {
                days: range.days(),
                max: self.config.max_range_days,
            }
            .into());
        }

        let Some(effective) = range.clamp_start(self.config.launch_date) else {
            info!(
                symbol = symbol.as_str(),
                %range,
                "range predates provider launch, skipping fetch"
            );
            return Ok(FetchOutcome::before_launch(symbol, range));
        };

        let mut collector = RowCollector::new(self.config.launch_date);
        let end_ms = effective.end_millis();
        let mut cursor = effective.start_millis();

        loop {
            self.limiter.wait_if_needed().await;
            let page =
                KlinePageRequest::new(symbol.clone(), cursor, end_ms, self.config.page_limit)?;
            let rows = self.source.daily_klines(page).await?;
            let page_len = rows.len();

            let mut last_open_time = None;
            for raw in &rows {
                if let Some(open_time) = open_time_of(raw) {
                    last_open_time = Some(open_time);
                }
                collector.push(raw);
            }

            if page_len < self.config.page_limit {
                break;
            }
            match last_open_time {
                Some(open_time) if open_time >= cursor && open_time + 1 < end_ms => {
                    cursor = open_time + 1;
                }
                _ => break,
            }
        }

        let outcome = collector.finish(symbol, range, effective);
        info!(
            symbol = outcome.symbol.as_str(),
            source = self.source.name(),
            kept = outcome.records.len(),
            dropped = outcome.dropped.len(),
            empty_reason = outcome.empty_reason.map(EmptyReason::as_str),
            "fetched daily records"
        );
        Ok(outcome)
    }
}

/// Accumulates validated records in arrival order.
struct RowCollector {
    launch_date: Date,
    seen: usize,
    records: Vec<DailyRecord>,
    dropped: Vec<RowDiagnostic>,
}

impl RowCollector {
    fn new(launch_date: Date) -> Self {
        Self {
            launch_date,
            seen: 0,
            records: Vec::new(),
            dropped: Vec::new(),
        }
    }

    fn push(&mut self, raw: &serde_json::Value) {
        let index = self.seen;
        self.seen += 1;

        match self.validate(raw) {
            Ok(record) => self.records.push(record),
            Err(defect) => {
                let open_time = open_time_of(raw);
                warn!(index, open_time, %defect, "dropping kline row");
                self.dropped.push(RowDiagnostic {
                    index,
                    open_time,
                    defect,
                });
            }
        }
    }

    fn validate(&self, raw: &serde_json::Value) -> Result<DailyRecord, RowDefect> {
        let record = KlineRow::parse(raw)?.into_record(self.launch_date)?;
        match self.records.last() {
            Some(previous) if record.date <= previous.date => Err(RowDefect::OutOfOrder {
                date: record.date.to_string(),
            }),
            _ => Ok(record),
        }
    }

    fn finish(self, symbol: Symbol, requested: TimeRange, effective: TimeRange) -> FetchOutcome {
        let empty_reason = match (self.records.is_empty(), self.seen) {
            (false, _) => None,
            (true, 0) => Some(EmptyReason::NoDataInRange),
            (true, _) => Some(EmptyReason::AllRowsRejected),
        };

        FetchOutcome {
            symbol,
            requested,
            effective: Some(effective),
            records: self.records,
            empty_reason,
            dropped: self.dropped,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use time::macros::date;

    #[test]
    fn collector_drops_duplicate_days_without_reordering() {
        let mut collector = RowCollector::new(date!(2017 - 07 - 14));
        // 2024-01-01, 2024-01-02, 2024-01-02 again, 2024-01-01 again
        let open_times = [
            1_704_067_200_000_i64,
            1_704_153_600_000,
            1_704_153_600_000,
            1_704_067_200_000,
        ];
        for open_time in open_times {
            collector.push(&json!([open_time, "1", "2", "1", "1.5", "10"]));
        }

        let range = TimeRange::new(date!(2024 - 01 - 01), date!(2024 - 01 - 02)).expect("valid");
        let symbol = Symbol::parse("BTCUSDT").expect("valid");
        let outcome = collector.finish(symbol, range, range);

        let dates: Vec<_> = outcome.records.iter().map(|r| r.date).collect();
        assert_eq!(dates, vec![date!(2024 - 01 - 01), date!(2024 - 01 - 02)]);
        assert_eq!(outcome.dropped.len(), 2);
        assert_eq!(outcome.dropped[0].index, 2);
        assert!(matches!(outcome.dropped[0].defect, RowDefect::OutOfOrder { .. }));
        assert_eq!(outcome.empty_reason, None);
    }

    #[test]
    fn collector_reports_all_rows_rejected() {
        let mut collector = RowCollector::new(date!(2017 - 07 - 14));
        collector.push(&json!(["garbage"]));

        let range = TimeRange::new(date!(2024 - 01 - 01), date!(2024 - 01 - 01)).expect("valid");
        let symbol = Symbol::parse("ETHUSDT").expect("valid");
        let outcome = collector.finish(symbol, range, range);

        assert!(outcome.is_empty());
        assert_eq!(outcome.empty_reason, Some(EmptyReason::AllRowsRejected));
    }
}
