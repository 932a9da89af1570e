//! # klinecal-core
//!
//! Daily crypto kline pipeline behind the klinecal calendar views.
//!
//! ## Overview
//!
//! - **Acquisition**: paginated, rate-limited daily candles from the Binance REST API
//! - **Validation**: malformed or inconsistent rows are dropped with a diagnostic
//! - **Volatility**: raw intraday range blended with a trailing rolling deviation
//! - **Aggregation**: week and month buckets with cross-bucket comparison
//! - **Patterns**: heuristic detectors over an accumulated history
//! - **Alerts**: latched threshold alerts with a notification hook
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`adapters`] | Provider adapters (Binance) |
//! | [`aggregate`] | Week/month buckets and bucket comparison |
//! | [`alerts`] | Alert rules, evaluation, and notifiers |
//! | [`config`] | Fetch configuration and provider constants |
//! | [`data_source`] | Kline source trait and page requests |
//! | [`domain`] | Domain models (DailyRecord, TimeRange, Symbol) |
//! | [`error`] | Core error types |
//! | [`fetcher`] | Record acquisition with outcome diagnostics |
//! | [`http_client`] | HTTP client abstraction |
//! | [`kline`] | Raw kline row parsing and validation |
//! | [`patterns`] | Heuristic pattern detectors |
//! | [`throttling`] | Sliding-window rate limiting |
//! | [`volatility`] | Blended volatility enhancement |
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use klinecal_core::{
//!     detect_patterns, enhance_volatility, FetchConfig, KlineFetcher, RateLimiter, TimeRange,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let limiter = Arc::new(RateLimiter::default());
//!     let fetcher = KlineFetcher::binance(FetchConfig::from_env(), limiter);
//!
//!     let range = TimeRange::parse_month("2024-03")?;
//!     let outcome = fetcher.get_daily_records("BTCUSDT", range).await?;
//!     let records = enhance_volatility(&outcome.records);
//!
//!     for pattern in detect_patterns(&records) {
//!         println!("{} ({:.0}%)", pattern.name, pattern.confidence);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────────┐   ┌──────────────────┐
//! │ KlineFetcher │──▶│  RateLimiter │   │  BinanceKline-   │
//! │              │──────────────────────▶│  Source          │
//! └──────┬───────┘   └──────────────┘   └──────────────────┘
//!        │ Vec<DailyRecord>
//!        ▼
//! ┌──────────────────────┐
//! │ enhance_volatility   │
//! └──────┬───────────────┘
//!        ├──────────────▶ aggregate / compare_buckets
//!        ├──────────────▶ detect_patterns
//!        └──────────────▶ evaluate_alerts
//! ```

pub mod adapters;
pub mod aggregate;
pub mod alerts;
pub mod config;
pub mod data_source;
pub mod domain;
pub mod error;
pub mod fetcher;
pub mod http_client;
pub mod kline;
pub mod patterns;
pub mod throttling;
pub mod volatility;

pub use adapters::BinanceKlineSource;
pub use aggregate::{aggregate, compare_buckets, Bucket, BucketComparison, PartitionScheme};
pub use alerts::{
    evaluate_alerts, evaluate_alerts_at, Alert, AlertCondition, AlertMetric, AlertNotifier,
    NotifyError, TracingNotifier,
};
pub use config::{FetchConfig, MAX_RANGE_DAYS, PROVIDER_LAUNCH_DATE};
pub use data_source::{KlinePageRequest, KlineSource, SourceError, SourceErrorKind};
pub use domain::{parse_date, DailyRecord, Symbol, TimeRange, UtcDateTime};
pub use error::ValidationError;
pub use fetcher::{EmptyReason, FetchOutcome, KlineFetcher, RowDiagnostic};
pub use http_client::{HttpClient, HttpError, HttpRequest, HttpResponse, ReqwestHttpClient};
pub use kline::RowDefect;
pub use patterns::{detect_patterns, Pattern, PatternKind, Severity, MIN_PATTERN_HISTORY};
pub use throttling::{RateLimitPolicy, RateLimiter};
pub use volatility::{enhance_volatility, enhance_volatility_with, VolatilityConfig};
