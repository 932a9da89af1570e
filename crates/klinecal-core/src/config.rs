use time::macros::date;
use time::Date;
use tracing::warn;

use crate::data_source::MAX_PAGE_LIMIT;

pub const DEFAULT_BASE_URL: &str = "https://api.binance.com";
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;

/// First day the provider has daily klines for.
pub const PROVIDER_LAUNCH_DATE: Date = date!(2017 - 07 - 14);

/// Longest range accepted by a single fetch.
pub const MAX_RANGE_DAYS: i64 = 1000;

pub const BASE_URL_ENV: &str = "KLINECAL_BASE_URL";
pub const TIMEOUT_ENV: &str = "KLINECAL_TIMEOUT_MS";

/// Fetch-side settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchConfig {
    pub base_url: String,
    pub timeout_ms: u64,
    pub page_limit: usize,
    pub launch_date: Date,
    pub max_range_days: i64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            base_url: String::from(DEFAULT_BASE_URL),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            page_limit: MAX_PAGE_LIMIT,
            launch_date: PROVIDER_LAUNCH_DATE,
            max_range_days: MAX_RANGE_DAYS,
        }
    }
}

impl FetchConfig {
    /// Defaults overridden by `KLINECAL_BASE_URL` and `KLINECAL_TIMEOUT_MS`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(base_url) = lookup(BASE_URL_ENV) {
            let base_url = base_url.trim().trim_end_matches('/');
            if base_url.starts_with("http://") || base_url.starts_with("https://") {
                config.base_url = base_url.to_owned();
            } else {
                warn!(value = base_url, "ignoring {BASE_URL_ENV}: not an http(s) url");
            }
        }

        if let Some(raw) = lookup(TIMEOUT_ENV) {
            match raw.trim().parse::<u64>() {
                Ok(timeout_ms) if timeout_ms > 0 => config.timeout_ms = timeout_ms,
                _ => warn!(value = raw.as_str(), "ignoring {TIMEOUT_ENV}: not a positive integer"),
            }
        }

        config
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_owned();
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn with_page_limit(mut self, page_limit: usize) -> Self {
        self.page_limit = page_limit;
        self
    }

    pub fn with_launch_date(mut self, launch_date: Date) -> Self {
        self.launch_date = launch_date;
        self
    }
}
