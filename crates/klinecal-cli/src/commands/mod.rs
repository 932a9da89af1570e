mod alerts;
mod buckets;
mod days;
mod patterns;

use std::sync::Arc;
use std::time::Instant;

use klinecal_core::{
    enhance_volatility, DailyRecord, FetchConfig, FetchOutcome, KlineFetcher, RateLimiter,
    TimeRange,
};
use serde_json::Value;

use crate::cli::{Cli, Command};
use crate::error::CliError;
use crate::output::{Envelope, EnvelopeMeta, Table};

#[derive(Debug)]
pub struct CommandResult {
    pub data: Value,
    pub warnings: Vec<String>,
    pub table: Option<Table>,
}

impl CommandResult {
    pub fn ok(data: Value) -> Self {
        Self {
            data,
            warnings: Vec::new(),
            table: None,
        }
    }

    pub fn with_warnings(mut self, warnings: Vec<String>) -> Self {
        self.warnings.extend(warnings);
        self
    }

    pub fn with_table(mut self, table: Table) -> Self {
        self.table = Some(table);
        self
    }
}

pub async fn run(cli: &Cli) -> Result<Envelope, CliError> {
    let started = Instant::now();
    let fetcher = build_fetcher(cli);

    let command_result = match &cli.command {
        Command::Days(args) => days::run(args, &fetcher).await?,
        Command::Buckets(args) => buckets::run(args, &fetcher).await?,
        Command::Patterns(args) => patterns::run(args, &fetcher).await?,
        Command::Alerts(args) => alerts::run(args, &fetcher).await?,
    };

    let CommandResult {
        data,
        warnings,
        table,
    } = command_result;

    let latency_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
    let mut meta = EnvelopeMeta::new(latency_ms);
    for warning in warnings {
        meta.push_warning(warning);
    }

    Ok(Envelope { meta, data, table })
}

fn build_fetcher(cli: &Cli) -> KlineFetcher {
    let mut config = FetchConfig::from_env();
    if let Some(base_url) = &cli.base_url {
        config = config.with_base_url(base_url.as_str());
    }
    if let Some(timeout_ms) = cli.timeout_ms {
        config = config.with_timeout_ms(timeout_ms);
    }

    KlineFetcher::binance(config, Arc::new(RateLimiter::default()))
}

/// Fetched records after volatility enhancement, plus the fetch diagnostics
/// rendered as warnings.
struct EnhancedFetch {
    outcome: FetchOutcome,
    records: Vec<DailyRecord>,
    warnings: Vec<String>,
}

async fn fetch_enhanced(
    fetcher: &KlineFetcher,
    symbol: &str,
    range: TimeRange,
) -> Result<EnhancedFetch, CliError> {
    let outcome = fetcher.get_daily_records(symbol, range).await?;
    let records = enhance_volatility(&outcome.records);
    let warnings = fetch_warnings(&outcome);

    Ok(EnhancedFetch {
        outcome,
        records,
        warnings,
    })
}

fn fetch_warnings(outcome: &FetchOutcome) -> Vec<String> {
    let mut warnings: Vec<String> = outcome
        .dropped
        .iter()
        .map(|diagnostic| format!("dropped row {}: {}", diagnostic.index, diagnostic.defect))
        .collect();

    if let Some(reason) = outcome.empty_reason {
        warnings.push(format!(
            "no records for {} in {}: {}",
            outcome.symbol,
            outcome.requested,
            reason.as_str()
        ));
    }
    if let Some(effective) = outcome.effective.filter(|e| e.start != outcome.requested.start) {
        warnings.push(format!(
            "range start raised to {} (provider launch)",
            effective.start
        ));
    }

    warnings
}

fn format_pct(value: f64) -> String {
    format!("{value:.2}%")
}

fn format_price(value: f64) -> String {
    format!("{value:.4}")
}
