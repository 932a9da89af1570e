//! CLI argument definitions for klinecal.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `days` | Fetch enhanced daily records for a month or date range |
//! | `buckets` | Weekly buckets for a month, or monthly buckets for a year |
//! | `patterns` | Detect patterns over a month plus preceding history |
//! | `alerts` | Manage threshold alerts and check them against the latest day |
//!
//! # Global Options
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `--format` | `json` | Output format (json, table) |
//! | `--pretty` | `false` | Pretty-print JSON output |
//! | `--strict` | `false` | Treat warnings as errors |
//! | `--base-url` | env / `https://api.binance.com` | Provider REST endpoint |
//! | `--timeout-ms` | env / `10000` | Per-request timeout in ms |
//! | `--verbose` | `false` | Debug-level logs on stderr |
//!
//! # Examples
//!
//! ```bash
//! klinecal days BTCUSDT --month 2024-03 --pretty
//! klinecal buckets ETHUSDT --year 2023 --format table
//! klinecal patterns BTCUSDT --month 2024-03 --history-months 3
//! klinecal alerts add volatility above 4.5
//! klinecal alerts check BTCUSDT
//! ```

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use klinecal_core::{AlertCondition, AlertMetric};
use uuid::Uuid;

/// Daily crypto kline calendar data from the command line
#[derive(Debug, Parser)]
#[command(
    name = "klinecal",
    author,
    version,
    about = "Daily crypto kline calendar data",
    long_about = "klinecal fetches daily candles for USD-quoted crypto pairs, validates them, \
blends a rolling volatility metric, and derives calendar buckets, heuristic patterns, \
and threshold alerts.\n\
\n\
Use 'klinecal <command> --help' for command-specific help."
)]
pub struct Cli {
    /// Output format for results.
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Json)]
    pub format: OutputFormat,

    /// Pretty-print JSON output with indentation.
    #[arg(long, global = true, default_value_t = false)]
    pub pretty: bool,

    /// Treat warnings as failures (exit code 5).
    #[arg(long, global = true, default_value_t = false)]
    pub strict: bool,

    /// Provider REST base URL; overrides KLINECAL_BASE_URL.
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    /// Per-request timeout in milliseconds; overrides KLINECAL_TIMEOUT_MS.
    #[arg(long, global = true)]
    pub timeout_ms: Option<u64>,

    /// Log at debug level (RUST_LOG still wins when set).
    #[arg(long, short, global = true, default_value_t = false)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Aligned columns for terminal display.
    Table,
    /// Single JSON envelope.
    Json,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fetch validated daily records with blended volatility.
    Days(DaysArgs),
    /// Aggregate daily records into calendar buckets.
    Buckets(BucketsArgs),
    /// Detect heuristic patterns over recent history.
    Patterns(PatternsArgs),
    /// Manage and check threshold alerts.
    Alerts(AlertsArgs),
}

#[derive(Debug, Args)]
pub struct DaysArgs {
    /// Trading pair, e.g. BTCUSDT.
    pub symbol: String,

    /// Calendar month as YYYY-MM.
    #[arg(long, conflicts_with_all = ["from", "to"], required_unless_present_all = ["from", "to"])]
    pub month: Option<String>,

    /// First day as YYYY-MM-DD.
    #[arg(long, requires = "to")]
    pub from: Option<String>,

    /// Last day as YYYY-MM-DD.
    #[arg(long, requires = "from")]
    pub to: Option<String>,
}

#[derive(Debug, Args)]
pub struct BucketsArgs {
    /// Trading pair, e.g. BTCUSDT.
    pub symbol: String,

    /// Weekly buckets for this month (YYYY-MM).
    #[arg(long, conflicts_with = "year", required_unless_present = "year")]
    pub month: Option<String>,

    /// Monthly buckets for this year.
    #[arg(long)]
    pub year: Option<i32>,
}

#[derive(Debug, Args)]
pub struct PatternsArgs {
    /// Trading pair, e.g. BTCUSDT.
    pub symbol: String,

    /// Current month as YYYY-MM.
    #[arg(long)]
    pub month: String,

    /// Months of history fetched before the current month.
    #[arg(long, default_value_t = 3)]
    pub history_months: u8,
}

#[derive(Debug, Args)]
pub struct AlertsArgs {
    /// Alert store location.
    #[arg(long, default_value = "alerts.json")]
    pub file: PathBuf,

    #[command(subcommand)]
    pub command: AlertCommand,
}

#[derive(Debug, Subcommand)]
pub enum AlertCommand {
    /// Create an enabled alert.
    Add {
        #[arg(value_enum)]
        metric: MetricArg,
        #[arg(value_enum)]
        condition: ConditionArg,
        /// Percent for volatility/performance, millions for volume.
        threshold: f64,
    },
    /// List stored alerts.
    List,
    /// Delete an alert.
    Remove { id: Uuid },
    /// Clear an alert's triggered latch.
    Reset { id: Uuid },
    /// Enable an alert (clears its latch).
    Enable { id: Uuid },
    /// Disable an alert (clears its latch).
    Disable { id: Uuid },
    /// Evaluate all alerts against the symbol's latest daily record.
    Check {
        /// Trading pair, e.g. BTCUSDT.
        symbol: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum MetricArg {
    Volatility,
    Performance,
    Volume,
}

impl From<MetricArg> for AlertMetric {
    fn from(value: MetricArg) -> Self {
        match value {
            MetricArg::Volatility => Self::Volatility,
            MetricArg::Performance => Self::Performance,
            MetricArg::Volume => Self::Volume,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ConditionArg {
    Above,
    Below,
}

impl From<ConditionArg> for AlertCondition {
    fn from(value: ConditionArg) -> Self {
        match value {
            ConditionArg::Above => Self::Above,
            ConditionArg::Below => Self::Below,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn days_requires_month_or_full_range() {
        assert!(Cli::try_parse_from(["klinecal", "days", "BTCUSDT"]).is_err());
        assert!(
            Cli::try_parse_from(["klinecal", "days", "BTCUSDT", "--from", "2024-01-01"]).is_err()
        );
        assert!(Cli::try_parse_from([
            "klinecal", "days", "BTCUSDT", "--month", "2024-01", "--from", "2024-01-01", "--to",
            "2024-01-05",
        ])
        .is_err());

        let cli = Cli::try_parse_from([
            "klinecal", "days", "BTCUSDT", "--from", "2024-01-01", "--to", "2024-01-05",
        ])
        .expect("range form parses");
        assert!(matches!(cli.command, Command::Days(DaysArgs { month: None, .. })));
    }

    #[test]
    fn global_flags_follow_the_subcommand() {
        let cli = Cli::try_parse_from([
            "klinecal", "buckets", "ETHUSDT", "--year", "2023", "--format", "table", "--strict",
        ])
        .expect("valid");
        assert_eq!(cli.format, OutputFormat::Table);
        assert!(cli.strict);
    }

    #[test]
    fn alert_add_parses_enums() {
        let cli = Cli::try_parse_from(["klinecal", "alerts", "add", "volume", "below", "1.5"])
            .expect("valid");
        let Command::Alerts(args) = cli.command else {
            panic!("expected alerts command");
        };
        assert_eq!(args.file, PathBuf::from("alerts.json"));
        assert!(matches!(
            args.command,
            AlertCommand::Add {
                metric: MetricArg::Volume,
                condition: ConditionArg::Below,
                ..
            }
        ));
    }
}
