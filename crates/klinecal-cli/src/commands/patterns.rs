use std::collections::BTreeMap;

use klinecal_core::{
    detect_patterns, enhance_volatility, DailyRecord, KlineFetcher, Pattern, TimeRange,
    MIN_PATTERN_HISTORY,
};
use serde_json::json;
use time::Date;

use crate::cli::PatternsArgs;
use crate::error::CliError;
use crate::output::Table;

use super::{fetch_warnings, CommandResult};

pub async fn run(args: &PatternsArgs, fetcher: &KlineFetcher) -> Result<CommandResult, CliError> {
    let current_range = TimeRange::parse_month(&args.month)?;
    let history_range = current_range.preceding_months(args.history_months)?;

    let mut warnings = Vec::new();
    let mut history = Vec::new();
    if let Some(range) = history_range {
        let outcome = fetcher.get_daily_records(&args.symbol, range).await?;
        warnings.extend(fetch_warnings(&outcome));
        history = outcome.records;
    }
    let current = fetcher.get_daily_records(&args.symbol, current_range).await?;
    warnings.extend(fetch_warnings(&current));

    let combined = merge_by_date(history, current.records);
    if combined.len() < MIN_PATTERN_HISTORY {
        warnings.push(format!(
            "pattern detection needs at least {MIN_PATTERN_HISTORY} days, have {}",
            combined.len()
        ));
    }

    let enhanced = enhance_volatility(&combined);
    let patterns = detect_patterns(&enhanced);

    let data = json!({
        "symbol": current.symbol,
        "month": current_range,
        "history": history_range,
        "days_analyzed": enhanced.len(),
        "patterns": patterns,
    });

    Ok(CommandResult::ok(data)
        .with_table(patterns_table(&patterns))
        .with_warnings(warnings))
}

/// Concatenates history and current records, keeping the current record for
/// any day present in both.
fn merge_by_date(history: Vec<DailyRecord>, current: Vec<DailyRecord>) -> Vec<DailyRecord> {
    let mut by_date: BTreeMap<Date, DailyRecord> = BTreeMap::new();
    for record in history.into_iter().chain(current) {
        by_date.insert(record.date, record);
    }
    by_date.into_values().collect()
}

fn patterns_table(patterns: &[Pattern]) -> Table {
    let mut table = Table::new(vec![
        "pattern", "type", "severity", "confidence", "occurrences", "avg_impact",
    ]);
    for pattern in patterns {
        table.push_row(vec![
            pattern.name.clone(),
            pattern.kind.as_str().to_owned(),
            pattern.severity.as_str().to_owned(),
            format!("{:.1}", pattern.confidence),
            pattern.occurrences.to_string(),
            format!("{:.2}", pattern.avg_impact),
        ]);
    }
    table
}
