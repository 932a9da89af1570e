use klinecal_core::{parse_date, DailyRecord, KlineFetcher, TimeRange};
use serde_json::json;

use crate::cli::DaysArgs;
use crate::error::CliError;
use crate::output::Table;

use super::{fetch_enhanced, format_pct, format_price, CommandResult};

pub async fn run(args: &DaysArgs, fetcher: &KlineFetcher) -> Result<CommandResult, CliError> {
    let range = requested_range(args)?;
    let fetched = fetch_enhanced(fetcher, &args.symbol, range).await?;
    let outcome = &fetched.outcome;

    let data = json!({
        "symbol": outcome.symbol,
        "requested": outcome.requested,
        "effective": outcome.effective,
        "empty_reason": outcome.empty_reason,
        "records": fetched.records,
    });

    Ok(CommandResult::ok(data)
        .with_table(records_table(&fetched.records))
        .with_warnings(fetched.warnings))
}

fn requested_range(args: &DaysArgs) -> Result<TimeRange, CliError> {
    match (&args.month, &args.from, &args.to) {
        (Some(month), _, _) => Ok(TimeRange::parse_month(month)?),
        (None, Some(from), Some(to)) => Ok(TimeRange::new(parse_date(from)?, parse_date(to)?)?),
        _ => Err(CliError::Command(String::from(
            "either --month or both --from and --to are required",
        ))),
    }
}

fn records_table(records: &[DailyRecord]) -> Table {
    let mut table = Table::new(vec![
        "date", "open", "high", "low", "close", "volume", "change", "volatility",
    ]);
    for record in records {
        table.push_row(vec![
            record.date.to_string(),
            format_price(record.open),
            format_price(record.high),
            format_price(record.low),
            format_price(record.close),
            format!("{:.2}", record.volume),
            format_pct(record.performance()),
            format_pct(record.volatility),
        ]);
    }
    table
}
