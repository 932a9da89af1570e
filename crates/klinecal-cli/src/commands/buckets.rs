use klinecal_core::{
    aggregate, compare_buckets, Bucket, KlineFetcher, PartitionScheme, TimeRange,
};
use serde_json::json;

use crate::cli::BucketsArgs;
use crate::error::CliError;
use crate::output::Table;

use super::{fetch_enhanced, format_pct, CommandResult};

pub async fn run(args: &BucketsArgs, fetcher: &KlineFetcher) -> Result<CommandResult, CliError> {
    let (scheme, granularity) = scheme_for(args)?;
    let view = view_range(&scheme);

    let fetched = fetch_enhanced(fetcher, &args.symbol, view).await?;
    let buckets = aggregate(&fetched.records, &scheme);
    let comparison = compare_buckets(&buckets);

    let data = json!({
        "symbol": fetched.outcome.symbol,
        "granularity": granularity,
        "view": view,
        "buckets": buckets,
        "comparison": comparison,
    });

    Ok(CommandResult::ok(data)
        .with_table(buckets_table(&buckets))
        .with_warnings(fetched.warnings))
}

fn scheme_for(args: &BucketsArgs) -> Result<(PartitionScheme, &'static str), CliError> {
    match (&args.month, args.year) {
        (Some(month), _) => {
            let range = TimeRange::parse_month(month)?;
            Ok((PartitionScheme::Weekly(range), "weekly"))
        }
        (None, Some(year)) => Ok((PartitionScheme::year_view(year)?, "monthly")),
        (None, None) => Err(CliError::Command(String::from(
            "either --month or --year is required",
        ))),
    }
}

fn view_range(scheme: &PartitionScheme) -> TimeRange {
    match *scheme {
        PartitionScheme::Weekly(view) | PartitionScheme::Monthly(view) => view,
    }
}

fn buckets_table(buckets: &[Bucket]) -> Table {
    let mut table = Table::new(vec![
        "bucket", "start", "end", "days", "return", "avg_volatility", "volume",
    ]);
    for bucket in buckets {
        table.push_row(vec![
            bucket.key.clone(),
            bucket.start.to_string(),
            bucket.end.to_string(),
            bucket.records.len().to_string(),
            format_pct(bucket.period_return * 100.0),
            format_pct(bucket.avg_volatility),
            format!("{:.2}", bucket.total_volume),
        ]);
    }
    table
}
