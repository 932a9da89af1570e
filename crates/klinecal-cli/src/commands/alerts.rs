use klinecal_core::{
    evaluate_alerts, Alert, AlertMetric, KlineFetcher, TimeRange, TracingNotifier, UtcDateTime,
};
use serde_json::json;
use time::Duration;
use uuid::Uuid;

use crate::alert_store::AlertStore;
use crate::cli::{AlertCommand, AlertsArgs};
use crate::error::CliError;
use crate::output::Table;

use super::{fetch_enhanced, format_pct, CommandResult};

/// Trailing days fetched to find the latest record.
const LATEST_LOOKBACK_DAYS: i64 = 7;

pub async fn run(args: &AlertsArgs, fetcher: &KlineFetcher) -> Result<CommandResult, CliError> {
    let store = AlertStore::new(&args.file);
    let mut alerts = store.load()?;

    match &args.command {
        AlertCommand::Add {
            metric,
            condition,
            threshold,
        } => {
            if !threshold.is_finite() {
                return Err(CliError::Command(String::from("threshold must be a finite number")));
            }
            let alert = Alert::new((*metric).into(), (*condition).into(), *threshold);
            alerts.push(alert.clone());
            store.save(&alerts)?;
            Ok(listing(&store, &alerts, json!({ "added": alert })))
        }
        AlertCommand::List => Ok(listing(&store, &alerts, json!({}))),
        AlertCommand::Remove { id } => {
            let before = alerts.len();
            alerts.retain(|alert| alert.id != *id);
            if alerts.len() == before {
                return Err(unknown_alert(*id));
            }
            store.save(&alerts)?;
            Ok(listing(&store, &alerts, json!({ "removed": id })))
        }
        AlertCommand::Reset { id } => {
            find_mut(&mut alerts, *id)?.reset();
            store.save(&alerts)?;
            Ok(listing(&store, &alerts, json!({ "reset": id })))
        }
        AlertCommand::Enable { id } | AlertCommand::Disable { id } => {
            let enabled = matches!(args.command, AlertCommand::Enable { .. });
            find_mut(&mut alerts, *id)?.set_enabled(enabled);
            store.save(&alerts)?;
            Ok(listing(&store, &alerts, json!({ "updated": id, "enabled": enabled })))
        }
        AlertCommand::Check { symbol } => check(&store, alerts, symbol, fetcher).await,
    }
}

async fn check(
    store: &AlertStore,
    alerts: Vec<Alert>,
    symbol: &str,
    fetcher: &KlineFetcher,
) -> Result<CommandResult, CliError> {
    let today = UtcDateTime::now().date();
    let range = TimeRange::new(today - Duration::days(LATEST_LOOKBACK_DAYS - 1), today)?;
    let fetched = fetch_enhanced(fetcher, symbol, range).await?;

    let Some(latest) = fetched.records.last() else {
        return Err(CliError::Command(format!(
            "no daily records for {symbol} in the last {LATEST_LOOKBACK_DAYS} days"
        )));
    };

    let evaluated = evaluate_alerts(latest, &alerts, &TracingNotifier);
    let fired: Vec<Uuid> = evaluated
        .iter()
        .zip(&alerts)
        .filter(|(after, before)| after.triggered && !before.triggered)
        .map(|(after, _)| after.id)
        .collect();
    store.save(&evaluated)?;

    let mut result = listing(
        store,
        &evaluated,
        json!({ "symbol": fetched.outcome.symbol, "latest": latest, "fired": fired }),
    );
    result.warnings.extend(fetched.warnings);
    Ok(result)
}

fn find_mut(alerts: &mut [Alert], id: Uuid) -> Result<&mut Alert, CliError> {
    alerts
        .iter_mut()
        .find(|alert| alert.id == id)
        .ok_or_else(|| unknown_alert(id))
}

fn unknown_alert(id: Uuid) -> CliError {
    CliError::Command(format!("no alert with id {id}"))
}

/// Result carrying the full alert list next to command-specific fields.
fn listing(store: &AlertStore, alerts: &[Alert], mut data: serde_json::Value) -> CommandResult {
    if let Some(fields) = data.as_object_mut() {
        fields.insert(String::from("file"), json!(store.path().display().to_string()));
        fields.insert(String::from("alerts"), json!(alerts));
    }
    CommandResult::ok(data).with_table(alerts_table(alerts))
}

fn alerts_table(alerts: &[Alert]) -> Table {
    let mut table = Table::new(vec![
        "id", "metric", "condition", "threshold", "enabled", "triggered", "last_triggered_at",
    ]);
    for alert in alerts {
        let threshold = match alert.metric {
            AlertMetric::Volume => format!("{}M", alert.threshold),
            _ => format_pct(alert.threshold),
        };
        table.push_row(vec![
            alert.id.to_string(),
            alert.metric.as_str().to_owned(),
            alert.condition.as_str().to_owned(),
            threshold,
            alert.enabled.to_string(),
            alert.triggered.to_string(),
            alert
                .last_triggered_at
                .map(|at| at.to_string())
                .unwrap_or_else(|| String::from("-")),
        ]);
    }
    table
}
