//! Threshold alerts evaluated against the latest daily record.
//!
//! An alert fires at most once: after it triggers it stays latched until
//! [`Alert::reset`] or an enable/disable transition clears it. Notification
//! is best effort; a failing [`AlertNotifier`] is logged and never turns into
//! an evaluation error.

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{DailyRecord, UtcDateTime};

/// Volume alerts compare against volume in millions of base units.
pub const VOLUME_UNIT: f64 = 1_000_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertMetric {
    Volatility,
    Performance,
    Volume,
}

impl AlertMetric {
    /// Value compared against the threshold for `record`.
    pub fn measure(self, record: &DailyRecord) -> f64 {
        match self {
            Self::Volatility => record.volatility,
            Self::Performance => record.absolute_performance(),
            Self::Volume => record.volume / VOLUME_UNIT,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Volatility => "volatility",
            Self::Performance => "performance",
            Self::Volume => "volume",
        }
    }
}

impl Display for AlertMetric {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertCondition {
    Above,
    Below,
}

impl AlertCondition {
    /// Strict comparison; a value equal to the threshold never matches.
    pub fn matches(self, value: f64, threshold: f64) -> bool {
        match self {
            Self::Above => value > threshold,
            Self::Below => value < threshold,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Above => "above",
            Self::Below => "below",
        }
    }
}

impl Display for AlertCondition {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: Uuid,
    pub metric: AlertMetric,
    pub condition: AlertCondition,
    pub threshold: f64,
    pub enabled: bool,
    pub triggered: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_triggered_at: Option<UtcDateTime>,
}

impl Alert {
    pub fn new(metric: AlertMetric, condition: AlertCondition, threshold: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            metric,
            condition,
            threshold,
            enabled: true,
            triggered: false,
            last_triggered_at: None,
        }
    }

    /// Clears the latch so the alert can fire again.
    pub fn reset(&mut self) {
        self.triggered = false;
    }

    /// Changing the enabled state also clears the latch.
    pub fn set_enabled(&mut self, enabled: bool) {
        if self.enabled != enabled {
            self.enabled = enabled;
            self.triggered = false;
        }
    }

    /// `true` when the alert is armed and `record` crosses its threshold.
    pub fn should_fire(&self, record: &DailyRecord) -> bool {
        self.enabled
            && !self.triggered
            && self
                .condition
                .matches(self.metric.measure(record), self.threshold)
    }
}

impl Display for Alert {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} {}", self.metric, self.condition, self.threshold)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("alert notification failed: {message}")]
pub struct NotifyError {
    message: String,
}

impl NotifyError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Side-effect hook invoked once per newly fired alert.
pub trait AlertNotifier: Send + Sync {
    fn notify(&self, alert: &Alert, value: f64, record: &DailyRecord) -> Result<(), NotifyError>;
}

/// Writes fired alerts to the `tracing` pipeline.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl AlertNotifier for TracingNotifier {
    fn notify(&self, alert: &Alert, value: f64, record: &DailyRecord) -> Result<(), NotifyError> {
        info!(
            alert_id = %alert.id,
            metric = alert.metric.as_str(),
            condition = alert.condition.as_str(),
            threshold = alert.threshold,
            value,
            date = %record.date,
            "alert triggered"
        );
        Ok(())
    }
}

/// [`evaluate_alerts_at`] stamped with the current time.
pub fn evaluate_alerts(
    latest: &DailyRecord,
    alerts: &[Alert],
    notifier: &dyn AlertNotifier,
) -> Vec<Alert> {
    evaluate_alerts_at(latest, alerts, notifier, UtcDateTime::now())
}

/// Returns the updated alert list; alerts that fire are latched and stamped with `now`.
pub fn evaluate_alerts_at(
    latest: &DailyRecord,
    alerts: &[Alert],
    notifier: &dyn AlertNotifier,
    now: UtcDateTime,
) -> Vec<Alert> {
    alerts
        .iter()
        .map(|alert| {
            if !alert.should_fire(latest) {
                return alert.clone();
            }

            let mut fired = alert.clone();
            fired.triggered = true;
            fired.last_triggered_at = Some(now);

            let value = fired.metric.measure(latest);
            if let Err(error) = notifier.notify(&fired, value, latest) {
                warn!(alert_id = %fired.id, %error, "alert notification dropped");
            }
            fired
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    fn record(open: f64, close: f64, volume: f64) -> DailyRecord {
        let high = open.max(close) * 1.01;
        let low = open.min(close) * 0.99;
        DailyRecord::new(date!(2024 - 05 - 01), open, high, low, close, volume).expect("valid")
    }

    #[test]
    fn performance_is_compared_by_magnitude() {
        let falling = record(100.0, 95.0, 1.0);
        assert!((AlertMetric::Performance.measure(&falling) - 5.0).abs() < 1e-9);
    }

    #[test]
    fn volume_is_measured_in_millions() {
        let busy = record(100.0, 100.0, 2_500_000.0);
        assert!((AlertMetric::Volume.measure(&busy) - 2.5).abs() < 1e-9);
    }

    #[test]
    fn conditions_are_strict() {
        assert!(!AlertCondition::Above.matches(2.0, 2.0));
        assert!(!AlertCondition::Below.matches(2.0, 2.0));
        assert!(AlertCondition::Below.matches(1.9, 2.0));
    }

    #[test]
    fn toggling_enabled_clears_the_latch() {
        let mut alert = Alert::new(AlertMetric::Volatility, AlertCondition::Above, 1.0);
        alert.triggered = true;

        alert.set_enabled(true);
        assert!(alert.triggered, "no state change keeps the latch");

        alert.set_enabled(false);
        assert!(!alert.triggered);
        assert!(!alert.enabled);
    }

    #[test]
    fn disabled_alerts_never_fire() {
        let mut alert = Alert::new(AlertMetric::Volatility, AlertCondition::Above, 0.0);
        alert.set_enabled(false);
        assert!(!alert.should_fire(&record(100.0, 110.0, 1.0)));
    }

    #[test]
    fn alert_serializes_snake_case_tags() {
        let alert = Alert::new(AlertMetric::Performance, AlertCondition::Below, 3.0);
        let json = serde_json::to_value(&alert).expect("serialize");
        assert_eq!(json["metric"], "performance");
        assert_eq!(json["condition"], "below");
        assert!(json.get("last_triggered_at").is_none());
    }
}
