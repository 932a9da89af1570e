//! Blended daily + rolling volatility.
//!
//! Each record's `volatility` is replaced by
//! `daily_weight * raw + rolling_weight * rolling`, where `raw` is the
//! record's incoming volatility and `rolling` is the population standard
//! deviation of close-to-close returns over a trailing window, in percent.

use crate::domain::non_negative_or_zero;
use crate::DailyRecord;

pub const VOLATILITY_WINDOW: usize = 7;
pub const DAILY_WEIGHT: f64 = 0.6;
pub const ROLLING_WEIGHT: f64 = 0.4;

/// Window size and blend weights for [`enhance_volatility_with`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VolatilityConfig {
    pub window: usize,
    pub daily_weight: f64,
    pub rolling_weight: f64,
}

impl Default for VolatilityConfig {
    fn default() -> Self {
        Self {
            window: VOLATILITY_WINDOW,
            daily_weight: DAILY_WEIGHT,
            rolling_weight: ROLLING_WEIGHT,
        }
    }
}

/// [`enhance_volatility_with`] using the default 7-day window and 0.6/0.4 blend.
pub fn enhance_volatility(records: &[DailyRecord]) -> Vec<DailyRecord> {
    enhance_volatility_with(records, &VolatilityConfig::default())
}

/// Returns a same-length copy with every `volatility` replaced by the blend.
///
/// Sequences shorter than two records come back unchanged. A window with
/// fewer than two positive closes keeps the record's own volatility,
/// floored at zero.
pub fn enhance_volatility_with(
    records: &[DailyRecord],
    config: &VolatilityConfig,
) -> Vec<DailyRecord> {
    if records.len() < 2 {
        return records.to_vec();
    }

    let window = config.window.max(1);
    records
        .iter()
        .enumerate()
        .map(|(index, record)| {
            let start = (index + 1).saturating_sub(window);
            let closes: Vec<f64> = records[start..=index]
                .iter()
                .map(|r| r.close)
                .filter(|close| close.is_finite() && *close > 0.0)
                .collect();

            let raw = non_negative_or_zero(record.volatility);
            if closes.len() < 2 {
                return record.clone().with_volatility(raw);
            }

            let rolling = non_negative_or_zero(rolling_volatility(&closes));
            let blended = config.daily_weight * raw + config.rolling_weight * rolling;
            record.clone().with_volatility(blended)
        })
        .collect()
}

/// Population standard deviation of consecutive returns, as a percentage.
fn rolling_volatility(closes: &[f64]) -> f64 {
    let returns: Vec<f64> = closes
        .windows(2)
        .map(|pair| (pair[1] - pair[0]) / pair[0])
        .collect();

    let n = returns.len() as f64;
    let mean = returns.iter().sum::<f64>() / n;
    let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n;
    variance.sqrt() * 100.0
}
