//! Heuristic pattern detectors over a daily record history.
//!
//! Every detector is a pure function over the full snapshot it is given and
//! contributes zero or one [`Pattern`] (the month-period detector may emit up
//! to three). Confidence scaling constants are fixed heuristics.

use serde::{Deserialize, Serialize};

use crate::DailyRecord;

/// Histories shorter than this produce no patterns.
pub const MIN_PATTERN_HISTORY: usize = 30;

/// Volatility (percent) above which a day counts as volatile.
pub const HIGH_VOLATILITY_PCT: f64 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternKind {
    Weekly,
    Monthly,
    Volatility,
    Volume,
    Anomaly,
}

impl PatternKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::Volatility => "volatility",
            Self::Volume => "volume",
            Self::Anomaly => "anomaly",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

/// One detected tendency in the history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pattern {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: PatternKind,
    pub name: String,
    pub description: String,
    /// In `[0, 100]`.
    pub confidence: f64,
    pub occurrences: usize,
    pub avg_impact: f64,
    pub severity: Severity,
}

/// Runs every detector and returns the patterns ordered by descending confidence.
///
/// The caller owns deduplication of concatenated history windows.
pub fn detect_patterns(records: &[DailyRecord]) -> Vec<Pattern> {
    if records.len() < MIN_PATTERN_HISTORY {
        return Vec::new();
    }

    let mut patterns = Vec::new();
    patterns.extend(detect_weekday_volatility(records));
    patterns.extend(detect_month_periods(records));
    patterns.extend(detect_volatility_clustering(records));
    patterns.extend(detect_volume_spikes(records));
    patterns.extend(detect_price_anomalies(records));

    patterns.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    patterns
}

/// Day of week (Sunday first) with the highest mean volatility.
pub fn detect_weekday_volatility(records: &[DailyRecord]) -> Option<Pattern> {
    let total = records.len();
    if total == 0 {
        return None;
    }

    let mut sums = [0.0_f64; 7];
    let mut counts = [0_usize; 7];
    for record in records {
        let slot = usize::from(record.date.weekday().number_days_from_sunday());
        sums[slot] += record.volatility;
        counts[slot] += 1;
    }

    let mut best: Option<(usize, f64)> = None;
    for (slot, (sum, count)) in sums.iter().zip(counts).enumerate() {
        if count == 0 {
            continue;
        }
        let mean = sum / count as f64;
        if best.map_or(true, |(_, top)| mean > top) {
            best = Some((slot, mean));
        }
    }

    let (slot, mean) = best?;
    let count = counts[slot];
    if mean <= HIGH_VOLATILITY_PCT || count < 4 {
        return None;
    }

    let day = WEEKDAY_NAMES[slot];
    Some(Pattern {
        id: format!("weekly-{}", day.to_ascii_lowercase()),
        kind: PatternKind::Weekly,
        name: format!("{day} Volatility"),
        description: format!("{day}s average {mean:.2}% volatility across {count} sessions"),
        confidence: capped(share_pct(count, total) * 7.0, 95.0),
        occurrences: count,
        avg_impact: mean,
        severity: if mean > 3.0 {
            Severity::High
        } else {
            Severity::Medium
        },
    })
}

/// Early/mid/late month return tendencies.
pub fn detect_month_periods(records: &[DailyRecord]) -> Vec<Pattern> {
    let total = records.len();
    let mut patterns = Vec::new();

    for period in MonthPeriod::ALL {
        let returns: Vec<f64> = records
            .iter()
            .filter(|record| MonthPeriod::of_day(record.date.day()) == period)
            .map(DailyRecord::performance)
            .collect();

        let count = returns.len();
        if count < 5 {
            continue;
        }
        let mean = mean(&returns);
        if mean.abs() <= 1.0 {
            continue;
        }

        let direction = if mean > 0.0 { "Rally" } else { "Decline" };
        let label = period.label();
        patterns.push(Pattern {
            id: format!("monthly-{}", label.to_ascii_lowercase()),
            kind: PatternKind::Monthly,
            name: format!("{label}-Month {direction}"),
            description: format!(
                "days {} of the month average a {mean:+.2}% daily return across {count} sessions",
                period.day_span()
            ),
            confidence: capped(share_pct(count, total) * 3.0, 90.0),
            occurrences: count,
            avg_impact: mean,
            severity: if mean.abs() > 3.0 {
                Severity::High
            } else if mean.abs() > 1.5 {
                Severity::Medium
            } else {
                Severity::Low
            },
        });
    }

    patterns
}

/// Runs of back-to-back volatile days.
///
/// Each run counts once, at the first day that is preceded by another
/// volatile day.
pub fn detect_volatility_clustering(records: &[DailyRecord]) -> Option<Pattern> {
    let total = records.len();
    let mut clusters = 0_usize;
    let mut in_run = false;

    for pair in records.windows(2) {
        let volatile = pair[0].volatility > HIGH_VOLATILITY_PCT
            && pair[1].volatility > HIGH_VOLATILITY_PCT;
        if volatile && !in_run {
            clusters += 1;
        }
        in_run = volatile;
    }

    if clusters < 3 {
        return None;
    }

    let volatile: Vec<f64> = records
        .iter()
        .map(|record| record.volatility)
        .filter(|v| *v > HIGH_VOLATILITY_PCT)
        .collect();
    let avg_impact = mean(&volatile);
    let per_ten = total as f64 / 10.0;

    Some(Pattern {
        id: String::from("volatility-clustering"),
        kind: PatternKind::Volatility,
        name: String::from("Volatility Clustering"),
        description: format!(
            "{clusters} separate runs of consecutive days above {HIGH_VOLATILITY_PCT}% volatility"
        ),
        confidence: capped(clusters as f64 / per_ten * 100.0, 85.0),
        occurrences: clusters,
        avg_impact,
        severity: Severity::Medium,
    })
}

/// Days trading more than twice the mean volume.
pub fn detect_volume_spikes(records: &[DailyRecord]) -> Option<Pattern> {
    let total = records.len();
    let volumes: Vec<f64> = records.iter().map(|record| record.volume).collect();
    let average = mean(&volumes);
    if average <= 0.0 {
        return None;
    }

    let spikes: Vec<f64> = volumes.into_iter().filter(|v| *v > 2.0 * average).collect();
    let count = spikes.len();
    if count < 3 {
        return None;
    }

    let multiplier = mean(&spikes) / average;
    Some(Pattern {
        id: String::from("volume-spikes"),
        kind: PatternKind::Volume,
        name: String::from("Volume Spikes"),
        description: format!("{count} sessions traded at {multiplier:.1}x the average volume"),
        confidence: capped(share_pct(count, total) * 10.0, 80.0),
        occurrences: count,
        avg_impact: multiplier,
        severity: Severity::Low,
    })
}

/// Days whose absolute open-to-close move exceeds three times the mean move.
pub fn detect_price_anomalies(records: &[DailyRecord]) -> Option<Pattern> {
    let total = records.len();
    let moves: Vec<f64> = records.iter().map(DailyRecord::absolute_performance).collect();
    let average = mean(&moves);
    if average <= 0.0 {
        return None;
    }

    let flagged: Vec<f64> = moves.into_iter().filter(|m| *m > 3.0 * average).collect();
    let count = flagged.len();
    if count < 2 {
        return None;
    }

    let avg_impact = mean(&flagged);
    Some(Pattern {
        id: String::from("price-anomalies"),
        kind: PatternKind::Anomaly,
        name: String::from("Price Anomalies"),
        description: format!(
            "{count} sessions moved more than 3x the mean absolute return of {average:.2}%"
        ),
        confidence: capped(share_pct(count, total) * 20.0, 75.0),
        occurrences: count,
        avg_impact,
        severity: Severity::High,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MonthPeriod {
    Early,
    Mid,
    Late,
}

impl MonthPeriod {
    const ALL: [Self; 3] = [Self::Early, Self::Mid, Self::Late];

    fn of_day(day: u8) -> Self {
        match day {
            1..=10 => Self::Early,
            11..=20 => Self::Mid,
            _ => Self::Late,
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::Early => "Early",
            Self::Mid => "Mid",
            Self::Late => "Late",
        }
    }

    fn day_span(self) -> &'static str {
        match self {
            Self::Early => "1-10",
            Self::Mid => "11-20",
            Self::Late => "21-31",
        }
    }
}

const WEEKDAY_NAMES: [&str; 7] = [
    "Sunday",
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
];

fn share_pct(count: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    count as f64 / total as f64 * 100.0
}

fn capped(confidence: f64, ceiling: f64) -> f64 {
    confidence.clamp(0.0, ceiling)
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use time::macros::date;
    use time::{Date, Duration, Weekday};

    // 2024-01-07 is a Sunday
    const FIRST_SUNDAY: Date = date!(2024 - 01 - 07);

    fn calm(date: Date) -> DailyRecord {
        DailyRecord::new(date, 100.0, 100.5, 99.5, 100.0, 1_000.0).expect("valid")
    }

    fn history(days: i64) -> Vec<DailyRecord> {
        (0..days)
            .map(|offset| calm(FIRST_SUNDAY + Duration::days(offset)))
            .collect()
    }

    #[test]
    fn short_history_yields_nothing() {
        let mut records = history(29);
        for record in &mut records {
            record.volatility = 9.0;
        }
        assert!(detect_patterns(&records).is_empty());
    }

    #[test]
    fn calm_history_yields_nothing() {
        assert!(detect_patterns(&history(60)).is_empty());
    }

    #[test]
    fn weekday_volatility_picks_the_loudest_day() {
        let mut records = history(35);
        // five Wednesdays at 3.5%
        for record in records.iter_mut().filter(|r| r.date.weekday() == Weekday::Wednesday) {
            record.volatility = 3.5;
        }

        let pattern = detect_weekday_volatility(&records).expect("pattern");
        assert_eq!(pattern.id, "weekly-wednesday");
        assert_eq!(pattern.occurrences, 5);
        assert_eq!(pattern.severity, Severity::High);
        // 5/35 * 100 * 7 = 100, capped
        assert_relative_eq!(pattern.confidence, 95.0);
        assert_relative_eq!(pattern.avg_impact, 3.5);
    }

    #[test]
    fn weekday_volatility_medium_tier_and_threshold() {
        let mut records = history(35);
        for record in records.iter_mut().filter(|r| r.date.weekday() == Weekday::Wednesday) {
            record.volatility = 3.0;
        }
        let pattern = detect_weekday_volatility(&records).expect("pattern");
        assert_eq!(pattern.severity, Severity::Medium);
        assert_relative_eq!(pattern.avg_impact, 3.0);

        for record in records.iter_mut().filter(|r| r.date.weekday() == Weekday::Wednesday) {
            record.volatility = HIGH_VOLATILITY_PCT;
        }
        assert!(detect_weekday_volatility(&records).is_none());
    }

    #[test]
    fn weekday_volatility_needs_four_samples() {
        let mut records = history(21);
        for record in records.iter_mut().filter(|r| r.date.weekday() == Weekday::Friday) {
            record.volatility = 5.0;
        }
        assert!(detect_weekday_volatility(&records).is_none());
    }

    #[test]
    fn month_period_names_direction_and_caps_confidence() {
        // all of January 2024: 10 early days rallying 4%
        let records: Vec<_> = (0..31)
            .map(|offset| {
                let date = date!(2024 - 01 - 01) + Duration::days(offset);
                if date.day() <= 10 {
                    DailyRecord::new(date, 100.0, 105.0, 99.0, 104.0, 1.0).expect("valid")
                } else {
                    calm(date)
                }
            })
            .collect();

        let patterns = detect_month_periods(&records);
        assert_eq!(patterns.len(), 1);
        let early = &patterns[0];
        assert_eq!(early.name, "Early-Month Rally");
        assert_eq!(early.severity, Severity::High);
        assert_relative_eq!(early.confidence, 90.0);
        assert_relative_eq!(early.avg_impact, 4.0, epsilon = 1e-9);
    }

    #[test]
    fn month_period_decline_severity_tiers() {
        let records: Vec<_> = (0..31)
            .map(|offset| {
                let date = date!(2024 - 01 - 01) + Duration::days(offset);
                if date.day() >= 21 {
                    DailyRecord::new(date, 100.0, 100.5, 97.0, 98.0, 1.0).expect("valid")
                } else {
                    calm(date)
                }
            })
            .collect();

        let patterns = detect_month_periods(&records);
        assert_eq!(patterns.len(), 1);
        assert_eq!(patterns[0].name, "Late-Month Decline");
        assert_eq!(patterns[0].severity, Severity::Medium);
    }

    #[test]
    fn every_qualifying_month_period_is_reported() {
        // January 2024: early rally 4%, mid decline 2%, late rally 1.2%
        let records: Vec<_> = (0..31)
            .map(|offset| {
                let date = date!(2024 - 01 - 01) + Duration::days(offset);
                let (high, low, close) = match date.day() {
                    1..=10 => (105.0, 99.0, 104.0),
                    11..=20 => (100.5, 97.5, 98.0),
                    _ => (101.5, 99.5, 101.2),
                };
                DailyRecord::new(date, 100.0, high, low, close, 1.0).expect("valid")
            })
            .collect();

        let patterns = detect_month_periods(&records);
        let names: Vec<_> = patterns.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["Early-Month Rally", "Mid-Month Decline", "Late-Month Rally"]
        );

        let mid = &patterns[1];
        assert_eq!(mid.id, "monthly-mid");
        assert_eq!(mid.occurrences, 10);
        assert_eq!(mid.severity, Severity::Medium);
        assert_relative_eq!(mid.avg_impact, -2.0, epsilon = 1e-9);

        assert_eq!(patterns[0].severity, Severity::High);
        assert_eq!(patterns[2].severity, Severity::Low);
        assert_eq!(patterns[2].occurrences, 11);
    }

    #[test]
    fn clustering_counts_each_run_once() {
        let mut records = history(30);
        let runs: [&[usize]; 3] = [&[2, 3, 4], &[10, 11], &[20, 21, 22]];
        for index in runs.into_iter().flatten() {
            records[*index].volatility = 6.0;
        }

        let pattern = detect_volatility_clustering(&records).expect("pattern");
        assert_eq!(pattern.occurrences, 3);
        assert_eq!(pattern.severity, Severity::Medium);
        assert_relative_eq!(pattern.confidence, 85.0);
        assert_relative_eq!(pattern.avg_impact, 6.0);
    }

    #[test]
    fn isolated_volatile_days_are_not_clusters() {
        let mut records = history(30);
        for index in [1, 5, 9, 13, 17] {
            records[index].volatility = 6.0;
        }
        assert!(detect_volatility_clustering(&records).is_none());
    }

    #[test]
    fn volume_spikes_report_multiplier() {
        let mut records = history(30);
        for index in [3, 12, 25] {
            records[index].volume = 10_000.0;
        }

        let pattern = detect_volume_spikes(&records).expect("pattern");
        let average = (27.0 * 1_000.0 + 3.0 * 10_000.0) / 30.0;
        assert_eq!(pattern.occurrences, 3);
        assert_eq!(pattern.severity, Severity::Low);
        assert_relative_eq!(pattern.avg_impact, 10_000.0 / average);
        assert_relative_eq!(pattern.confidence, 80.0);
    }

    #[test]
    fn volume_exactly_twice_the_mean_is_not_a_spike() {
        // 27 days at 1000 and 3 at 2250 average exactly 1125
        let mut records = history(30);
        for index in [3, 12, 25] {
            records[index].volume = 2_250.0;
        }
        assert!(detect_volume_spikes(&records).is_none());

        for index in [3, 12, 25] {
            records[index].volume = 2_260.0;
        }
        let pattern = detect_volume_spikes(&records).expect("just above twice the mean");
        assert_eq!(pattern.occurrences, 3);
    }

    #[test]
    fn price_anomalies_flag_outsized_moves() {
        let mut records: Vec<_> = (0..30)
            .map(|offset| {
                let date = FIRST_SUNDAY + Duration::days(offset);
                DailyRecord::new(date, 100.0, 101.5, 99.5, 101.0, 1.0).expect("valid")
            })
            .collect();
        for index in [7, 19] {
            let date = records[index].date;
            records[index] = DailyRecord::new(date, 100.0, 121.0, 99.0, 120.0, 1.0).expect("valid");
        }

        let pattern = detect_price_anomalies(&records).expect("pattern");
        assert_eq!(pattern.occurrences, 2);
        assert_eq!(pattern.severity, Severity::High);
        assert_relative_eq!(pattern.avg_impact, 20.0, epsilon = 1e-9);
        assert_relative_eq!(pattern.confidence, 75.0);
    }

    #[test]
    fn move_exactly_three_times_the_mean_is_not_an_anomaly() {
        // six 1.5625% moves and two 14.0625% moves average exactly 4.6875%
        let day = |offset: i64, close: f64| {
            let date = FIRST_SUNDAY + Duration::days(offset);
            DailyRecord::new(date, 128.0, close, 128.0, close, 1.0).expect("valid")
        };
        let mut records: Vec<_> = (0..8).map(|offset| day(offset, 130.0)).collect();
        records[2] = day(2, 146.0);
        records[6] = day(6, 146.0);
        assert!(detect_price_anomalies(&records).is_none());

        records[2] = day(2, 147.0);
        records[6] = day(6, 147.0);
        let pattern = detect_price_anomalies(&records).expect("just above three times the mean");
        assert_eq!(pattern.occurrences, 2);
    }

    #[test]
    fn patterns_are_sorted_by_confidence() {
        let mut records = history(40);
        for index in [3, 12, 25, 33] {
            records[index].volume = 50_000.0;
        }
        for run in [[5, 6], [15, 16], [30, 31]] {
            for index in run {
                records[index].volatility = 4.0;
            }
        }

        let patterns = detect_patterns(&records);
        assert!(patterns.len() >= 2);
        for pair in patterns.windows(2) {
            assert!(pair[0].confidence >= pair[1].confidence);
        }
    }
}
