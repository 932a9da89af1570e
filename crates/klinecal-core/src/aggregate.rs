//! Week and month buckets over a daily record sequence.
//!
//! Buckets are recomputed from scratch on every call. Empty buckets are still
//! emitted so a calendar can render "no data" cells, but [`compare_buckets`]
//! ignores them.

use serde::{Deserialize, Serialize};
use time::{Date, Duration, Month};

use crate::domain::iso_date;
use crate::{DailyRecord, TimeRange, ValidationError};

/// How a view range is split into buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartitionScheme {
    /// Monday-aligned ISO weeks intersecting the view, clipped to it.
    Weekly(TimeRange),
    /// Calendar months intersecting the view, clipped to it.
    Monthly(TimeRange),
}

impl PartitionScheme {
    /// Week buckets for a calendar month view.
    pub fn month_view(year: i32, month: Month) -> Result<Self, ValidationError> {
        TimeRange::month(year, month).map(Self::Weekly)
    }

    /// Month buckets for a calendar year view.
    pub fn year_view(year: i32) -> Result<Self, ValidationError> {
        let start = TimeRange::month(year, Month::January)?.start;
        let end = TimeRange::month(year, Month::December)?.end;
        TimeRange::new(start, end).map(Self::Monthly)
    }

    /// Bucket boundaries with their keys, in ascending order.
    pub fn boundaries(&self) -> Vec<(String, TimeRange)> {
        match *self {
            Self::Weekly(view) => week_boundaries(view),
            Self::Monthly(view) => month_boundaries(view),
        }
    }
}

/// Summary of the records falling inside one bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bucket {
    /// `YYYY-Www` for weeks, `YYYY-MM` for months.
    pub key: String,
    #[serde(with = "iso_date")]
    pub start: Date,
    #[serde(with = "iso_date")]
    pub end: Date,
    pub records: Vec<DailyRecord>,
    pub avg_volatility: f64,
    pub total_volume: f64,
    /// `(last.close - first.open) / first.open`, as a fraction.
    pub period_return: f64,
}

impl Bucket {
    fn from_records(key: String, range: TimeRange, records: Vec<DailyRecord>) -> Self {
        let count = records.len();
        let avg_volatility = if count == 0 {
            0.0
        } else {
            records.iter().map(|r| r.volatility).sum::<f64>() / count as f64
        };
        let total_volume = records.iter().map(|r| r.volume).sum();
        let period_return = match (records.first(), records.last()) {
            (Some(first), Some(last)) if first.open != 0.0 => {
                (last.close - first.open) / first.open
            }
            _ => 0.0,
        };

        Self {
            key,
            start: range.start,
            end: range.end,
            records,
            avg_volatility,
            total_volume,
            period_return,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Splits `records` into the buckets of `scheme`.
///
/// Records outside every bucket are ignored; each record lands in at most one
/// bucket because boundaries never overlap.
pub fn aggregate(records: &[DailyRecord], scheme: &PartitionScheme) -> Vec<Bucket> {
    scheme
        .boundaries()
        .into_iter()
        .map(|(key, range)| {
            let inside = records
                .iter()
                .filter(|record| range.contains(record.date))
                .cloned()
                .collect();
            Bucket::from_records(key, range, inside)
        })
        .collect()
}

/// Cross-bucket statistics over non-empty buckets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BucketComparison {
    /// Number of non-empty buckets compared.
    pub compared: usize,
    pub best: Option<String>,
    pub worst: Option<String>,
    pub mean_return: f64,
    pub mean_volatility: f64,
    pub total_volume: f64,
}

pub fn compare_buckets(buckets: &[Bucket]) -> BucketComparison {
    let populated: Vec<&Bucket> = buckets.iter().filter(|b| !b.is_empty()).collect();
    let compared = populated.len();

    let best = populated
        .iter()
        .max_by(|a, b| a.period_return.total_cmp(&b.period_return))
        .map(|b| b.key.clone());
    let worst = populated
        .iter()
        .min_by(|a, b| a.period_return.total_cmp(&b.period_return))
        .map(|b| b.key.clone());

    let (mean_return, mean_volatility) = if compared == 0 {
        (0.0, 0.0)
    } else {
        let n = compared as f64;
        (
            populated.iter().map(|b| b.period_return).sum::<f64>() / n,
            populated.iter().map(|b| b.avg_volatility).sum::<f64>() / n,
        )
    };

    BucketComparison {
        compared,
        best,
        worst,
        mean_return,
        mean_volatility,
        total_volume: populated.iter().map(|b| b.total_volume).sum(),
    }
}

fn week_boundaries(view: TimeRange) -> Vec<(String, TimeRange)> {
    let offset = i64::from(view.start.weekday().number_days_from_monday());
    let mut monday = view.start - Duration::days(offset);
    let mut boundaries = Vec::new();

    while monday <= view.end {
        let sunday = monday + Duration::days(6);
        let (iso_year, week, _) = monday.to_iso_week_date();
        let range = TimeRange {
            start: monday.max(view.start),
            end: sunday.min(view.end),
        };
        boundaries.push((format!("{iso_year:04}-W{week:02}"), range));
        monday += Duration::weeks(1);
    }

    boundaries
}

fn month_boundaries(view: TimeRange) -> Vec<(String, TimeRange)> {
    let mut boundaries = Vec::new();
    let mut year = view.start.year();
    let mut month = view.start.month();

    loop {
        let Ok(full) = TimeRange::month(year, month) else {
            break;
        };
        if full.start > view.end {
            break;
        }
        let range = TimeRange {
            start: full.start.max(view.start),
            end: full.end.min(view.end),
        };
        boundaries.push((format!("{year:04}-{:02}", u8::from(month)), range));

        if month == Month::December {
            year += 1;
        }
        month = month.next();
    }

    boundaries
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use time::macros::date;

    fn record(date: Date, open: f64, close: f64, volume: f64) -> DailyRecord {
        let high = open.max(close) + 1.0;
        let low = open.min(close) - 1.0;
        DailyRecord::new(date, open, high, low, close, volume).expect("valid")
    }

    #[test]
    fn month_view_weeks_partition_the_month() {
        // March 2024 starts on a Friday and ends on a Sunday
        let scheme = PartitionScheme::month_view(2024, Month::March).expect("valid");
        let boundaries = scheme.boundaries();

        assert_eq!(boundaries.len(), 5);
        assert_eq!(boundaries[0].0, "2024-W09");
        assert_eq!(boundaries[0].1.start, date!(2024 - 03 - 01));
        assert_eq!(boundaries[0].1.end, date!(2024 - 03 - 03));
        assert_eq!(boundaries[4].1.end, date!(2024 - 03 - 31));

        let covered: i64 = boundaries.iter().map(|(_, r)| r.days()).sum();
        assert_eq!(covered, 31);
        for pair in boundaries.windows(2) {
            assert_eq!(pair[0].1.end + Duration::days(1), pair[1].1.start);
        }
    }

    #[test]
    fn iso_week_key_uses_iso_year() {
        // 2021-01-01 is a Friday in ISO week 53 of 2020
        let scheme = PartitionScheme::month_view(2021, Month::January).expect("valid");
        assert_eq!(scheme.boundaries()[0].0, "2020-W53");
    }

    #[test]
    fn year_view_has_twelve_month_keys() {
        let scheme = PartitionScheme::year_view(2023).expect("valid");
        let keys: Vec<_> = scheme.boundaries().into_iter().map(|(k, _)| k).collect();
        assert_eq!(keys.len(), 12);
        assert_eq!(keys[0], "2023-01");
        assert_eq!(keys[11], "2023-12");
    }

    #[test]
    fn bucket_metrics_follow_first_open_and_last_close() {
        let records = vec![
            record(date!(2024 - 03 - 04), 100.0, 104.0, 10.0),
            record(date!(2024 - 03 - 05), 104.0, 98.0, 20.0),
            record(date!(2024 - 03 - 06), 98.0, 110.0, 30.0),
        ];
        let march = PartitionScheme::month_view(2024, Month::March).expect("valid");
        let buckets = aggregate(&records, &march);
        let week = &buckets[1];

        assert_eq!(week.records.len(), 3);
        assert_relative_eq!(week.total_volume, 60.0);
        assert_relative_eq!(week.period_return, 0.10);
        let expected_vol = records.iter().map(|r| r.volatility).sum::<f64>() / 3.0;
        assert_relative_eq!(week.avg_volatility, expected_vol);
    }

    #[test]
    fn empty_buckets_are_emitted_with_zero_metrics() {
        let buckets = aggregate(&[], &PartitionScheme::year_view(2024).expect("valid"));
        assert_eq!(buckets.len(), 12);
        assert!(buckets.iter().all(|b| b.is_empty()
            && b.avg_volatility == 0.0
            && b.total_volume == 0.0
            && b.period_return == 0.0));
    }

    #[test]
    fn comparison_skips_empty_buckets() {
        let records = vec![
            record(date!(2024 - 01 - 10), 100.0, 110.0, 5.0),
            record(date!(2024 - 03 - 10), 100.0, 95.0, 7.0),
        ];
        let buckets = aggregate(&records, &PartitionScheme::year_view(2024).expect("valid"));
        let comparison = compare_buckets(&buckets);

        assert_eq!(comparison.compared, 2);
        assert_eq!(comparison.best.as_deref(), Some("2024-01"));
        assert_eq!(comparison.worst.as_deref(), Some("2024-03"));
        assert_relative_eq!(comparison.mean_return, (0.10 - 0.05) / 2.0);
        assert_relative_eq!(comparison.total_volume, 12.0);
    }

    #[test]
    fn comparison_of_nothing_is_neutral() {
        let comparison = compare_buckets(&[]);
        assert_eq!(comparison.compared, 0);
        assert!(comparison.best.is_none() && comparison.worst.is_none());
    }
}
