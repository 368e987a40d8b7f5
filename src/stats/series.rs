//! Time-bucketed chart series.

use super::window::{Bucketing, DateWindow, RangeSelector};
use crate::db::RecordSummary;

use chrono::{DateTime, Datelike, Months, NaiveDate, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

/// Anything carrying a creation timestamp.
pub trait Timestamped {
    fn created_at(&self) -> DateTime<Utc>;
}

impl Timestamped for DateTime<Utc> {
    fn created_at(&self) -> DateTime<Utc> {
        *self
    }
}

impl Timestamped for RecordSummary {
    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// One labeled point of a chart series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Bucket {
    pub label: String,
    pub count: u64,
    /// First day covered by the bucket.
    #[serde(skip)]
    pub first_day: NaiveDate,
}

impl Bucket {
    fn day(first_day: NaiveDate, count: u64) -> Self {
        Self {
            label: first_day.format("%-d %b").to_string(),
            count,
            first_day,
        }
    }

    fn month(first_day: NaiveDate, count: u64) -> Self {
        Self {
            label: first_day.format("%b %y").to_string(),
            count,
            first_day,
        }
    }
}

/// Split the records inside `window` into ascending buckets for `range`.
///
/// Records outside the window are ignored. Units without records still get
/// a zero bucket. If no unit is produced at all, a single zero bucket
/// labeled with the ISO date of the window start is returned instead of an
/// empty series.
pub fn build_series<T: Timestamped>(
    records: &[T],
    window: &DateWindow,
    range: RangeSelector,
) -> Vec<Bucket> {
    let first = window.start.date_naive();
    let last = window.end.date_naive();

    let mut per_day: BTreeMap<NaiveDate, u64> = BTreeMap::new();
    for t in records.iter().map(|r| r.created_at()).filter(|t| window.contains(*t)) {
        *per_day.entry(t.date_naive()).or_insert(0) += 1;
    }
    let count_day = |d: NaiveDate| per_day.get(&d).copied().unwrap_or(0);

    let buckets: Vec<Bucket> = match range.bucketing() {
        Bucketing::SingleDay if first <= last => vec![Bucket::day(first, count_day(first))],
        Bucketing::SingleDay => Vec::new(),
        Bucketing::Days { cap } => first
            .iter_days()
            .take_while(|d| *d <= last)
            .take(cap)
            .map(|d| Bucket::day(d, count_day(d)))
            .collect(),
        Bucketing::Months => {
            let mut per_month: BTreeMap<(i32, u32), u64> = BTreeMap::new();
            for (day, n) in &per_day {
                *per_month.entry((day.year(), day.month())).or_insert(0) += n;
            }

            months_between(first, last)
                .into_iter()
                .map(|m| {
                    let n = per_month.get(&(m.year(), m.month())).copied().unwrap_or(0);
                    Bucket::month(m, n)
                })
                .collect()
        }
    };

    if buckets.is_empty() {
        return vec![Bucket {
            label: first.format("%Y-%m-%d").to_string(),
            count: 0,
            first_day: first,
        }];
    }

    buckets
}

/// First day of every calendar month from `first`'s month to `last`'s month.
fn months_between(first: NaiveDate, last: NaiveDate) -> Vec<NaiveDate> {
    let mut months = Vec::new();
    let mut cursor = first.with_day(1);

    while let Some(m) = cursor {
        if m > last {
            break;
        }
        months.push(m);
        cursor = m.checked_add_months(Months::new(1));
    }

    months
}
