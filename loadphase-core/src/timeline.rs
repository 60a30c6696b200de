//! Per-interval request series for each api, built from replayed timestamps.
//!
//! Buckets are aligned to the test start and keep every duration sample, so the
//! interval percentiles are exact nearest-rank values. Scenarios are folded
//! together.

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::aggregate::format_error_pct;
use crate::error::{Error, Result};
use crate::ingest::Point;

/// One interval of one api. Latencies are milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IntervalRow {
    /// Interval start in seconds from the test start; negative before it.
    pub offset_secs: i64,
    pub requests: u64,
    pub failures: u64,
    /// Requests per second over the interval.
    pub rps: f64,
    pub error_pct: String,
    pub avg: f64,
    pub p90: f64,
    pub p95: f64,
    pub max: f64,
    /// Every status code seen in the interval, including successes.
    pub statuses: BTreeMap<u16, u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiTimeline {
    pub api: String,
    /// Intervals with at least one request, oldest first.
    pub rows: Vec<IntervalRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Timeline {
    pub start: DateTime<Utc>,
    pub interval_secs: u64,
    pub apis: Vec<ApiTimeline>,
}

impl Timeline {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.apis.iter().all(|a| a.rows.is_empty())
    }
}

#[derive(Debug, Default)]
struct Bucket {
    failures: u64,
    statuses: BTreeMap<u16, u64>,
    samples: Vec<f64>,
}

fn nearest_rank(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let rank = (q * sorted.len() as f64).ceil() as usize;
    let idx = rank.saturating_sub(1).min(sorted.len() - 1);
    sorted.get(idx).copied().unwrap_or(0.0)
}

impl Bucket {
    fn into_row(mut self, offset_secs: i64, interval_secs: u64) -> IntervalRow {
        self.samples.sort_by(f64::total_cmp);
        let requests = self.samples.len() as u64;
        let sum: f64 = self.samples.iter().sum();

        IntervalRow {
            offset_secs,
            requests,
            failures: self.failures,
            rps: requests as f64 / interval_secs as f64,
            error_pct: format_error_pct(self.failures, requests),
            avg: if requests == 0 { 0.0 } else { sum / requests as f64 },
            p90: nearest_rank(&self.samples, 0.90),
            p95: nearest_rank(&self.samples, 0.95),
            max: self.samples.last().copied().unwrap_or(0.0),
            statuses: self.statuses,
        }
    }
}

/// Collects points into fixed-width buckets per api.
#[derive(Debug)]
pub struct TimelineBuilder {
    start: DateTime<Utc>,
    interval_secs: u64,
    buckets: HashMap<String, BTreeMap<i64, Bucket>>,
}

impl TimelineBuilder {
    /// `interval` is truncated to whole seconds and must be at least one second.
    pub fn new(start: DateTime<Utc>, interval: Duration) -> Result<Self> {
        let interval_secs = interval.as_secs();
        if interval_secs == 0 {
            return Err(Error::InvalidInterval);
        }
        Ok(Self {
            start,
            interval_secs,
            buckets: HashMap::new(),
        })
    }

    fn bucket_offset(&self, time: DateTime<Utc>) -> i64 {
        let width_ms = i64::try_from(self.interval_secs)
            .unwrap_or(i64::MAX)
            .saturating_mul(1000);
        let elapsed_ms = (time - self.start).num_milliseconds();
        elapsed_ms.div_euclid(width_ms).saturating_mul(width_ms / 1000)
    }

    pub fn observe(&mut self, point: &Point) {
        let offset = self.bucket_offset(point.time);
        let bucket = self
            .buckets
            .entry(point.api.clone())
            .or_default()
            .entry(offset)
            .or_default();

        let ms = if point.duration_ms.is_finite() {
            point.duration_ms.max(0.0)
        } else {
            0.0
        };
        bucket.samples.push(ms);
        *bucket.statuses.entry(point.status_code).or_default() += 1;
        if point.outcome().is_failure() {
            bucket.failures += 1;
        }
    }

    /// Series for `apis` in the given order; apis without traffic get no rows.
    #[must_use]
    pub fn finish<S: AsRef<str>>(mut self, apis: &[S]) -> Timeline {
        let interval_secs = self.interval_secs;
        let apis = apis
            .iter()
            .map(|api| {
                let api = api.as_ref();
                let rows = self
                    .buckets
                    .remove(api)
                    .unwrap_or_default()
                    .into_iter()
                    .map(|(offset, b)| b.into_row(offset, interval_secs))
                    .collect();
                ApiTimeline {
                    api: api.to_string(),
                    rows,
                }
            })
            .collect();

        Timeline {
            start: self.start,
            interval_secs,
            apis,
        }
    }
}
