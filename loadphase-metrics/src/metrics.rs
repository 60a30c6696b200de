use hdrhistogram::Histogram;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::Result;

/// HTTP status codes that get a dedicated counter in every metric set.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, strum::Display, strum::EnumString,
)]
pub enum TrackedStatus {
    #[strum(serialize = "400")]
    BadRequest,
    #[strum(serialize = "401")]
    Unauthorized,
    #[strum(serialize = "403")]
    Forbidden,
    #[strum(serialize = "404")]
    NotFound,
    #[strum(serialize = "500")]
    InternalServerError,
    #[strum(serialize = "502")]
    BadGateway,
    #[strum(serialize = "503")]
    ServiceUnavailable,
    #[strum(serialize = "504")]
    GatewayTimeout,
}

impl TrackedStatus {
    pub const ALL: [TrackedStatus; 8] = [
        TrackedStatus::BadRequest,
        TrackedStatus::Unauthorized,
        TrackedStatus::Forbidden,
        TrackedStatus::NotFound,
        TrackedStatus::InternalServerError,
        TrackedStatus::BadGateway,
        TrackedStatus::ServiceUnavailable,
        TrackedStatus::GatewayTimeout,
    ];

    #[must_use]
    pub fn from_code(code: u16) -> Option<Self> {
        match code {
            400 => Some(Self::BadRequest),
            401 => Some(Self::Unauthorized),
            403 => Some(Self::Forbidden),
            404 => Some(Self::NotFound),
            500 => Some(Self::InternalServerError),
            502 => Some(Self::BadGateway),
            503 => Some(Self::ServiceUnavailable),
            504 => Some(Self::GatewayTimeout),
            _ => None,
        }
    }

    #[must_use]
    pub fn code(self) -> u16 {
        match self {
            Self::BadRequest => 400,
            Self::Unauthorized => 401,
            Self::Forbidden => 403,
            Self::NotFound => 404,
            Self::InternalServerError => 500,
            Self::BadGateway => 502,
            Self::ServiceUnavailable => 503,
            Self::GatewayTimeout => 504,
        }
    }

    fn slot(self) -> usize {
        self as usize
    }
}

/// Latency statistics in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatencySummary {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub p90: f64,
    pub p95: f64,
    pub p99: f64,
}

/// Point-in-time copy of one metric set.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricSnapshot {
    pub requests: u64,
    pub failures: u64,
    pub statuses: [u64; TrackedStatus::ALL.len()],
    /// `None` when nothing was recorded.
    pub latency: Option<LatencySummary>,
}

impl MetricSnapshot {
    #[must_use]
    pub fn status_count(&self, status: TrackedStatus) -> u64 {
        self.statuses[status.slot()]
    }
}

// Microsecond values, 3 significant digits. Histograms start small and grow with
// the largest recorded value; inputs are capped at one hour.
const HIST_HIGH_MICROS: u64 = 3_600_000_000;
const HIST_SIGFIG: u8 = 3;

fn new_latency_histogram() -> Result<Histogram<u64>> {
    let mut h = Histogram::<u64>::new(HIST_SIGFIG)?;
    h.auto(true);
    Ok(h)
}

fn ms_to_micros(ms: f64) -> u64 {
    if !ms.is_finite() || ms <= 0.0 {
        return 0;
    }
    let micros = (ms * 1000.0).round();
    if micros >= HIST_HIGH_MICROS as f64 {
        HIST_HIGH_MICROS
    } else {
        micros as u64
    }
}

fn micros_to_ms(micros: u64) -> f64 {
    micros as f64 / 1000.0
}

#[derive(Debug)]
struct Distribution {
    sum_micros: AtomicU64,
    min_micros: AtomicU64,
    max_micros: AtomicU64,
    hist: Mutex<Histogram<u64>>,
}

impl Distribution {
    fn new() -> Result<Self> {
        Ok(Self {
            sum_micros: AtomicU64::new(0),
            min_micros: AtomicU64::new(u64::MAX),
            max_micros: AtomicU64::new(0),
            hist: Mutex::new(new_latency_histogram()?),
        })
    }

    fn observe(&self, micros: u64) {
        self.sum_micros.fetch_add(micros, Ordering::Relaxed);
        self.min_micros.fetch_min(micros, Ordering::Relaxed);
        self.max_micros.fetch_max(micros, Ordering::Relaxed);
        self.hist.lock().saturating_record(micros);
    }

    fn summarize(&self) -> Option<LatencySummary> {
        let h = self.hist.lock();
        let count = h.len();
        if count == 0 {
            return None;
        }

        let min = self.min_micros.load(Ordering::Relaxed);
        let max = self.max_micros.load(Ordering::Relaxed);
        let sum = self.sum_micros.load(Ordering::Relaxed);

        // Nearest-rank percentile. The bucket holding max reports max; any other
        // bucket reports its upper edge so a percentile is never under-stated.
        let quantile = |q: f64| {
            let raw = h.value_at_quantile(q);
            let v = if h.equivalent(raw, max) {
                max
            } else {
                h.highest_equivalent(raw).clamp(min, max)
            };
            micros_to_ms(v)
        };

        Some(LatencySummary {
            min: micros_to_ms(min),
            max: micros_to_ms(max),
            mean: (sum as f64 / count as f64) / 1000.0,
            p90: quantile(0.90),
            p95: quantile(0.95),
            p99: quantile(0.99),
        })
    }
}

/// Counters and latency distribution for one `(api, scenario, phase)` key.
#[derive(Debug)]
pub struct MetricSet {
    requests: AtomicU64,
    failures: AtomicU64,
    statuses: [AtomicU64; TrackedStatus::ALL.len()],
    latency: Distribution,
}

impl MetricSet {
    pub fn new() -> Result<Self> {
        Ok(Self {
            requests: AtomicU64::new(0),
            failures: AtomicU64::new(0),
            statuses: std::array::from_fn(|_| AtomicU64::new(0)),
            latency: Distribution::new()?,
        })
    }

    /// Applies one completed request. Only additive updates, so concurrent callers
    /// never need to coordinate.
    #[inline]
    pub fn observe(&self, status_code: u16, duration_ms: f64) {
        self.requests.fetch_add(1, Ordering::Relaxed);
        self.latency.observe(ms_to_micros(duration_ms));

        if status_code >= 400 {
            self.failures.fetch_add(1, Ordering::Relaxed);
            if let Some(tracked) = TrackedStatus::from_code(status_code) {
                self.statuses[tracked.slot()].fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    #[must_use]
    pub fn requests(&self) -> u64 {
        self.requests.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn failures(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn status_count(&self, status: TrackedStatus) -> u64 {
        self.statuses[status.slot()].load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn snapshot(&self) -> MetricSnapshot {
        MetricSnapshot {
            requests: self.requests(),
            failures: self.failures(),
            statuses: std::array::from_fn(|i| self.statuses[i].load(Ordering::Relaxed)),
            latency: self.latency.summarize(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set() -> MetricSet {
        MetricSet::new().unwrap_or_else(|e| panic!("metric set: {e}"))
    }

    #[test]
    fn tracked_status_round_trips_codes() {
        for s in TrackedStatus::ALL {
            assert_eq!(TrackedStatus::from_code(s.code()), Some(s));
            assert_eq!(s.to_string(), s.code().to_string());
        }
        assert_eq!(TrackedStatus::from_code(200), None);
        assert_eq!(TrackedStatus::from_code(418), None);
        assert_eq!("503".parse::<TrackedStatus>().ok(), Some(TrackedStatus::ServiceUnavailable));
    }

    #[test]
    fn empty_set_has_no_latency() {
        let s = set().snapshot();
        assert_eq!(s.requests, 0);
        assert_eq!(s.failures, 0);
        assert!(s.latency.is_none());
    }

    #[test]
    fn observe_counts_failures_and_tracked_codes() {
        let s = set();
        s.observe(200, 10.0);
        s.observe(500, 20.0);
        s.observe(418, 30.0);

        let snap = s.snapshot();
        assert_eq!(snap.requests, 3);
        assert_eq!(snap.failures, 2);
        assert_eq!(snap.status_count(TrackedStatus::InternalServerError), 1);
        assert_eq!(snap.statuses.iter().sum::<u64>(), 1);
    }

    #[test]
    fn latency_summary_is_exact_at_the_edges() {
        let s = set();
        for ms in [12.5, 40.0, 100.0, 250.0] {
            s.observe(200, ms);
        }

        let lat = s
            .snapshot()
            .latency
            .unwrap_or_else(|| panic!("expected latency"));
        assert_eq!(lat.min, 12.5);
        assert_eq!(lat.max, 250.0);
        assert!((lat.mean - 100.625).abs() < 1e-9);
        // Nearest rank over 4 samples puts p90/p95/p99 on the slowest one.
        assert_eq!(lat.p90, 250.0);
        assert_eq!(lat.p99, 250.0);
    }

    #[test]
    fn single_sample_percentiles_equal_the_sample() {
        let s = set();
        s.observe(200, 123.456);
        let lat = s
            .snapshot()
            .latency
            .unwrap_or_else(|| panic!("expected latency"));
        assert_eq!(lat.p90, 123.456);
        assert_eq!(lat.min, lat.max);
    }

    #[test]
    fn p90_never_reads_below_the_ranked_sample() {
        let s = set();
        s.observe(200, 1.0);
        for _ in 0..98 {
            s.observe(200, 1000.3);
        }
        s.observe(200, 2000.0);

        let lat = s
            .snapshot()
            .latency
            .unwrap_or_else(|| panic!("expected latency"));
        assert!(lat.p90 >= 1000.3, "p90 {}", lat.p90);
        assert!(lat.p90 < 1001.0, "p90 {}", lat.p90);
        assert_eq!(lat.max, 2000.0);
    }

    #[test]
    fn huge_durations_are_capped_at_one_hour() {
        let s = set();
        s.observe(200, f64::MAX);
        s.observe(200, 1e300);
        s.observe(200, 5.0);

        let lat = s
            .snapshot()
            .latency
            .unwrap_or_else(|| panic!("expected latency"));
        assert_eq!(lat.max, 3_600_000.0);
        assert_eq!(lat.p99, 3_600_000.0);
        assert!((lat.mean - (7_200_005.0 / 3.0)).abs() < 1e-6);
    }

    #[test]
    fn fresh_histogram_stays_small() {
        let h = new_latency_histogram().unwrap_or_else(|e| panic!("histogram: {e}"));
        assert!(h.distinct_values() <= 4096, "{}", h.distinct_values());
    }

    #[test]
    fn negative_and_nan_durations_record_as_zero() {
        let s = set();
        s.observe(200, -5.0);
        s.observe(200, f64::NAN);
        let snap = s.snapshot();
        assert_eq!(snap.requests, 2);
        assert_eq!(snap.latency.map(|l| l.max), Some(0.0));
    }
}
