use serde::Serialize;

use loadphase_metrics::{LatencySummary, MetricRegistry, MetricSnapshot, TrackedStatus};

use crate::config::Sla;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, strum::Display)]
pub enum SlaStatus {
    #[strum(serialize = "PASS")]
    #[serde(rename = "PASS")]
    Pass,
    #[strum(serialize = "FAIL")]
    #[serde(rename = "FAIL")]
    Fail,
    #[strum(serialize = "N/A")]
    #[serde(rename = "N/A")]
    NotApplicable,
}

/// One line of a summary table. Latency values are milliseconds and `None`
/// when the row saw no traffic.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryRow {
    pub api: String,
    /// SLA p90 threshold in milliseconds.
    pub sla_threshold: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub avg: Option<f64>,
    pub p90: Option<f64>,
    pub p95: Option<f64>,
    pub p99: Option<f64>,
    pub total_count: u64,
    pub passed_count: u64,
    pub failed_count: u64,
    /// Failure share of `total_count`, two decimals. `"0.00"` without traffic.
    pub error_pct: String,
    pub status: SlaStatus,
    /// Expected transaction count from the SLA, if any.
    pub target_count: Option<u64>,
}

impl SummaryRow {
    #[must_use]
    pub fn is_fail(&self) -> bool {
        self.status == SlaStatus::Fail
    }
}

/// Tracked status code totals for one api across all scenarios.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorRow {
    pub api: String,
    pub status_code: u16,
    pub count: u64,
    /// Share of all tracked errors in the run, across every api and code.
    pub pct: f64,
}

#[must_use]
pub fn format_error_pct(failed: u64, total: u64) -> String {
    if total == 0 {
        return "0.00".to_string();
    }
    format!("{:.2}", failed as f64 / total as f64 * 100.0)
}

#[must_use]
pub fn sla_status(p90: Option<f64>, total: u64, threshold: Option<f64>) -> SlaStatus {
    match (threshold, p90) {
        (Some(limit), Some(observed)) if total > 0 => {
            if observed > limit {
                SlaStatus::Fail
            } else {
                SlaStatus::Pass
            }
        }
        _ => SlaStatus::NotApplicable,
    }
}

/// Raw inputs of a row: counts plus the latency distribution summary.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RowStats {
    pub total: u64,
    pub failed: u64,
    pub latency: Option<LatencySummary>,
}

impl RowStats {
    pub const EMPTY: RowStats = RowStats {
        total: 0,
        failed: 0,
        latency: None,
    };
}

impl From<&MetricSnapshot> for RowStats {
    fn from(s: &MetricSnapshot) -> Self {
        Self {
            total: s.requests,
            failed: s.failures,
            latency: s.latency,
        }
    }
}

#[must_use]
pub fn summary_row(api: &str, stats: RowStats, sla: &Sla) -> SummaryRow {
    let threshold = sla.p90(api);
    let lat = stats.latency.filter(|_| stats.total > 0);
    let failed = stats.failed.min(stats.total);

    SummaryRow {
        api: api.to_string(),
        sla_threshold: threshold,
        min: lat.map(|l| l.min),
        max: lat.map(|l| l.max),
        avg: lat.map(|l| l.mean),
        p90: lat.map(|l| l.p90),
        p95: lat.map(|l| l.p95),
        p99: lat.map(|l| l.p99),
        total_count: stats.total,
        passed_count: stats.total - failed,
        failed_count: failed,
        error_pct: format_error_pct(failed, stats.total),
        status: sla_status(lat.map(|l| l.p90), stats.total, threshold),
        target_count: sla.get(api).and_then(|t| t.target_count),
    }
}

/// Folds per-scenario stats of one api into the all-scenario view.
///
/// Counts add up. Min/max take the extremes. Avg and the percentiles are the
/// plain mean of the per-scenario values, ignoring how much traffic each
/// scenario had; scenarios without traffic are left out entirely.
#[must_use]
pub fn combine_scenarios(parts: &[RowStats]) -> RowStats {
    let mut total = 0u64;
    let mut failed = 0u64;
    let mut contributing: Vec<LatencySummary> = Vec::with_capacity(parts.len());

    for p in parts {
        total = total.saturating_add(p.total);
        failed = failed.saturating_add(p.failed);
        if p.total > 0
            && let Some(lat) = p.latency
        {
            contributing.push(lat);
        }
    }

    if contributing.is_empty() {
        return RowStats {
            total,
            failed,
            latency: None,
        };
    }

    let n = contributing.len() as f64;
    let mean_of = |f: fn(&LatencySummary) -> f64| contributing.iter().map(f).sum::<f64>() / n;

    let latency = LatencySummary {
        min: contributing
            .iter()
            .map(|l| l.min)
            .fold(f64::INFINITY, f64::min),
        max: contributing
            .iter()
            .map(|l| l.max)
            .fold(f64::NEG_INFINITY, f64::max),
        mean: mean_of(|l| l.mean),
        p90: mean_of(|l| l.p90),
        p95: mean_of(|l| l.p95),
        p99: mean_of(|l| l.p99),
    };

    RowStats {
        total,
        failed,
        latency: Some(latency),
    }
}

fn stats_for(
    registry: &MetricRegistry,
    api: &str,
    scenario: &str,
    phase: Option<usize>,
) -> RowStats {
    registry
        .snapshot(api, scenario, phase)
        .as_ref()
        .map(RowStats::from)
        .unwrap_or(RowStats::EMPTY)
}

/// One row per api for the scenario-level sets of `scenario`.
#[must_use]
pub fn build_scenario_table<S: AsRef<str>>(
    registry: &MetricRegistry,
    scenario: &str,
    sla: &Sla,
    apis: &[S],
) -> Vec<SummaryRow> {
    apis.iter()
        .map(|api| {
            let api = api.as_ref();
            summary_row(api, stats_for(registry, api, scenario, None), sla)
        })
        .collect()
}

/// One row per api for phase `phase` of `scenario`.
#[must_use]
pub fn build_phase_table<S: AsRef<str>>(
    registry: &MetricRegistry,
    scenario: &str,
    phase: usize,
    sla: &Sla,
    apis: &[S],
) -> Vec<SummaryRow> {
    apis.iter()
        .map(|api| {
            let api = api.as_ref();
            summary_row(api, stats_for(registry, api, scenario, Some(phase)), sla)
        })
        .collect()
}

/// One row per api combining every scenario, see [`combine_scenarios`].
#[must_use]
pub fn build_overall_table<A: AsRef<str>, S: AsRef<str>>(
    registry: &MetricRegistry,
    sla: &Sla,
    apis: &[A],
    scenarios: &[S],
) -> Vec<SummaryRow> {
    apis.iter()
        .map(|api| {
            let api = api.as_ref();
            let parts: Vec<RowStats> = scenarios
                .iter()
                .map(|s| stats_for(registry, api, s.as_ref(), None))
                .collect();
            summary_row(api, combine_scenarios(&parts), sla)
        })
        .collect()
}

/// Tracked status code counts per api, summed over scenario-level sets only.
/// Rows with a zero count are omitted.
#[must_use]
pub fn build_error_distribution<A: AsRef<str>, S: AsRef<str>>(
    registry: &MetricRegistry,
    apis: &[A],
    scenarios: &[S],
) -> Vec<ErrorRow> {
    let mut rows = Vec::new();

    for api in apis {
        let api = api.as_ref();
        let snapshots: Vec<MetricSnapshot> = scenarios
            .iter()
            .filter_map(|s| registry.snapshot(api, s.as_ref(), None))
            .collect();

        for status in TrackedStatus::ALL {
            let count: u64 = snapshots.iter().map(|s| s.status_count(status)).sum();
            if count > 0 {
                rows.push(ErrorRow {
                    api: api.to_string(),
                    status_code: status.code(),
                    count,
                    pct: 0.0,
                });
            }
        }
    }

    let grand_total: u64 = rows.iter().map(|r| r.count).sum();
    if grand_total > 0 {
        for r in &mut rows {
            r.pct = r.count as f64 / grand_total as f64 * 100.0;
        }
    }

    rows
}
