use chrono::{DateTime, Utc};
use serde::Serialize;

use loadphase_metrics::MetricRegistry;

use crate::aggregate::{
    ErrorRow, SlaStatus, SummaryRow, build_error_distribution, build_overall_table,
    build_phase_table, build_scenario_table, format_error_pct,
};
use crate::config::TestPlan;
use crate::phase::PhaseSchedule;
use crate::timeline::Timeline;

const NOT_AVAILABLE: &str = "N/A";

/// Run metadata that does not come from the metrics themselves.
#[derive(Debug, Clone, Default)]
pub struct RunInfo {
    pub app_name: Option<String>,
    pub run_name: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutiveSummary {
    pub app_name: String,
    pub run_name: String,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub duration_secs: u64,
    pub total_requests: u64,
    pub total_failures: u64,
    /// Share of non-failed requests, two decimals.
    pub pass_pct: String,
    /// `PASS` unless any overall row failed its SLA.
    pub verdict: SlaStatus,
}

impl ExecutiveSummary {
    #[must_use]
    pub fn from_overall(info: &RunInfo, overall: &[SummaryRow]) -> Self {
        let total_requests: u64 = overall.iter().map(|r| r.total_count).sum();
        let total_failures: u64 = overall.iter().map(|r| r.failed_count).sum();
        let duration_secs = match (info.start_time, info.end_time) {
            (Some(start), Some(end)) => u64::try_from((end - start).num_seconds()).unwrap_or(0),
            _ => 0,
        };
        let verdict = if overall.iter().any(SummaryRow::is_fail) {
            SlaStatus::Fail
        } else {
            SlaStatus::Pass
        };

        Self {
            app_name: info
                .app_name
                .clone()
                .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
            run_name: info
                .run_name
                .clone()
                .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
            start_time: info.start_time,
            end_time: info.end_time,
            duration_secs,
            total_requests,
            total_failures,
            pass_pct: format_error_pct(total_requests - total_failures.min(total_requests), total_requests),
            verdict,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaseReport {
    pub index: usize,
    pub name: String,
    pub target: u64,
    /// Window start, seconds from test start.
    pub start_secs: u64,
    pub end_secs: u64,
    pub requests: u64,
    pub rows: Vec<SummaryRow>,
}

impl PhaseReport {
    /// No api recorded anything in this phase.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.requests == 0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioReport {
    pub name: String,
    pub rows: Vec<SummaryRow>,
    pub phases: Vec<PhaseReport>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiFailures {
    pub api: String,
    pub failures: u64,
}

/// Everything the renderers need, computed once after the run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub summary: ExecutiveSummary,
    /// Whether any SLA thresholds were configured; drives the SLA/Target columns.
    pub has_sla: bool,
    pub overall: Vec<SummaryRow>,
    pub scenarios: Vec<ScenarioReport>,
    pub error_distribution: Vec<ErrorRow>,
    pub api_failures: Vec<ApiFailures>,
    pub dropped_recordings: u64,
    /// Per-interval series, present when the results carried timestamps.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeline: Option<Timeline>,
}

impl Report {
    #[must_use]
    pub fn has_sla_failures(&self) -> bool {
        self.summary.verdict == SlaStatus::Fail
    }

    #[must_use]
    pub fn with_timeline(mut self, timeline: Timeline) -> Self {
        self.timeline = Some(timeline);
        self
    }

    pub fn failing_apis(&self) -> impl Iterator<Item = &str> + '_ {
        self.overall
            .iter()
            .filter(|r| r.is_fail())
            .map(|r| r.api.as_str())
    }
}

/// Builds the full report from a registry that is no longer being written to.
#[must_use]
pub fn build_report(registry: &MetricRegistry, plan: &TestPlan, info: &RunInfo) -> Report {
    let scenario_names: Vec<&str> = plan.scenarios.iter().map(|s| s.name.as_str()).collect();
    let overall = build_overall_table(registry, &plan.sla, &plan.apis, &scenario_names);

    let scenarios = plan
        .scenarios
        .iter()
        .map(|s| {
            let phases = PhaseSchedule::new(s)
                .windows(s)
                .into_iter()
                .map(|w| {
                    let rows = build_phase_table(registry, &s.name, w.index, &plan.sla, &plan.apis);
                    PhaseReport {
                        index: w.index,
                        name: w.name,
                        target: w.target,
                        start_secs: w.start.as_secs(),
                        end_secs: w.end.as_secs(),
                        requests: rows.iter().map(|r| r.total_count).sum(),
                        rows,
                    }
                })
                .collect();

            ScenarioReport {
                name: s.name.clone(),
                rows: build_scenario_table(registry, &s.name, &plan.sla, &plan.apis),
                phases,
            }
        })
        .collect();

    let api_failures = overall
        .iter()
        .filter(|r| r.failed_count > 0)
        .map(|r| ApiFailures {
            api: r.api.clone(),
            failures: r.failed_count,
        })
        .collect();

    let report = Report {
        summary: ExecutiveSummary::from_overall(info, &overall),
        has_sla: !plan.sla.is_empty(),
        error_distribution: build_error_distribution(registry, &plan.apis, &scenario_names),
        overall,
        scenarios,
        api_failures,
        dropped_recordings: registry.dropped_recordings(),
        timeline: None,
    };

    tracing::debug!(
        requests = report.summary.total_requests,
        failures = report.summary.total_failures,
        verdict = %report.summary.verdict,
        "report built"
    );
    report
}
