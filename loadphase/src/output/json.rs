use serde::Serialize;
use std::io::Write as _;

use loadphase_core::{IngestStats, Report};

use super::OutputFormatter;

pub(crate) struct JsonOutput;

impl OutputFormatter for JsonOutput {
    fn print_report(&self, report: &Report, ingest: &IngestStats) -> anyhow::Result<()> {
        let doc = JsonReport {
            kind: "report",
            report,
            ingest,
        };
        let mut out = std::io::stdout().lock();
        serde_json::to_writer(&mut out, &doc)?;
        writeln!(out)?;
        Ok(())
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct JsonReport<'a> {
    pub kind: &'static str,
    #[serde(flatten)]
    pub report: &'a Report,
    pub ingest: &'a IngestStats,
}

#[cfg(test)]
mod tests {
    use super::*;
    use loadphase_core::{Outcome, RunInfo, TestPlan, build_report, registry_for};
    use serde_json::Value;

    #[test]
    fn report_document_shape() {
        let plan = match TestPlan::from_yaml_str(
            "apis: [login]\nscenarios:\n  smoke:\n    phases:\n      - { duration: 1m, target: 1 }\nsla:\n  login: { p90: 50 }",
        ) {
            Ok(v) => v,
            Err(err) => panic!("plan: {err}"),
        };
        let registry = match registry_for(&plan) {
            Ok(v) => v,
            Err(err) => panic!("registry: {err}"),
        };
        registry.record("login", "smoke", Some(0), Outcome::new(503, 80.0));
        let report = build_report(&registry, &plan, &RunInfo::default());

        let ingest = IngestStats::default();
        let doc = JsonReport {
            kind: "report",
            report: &report,
            ingest: &ingest,
        };
        let v: Value = match serde_json::to_value(&doc) {
            Ok(v) => v,
            Err(err) => panic!("to_value failed: {err}"),
        };

        assert_eq!(v.get("kind").and_then(Value::as_str), Some("report"));
        assert_eq!(
            v.pointer("/summary/verdict").and_then(Value::as_str),
            Some("FAIL")
        );
        assert_eq!(
            v.pointer("/overall/0/status").and_then(Value::as_str),
            Some("FAIL")
        );
        assert_eq!(
            v.pointer("/overall/0/errorPct").and_then(Value::as_str),
            Some("100.00")
        );
        assert_eq!(
            v.pointer("/scenarios/0/phases/0/rows/0/totalCount")
                .and_then(Value::as_u64),
            Some(1)
        );
        assert_eq!(
            v.pointer("/errorDistribution/0/statusCode")
                .and_then(Value::as_u64),
            Some(503)
        );
        assert_eq!(v.pointer("/ingest/points").and_then(Value::as_u64), Some(0));
        assert!(v.get("timeline").is_none());
    }

    #[test]
    fn timeline_is_serialized_when_present() {
        let plan = match TestPlan::from_yaml_str(
            "apis: [login]\nscenarios:\n  smoke:\n    phases:\n      - { duration: 1m, target: 1 }",
        ) {
            Ok(v) => v,
            Err(err) => panic!("plan: {err}"),
        };
        let registry = match registry_for(&plan) {
            Ok(v) => v,
            Err(err) => panic!("registry: {err}"),
        };
        let start = match loadphase_core::ingest::parse_timestamp("2024-05-01T12:00:00Z") {
            Ok(v) => v,
            Err(err) => panic!("time: {err}"),
        };
        let mut b = match loadphase_core::TimelineBuilder::new(start, std::time::Duration::from_secs(5)) {
            Ok(v) => v,
            Err(err) => panic!("builder: {err}"),
        };
        for ms in [10.0, 30.0] {
            b.observe(&loadphase_core::ingest::Point {
                api: "login".to_string(),
                scenario: "smoke".to_string(),
                status_code: 200,
                duration_ms: ms,
                time: start,
            });
        }
        let report = build_report(&registry, &plan, &RunInfo::default())
            .with_timeline(b.finish(&plan.apis));

        let ingest = IngestStats::default();
        let doc = JsonReport {
            kind: "report",
            report: &report,
            ingest: &ingest,
        };
        let v: Value = match serde_json::to_value(&doc) {
            Ok(v) => v,
            Err(err) => panic!("to_value failed: {err}"),
        };

        assert_eq!(v.pointer("/timeline/intervalSecs").and_then(Value::as_u64), Some(5));
        assert_eq!(
            v.pointer("/timeline/apis/0/rows/0/requests").and_then(Value::as_u64),
            Some(2)
        );
        assert_eq!(
            v.pointer("/timeline/apis/0/rows/0/avg").and_then(Value::as_f64),
            Some(20.0)
        );
        assert_eq!(
            v.pointer("/timeline/apis/0/rows/0/statuses/200").and_then(Value::as_u64),
            Some(2)
        );
    }
}
