use std::fmt::Write as _;

use loadphase_core::{IngestStats, Report};

use super::format::{Table, format_secs, summary_table, timeline_table};

const NO_PHASE_REQUESTS: &str = "no requests recorded in this phase";

fn format_time(t: Option<chrono::DateTime<chrono::Utc>>) -> String {
    t.map_or_else(|| "N/A".to_string(), |t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
}

pub(crate) fn render(report: &Report, ingest: &IngestStats, color: bool) -> String {
    let mut out = String::new();
    let s = &report.summary;

    out.push_str("Load Summary Report\n");
    writeln!(&mut out, "  application: {}  run: {}", s.app_name, s.run_name).ok();
    writeln!(
        &mut out,
        "  start: {}  end: {}  duration: {}s",
        format_time(s.start_time),
        format_time(s.end_time),
        s.duration_secs
    )
    .ok();
    writeln!(
        &mut out,
        "  requests: {}  failures: {}  pass: {}%  verdict: {}",
        s.total_requests, s.total_failures, s.pass_pct, s.verdict
    )
    .ok();
    writeln!(
        &mut out,
        "  ingest: lines={} points={} recorded={} unmatched={} malformed={}",
        ingest.lines,
        ingest.points,
        ingest.recorded,
        ingest.unmatched(),
        ingest.malformed
    )
    .ok();
    if report.dropped_recordings > 0 {
        writeln!(&mut out, "  dropped recordings: {}", report.dropped_recordings).ok();
    }
    out.push('\n');

    out.push_str("Transaction Summary (all scenarios)\n");
    summary_table(&report.overall, report.has_sla).render(&mut out, "", color);
    out.push('\n');

    for scenario in &report.scenarios {
        writeln!(&mut out, "Scenario: {}", scenario.name).ok();
        summary_table(&scenario.rows, report.has_sla).render(&mut out, "", color);

        let count = scenario.phases.len();
        for phase in &scenario.phases {
            writeln!(
                &mut out,
                "\n  Phase {}/{}: {} [{} - {}] target={}",
                phase.index + 1,
                count,
                phase.name,
                format_secs(phase.start_secs),
                format_secs(phase.end_secs),
                phase.target
            )
            .ok();
            if phase.is_empty() {
                writeln!(&mut out, "    {NO_PHASE_REQUESTS}").ok();
            } else {
                summary_table(&phase.rows, report.has_sla).render(&mut out, "  ", color);
            }
        }
        out.push('\n');
    }

    out.push_str("Error Summary\n");
    let mut failures = Table::new(["API", "Failures"]);
    if report.api_failures.is_empty() {
        failures.push(vec!["None".to_string(), "0".to_string()], false);
    }
    for f in &report.api_failures {
        failures.push(vec![f.api.clone(), f.failures.to_string()], false);
    }
    failures.render(&mut out, "", color);
    out.push('\n');

    out.push_str("Status Code Distribution\n");
    if report.error_distribution.is_empty() {
        out.push_str("  none\n");
    } else {
        let mut codes = Table::new(["API", "Status", "Count", "Share %"]);
        for e in &report.error_distribution {
            codes.push(
                vec![
                    e.api.clone(),
                    e.status_code.to_string(),
                    e.count.to_string(),
                    format!("{:.2}", e.pct),
                ],
                false,
            );
        }
        codes.render(&mut out, "", color);
    }

    if let Some(timeline) = report.timeline.as_ref().filter(|t| !t.is_empty()) {
        writeln!(
            &mut out,
            "\nTimeline ({} intervals)",
            format_secs(timeline.interval_secs)
        )
        .ok();
        for api in timeline.apis.iter().filter(|a| !a.rows.is_empty()) {
            writeln!(&mut out, "  {}", api.api).ok();
            timeline_table(&api.rows).render(&mut out, "  ", color);
        }
    }

    out
}
