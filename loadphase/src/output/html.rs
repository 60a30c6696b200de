//! Self-contained HTML report: inline CSS, no scripts, no external assets.

use std::fmt::Write as _;

use loadphase_core::timeline::Timeline;
use loadphase_core::{Report, SummaryRow};

const STYLE: &str = "body{font-family:system-ui,sans-serif;margin:2rem;background:#f6f7f9;color:#222}\
h1{margin-bottom:.25rem}h2{margin-top:2rem}h3{margin:1.25rem 0 .5rem;font-size:1rem}\
.meta span{margin-right:1.5rem}\
.cards{display:flex;gap:1rem;flex-wrap:wrap;margin:1rem 0}\
.card{background:#fff;border-radius:8px;padding:.75rem 1.25rem;box-shadow:0 1px 3px rgba(0,0,0,.08);min-width:8rem}\
.card h6{margin:0;color:#666;font-weight:normal}.card div{font-size:1.4rem;font-family:monospace}\
table{border-collapse:collapse;background:#fff;margin:.5rem 0}\
th,td{padding:.3rem .7rem;border-bottom:1px solid #e3e5e8;text-align:right;font-family:monospace}\
th:first-child,td:first-child{text-align:left}\
tr.fail td{background:#fde8e8;color:#b00020}.pass{color:#137333}.fail-text{color:#b00020}\
.empty{color:#888;font-style:italic}";

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

fn ms(v: Option<f64>) -> String {
    v.map_or_else(|| "-".to_string(), |v| format!("{v:.2}"))
}

fn verdict_class(fail: bool) -> &'static str {
    if fail { "fail-text" } else { "pass" }
}

fn summary_table(rows: &[SummaryRow], with_sla: bool) -> String {
    let mut cols = vec!["Transaction"];
    if with_sla {
        cols.push("SLA (P90)");
    }
    cols.extend(["Min", "Max", "Avg", "P90", "P95", "P99"]);
    if with_sla {
        cols.push("Target");
    }
    cols.extend(["Achieved", "Pass", "Fail", "Error %", "Status"]);

    let header: String = cols.iter().map(|c| format!("<th>{c}</th>")).collect();

    let body: String = rows
        .iter()
        .map(|r| {
            let mut row = format!("<td>{}</td>", html_escape(&r.api));
            if with_sla {
                let sla = r
                    .sla_threshold
                    .map_or_else(|| "N/A".to_string(), |v| format!("{v:.2}ms"));
                write!(&mut row, "<td>{sla}</td>").ok();
            }
            for v in [r.min, r.max, r.avg, r.p90, r.p95, r.p99] {
                write!(&mut row, "<td>{}</td>", ms(v)).ok();
            }
            if with_sla {
                let target = r
                    .target_count
                    .map_or_else(|| "N/A".to_string(), |v| v.to_string());
                write!(&mut row, "<td>{target}</td>").ok();
            }
            write!(
                &mut row,
                "<td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td>",
                r.total_count, r.passed_count, r.failed_count, r.error_pct, r.status
            )
            .ok();

            let class = if r.is_fail() { " class=\"fail\"" } else { "" };
            format!("<tr{class}>{row}</tr>\n")
        })
        .collect();

    format!("<table><thead><tr>{header}</tr></thead><tbody>\n{body}</tbody></table>\n")
}

fn timeline_section(timeline: &Timeline) -> String {
    let mut out = format!("<h2>Timeline ({}s intervals)</h2>\n", timeline.interval_secs);
    for api in timeline.apis.iter().filter(|a| !a.rows.is_empty()) {
        let rows: String = api
            .rows
            .iter()
            .map(|r| {
                let statuses = r
                    .statuses
                    .iter()
                    .map(|(code, n)| format!("{code}:{n}"))
                    .collect::<Vec<_>>()
                    .join(" ");
                let class = if r.failures > 0 { " class=\"fail\"" } else { "" };
                format!(
                    "<tr{class}><td>{}s</td><td>{}</td><td>{:.2}</td><td>{}</td><td>{}</td><td>{:.2}</td><td>{:.2}</td><td>{:.2}</td><td>{:.2}</td><td>{statuses}</td></tr>\n",
                    r.offset_secs, r.requests, r.rps, r.failures, r.error_pct, r.avg, r.p90, r.p95, r.max
                )
            })
            .collect();
        write!(
            &mut out,
            "<h3>{}</h3>\n<table><thead><tr><th>Offset</th><th>Reqs</th><th>RPS</th><th>Fail</th><th>Error %</th><th>Avg</th><th>P90</th><th>P95</th><th>Max</th><th>Statuses</th></tr></thead><tbody>\n{rows}</tbody></table>\n",
            html_escape(&api.api)
        )
        .ok();
    }
    out
}

fn card(title: &str, value: &str, class: &str) -> String {
    format!(
        "<div class=\"card\"><h6>{}</h6><div class=\"{class}\">{}</div></div>",
        html_escape(title),
        html_escape(value)
    )
}

pub(crate) fn render_html(report: &Report) -> String {
    let s = &report.summary;
    let time = |t: Option<chrono::DateTime<chrono::Utc>>| {
        t.map_or_else(|| "N/A".to_string(), |t| t.format("%H:%M:%S").to_string())
    };
    let failed = report.has_sla_failures();

    let cards = [
        card("Start Time", &time(s.start_time), ""),
        card("End Time", &time(s.end_time), ""),
        card("Duration", &format!("{}s", s.duration_secs), ""),
        card("Total Req", &s.total_requests.to_string(), ""),
        card("Pass %", &format!("{}%", s.pass_pct), "pass"),
        card("Verdict", &s.verdict.to_string(), verdict_class(failed)),
    ]
    .concat();

    let mut scenarios = String::new();
    for sc in &report.scenarios {
        write!(
            &mut scenarios,
            "<h2>Scenario: {}</h2>\n{}",
            html_escape(&sc.name),
            summary_table(&sc.rows, report.has_sla)
        )
        .ok();
        for p in &sc.phases {
            write!(
                &mut scenarios,
                "<h3>Phase {}/{}: {} ({}s &ndash; {}s, target {})</h3>\n",
                p.index + 1,
                sc.phases.len(),
                html_escape(&p.name),
                p.start_secs,
                p.end_secs,
                p.target
            )
            .ok();
            if p.is_empty() {
                scenarios.push_str("<p class=\"empty\">No requests recorded in this phase.</p>\n");
            } else {
                scenarios.push_str(&summary_table(&p.rows, report.has_sla));
            }
        }
    }

    let failure_rows: String = if report.api_failures.is_empty() {
        "<tr><td>None</td><td>0</td></tr>".to_string()
    } else {
        report
            .api_failures
            .iter()
            .map(|f| {
                format!(
                    "<tr><td>{}</td><td class=\"fail-text\">{}</td></tr>",
                    html_escape(&f.api),
                    f.failures
                )
            })
            .collect()
    };

    let distribution: String = if report.error_distribution.is_empty() {
        "<p class=\"empty\">No tracked error status codes.</p>".to_string()
    } else {
        let rows: String = report
            .error_distribution
            .iter()
            .map(|e| {
                format!(
                    "<tr><td>{}</td><td>{}</td><td>{}</td><td>{:.2}</td></tr>",
                    html_escape(&e.api),
                    e.status_code,
                    e.count,
                    e.pct
                )
            })
            .collect();
        format!(
            "<table><thead><tr><th>API</th><th>Status</th><th>Count</th><th>Share %</th></tr></thead><tbody>{rows}</tbody></table>"
        )
    };

    let timeline = report
        .timeline
        .as_ref()
        .filter(|t| !t.is_empty())
        .map(timeline_section)
        .unwrap_or_default();

    format!(
        r#"<!DOCTYPE html>
<html lang="en"><head><meta charset="utf-8"><title>Load Summary Report</title>
<style>{STYLE}</style></head>
<body>
<h1>Load Summary Report</h1>
<div class="meta"><span><strong>Application:</strong> {app}</span><span><strong>Run Name:</strong> {run}</span></div>
<div class="cards">{cards}</div>
<h2>Transaction Summary</h2>
{overall}
{scenarios}
<h2>Error Summary</h2>
<table><thead><tr><th>API</th><th>Failures</th></tr></thead><tbody>{failure_rows}</tbody></table>
<h2>Status Code Distribution</h2>
{distribution}
{timeline}</body></html>
"#,
        app = html_escape(&s.app_name),
        run = html_escape(&s.run_name),
        overall = summary_table(&report.overall, report.has_sla),
    )
}
