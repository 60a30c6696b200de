use std::fmt::Write as _;

use loadphase_core::SummaryRow;
use loadphase_core::timeline::IntervalRow;

const RED: &str = "\x1b[31m";
const RESET: &str = "\x1b[0m";
const FAIL_MARKER: &str = "! ";
const NO_MARKER: &str = "  ";

pub(crate) fn format_ms(v: Option<f64>) -> String {
    match v {
        Some(v) if v.is_finite() => format!("{v:.2}"),
        _ => "-".to_string(),
    }
}

pub(crate) fn format_threshold(v: Option<f64>) -> String {
    match v {
        Some(v) => format!("{v:.2}ms"),
        None => "N/A".to_string(),
    }
}

pub(crate) fn format_count_opt(v: Option<u64>) -> String {
    v.map_or_else(|| "N/A".to_string(), |v| v.to_string())
}

pub(crate) fn format_secs(secs: u64) -> String {
    loadphase_core::duration::format_duration_secs(secs)
}

/// Fixed-width text table. The first column is left aligned, the rest right
/// aligned. Highlighted rows get a leading marker and, with colour on, red text.
pub(crate) struct Table {
    headers: Vec<String>,
    rows: Vec<(Vec<String>, bool)>,
}

impl Table {
    pub(crate) fn new<I, S>(headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            headers: headers.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    pub(crate) fn push(&mut self, cells: Vec<String>, highlight: bool) {
        self.rows.push((cells, highlight));
    }

    fn widths(&self) -> Vec<usize> {
        let mut widths: Vec<usize> = self.headers.iter().map(|h| h.chars().count()).collect();
        for (cells, _) in &self.rows {
            for (i, c) in cells.iter().enumerate() {
                let w = c.chars().count();
                match widths.get_mut(i) {
                    Some(cur) => *cur = (*cur).max(w),
                    None => widths.push(w),
                }
            }
        }
        widths
    }

    fn line(cells: &[String], widths: &[usize]) -> String {
        let mut line = String::new();
        for (i, width) in widths.iter().enumerate() {
            let cell = cells.get(i).map_or("", String::as_str);
            if i == 0 {
                write!(&mut line, "{cell:<width$}").ok();
            } else {
                write!(&mut line, "  {cell:>width$}").ok();
            }
        }
        line.trim_end().to_string()
    }

    pub(crate) fn render(&self, out: &mut String, indent: &str, color: bool) {
        let widths = self.widths();

        writeln!(out, "{indent}{NO_MARKER}{}", Self::line(&self.headers, &widths)).ok();
        let rule: usize = widths.iter().sum::<usize>() + 2 * widths.len().saturating_sub(1);
        writeln!(out, "{indent}{NO_MARKER}{}", "-".repeat(rule)).ok();

        for (cells, highlight) in &self.rows {
            let line = Self::line(cells, &widths);
            match (highlight, color) {
                (true, true) => writeln!(out, "{indent}{RED}{FAIL_MARKER}{line}{RESET}").ok(),
                (true, false) => writeln!(out, "{indent}{FAIL_MARKER}{line}").ok(),
                (false, _) => writeln!(out, "{indent}{NO_MARKER}{line}").ok(),
            };
        }
    }
}

/// `-10` -> `"-10s"`, `90` -> `"1m30s"`.
pub(crate) fn format_offset(secs: i64) -> String {
    let abs = format_secs(secs.unsigned_abs());
    if secs < 0 { format!("-{abs}") } else { abs }
}

/// `"200:10 503:1"`, ascending by code.
pub(crate) fn format_statuses<'a>(statuses: impl IntoIterator<Item = (&'a u16, &'a u64)>) -> String {
    statuses
        .into_iter()
        .map(|(code, n)| format!("{code}:{n}"))
        .collect::<Vec<_>>()
        .join(" ")
}

/// One api's per-interval series; intervals with failures are highlighted.
pub(crate) fn timeline_table(rows: &[IntervalRow]) -> Table {
    let mut table = Table::new([
        "Offset", "Reqs", "RPS", "Fail", "Error %", "Avg", "P90", "P95", "Max", "Statuses",
    ]);
    for r in rows {
        let mut cells = vec![
            format_offset(r.offset_secs),
            r.requests.to_string(),
            format!("{:.2}", r.rps),
            r.failures.to_string(),
            r.error_pct.clone(),
        ];
        cells.extend([r.avg, r.p90, r.p95, r.max].map(|v| format_ms(Some(v))));
        cells.push(format_statuses(&r.statuses));
        table.push(cells, r.failures > 0);
    }
    table
}

/// Column layout shared by the overall, scenario and phase tables.
pub(crate) fn summary_table(rows: &[SummaryRow], with_sla: bool) -> Table {
    let mut headers = vec!["Transaction"];
    if with_sla {
        headers.push("SLA (P90)");
    }
    headers.extend(["Min", "Max", "Avg", "P90", "P95", "P99"]);
    if with_sla {
        headers.push("Target");
    }
    headers.extend(["Achieved", "Pass", "Fail", "Error %", "Status"]);

    let mut table = Table::new(headers);
    for r in rows {
        let mut cells = vec![r.api.clone()];
        if with_sla {
            cells.push(format_threshold(r.sla_threshold));
        }
        cells.extend([r.min, r.max, r.avg, r.p90, r.p95, r.p99].map(format_ms));
        if with_sla {
            cells.push(format_count_opt(r.target_count));
        }
        cells.extend([
            r.total_count.to_string(),
            r.passed_count.to_string(),
            r.failed_count.to_string(),
            r.error_pct.clone(),
            r.status.to_string(),
        ]);
        table.push(cells, r.is_fail());
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_cells() {
        assert_eq!(format_ms(Some(12.345)), "12.35");
        assert_eq!(format_ms(None), "-");
        assert_eq!(format_threshold(Some(250.0)), "250.00ms");
        assert_eq!(format_threshold(None), "N/A");
        assert_eq!(format_count_opt(None), "N/A");
        assert_eq!(format_secs(90), "1m30s");
        assert_eq!(format_offset(-10), "-10s");
        assert_eq!(format_offset(70), "1m10s");
    }

    #[test]
    fn timeline_rows_show_statuses_and_flag_failures() {
        let row = IntervalRow {
            offset_secs: 10,
            requests: 4,
            failures: 1,
            rps: 0.4,
            error_pct: "25.00".to_string(),
            avg: 12.5,
            p90: 20.0,
            p95: 20.0,
            max: 20.0,
            statuses: [(200, 3), (503, 1)].into_iter().collect(),
        };
        let mut out = String::new();
        timeline_table(&[row]).render(&mut out, "", false);
        let last = out.lines().last().unwrap_or_default();
        assert!(last.starts_with("! 10s"), "{last}");
        assert!(last.ends_with("200:3 503:1"), "{last}");
        assert!(last.contains("0.40"));
    }

    #[test]
    fn table_aligns_columns() {
        let mut t = Table::new(["Name", "Count"]);
        t.push(vec!["a".to_string(), "1".to_string()], false);
        t.push(vec!["longer".to_string(), "1000".to_string()], true);

        let mut out = String::new();
        t.render(&mut out, "", false);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "  Name    Count");
        assert_eq!(lines[1], "  -------------");
        assert_eq!(lines[2], "  a           1");
        assert_eq!(lines[3], "! longer   1000");
    }

    #[test]
    fn colour_wraps_highlighted_rows() {
        let mut t = Table::new(["Name"]);
        t.push(vec!["x".to_string()], true);
        let mut out = String::new();
        t.render(&mut out, "", true);
        assert!(out.contains("\x1b[31m! x\x1b[0m"));
    }
}
