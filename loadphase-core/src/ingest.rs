//! Replays k6 NDJSON results (`k6 run --out json=...`) through the recorder.
//!
//! Only `http_req_duration` points are recorded. The api name comes from the
//! `group` tag (with `::` stripped), then `name`, then `url`; the scenario from
//! the `scenario` tag. A group that is empty once `::` is stripped falls back
//! like a missing one. Lines that are not valid UTF-8 or JSON are counted and
//! skipped.

use std::collections::{HashMap, HashSet};
use std::io::BufRead;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use loadphase_metrics::Outcome;

use crate::error::{Error, Result};
use crate::run::RunRecorder;
use crate::timeline::TimelineBuilder;

pub const DURATION_METRIC: &str = "http_req_duration";
pub const DEFAULT_SCENARIO: &str = "default";
pub const UNKNOWN_API: &str = "unknown";

/// Counters collected while reading a results file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestStats {
    /// Non-blank lines read.
    pub lines: u64,
    /// `http_req_duration` points found.
    pub points: u64,
    /// Points that landed in a registered api/scenario.
    pub recorded: u64,
    /// Valid lines that are not duration points.
    pub skipped: u64,
    pub malformed: u64,
    pub first_time: Option<DateTime<Utc>>,
    pub last_time: Option<DateTime<Utc>>,
}

impl IngestStats {
    fn observe_time(&mut self, t: DateTime<Utc>) {
        self.first_time = Some(self.first_time.map_or(t, |f| f.min(t)));
        self.last_time = Some(self.last_time.map_or(t, |l| l.max(t)));
    }

    /// Points whose api or scenario is not part of the plan.
    #[must_use]
    pub fn unmatched(&self) -> u64 {
        self.points.saturating_sub(self.recorded)
    }
}

#[derive(Debug, Deserialize)]
struct Line {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    metric: String,
    #[serde(default)]
    data: Value,
}

#[derive(Debug, Deserialize)]
struct PointData {
    time: String,
    value: f64,
    #[serde(default)]
    tags: HashMap<String, Value>,
}

/// One request duration sample.
#[derive(Debug, Clone, PartialEq)]
pub struct Point {
    pub api: String,
    pub scenario: String,
    pub status_code: u16,
    pub duration_ms: f64,
    pub time: DateTime<Utc>,
}

impl Point {
    #[must_use]
    pub fn outcome(&self) -> Outcome {
        Outcome::new(self.status_code, self.duration_ms)
    }
}

enum Parsed {
    Blank,
    Other,
    Point(Point),
}

fn tag<'a>(tags: &'a HashMap<String, Value>, name: &str) -> Option<&'a str> {
    tags.get(name)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}

fn status_tag(tags: &HashMap<String, Value>) -> u16 {
    match tags.get("status") {
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0),
        Some(Value::Number(n)) => n.as_u64().and_then(|n| u16::try_from(n).ok()).unwrap_or(0),
        _ => 0,
    }
}

pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|_| Error::InvalidTimestamp(raw.to_string()))
}

fn parse_line(line: &str) -> Result<Parsed> {
    if line.trim().is_empty() {
        return Ok(Parsed::Blank);
    }

    let line: Line = serde_json::from_str(line)?;
    if line.kind != "Point" || line.metric != DURATION_METRIC {
        return Ok(Parsed::Other);
    }
    let data: PointData = serde_json::from_value(line.data)?;

    let api = tag(&data.tags, "group")
        .map(|g| g.replace("::", ""))
        .filter(|g| !g.is_empty())
        .or_else(|| tag(&data.tags, "name").map(str::to_string))
        .or_else(|| tag(&data.tags, "url").map(str::to_string))
        .unwrap_or_else(|| UNKNOWN_API.to_string());

    Ok(Parsed::Point(Point {
        api,
        scenario: tag(&data.tags, "scenario")
            .unwrap_or(DEFAULT_SCENARIO)
            .to_string(),
        status_code: status_tag(&data.tags),
        duration_ms: data.value,
        time: parse_timestamp(&data.time)?,
    }))
}

fn decode(raw: &[u8]) -> Result<Parsed> {
    let line = std::str::from_utf8(raw).map_err(|_| Error::InvalidUtf8)?;
    parse_line(line)
}

/// Walks every line, handing duration points to `on_point`.
fn scan<R, F>(mut reader: R, mut on_point: F) -> Result<IngestStats>
where
    R: BufRead,
    F: FnMut(&Point),
{
    let mut stats = IngestStats::default();
    let mut buf = Vec::new();
    let mut n = 0usize;

    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            break;
        }
        n += 1;

        match decode(&buf) {
            Ok(Parsed::Blank) => continue,
            Ok(Parsed::Other) => {
                stats.lines += 1;
                stats.skipped += 1;
            }
            Ok(Parsed::Point(p)) => {
                stats.lines += 1;
                stats.points += 1;
                stats.observe_time(p.time);
                on_point(&p);
            }
            Err(e) => {
                stats.lines += 1;
                stats.malformed += 1;
                tracing::debug!(line = n, error = %e, "skipping malformed result line");
            }
        }
    }

    Ok(stats)
}

/// Reads the file once without recording anything.
pub fn survey<R: BufRead>(reader: R) -> Result<IngestStats> {
    scan(reader, |_| {})
}

/// Api names in first-seen order.
pub fn discover_apis<R: BufRead>(reader: R) -> Result<Vec<String>> {
    let mut seen = HashSet::new();
    let mut apis = Vec::new();
    scan(reader, |p| {
        if seen.insert(p.api.clone()) {
            apis.push(p.api.clone());
        }
    })?;
    Ok(apis)
}

/// Records every duration point, attributing phases by `point time - test_start`.
///
/// Points timestamped before `test_start` only count towards their scenario.
/// Points that land in a registered api/scenario also feed `timeline`.
pub fn replay<R: BufRead>(
    reader: R,
    recorder: &RunRecorder,
    test_start: DateTime<Utc>,
    mut timeline: Option<&mut TimelineBuilder>,
) -> Result<IngestStats> {
    let mut recorded = 0u64;

    let mut stats = scan(reader, |p| {
        if recorder.is_registered(&p.api, &p.scenario) {
            recorded += 1;
            if let Some(t) = timeline.as_deref_mut() {
                t.observe(p);
            }
        }

        match (p.time - test_start).to_std() {
            Ok(elapsed) => recorder.record_at(&p.api, &p.scenario, elapsed, p.outcome()),
            Err(_) => recorder.record_unphased(&p.api, &p.scenario, p.outcome()),
        }
    })?;
    stats.recorded = recorded;

    tracing::info!(
        lines = stats.lines,
        points = stats.points,
        recorded = stats.recorded,
        unmatched = stats.unmatched(),
        malformed = stats.malformed,
        "replayed k6 results"
    );
    Ok(stats)
}
