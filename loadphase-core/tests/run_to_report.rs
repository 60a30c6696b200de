use std::io::BufReader;
use std::time::Duration;

use anyhow::Context as _;

use loadphase_core::aggregate::{build_overall_table, build_scenario_table};
use loadphase_core::{
    Error, Outcome, RunInfo, RunMetrics, SlaStatus, TestPlan, build_report, ingest,
};

const PLAN: &str = r#"
apis: [login, search]
scenarios:
  light:
    phases:
      - { name: ramp, duration: 10s, target: 5 }
      - { name: hold, duration: 10s, target: 5 }
  heavy:
    startTime: 5s
    phases:
      - { duration: 20s, target: 50 }
sla:
  login: { p90: 200 }
  search: { p90: 50 }
"#;

fn plan() -> anyhow::Result<TestPlan> {
    TestPlan::from_yaml_str(PLAN).context("parse plan")
}

#[test]
fn concurrent_workers_then_report() -> anyhow::Result<()> {
    let plan = plan()?;
    let run = RunMetrics::new(&plan)?;

    std::thread::scope(|s| {
        for worker in 0..8u64 {
            let rec = run.recorder();
            s.spawn(move || {
                for i in 0..500u64 {
                    let elapsed = Duration::from_millis((worker * 500 + i) * 5);
                    let status = if i % 50 == 0 { 500 } else { 200 };
                    rec.record_at("login", "light", elapsed, Outcome::new(status, 100.0));
                    rec.record_at("search", "heavy", elapsed, Outcome::new(200, 20.0));
                }
            });
        }
    });

    let registry = run.finish().map_err(|(_, e)| e)?;
    let scenarios = ["light", "heavy"];

    let light = build_scenario_table(&registry, "light", &plan.sla, &plan.apis);
    assert_eq!(light[0].total_count, 4000);
    assert_eq!(light[0].failed_count, 80);
    assert_eq!(light[0].error_pct, "2.00");
    assert_eq!(light[1].total_count, 0);
    assert_eq!(light[1].status, SlaStatus::NotApplicable);

    // elapsed spans 0..20s, so every light request lands in ramp or hold
    let phase_sum: u64 = (0..2)
        .filter_map(|p| registry.set("login", "light", Some(p)))
        .map(|s| s.requests())
        .sum();
    assert_eq!(phase_sum, 4000);

    let overall = build_overall_table(&registry, &plan.sla, &plan.apis, &scenarios);
    for (i, api) in plan.apis.iter().enumerate() {
        let per_scenario: u64 = scenarios
            .iter()
            .filter_map(|s| registry.set(api, s, None))
            .map(|s| s.requests())
            .sum();
        assert_eq!(overall[i].total_count, per_scenario);
    }
    assert_eq!(overall[0].p90, Some(100.0));
    assert_eq!(overall[0].status, SlaStatus::Pass);
    assert_eq!(overall[1].p90, Some(20.0));
    assert_eq!(registry.dropped_recordings(), 0);
    Ok(())
}

#[test]
fn finish_refuses_while_recorders_live() -> anyhow::Result<()> {
    let run = RunMetrics::new(&plan()?)?;
    let a = run.recorder();
    let b = a.clone();

    let run = match run.finish() {
        Ok(_) => anyhow::bail!("finish succeeded with live recorders"),
        Err((run, Error::RecordingInFlight(n))) => {
            assert_eq!(n, 2);
            run
        }
        Err((_, e)) => return Err(e.into()),
    };

    drop(a);
    drop(b);
    run.finish().map_err(|(_, e)| e)?;
    Ok(())
}

#[test]
fn overall_p90_is_unweighted_across_scenarios() -> anyhow::Result<()> {
    let plan = plan()?;
    let run = RunMetrics::new(&plan)?;
    let rec = run.recorder();

    rec.record_at("login", "light", Duration::from_secs(1), Outcome::new(200, 100.0));
    for _ in 0..99 {
        rec.record_at("login", "heavy", Duration::from_secs(6), Outcome::new(200, 300.0));
    }
    drop(rec);

    let registry = run.finish().map_err(|(_, e)| e)?;
    let report = build_report(&registry, &plan, &RunInfo::default());

    let login = &report.overall[0];
    assert_eq!(login.total_count, 100);
    assert_eq!(login.p90, Some(200.0));
    assert_eq!(login.min, Some(100.0));
    assert_eq!(login.max, Some(300.0));
    assert_eq!(login.status, SlaStatus::Pass);
    assert!(!report.has_sla_failures());
    Ok(())
}

#[test]
fn p90_just_over_threshold_fails() -> anyhow::Result<()> {
    let plan = plan()?;
    let run = RunMetrics::new(&plan)?;
    let rec = run.recorder();

    rec.record_at("login", "light", Duration::from_secs(1), Outcome::new(200, 1.0));
    for _ in 0..98 {
        rec.record_at("login", "light", Duration::from_secs(1), Outcome::new(200, 200.3));
    }
    rec.record_at("login", "light", Duration::from_secs(1), Outcome::new(200, 400.0));
    drop(rec);

    let registry = run.finish().map_err(|(_, e)| e)?;
    let light = build_scenario_table(&registry, "light", &plan.sla, &plan.apis);
    let p90 = light[0].p90.context("login p90")?;
    assert!(p90 >= 200.3, "p90 {p90}");
    assert_eq!(light[0].status, SlaStatus::Fail);
    Ok(())
}

#[test]
fn replays_k6_file_from_disk() -> anyhow::Result<()> {
    let plan = plan()?;
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("results.ndjson");
    let lines = [
        r#"{"type":"Point","metric":"http_req_duration","data":{"time":"2024-05-01T12:00:00Z","value":300,"tags":{"group":"::login","scenario":"light","status":"200"}}}"#,
        r#"{"type":"Point","metric":"http_req_duration","data":{"time":"2024-05-01T12:00:12Z","value":80,"tags":{"name":"search","scenario":"light","status":"401"}}}"#,
        r#"{"type":"Point","metric":"http_reqs","data":{"time":"2024-05-01T12:00:12Z","value":1,"tags":{}}}"#,
    ];
    std::fs::write(&path, lines.join("\n"))?;

    let first = ingest::survey(BufReader::new(std::fs::File::open(&path)?))?;
    let start = first.first_time.context("no points")?;

    let run = RunMetrics::new(&plan)?;
    let rec = run.recorder();
    let stats = ingest::replay(BufReader::new(std::fs::File::open(&path)?), &rec, start, None)?;
    drop(rec);
    assert_eq!(stats.recorded, 2);
    assert_eq!(stats.skipped, 1);

    let registry = run.finish().map_err(|(_, e)| e)?;
    let report = build_report(
        &registry,
        &plan,
        &RunInfo {
            start_time: Some(start),
            end_time: stats.last_time,
            ..RunInfo::default()
        },
    );

    assert_eq!(report.summary.duration_secs, 12);
    assert!(report.has_sla_failures());
    assert_eq!(report.failing_apis().collect::<Vec<_>>(), ["login", "search"]);

    let light = &report.scenarios[0];
    assert_eq!(light.phases[0].rows[0].total_count, 1);
    assert_eq!(light.phases[1].rows[1].total_count, 1);
    assert_eq!(report.error_distribution.len(), 1);
    assert_eq!(report.error_distribution[0].status_code, 401);
    assert_eq!(report.error_distribution[0].pct, 100.0);
    Ok(())
}
