use std::sync::Arc;

use loadphase_metrics::{MetricRegistry, Outcome, Recorder, ScenarioLayout, TrackedStatus};

const WORKERS: usize = 16;
const PER_WORKER: usize = 2_000;

fn registry() -> Arc<MetricRegistry> {
    let reg = MetricRegistry::initialize(
        ["login", "search"],
        [
            ScenarioLayout {
                name: "ramp",
                phases: 3,
            },
            ScenarioLayout {
                name: "steady",
                phases: 1,
            },
        ],
    )
    .unwrap_or_else(|e| panic!("initialize: {e}"));
    Arc::new(reg)
}

#[test]
fn concurrent_workers_lose_no_updates() {
    let reg = registry();

    std::thread::scope(|scope| {
        for worker in 0..WORKERS {
            let recorder = Recorder::new(reg.clone());
            scope.spawn(move || {
                for i in 0..PER_WORKER {
                    let api = if i % 2 == 0 { "login" } else { "search" };
                    let phase = Some((worker + i) % 3);
                    let status = if i % 10 == 0 { 503 } else { 200 };
                    recorder.record(api, "ramp", phase, Outcome::new(status, (i % 50) as f64));
                }
            });
        }
    });

    let total = WORKERS * PER_WORKER;
    let mut scenario_requests = 0;
    let mut scenario_failures = 0;
    let mut phase_requests = 0;

    for api in ["login", "search"] {
        let s = reg
            .snapshot(api, "ramp", None)
            .unwrap_or_else(|| panic!("scenario set for {api}"));
        scenario_requests += s.requests;
        scenario_failures += s.failures;
        assert_eq!(s.failures, s.status_count(TrackedStatus::ServiceUnavailable));

        for p in 0..3 {
            phase_requests += reg
                .snapshot(api, "ramp", Some(p))
                .map(|s| s.requests)
                .unwrap_or_default();
        }
    }

    assert_eq!(scenario_requests as usize, total);
    assert_eq!(phase_requests as usize, total);
    assert_eq!(scenario_failures as usize, total / 10);
    assert_eq!(reg.dropped_recordings(), 0);

    let untouched = reg
        .snapshot("login", "steady", None)
        .unwrap_or_else(|| panic!("steady set"));
    assert_eq!(untouched.requests, 0);
    assert!(untouched.latency.is_none());
}

#[test]
fn latency_extremes_survive_contention() {
    let reg = registry();

    std::thread::scope(|scope| {
        for worker in 0..WORKERS {
            let reg = reg.clone();
            scope.spawn(move || {
                for i in 0..PER_WORKER {
                    let ms = 1.0 + ((worker * PER_WORKER + i) % 1000) as f64;
                    reg.record("search", "steady", Some(0), Outcome::new(200, ms));
                }
            });
        }
    });

    let lat = reg
        .snapshot("search", "steady", Some(0))
        .and_then(|s| s.latency)
        .unwrap_or_else(|| panic!("latency"));
    assert_eq!(lat.min, 1.0);
    assert_eq!(lat.max, 1000.0);
    assert!((lat.mean - 500.5).abs() < 1e-6, "mean={}", lat.mean);
    assert!(lat.p90 >= 890.0 && lat.p90 <= 910.0, "p90={}", lat.p90);
}
