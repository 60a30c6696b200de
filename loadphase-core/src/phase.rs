use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::config::{ScenarioConfig, TestPlan};

/// Absolute window of one phase, measured from the start of the test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseWindow {
    pub index: usize,
    pub name: String,
    pub start: Duration,
    pub end: Duration,
    pub target: u64,
}

/// Phase boundaries of one scenario, precomputed as cumulative ends.
#[derive(Debug, Clone)]
pub struct PhaseSchedule {
    start_offset: Duration,
    cumulative_ends: Vec<Duration>,
}

impl PhaseSchedule {
    #[must_use]
    pub fn new(config: &ScenarioConfig) -> Self {
        let mut cumulative_ends = Vec::with_capacity(config.phases.len());
        let mut acc = Duration::ZERO;
        for p in &config.phases {
            acc = acc.saturating_add(p.duration);
            cumulative_ends.push(acc);
        }

        Self {
            start_offset: config.start_time,
            cumulative_ends,
        }
    }

    #[must_use]
    pub fn phase_count(&self) -> usize {
        self.cumulative_ends.len()
    }

    /// Total time spent in phases, grace windows excluded.
    #[must_use]
    pub fn phases_duration(&self) -> Duration {
        self.cumulative_ends
            .last()
            .copied()
            .unwrap_or(Duration::ZERO)
    }

    /// Phase index for a request observed `elapsed` after the test started.
    ///
    /// `None` before the scenario's start offset and once every phase has ended
    /// (the grace window). Non-decreasing in `elapsed` until it turns `None`.
    #[must_use]
    pub fn resolve(&self, elapsed: Duration) -> Option<usize> {
        let scenario_elapsed = elapsed.checked_sub(self.start_offset)?;

        // First phase whose cumulative end lies strictly after `scenario_elapsed`.
        let idx = self
            .cumulative_ends
            .partition_point(|end| *end <= scenario_elapsed);

        (idx < self.cumulative_ends.len()).then_some(idx)
    }

    /// Same as [`PhaseSchedule::resolve`], with `elapsed` sampled now.
    #[must_use]
    pub fn resolve_now(&self, test_start: Instant) -> Option<usize> {
        self.resolve(test_start.elapsed())
    }

    #[must_use]
    pub fn windows(&self, config: &ScenarioConfig) -> Vec<PhaseWindow> {
        let mut out = Vec::with_capacity(self.cumulative_ends.len());
        let mut start = self.start_offset;

        for (index, (phase, end)) in config.phases.iter().zip(&self.cumulative_ends).enumerate() {
            let end = self.start_offset.saturating_add(*end);
            out.push(PhaseWindow {
                index,
                name: phase.name.clone(),
                start,
                end,
                target: phase.target,
            });
            start = end;
        }

        out
    }
}

/// Phase lookup for every scenario of a plan.
#[derive(Debug, Clone, Default)]
pub struct PhaseResolver {
    schedules: HashMap<String, PhaseSchedule>,
}

impl PhaseResolver {
    #[must_use]
    pub fn new(plan: &TestPlan) -> Self {
        let schedules = plan
            .scenarios
            .iter()
            .map(|s| (s.name.clone(), PhaseSchedule::new(s)))
            .collect();
        Self { schedules }
    }

    #[must_use]
    pub fn schedule(&self, scenario: &str) -> Option<&PhaseSchedule> {
        self.schedules.get(scenario)
    }

    /// Phase of `scenario` at `elapsed` since test start. Unknown scenarios
    /// resolve to `None`, same as the grace window.
    #[must_use]
    pub fn resolve(&self, scenario: &str, elapsed: Duration) -> Option<usize> {
        self.schedules.get(scenario)?.resolve(elapsed)
    }

    #[must_use]
    pub fn resolve_now(&self, scenario: &str, test_start: Instant) -> Option<usize> {
        self.resolve(scenario, test_start.elapsed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Phase;

    fn scenario(start: u64, phases: &[u64]) -> ScenarioConfig {
        ScenarioConfig {
            name: "s".to_string(),
            start_time: Duration::from_secs(start),
            phases: phases
                .iter()
                .enumerate()
                .map(|(i, secs)| Phase {
                    name: format!("p{i}"),
                    duration: Duration::from_secs(*secs),
                    target: 10 * (i as u64 + 1),
                })
                .collect(),
            graceful_ramp_down: Duration::from_secs(30),
            graceful_stop: Duration::from_secs(30),
        }
    }

    fn secs(s: u64) -> Duration {
        Duration::from_secs(s)
    }

    #[test]
    fn resolves_documented_example() {
        let sched = PhaseSchedule::new(&scenario(0, &[60, 120]));
        assert_eq!(sched.resolve(secs(30)), Some(0));
        assert_eq!(sched.resolve(secs(90)), Some(1));
        assert_eq!(sched.resolve(secs(200)), None);
    }

    #[test]
    fn boundaries_belong_to_the_next_phase() {
        let sched = PhaseSchedule::new(&scenario(0, &[60, 120]));
        assert_eq!(sched.resolve(Duration::ZERO), Some(0));
        assert_eq!(sched.resolve(secs(60)), Some(1));
        assert_eq!(sched.resolve(secs(180)), None);
        assert_eq!(sched.resolve(secs(180) - Duration::from_millis(1)), Some(1));
    }

    #[test]
    fn start_offset_delays_the_scenario() {
        let sched = PhaseSchedule::new(&scenario(300, &[60]));
        assert_eq!(sched.resolve(secs(10)), None);
        assert_eq!(sched.resolve(secs(300)), Some(0));
        assert_eq!(sched.resolve(secs(359)), Some(0));
        assert_eq!(sched.resolve(secs(360)), None);
    }

    #[test]
    fn zero_phases_never_resolve() {
        let sched = PhaseSchedule::new(&scenario(0, &[]));
        for s in [0, 1, 60, 10_000] {
            assert_eq!(sched.resolve(secs(s)), None);
        }
    }

    #[test]
    fn zero_length_phases_are_skipped() {
        let sched = PhaseSchedule::new(&scenario(0, &[10, 0, 10]));
        assert_eq!(sched.resolve(secs(9)), Some(0));
        assert_eq!(sched.resolve(secs(10)), Some(2));
    }

    #[test]
    fn resolution_is_monotonic_until_terminal() {
        let sched = PhaseSchedule::new(&scenario(5, &[7, 3, 11, 1]));
        let mut last: Option<usize> = None;
        let mut started = false;
        let mut ended = false;

        for ms in (0..40_000).step_by(250) {
            let cur = sched.resolve(Duration::from_millis(ms));
            match (cur, ended) {
                (Some(_), true) => panic!("phase reappeared at {ms}ms"),
                (Some(i), false) => {
                    started = true;
                    if let Some(prev) = last {
                        assert!(i >= prev, "phase went back at {ms}ms");
                    }
                    last = Some(i);
                }
                (None, _) if started => ended = true,
                (None, _) => {}
            }
        }

        assert!(ended);
        assert_eq!(last, Some(3));
    }

    #[test]
    fn windows_are_absolute() {
        let cfg = scenario(60, &[30, 90]);
        let w = PhaseSchedule::new(&cfg).windows(&cfg);
        assert_eq!(w.len(), 2);
        assert_eq!((w[0].start, w[0].end), (secs(60), secs(90)));
        assert_eq!((w[1].start, w[1].end), (secs(90), secs(180)));
        assert_eq!(w[1].target, 20);
    }

    #[test]
    fn resolver_looks_up_by_scenario() {
        let mut a = scenario(0, &[60]);
        a.name = "a".to_string();
        let mut b = scenario(60, &[60]);
        b.name = "b".to_string();
        let plan = TestPlan {
            apis: vec!["x".to_string()],
            scenarios: vec![a, b],
            sla: Default::default(),
        };

        let r = PhaseResolver::new(&plan);
        assert_eq!(r.resolve("a", secs(30)), Some(0));
        assert_eq!(r.resolve("b", secs(30)), None);
        assert_eq!(r.resolve("b", secs(90)), Some(0));
        assert_eq!(r.resolve("missing", secs(30)), None);
        assert_eq!(r.resolve_now("a", Instant::now()), Some(0));
    }
}
