use std::sync::Arc;
use std::time::{Duration, Instant};

use loadphase_metrics::{MetricRegistry, Outcome, Recorder, ScenarioLayout};

use crate::config::TestPlan;
use crate::error::{Error, Result};
use crate::phase::PhaseResolver;

/// Allocates the registry for every `(api, scenario, phase)` key of `plan`.
pub fn registry_for(plan: &TestPlan) -> Result<MetricRegistry> {
    let registry = MetricRegistry::initialize(
        plan.apis.iter().map(String::as_str),
        plan.scenarios.iter().map(|s| ScenarioLayout {
            name: s.name.as_str(),
            phases: s.phases.len(),
        }),
    )?;
    tracing::debug!(sets = registry.len(), "metric registry initialized");
    Ok(registry)
}

/// Owns the metrics of a live run.
///
/// Workers get [`RunRecorder`] handles; [`RunMetrics::finish`] hands the registry
/// back for aggregation only after every handle is gone.
#[derive(Debug)]
pub struct RunMetrics {
    registry: Arc<MetricRegistry>,
    resolver: Arc<PhaseResolver>,
    started: Instant,
}

impl RunMetrics {
    pub fn new(plan: &TestPlan) -> Result<Self> {
        Ok(Self {
            registry: Arc::new(registry_for(plan)?),
            resolver: Arc::new(PhaseResolver::new(plan)),
            started: Instant::now(),
        })
    }

    #[must_use]
    pub fn started(&self) -> Instant {
        self.started
    }

    #[must_use]
    pub fn recorder(&self) -> RunRecorder {
        RunRecorder {
            recorder: Recorder::new(self.registry.clone()),
            resolver: self.resolver.clone(),
            started: self.started,
        }
    }

    /// Ends the recording phase.
    ///
    /// While any recorder handle is still alive this gives `self` back together
    /// with [`Error::RecordingInFlight`].
    pub fn finish(self) -> std::result::Result<MetricRegistry, (Self, Error)> {
        let live = Arc::strong_count(&self.registry).saturating_sub(1);
        let Self {
            registry,
            resolver,
            started,
        } = self;

        match Arc::try_unwrap(registry) {
            Ok(registry) => Ok(registry),
            Err(registry) => Err((
                Self {
                    registry,
                    resolver,
                    started,
                },
                Error::RecordingInFlight(live),
            )),
        }
    }
}

/// Per-worker handle: resolves the phase from the run clock, then records.
#[derive(Debug, Clone)]
pub struct RunRecorder {
    recorder: Recorder,
    resolver: Arc<PhaseResolver>,
    started: Instant,
}

impl RunRecorder {
    /// Records a completed request observed now.
    #[inline]
    pub fn record(&self, api: &str, scenario: &str, outcome: Outcome) {
        self.record_at(api, scenario, self.started.elapsed(), outcome);
    }

    /// Records a request observed `elapsed` after the run started.
    #[inline]
    pub fn record_at(&self, api: &str, scenario: &str, elapsed: Duration, outcome: Outcome) {
        let phase = self.resolver.resolve(scenario, elapsed);
        self.recorder.record(api, scenario, phase, outcome);
    }

    /// Records against the scenario-level set only, e.g. for requests seen
    /// before the run clock started.
    #[inline]
    pub fn record_unphased(&self, api: &str, scenario: &str, outcome: Outcome) {
        self.recorder.record(api, scenario, None, outcome);
    }

    /// Whether recordings for `api` in `scenario` land in a metric set.
    #[must_use]
    pub fn is_registered(&self, api: &str, scenario: &str) -> bool {
        self.recorder.is_registered(api, scenario)
    }
}
