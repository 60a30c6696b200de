use std::sync::Arc;

use crate::key::MetricKey;
use crate::registry::MetricRegistry;

/// Result of one completed (or failed/timed-out) request attempt.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Outcome {
    pub status_code: u16,
    pub duration_ms: f64,
}

impl Outcome {
    #[must_use]
    pub fn new(status_code: u16, duration_ms: f64) -> Self {
        Self {
            status_code,
            duration_ms,
        }
    }

    #[must_use]
    pub fn is_failure(&self) -> bool {
        self.status_code >= 400
    }
}

impl MetricRegistry {
    /// Records one request against the scenario-level set and, when `phase` is
    /// given, the matching phase-level set. Touches at most two sets.
    ///
    /// Unknown api/scenario/phase combinations are dropped and only counted in
    /// [`MetricRegistry::dropped_recordings`].
    #[inline]
    pub fn record(&self, api: &str, scenario: &str, phase: Option<usize>, outcome: Outcome) {
        let (Some(api), Some(scenario)) = (self.api_id(api), self.scenario_id(scenario)) else {
            self.note_dropped();
            return;
        };

        let Some(scenario_set) = self.get(MetricKey::scenario_level(api, scenario)) else {
            self.note_dropped();
            return;
        };

        let phase_set = match phase {
            None => None,
            Some(p) => {
                let set = u32::try_from(p)
                    .ok()
                    .and_then(|p| self.get(MetricKey::phase_level(api, scenario, p)));
                if set.is_none() {
                    self.note_dropped();
                }
                set
            }
        };

        scenario_set.observe(outcome.status_code, outcome.duration_ms);
        if let Some(set) = phase_set {
            set.observe(outcome.status_code, outcome.duration_ms);
        }
    }
}

/// Cloneable write handle shared by virtual users.
#[derive(Debug, Clone)]
pub struct Recorder {
    registry: Arc<MetricRegistry>,
}

impl Recorder {
    #[must_use]
    pub fn new(registry: Arc<MetricRegistry>) -> Self {
        Self { registry }
    }

    #[inline]
    pub fn record(&self, api: &str, scenario: &str, phase: Option<usize>, outcome: Outcome) {
        self.registry.record(api, scenario, phase, outcome);
    }

    /// Whether `api` and `scenario` both have metric sets in the registry.
    #[must_use]
    pub fn is_registered(&self, api: &str, scenario: &str) -> bool {
        self.registry.api_id(api).is_some() && self.registry.scenario_id(scenario).is_some()
    }
}
