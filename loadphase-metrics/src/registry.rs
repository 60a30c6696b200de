use ahash::AHashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::{Error, Result};
use crate::key::{ApiId, MetricKey, NameTable, ScenarioId, api_id, scenario_id};
use crate::metrics::{MetricSet, MetricSnapshot};

/// Name and phase count of one scenario, as far as the registry cares.
#[derive(Debug, Clone, Copy)]
pub struct ScenarioLayout<'a> {
    pub name: &'a str,
    pub phases: usize,
}

/// Every metric set of a run, allocated up front.
///
/// The key space is `apis x scenarios x (scenario-level + one per phase)` and never
/// changes after [`MetricRegistry::initialize`], so lookups need no locking.
#[derive(Debug)]
pub struct MetricRegistry {
    apis: NameTable,
    scenarios: NameTable,
    phase_counts: Vec<u32>,
    sets: AHashMap<MetricKey, MetricSet>,
    dropped: AtomicU64,
}

impl MetricRegistry {
    pub fn initialize<'a>(
        apis: impl IntoIterator<Item = &'a str>,
        scenarios: impl IntoIterator<Item = ScenarioLayout<'a>>,
    ) -> Result<Self> {
        let mut api_table = NameTable::default();
        for api in apis {
            if api_table.insert(api).is_none() {
                return Err(Error::DuplicateApi(api.to_string()));
            }
        }

        let mut scenario_table = NameTable::default();
        let mut phase_counts = Vec::new();
        for layout in scenarios {
            if scenario_table.insert(layout.name).is_none() {
                return Err(Error::DuplicateScenario(layout.name.to_string()));
            }
            phase_counts.push(u32::try_from(layout.phases).unwrap_or(u32::MAX));
        }

        let total_phases: usize = phase_counts.iter().map(|p| *p as usize + 1).sum();
        let mut sets = AHashMap::with_capacity(api_table.len() * total_phases);

        for a in 0..api_table.len() as u32 {
            for (s, phases) in phase_counts.iter().enumerate() {
                let api = api_id(a);
                let scenario = scenario_id(s as u32);
                sets.insert(MetricKey::scenario_level(api, scenario), MetricSet::new()?);
                for p in 0..*phases {
                    sets.insert(MetricKey::phase_level(api, scenario, p), MetricSet::new()?);
                }
            }
        }

        Ok(Self {
            apis: api_table,
            scenarios: scenario_table,
            phase_counts,
            sets,
            dropped: AtomicU64::new(0),
        })
    }

    #[must_use]
    pub fn api_id(&self, api: &str) -> Option<ApiId> {
        self.apis.get(api).map(api_id)
    }

    #[must_use]
    pub fn scenario_id(&self, scenario: &str) -> Option<ScenarioId> {
        self.scenarios.get(scenario).map(scenario_id)
    }

    #[must_use]
    pub fn api_name(&self, id: ApiId) -> Option<&str> {
        self.apis.resolve(id.index() as u32)
    }

    #[must_use]
    pub fn scenario_name(&self, id: ScenarioId) -> Option<&str> {
        self.scenarios.resolve(id.index() as u32)
    }

    /// Registered APIs in registration order.
    pub fn apis(&self) -> impl Iterator<Item = &str> + '_ {
        (0..self.apis.len() as u32).filter_map(|i| self.apis.resolve(i))
    }

    /// Registered scenarios in registration order.
    pub fn scenarios(&self) -> impl Iterator<Item = &str> + '_ {
        (0..self.scenarios.len() as u32).filter_map(|i| self.scenarios.resolve(i))
    }

    #[must_use]
    pub fn phase_count(&self, scenario: &str) -> Option<usize> {
        let id = self.scenario_id(scenario)?;
        self.phase_counts.get(id.index()).map(|p| *p as usize)
    }

    /// Resolves a key from names. `None` if any component is not registered,
    /// including a phase index past the scenario's last phase.
    #[must_use]
    pub fn key(&self, api: &str, scenario: &str, phase: Option<usize>) -> Option<MetricKey> {
        let api = self.api_id(api)?;
        let scenario = self.scenario_id(scenario)?;
        match phase {
            None => Some(MetricKey::scenario_level(api, scenario)),
            Some(p) => {
                let count = *self.phase_counts.get(scenario.index())?;
                let p = u32::try_from(p).ok()?;
                (p < count).then(|| MetricKey::phase_level(api, scenario, p))
            }
        }
    }

    #[must_use]
    pub fn get(&self, key: MetricKey) -> Option<&MetricSet> {
        self.sets.get(&key)
    }

    #[must_use]
    pub fn set(&self, api: &str, scenario: &str, phase: Option<usize>) -> Option<&MetricSet> {
        self.get(self.key(api, scenario, phase)?)
    }

    #[must_use]
    pub fn snapshot(&self, api: &str, scenario: &str, phase: Option<usize>) -> Option<MetricSnapshot> {
        self.set(api, scenario, phase).map(MetricSet::snapshot)
    }

    /// Number of allocated metric sets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sets.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    /// Recordings that hit no registered key (unknown api/scenario/phase).
    #[must_use]
    pub fn dropped_recordings(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    #[inline]
    pub(crate) fn note_dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }
}
