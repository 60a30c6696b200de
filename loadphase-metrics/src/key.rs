use ahash::AHashMap;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ApiId(u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScenarioId(u32);

impl ApiId {
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

impl ScenarioId {
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// Identity of one metric set: `(api, scenario, phase)`.
///
/// `phase: None` addresses the scenario-level set that sees every request of the
/// scenario regardless of the phase it landed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MetricKey {
    pub api: ApiId,
    pub scenario: ScenarioId,
    pub phase: Option<u32>,
}

impl MetricKey {
    #[must_use]
    pub fn scenario_level(api: ApiId, scenario: ScenarioId) -> Self {
        Self {
            api,
            scenario,
            phase: None,
        }
    }

    #[must_use]
    pub fn phase_level(api: ApiId, scenario: ScenarioId, phase: u32) -> Self {
        Self {
            api,
            scenario,
            phase: Some(phase),
        }
    }
}

/// Fixed name table built once at registry setup; lookups never mutate it.
#[derive(Debug, Default)]
pub(crate) struct NameTable {
    ids: AHashMap<Arc<str>, u32>,
    names: Vec<Arc<str>>,
}

impl NameTable {
    /// Returns `None` when the name is already present.
    pub(crate) fn insert(&mut self, name: &str) -> Option<u32> {
        if self.ids.contains_key(name) {
            return None;
        }

        let id = self.names.len() as u32;
        let name: Arc<str> = Arc::from(name);
        self.names.push(name.clone());
        self.ids.insert(name, id);
        Some(id)
    }

    pub(crate) fn get(&self, name: &str) -> Option<u32> {
        self.ids.get(name).copied()
    }

    pub(crate) fn resolve(&self, id: u32) -> Option<&str> {
        self.names.get(id as usize).map(|s| s.as_ref())
    }

    pub(crate) fn len(&self) -> usize {
        self.names.len()
    }
}

pub(crate) fn api_id(raw: u32) -> ApiId {
    ApiId(raw)
}

pub(crate) fn scenario_id(raw: u32) -> ScenarioId {
    ScenarioId(raw)
}
