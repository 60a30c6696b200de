use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize};

use crate::duration::parse_duration_secs;
use crate::error::{Error, Result};

const DEFAULT_START_TIME: &str = "0s";
const DEFAULT_GRACEFUL_RAMP_DOWN: &str = "30s";
const DEFAULT_GRACEFUL_STOP: &str = "30s";

/// One segment of a scenario's ramp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Phase {
    pub name: String,
    pub duration: Duration,
    pub target: u64,
}

/// A named load scenario: when it starts and the phases it walks through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScenarioConfig {
    pub name: String,
    /// Offset from the start of the test.
    pub start_time: Duration,
    pub phases: Vec<Phase>,
    pub graceful_ramp_down: Duration,
    pub graceful_stop: Duration,
}

impl ScenarioConfig {
    /// Sum of all phase durations, not counting the grace windows.
    #[must_use]
    pub fn phases_duration(&self) -> Duration {
        self.phases
            .iter()
            .fold(Duration::ZERO, |acc, p| acc.saturating_add(p.duration))
    }
}

/// Latency thresholds for one api, in milliseconds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlaThreshold {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub p90: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub p95: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub p99: Option<f64>,

    /// Expected number of transactions for the whole run.
    #[serde(default, alias = "target_count", skip_serializing_if = "Option::is_none")]
    pub target_count: Option<u64>,
}

/// Per-api SLA thresholds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Sla(BTreeMap<String, SlaThreshold>);

impl Sla {
    #[must_use]
    pub fn new(entries: BTreeMap<String, SlaThreshold>) -> Self {
        Self(entries)
    }

    /// Parses a YAML or JSON SLA document and validates it.
    pub fn parse(input: &str) -> Result<Self> {
        let sla: Sla = serde_yaml::from_str(input)?;
        sla.validate()?;
        Ok(sla)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::parse(&raw)
    }

    #[must_use]
    pub fn get(&self, api: &str) -> Option<&SlaThreshold> {
        self.0.get(api)
    }

    #[must_use]
    pub fn p90(&self, api: &str) -> Option<f64> {
        self.get(api).and_then(|t| t.p90)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SlaThreshold)> + '_ {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn validate(&self) -> Result<()> {
        for (api, t) in &self.0 {
            for (field, value) in [("p90", t.p90), ("p95", t.p95), ("p99", t.p99)] {
                if let Some(v) = value
                    && !(v.is_finite() && v > 0.0)
                {
                    return Err(Error::InvalidSla {
                        api: api.clone(),
                        field,
                    });
                }
            }
        }
        Ok(())
    }
}

/// Everything known about a run before the first request: apis under test,
/// scenarios and SLA thresholds.
#[derive(Debug, Clone, PartialEq)]
pub struct TestPlan {
    pub apis: Vec<String>,
    pub scenarios: Vec<ScenarioConfig>,
    pub sla: Sla,
}

impl TestPlan {
    /// Parses and validates a plan document (YAML; JSON is accepted too).
    pub fn from_yaml_str(input: &str) -> Result<Self> {
        let plan = Self::parse_yaml(input)?;
        plan.validate()?;
        Ok(plan)
    }

    /// Parses a plan document without validating it. Callers that fill in
    /// missing pieces (e.g. discovered apis) validate afterwards.
    pub fn parse_yaml(input: &str) -> Result<Self> {
        let file: PlanFile = serde_yaml::from_str(input)?;
        Ok(file.into_plan())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&raw)
    }

    pub fn load_unvalidated(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::parse_yaml(&raw)
    }

    #[must_use]
    pub fn with_sla(mut self, sla: Sla) -> Self {
        self.sla = sla;
        self
    }

    #[must_use]
    pub fn with_apis(mut self, apis: Vec<String>) -> Self {
        self.apis = apis;
        self
    }

    #[must_use]
    pub fn scenario(&self, name: &str) -> Option<&ScenarioConfig> {
        self.scenarios.iter().find(|s| s.name == name)
    }

    pub fn validate(&self) -> Result<()> {
        if self.apis.is_empty() {
            return Err(Error::EmptyApis);
        }

        let mut seen = HashSet::new();
        for api in &self.apis {
            if api.trim().is_empty() {
                return Err(Error::EmptyApiName);
            }
            if !seen.insert(api.as_str()) {
                return Err(Error::DuplicateApi(api.clone()));
            }
        }

        let mut seen_scenarios = HashSet::new();
        for s in &self.scenarios {
            if s.name.trim().is_empty() {
                return Err(Error::EmptyScenarioName);
            }
            if !seen_scenarios.insert(s.name.as_str()) {
                return Err(Error::DuplicateScenario(s.name.clone()));
            }
            for (index, p) in s.phases.iter().enumerate() {
                if p.name.trim().is_empty() {
                    return Err(Error::InvalidPhase {
                        scenario: s.name.clone(),
                        index,
                        reason: "name must not be empty".to_string(),
                    });
                }
            }
            if s.phases.is_empty() {
                tracing::warn!(scenario = %s.name, "scenario declares no phases; only scenario-level metrics will be recorded");
            }
        }

        self.sla.validate()?;
        for (api, _) in self.sla.iter() {
            if !seen.contains(api) {
                tracing::warn!(api, "sla entry does not match any api under test");
            }
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum DurationSpec {
    Text(String),
    Seconds(u64),
}

impl DurationSpec {
    fn into_duration(self) -> Duration {
        match self {
            Self::Text(s) => Duration::from_secs(parse_duration_secs(&s)),
            Self::Seconds(secs) => Duration::from_secs(secs),
        }
    }
}

fn duration_or(spec: Option<DurationSpec>, default: &str) -> Duration {
    spec.map(DurationSpec::into_duration)
        .unwrap_or_else(|| Duration::from_secs(parse_duration_secs(default)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlanFile {
    #[serde(default)]
    apis: Vec<String>,

    #[serde(default, deserialize_with = "ordered_scenarios")]
    scenarios: Vec<(String, ScenarioFile)>,

    #[serde(default)]
    sla: Sla,
}

impl PlanFile {
    fn into_plan(self) -> TestPlan {
        TestPlan {
            apis: self.apis,
            scenarios: self
                .scenarios
                .into_iter()
                .map(|(name, s)| s.into_config(name))
                .collect(),
            sla: self.sla,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ScenarioFile {
    #[serde(default)]
    start_time: Option<DurationSpec>,

    #[serde(default, alias = "stages")]
    phases: Vec<PhaseFile>,

    #[serde(default)]
    graceful_ramp_down: Option<DurationSpec>,

    #[serde(default)]
    graceful_stop: Option<DurationSpec>,
}

impl ScenarioFile {
    fn into_config(self, name: String) -> ScenarioConfig {
        ScenarioConfig {
            name,
            start_time: duration_or(self.start_time, DEFAULT_START_TIME),
            phases: self
                .phases
                .into_iter()
                .enumerate()
                .map(|(i, p)| Phase {
                    name: p.name.unwrap_or_else(|| format!("phase {}", i + 1)),
                    duration: p.duration.into_duration(),
                    target: p.target,
                })
                .collect(),
            graceful_ramp_down: duration_or(self.graceful_ramp_down, DEFAULT_GRACEFUL_RAMP_DOWN),
            graceful_stop: duration_or(self.graceful_stop, DEFAULT_GRACEFUL_STOP),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PhaseFile {
    #[serde(default)]
    name: Option<String>,
    duration: DurationSpec,
    #[serde(default)]
    target: u64,
}

fn ordered_scenarios<'de, D>(deserializer: D) -> std::result::Result<Vec<(String, ScenarioFile)>, D::Error>
where
    D: Deserializer<'de>,
{
    struct V;

    impl<'de> serde::de::Visitor<'de> for V {
        type Value = Vec<(String, ScenarioFile)>;

        fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
            f.write_str("a map of scenario name to scenario config")
        }

        fn visit_map<A>(self, mut map: A) -> std::result::Result<Self::Value, A::Error>
        where
            A: serde::de::MapAccess<'de>,
        {
            let mut out = Vec::with_capacity(map.size_hint().unwrap_or(0));
            while let Some((name, scenario)) = map.next_entry::<String, ScenarioFile>()? {
                out.push((name, scenario));
            }
            Ok(out)
        }

        fn visit_unit<E>(self) -> std::result::Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(Vec::new())
        }
    }

    deserializer.deserialize_any(V)
}
