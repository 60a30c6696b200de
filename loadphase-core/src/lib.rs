pub mod aggregate;
pub mod config;
pub mod duration;
pub mod error;
pub mod ingest;
pub mod phase;
pub mod report;
pub mod run;
pub mod timeline;

pub use aggregate::{ErrorRow, SlaStatus, SummaryRow};
pub use config::{Phase, ScenarioConfig, Sla, SlaThreshold, TestPlan};
pub use error::{Error, Result};
pub use ingest::IngestStats;
pub use phase::{PhaseResolver, PhaseSchedule, PhaseWindow};
pub use report::{Report, RunInfo, build_report};
pub use run::{RunMetrics, RunRecorder, registry_for};
pub use timeline::{Timeline, TimelineBuilder};

pub use loadphase_metrics::{MetricRegistry, Outcome};
