pub mod error;
pub mod key;
pub mod metrics;
pub mod recorder;
pub mod registry;

pub use error::{Error, Result};
pub use key::{ApiId, MetricKey, ScenarioId};
pub use metrics::{LatencySummary, MetricSet, MetricSnapshot, TrackedStatus};
pub use recorder::{Outcome, Recorder};
pub use registry::{MetricRegistry, ScenarioLayout};
