pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid yaml: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Metrics(#[from] loadphase_metrics::Error),

    #[error("`apis` must list at least one api")]
    EmptyApis,

    #[error("api names must not be empty")]
    EmptyApiName,

    #[error("api `{0}` is listed more than once")]
    DuplicateApi(String),

    #[error("scenario names must not be empty")]
    EmptyScenarioName,

    #[error("scenario `{0}` is defined more than once")]
    DuplicateScenario(String),

    #[error("invalid sla for `{api}`: `{field}` must be a positive number")]
    InvalidSla { api: String, field: &'static str },

    #[error("invalid phase {index} in scenario `{scenario}`: {reason}")]
    InvalidPhase {
        scenario: String,
        index: usize,
        reason: String,
    },

    #[error("metrics are still being recorded ({0} recorder handle(s) alive)")]
    RecordingInFlight(usize),

    #[error("invalid timestamp `{0}` (expected RFC 3339)")]
    InvalidTimestamp(String),

    #[error("line is not valid UTF-8")]
    InvalidUtf8,

    #[error("timeline interval must be at least one second")]
    InvalidInterval,
}
