pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to create latency histogram: {0}")]
    Histogram(#[from] hdrhistogram::CreationError),

    #[error("api `{0}` is registered more than once")]
    DuplicateApi(String),

    #[error("scenario `{0}` is registered more than once")]
    DuplicateScenario(String),
}
