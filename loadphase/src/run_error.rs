use crate::exit_codes::ExitCode;

#[derive(Debug)]
pub enum RunError {
    InvalidInput(anyhow::Error),
    RuntimeError(anyhow::Error),
}

impl RunError {
    #[must_use]
    pub fn exit_code(&self) -> ExitCode {
        match self {
            Self::InvalidInput(_) => ExitCode::InvalidInput,
            Self::RuntimeError(_) => ExitCode::RuntimeError,
        }
    }

    #[must_use]
    pub fn anyhow(&self) -> &anyhow::Error {
        match self {
            Self::InvalidInput(e) | Self::RuntimeError(e) => e,
        }
    }
}

impl std::fmt::Display for RunError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#}", self.anyhow())
    }
}

impl std::error::Error for RunError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.anyhow().as_ref())
    }
}

/// Tags an error as bad user input (exit 30).
pub(crate) trait InvalidInputExt<T> {
    fn invalid_input(self) -> Result<T, RunError>;
}

/// Tags an error as a runtime failure (exit 40).
pub(crate) trait RuntimeErrorExt<T> {
    fn runtime_error(self) -> Result<T, RunError>;
}

impl<T> InvalidInputExt<T> for anyhow::Result<T> {
    fn invalid_input(self) -> Result<T, RunError> {
        self.map_err(RunError::InvalidInput)
    }
}

impl<T> RuntimeErrorExt<T> for anyhow::Result<T> {
    fn runtime_error(self) -> Result<T, RunError> {
        self.map_err(RunError::RuntimeError)
    }
}
