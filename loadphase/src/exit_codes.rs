#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    Success = 0,

    /// At least one api breached its SLA in the overall table.
    SlaFailed = 11,

    /// Invalid CLI input, test plan or SLA file.
    InvalidInput = 30,

    /// IO errors and unexpected failures while processing results.
    RuntimeError = 40,
}

impl ExitCode {
    #[must_use]
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    #[must_use]
    pub fn from_sla(sla_failed: bool) -> Self {
        if sla_failed {
            Self::SlaFailed
        } else {
            Self::Success
        }
    }
}
