#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    Success = 0,

    /// The share of failed requests exceeded `--max-failure-ratio`.
    FailureRatioExceeded = 11,

    /// Invalid CLI/config/options (bad flags, invalid durations, unknown config keys, etc.).
    InvalidInput = 30,

    /// Internal/runtime error (IO errors, task panics, unexpected invariants).
    RuntimeError = 40,
}

impl ExitCode {
    #[must_use]
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    #[must_use]
    pub fn from_failure_ratio(ratio: f64, max: Option<f64>) -> Self {
        match max {
            Some(max) if ratio > max => Self::FailureRatioExceeded,
            _ => Self::Success,
        }
    }
}
