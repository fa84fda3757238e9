// Error taxonomy for the telemetry core
use thiserror::Error;

/// Problems with user input, reported before any network call is made.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("time range must end after it starts")]
    EmptyRange,

    #[error("end date {end} is before start date {start}")]
    InvertedDates { start: String, end: String },

    #[error("both a start date and an end date are required")]
    IncompleteDates,

    #[error("rolling window must be at least one hour")]
    NonPositiveHours,

    #[error("no device selected")]
    MissingDevice,
}

#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("no credential available for the telemetry backend")]
    MissingCredential,

    #[error("telemetry request failed: {0}")]
    Transport(String),

    #[error("telemetry backend responded with status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed telemetry response: {0}")]
    Decode(String),

    #[error("export failed: {0}")]
    Export(String),
}

impl TelemetryError {
    pub fn is_validation(&self) -> bool {
        matches!(self, TelemetryError::Validation(_))
    }
}

impl From<reqwest::Error> for TelemetryError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            TelemetryError::Decode(err.to_string())
        } else {
            TelemetryError::Transport(err.to_string())
        }
    }
}

impl From<csv::Error> for TelemetryError {
    fn from(err: csv::Error) -> Self {
        TelemetryError::Export(err.to_string())
    }
}
