use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("Invalid input for {0}: {1}")]
    InvalidInput(String, String),

    #[error("Unknown metric name '{0}'")]
    UnknownMetric(String),

    #[error("Unknown custom field type '{0}'")]
    UnknownFieldKind(String),

    #[error("Invalid reporting period: {0}")]
    InvalidPeriod(String),
}
