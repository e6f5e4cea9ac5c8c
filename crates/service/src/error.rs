use backend_client::BackendError;
use core_types::CoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Not allowed: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    Validation(String),

    /// The platform could not be reached; the data is unavailable right now.
    #[error("Data unavailable: {0}")]
    DataUnavailable(#[source] BackendError),

    #[error("Backend request failed: {0}")]
    Backend(#[source] BackendError),

    #[error("Failed to write the export: {0}")]
    Export(#[from] csv::Error),
}

impl From<BackendError> for ServiceError {
    fn from(err: BackendError) -> Self {
        match err {
            e if e.is_unavailable() => ServiceError::DataUnavailable(e),
            BackendError::NotFound => ServiceError::NotFound("record".into()),
            BackendError::Core(e) => e.into(),
            e => ServiceError::Backend(e),
        }
    }
}

impl From<CoreError> for ServiceError {
    fn from(err: CoreError) -> Self {
        ServiceError::Validation(err.to_string())
    }
}
