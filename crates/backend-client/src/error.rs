use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Failed to reach the backend: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("The backend returned an error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Failed to deserialize the backend response: {0}")]
    Deserialization(String),

    #[error("Invalid data format from backend: {0}")]
    InvalidData(String),

    #[error("Authentication failed: {0}")]
    Unauthorized(String),

    #[error("The requested record was not found.")]
    NotFound,

    #[error("The backend is unavailable: {0}")]
    Unavailable(String),

    #[error(transparent)]
    Core(#[from] core_types::CoreError),
}

impl BackendError {
    /// Whether the failure is about reaching the platform rather than about the request.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, BackendError::Transport(_) | BackendError::Unavailable(_))
            || matches!(self, BackendError::Api { status, .. } if *status >= 500)
    }
}
