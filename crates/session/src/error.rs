use backend_client::BackendError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error("Only {0} email addresses may register.")]
    EmailDomain(String),

    #[error("The session listener has stopped.")]
    ListenerStopped,
}
