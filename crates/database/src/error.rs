use backend_client::BackendError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Failed to load environment variables for database connection: {0}")]
    ConnectionConfigError(String),

    #[error("Database query failed: {0}")]
    QueryError(#[from] sqlx::Error),

    #[error("Database migration failed: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),

    #[error("The requested data was not found in the database.")]
    NotFound,
}

impl From<DbError> for BackendError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound => BackendError::NotFound,
            DbError::QueryError(sqlx::Error::RowNotFound) => BackendError::NotFound,
            DbError::QueryError(
                e @ (sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_)),
            ) => BackendError::Unavailable(e.to_string()),
            DbError::QueryError(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                BackendError::Api { status: 409, message: e.message().to_string() }
            }
            other => BackendError::Api { status: 500, message: other.to_string() },
        }
    }
}
