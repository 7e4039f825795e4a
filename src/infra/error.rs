use thiserror::Error;

use crate::app_error::AppError;

/// Infrastructure errors that can occur during application startup.
///
/// SECURITY: Display messages are sanitized and safe for logs/console output.
/// Debug output includes the full #[source] chain, which may carry secrets
/// (connection strings, key material errors). Log with `%e`, not `?e`.
#[derive(Error, Debug)]
pub enum InfraError {
    #[error("Database connection failed. Check DATABASE_URL and ensure the database is running.")]
    DatabaseConnection(#[source] sqlx::Error),

    #[error("Database migration failed")]
    Migration(#[source] sqlx::migrate::MigrateError),

    #[error("Configuration error: environment variable {var} not set")]
    ConfigMissing { var: &'static str },

    #[error("Configuration error: {var} is invalid ({reason})")]
    ConfigInvalid { var: &'static str, reason: String },

    #[error("Cipher initialization failed")]
    CipherInit(#[source] AppError),

    #[error("HTTP client initialization failed")]
    HttpClient(#[source] reqwest::Error),
}

impl From<sqlx::Error> for InfraError {
    fn from(e: sqlx::Error) -> Self {
        InfraError::DatabaseConnection(e)
    }
}
