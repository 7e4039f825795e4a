use sqlx::PgPool;

use crate::app_error::AppError;

pub mod activation;
pub mod gateway_credentials;
pub mod payment_transaction;
pub mod subscription_plan;

const MAX_JSON_LOG_LEN: usize = 200;

/// Parse a JSON column, logging and falling back to the default on failure.
///
/// SQL NULL arrives as `Value::Null` and maps to the default silently. Only
/// real parse failures (shape changes, corruption) are logged.
///
/// # Arguments
/// * `json` - The column value (may be `Value::Null` for SQL NULL)
/// * `field_name` - Column being parsed (for logging)
/// * `entity_type` - Table or entity name, e.g. "payment_transaction"
/// * `entity_id` - Row key (for log filtering), e.g. the transaction reference
pub fn parse_json_with_fallback<T: serde::de::DeserializeOwned + Default>(
    json: &serde_json::Value,
    field_name: &str,
    entity_type: &str,
    entity_id: &str,
) -> T {
    // SQL NULL becomes Value::Null: valid empty state, no warning
    if json.is_null() {
        return T::default();
    }

    serde_json::from_value(json.clone()).unwrap_or_else(|err| {
        // Truncate on a char boundary; challenge payloads can be large
        let raw_str = json.to_string();
        let truncated = if raw_str.len() > MAX_JSON_LOG_LEN {
            let cut = (0..=MAX_JSON_LOG_LEN)
                .rev()
                .find(|i| raw_str.is_char_boundary(*i))
                .unwrap_or(0);
            format!("{}...", &raw_str[..cut])
        } else {
            raw_str
        };

        tracing::warn!(
            field = field_name,
            entity_type = entity_type,
            entity_id = entity_id,
            raw_json = %truncated,
            error = %err,
            "Failed to parse JSON field, using default value"
        );
        T::default()
    })
}

/// Postgres implementation of every repository port.
///
/// Cheap to clone; all clones share one pool.
#[derive(Clone)]
pub struct PostgresPersistence {
    pool: PgPool,
}

impl PostgresPersistence {
    pub fn new(pool: PgPool) -> Self {
        PostgresPersistence { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => AppError::NotFound,
            sqlx::Error::Database(db_err) => {
                let msg = db_err.message();
                if msg.contains("duplicate key") || msg.contains("unique constraint") {
                    AppError::Validation("A record with this value already exists".into())
                } else if msg.contains("foreign key") || msg.contains("violates foreign key") {
                    AppError::Validation("Referenced record not found".into())
                } else if msg.contains("null value") && msg.contains("violates not-null") {
                    AppError::Validation("Required field is missing".into())
                } else {
                    tracing::error!(error = ?err, "Database error");
                    AppError::Database("Database operation failed".into())
                }
            }
            _ => {
                tracing::error!(error = ?err, "Database error");
                AppError::Database("Database operation failed".into())
            }
        }
    }
}
