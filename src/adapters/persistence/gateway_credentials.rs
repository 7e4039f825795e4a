use async_trait::async_trait;
use sqlx::Row;
use uuid::Uuid;

use crate::{
    adapters::persistence::PostgresPersistence,
    app_error::{AppError, AppResult},
    domain::entities::credential_scope::CredentialScope,
    use_cases::gateway_credentials::{
        EncryptedCredentials, GatewayCredentialProfile, GatewayCredentialRepo,
    },
};

const SELECT_COLS: &str = r#"
    id, owner_type, owner_id, environment, public_key,
    private_key_encrypted, integrity_secret_encrypted, events_secret_encrypted,
    created_at, updated_at
"#;

fn row_to_profile(row: sqlx::postgres::PgRow) -> GatewayCredentialProfile {
    GatewayCredentialProfile {
        id: row.get("id"),
        scope: CredentialScope {
            owner_type: row.get("owner_type"),
            owner_id: row.get("owner_id"),
        },
        environment: row.get("environment"),
        public_key: row.get("public_key"),
        private_key_encrypted: row.get("private_key_encrypted"),
        integrity_secret_encrypted: row.get("integrity_secret_encrypted"),
        events_secret_encrypted: row.get("events_secret_encrypted"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

#[async_trait]
impl GatewayCredentialRepo for PostgresPersistence {
    async fn get_by_scope(
        &self,
        scope: CredentialScope,
    ) -> AppResult<Option<GatewayCredentialProfile>> {
        let row = sqlx::query(&format!(
            "SELECT {SELECT_COLS} FROM gateway_credentials WHERE owner_type = $1 AND owner_id = $2"
        ))
        .bind(scope.owner_type)
        .bind(scope.owner_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::from)?;

        Ok(row.map(row_to_profile))
    }

    async fn upsert(
        &self,
        scope: CredentialScope,
        credentials: EncryptedCredentials<'_>,
    ) -> AppResult<GatewayCredentialProfile> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO gateway_credentials (
                id, owner_type, owner_id, environment, public_key,
                private_key_encrypted, integrity_secret_encrypted, events_secret_encrypted
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (owner_type, owner_id) DO UPDATE SET
                environment = EXCLUDED.environment,
                public_key = EXCLUDED.public_key,
                private_key_encrypted = EXCLUDED.private_key_encrypted,
                integrity_secret_encrypted = EXCLUDED.integrity_secret_encrypted,
                events_secret_encrypted = EXCLUDED.events_secret_encrypted,
                updated_at = CURRENT_TIMESTAMP
            RETURNING {SELECT_COLS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(scope.owner_type)
        .bind(scope.owner_id)
        .bind(credentials.environment)
        .bind(credentials.public_key)
        .bind(credentials.private_key_encrypted)
        .bind(credentials.integrity_secret_encrypted)
        .bind(credentials.events_secret_encrypted)
        .fetch_one(&self.pool)
        .await
        .map_err(AppError::from)?;

        Ok(row_to_profile(row))
    }
}
