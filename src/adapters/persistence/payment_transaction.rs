use async_trait::async_trait;
use chrono::NaiveDateTime;
use sqlx::Row;
use uuid::Uuid;

use crate::{
    adapters::persistence::{PostgresPersistence, parse_json_with_fallback},
    app_error::{AppError, AppResult},
    application::ports::ThreeDsChallenge,
    domain::entities::{credential_scope::CredentialScope, transaction_status::TransactionStatus},
    use_cases::payment_initiation::{
        ConditionalUpdate, NewPaymentTransaction, PaymentTransactionProfile,
        PaymentTransactionRepo, RegistrationDetails, StatusUpdate,
    },
};

pub(crate) const SELECT_COLS: &str = r#"
    id, reference, gateway_transaction_id, owner_type, owner_id, purpose,
    business_id, plan_id, customer_email, amount_minor_units, currency, status,
    three_ds_challenge, failure_message, created_at, updated_at, finalized_at
"#;

pub(crate) fn row_to_profile(row: sqlx::postgres::PgRow) -> PaymentTransactionProfile {
    let reference: String = row.get("reference");
    let challenge_json: Option<serde_json::Value> = row.get("three_ds_challenge");
    let three_ds_challenge: Option<ThreeDsChallenge> = parse_json_with_fallback(
        &challenge_json.unwrap_or(serde_json::Value::Null),
        "three_ds_challenge",
        "payment_transaction",
        &reference,
    );

    PaymentTransactionProfile {
        id: row.get("id"),
        gateway_transaction_id: row.get("gateway_transaction_id"),
        scope: CredentialScope {
            owner_type: row.get("owner_type"),
            owner_id: row.get("owner_id"),
        },
        purpose: row.get("purpose"),
        business_id: row.get("business_id"),
        plan_id: row.get("plan_id"),
        customer_email: row.get("customer_email"),
        amount_minor_units: row.get("amount_minor_units"),
        currency: row.get::<String, _>("currency").trim_end().to_string(),
        status: row.get("status"),
        three_ds_challenge,
        failure_message: row.get("failure_message"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
        finalized_at: row.get("finalized_at"),
        reference,
    }
}

fn challenge_to_json(challenge: Option<&ThreeDsChallenge>) -> AppResult<Option<serde_json::Value>> {
    challenge
        .map(serde_json::to_value)
        .transpose()
        .map_err(|e| AppError::Internal(format!("Failed to serialize challenge: {e}")))
}

#[async_trait]
impl PaymentTransactionRepo for PostgresPersistence {
    async fn get_by_reference(
        &self,
        reference: &str,
    ) -> AppResult<Option<PaymentTransactionProfile>> {
        let row = sqlx::query(&format!(
            "SELECT {SELECT_COLS} FROM payment_transactions WHERE reference = $1"
        ))
        .bind(reference)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::from)?;

        Ok(row.map(row_to_profile))
    }

    async fn create(
        &self,
        transaction: &NewPaymentTransaction,
        registration: Option<&RegistrationDetails>,
    ) -> AppResult<PaymentTransactionProfile> {
        let mut db_tx = self.pool.begin().await.map_err(AppError::from)?;

        let row = sqlx::query(&format!(
            r#"
            INSERT INTO payment_transactions (
                id, reference, owner_type, owner_id, purpose, business_id, plan_id,
                customer_email, amount_minor_units, currency, status
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING {SELECT_COLS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(&transaction.reference)
        .bind(transaction.scope.owner_type)
        .bind(transaction.scope.owner_id)
        .bind(transaction.purpose)
        .bind(transaction.business_id)
        .bind(transaction.plan_id)
        .bind(&transaction.customer_email)
        .bind(transaction.amount_minor_units)
        .bind(&transaction.currency)
        .bind(TransactionStatus::Created)
        .fetch_one(&mut *db_tx)
        .await
        .map_err(AppError::from)?;

        if let Some(details) = registration {
            sqlx::query(
                r#"
                INSERT INTO pending_registrations (
                    reference, business_name, owner_name, email, phone, plan_id
                )
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(&transaction.reference)
            .bind(details.business_name.trim())
            .bind(details.owner_name.trim())
            .bind(details.email.trim())
            .bind(details.phone.as_deref().map(str::trim))
            .bind(transaction.plan_id)
            .execute(&mut *db_tx)
            .await
            .map_err(AppError::from)?;
        }

        db_tx.commit().await.map_err(AppError::from)?;
        Ok(row_to_profile(row))
    }

    async fn update_status_if_open(
        &self,
        reference: &str,
        update: &StatusUpdate,
    ) -> AppResult<ConditionalUpdate> {
        let predecessors: Vec<String> = update
            .status
            .allowed_predecessors()
            .iter()
            .map(|s| s.as_ref().to_string())
            .collect();

        let row = sqlx::query(&format!(
            r#"
            UPDATE payment_transactions SET
                status = $2,
                gateway_transaction_id = COALESCE($3, gateway_transaction_id),
                three_ds_challenge = COALESCE($4, three_ds_challenge),
                failure_message = COALESCE($5, failure_message),
                finalized_at = CASE
                    WHEN $6 THEN COALESCE(finalized_at, CURRENT_TIMESTAMP)
                    ELSE finalized_at
                END,
                updated_at = CURRENT_TIMESTAMP
            WHERE reference = $1 AND status::text = ANY($7)
            RETURNING {SELECT_COLS}
            "#
        ))
        .bind(reference)
        .bind(update.status)
        .bind(&update.gateway_transaction_id)
        .bind(challenge_to_json(update.three_ds_challenge.as_ref())?)
        .bind(&update.failure_message)
        .bind(update.status.is_terminal())
        .bind(&predecessors)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::from)?;

        if let Some(row) = row {
            return Ok(ConditionalUpdate::Applied(row_to_profile(row)));
        }

        self.get_by_reference(reference)
            .await?
            .map(ConditionalUpdate::Unchanged)
            .ok_or(AppError::NotFound)
    }

    async fn list_unresolved(
        &self,
        created_before: NaiveDateTime,
        created_after: NaiveDateTime,
        limit: i64,
    ) -> AppResult<Vec<PaymentTransactionProfile>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {SELECT_COLS}
            FROM payment_transactions
            WHERE status IN ('CREATED', 'PENDING_3DS')
              AND created_at <= $1
              AND created_at >= $2
            ORDER BY created_at
            LIMIT $3
            "#
        ))
        .bind(created_before)
        .bind(created_after)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::from)?;

        Ok(rows.into_iter().map(row_to_profile).collect())
    }
}
