use async_trait::async_trait;
use sqlx::{Postgres, Row, Transaction};
use uuid::Uuid;

use crate::{
    adapters::persistence::{
        PostgresPersistence,
        payment_transaction::{SELECT_COLS as TX_COLS, row_to_profile as row_to_transaction},
    },
    app_error::{AppError, AppResult},
    domain::entities::{activation_source::ActivationSource, payment_purpose::PaymentPurpose},
    use_cases::{
        activation::{ActivationOutcome, ActivationRecord, ActivationRepo},
        payment_initiation::PaymentTransactionProfile,
        subscription_plans::SubscriptionPlanProfile,
    },
};

const ACTIVATION_COLS: &str = "reference, business_id, subscription_id, source, created_at";

fn row_to_record(row: sqlx::postgres::PgRow) -> ActivationRecord {
    ActivationRecord {
        reference: row.get("reference"),
        business_id: row.get("business_id"),
        subscription_id: row.get("subscription_id"),
        source: row.get("source"),
        created_at: row.get("created_at"),
    }
}

/// Creates the subscription or pushes its period end forward by one plan
/// duration, counting from now when it already lapsed.
async fn extend_subscription(
    db_tx: &mut Transaction<'_, Postgres>,
    business_id: Uuid,
    plan: &SubscriptionPlanProfile,
) -> AppResult<Uuid> {
    let row = sqlx::query(
        r#"
        INSERT INTO subscriptions (id, business_id, plan_id, status, current_period_end)
        VALUES ($1, $2, $3, 'active', CURRENT_TIMESTAMP + make_interval(days => $4))
        ON CONFLICT (business_id) DO UPDATE SET
            plan_id = EXCLUDED.plan_id,
            status = 'active',
            current_period_end = GREATEST(subscriptions.current_period_end, CURRENT_TIMESTAMP)
                + make_interval(days => $4),
            updated_at = CURRENT_TIMESTAMP
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(business_id)
    .bind(plan.id)
    .bind(plan.duration_days)
    .fetch_one(&mut **db_tx)
    .await
    .map_err(AppError::from)?;

    Ok(row.get("id"))
}

/// Turns the stored signup into a business. The pending row is locked so a
/// second activation path cannot read it concurrently.
async fn create_business_from_registration(
    db_tx: &mut Transaction<'_, Postgres>,
    reference: &str,
) -> AppResult<Uuid> {
    let pending = sqlx::query(
        r#"
        SELECT business_name, owner_name, email, phone
        FROM pending_registrations
        WHERE reference = $1 AND consumed_at IS NULL
        FOR UPDATE
        "#,
    )
    .bind(reference)
    .fetch_optional(&mut **db_tx)
    .await
    .map_err(AppError::from)?
    .ok_or_else(|| {
        AppError::Internal(format!("No unconsumed registration for {reference}"))
    })?;

    let business_id = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO businesses (id, name, owner_name, email, phone)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(business_id)
    .bind(pending.get::<String, _>("business_name"))
    .bind(pending.get::<String, _>("owner_name"))
    .bind(pending.get::<String, _>("email"))
    .bind(pending.get::<Option<String>, _>("phone"))
    .execute(&mut **db_tx)
    .await
    .map_err(AppError::from)?;

    sqlx::query(
        "UPDATE pending_registrations SET consumed_at = CURRENT_TIMESTAMP WHERE reference = $1",
    )
    .bind(reference)
    .execute(&mut **db_tx)
    .await
    .map_err(AppError::from)?;

    Ok(business_id)
}

impl PostgresPersistence {
    async fn fetch_activation(&self, reference: &str) -> AppResult<Option<ActivationRecord>> {
        let row = sqlx::query(&format!(
            "SELECT {ACTIVATION_COLS} FROM payment_activations WHERE reference = $1"
        ))
        .bind(reference)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::from)?;

        Ok(row.map(row_to_record))
    }
}

#[async_trait]
impl ActivationRepo for PostgresPersistence {
    async fn activate(
        &self,
        transaction: &PaymentTransactionProfile,
        plan: &SubscriptionPlanProfile,
        source: ActivationSource,
    ) -> AppResult<ActivationOutcome> {
        let mut db_tx = self.pool.begin().await.map_err(AppError::from)?;

        // Blocks on a concurrent uncommitted claim, then yields nothing.
        let claimed = sqlx::query(
            r#"
            INSERT INTO payment_activations (reference, source)
            VALUES ($1, $2)
            ON CONFLICT (reference) DO NOTHING
            RETURNING reference
            "#,
        )
        .bind(&transaction.reference)
        .bind(source)
        .fetch_optional(&mut *db_tx)
        .await
        .map_err(AppError::from)?;

        if claimed.is_none() {
            db_tx.rollback().await.map_err(AppError::from)?;
            return self
                .fetch_activation(&transaction.reference)
                .await?
                .map(ActivationOutcome::AlreadyApplied)
                .ok_or_else(|| {
                    AppError::Internal(format!(
                        "Activation for {} vanished after conflict",
                        transaction.reference
                    ))
                });
        }

        let business_id = match transaction.purpose {
            PaymentPurpose::Registration => {
                create_business_from_registration(&mut db_tx, &transaction.reference).await?
            }
            PaymentPurpose::Subscription => transaction.business_id.ok_or_else(|| {
                AppError::Internal(format!(
                    "Subscription payment {} has no business",
                    transaction.reference
                ))
            })?,
        };
        let subscription_id = extend_subscription(&mut db_tx, business_id, plan).await?;

        let row = sqlx::query(&format!(
            r#"
            UPDATE payment_activations
            SET business_id = $2, subscription_id = $3
            WHERE reference = $1
            RETURNING {ACTIVATION_COLS}
            "#
        ))
        .bind(&transaction.reference)
        .bind(business_id)
        .bind(subscription_id)
        .fetch_one(&mut *db_tx)
        .await
        .map_err(AppError::from)?;

        db_tx.commit().await.map_err(AppError::from)?;
        Ok(ActivationOutcome::Applied(row_to_record(row)))
    }

    async fn list_approved_without_activation(
        &self,
        limit: i64,
    ) -> AppResult<Vec<PaymentTransactionProfile>> {
        let cols = TX_COLS
            .split(',')
            .map(|c| format!("t.{}", c.trim()))
            .collect::<Vec<_>>()
            .join(", ");
        let rows = sqlx::query(&format!(
            r#"
            SELECT {cols}
            FROM payment_transactions t
            LEFT JOIN payment_activations a ON a.reference = t.reference
            WHERE t.status = 'APPROVED' AND a.reference IS NULL
            ORDER BY t.finalized_at NULLS FIRST
            LIMIT $1
            "#
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::from)?;

        Ok(rows.into_iter().map(row_to_transaction).collect())
    }
}
