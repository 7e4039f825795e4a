use async_trait::async_trait;
use sqlx::Row;
use uuid::Uuid;

use crate::{
    adapters::persistence::PostgresPersistence,
    app_error::{AppError, AppResult},
    use_cases::subscription_plans::{SubscriptionPlanProfile, SubscriptionPlanRepo},
};

#[async_trait]
impl SubscriptionPlanRepo for PostgresPersistence {
    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<SubscriptionPlanProfile>> {
        let row = sqlx::query(
            r#"
            SELECT id, name, price_minor_units, currency, duration_days, is_active, created_at
            FROM subscription_plans
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::from)?;

        Ok(row.map(|r| SubscriptionPlanProfile {
            id: r.get("id"),
            name: r.get("name"),
            price_minor_units: r.get("price_minor_units"),
            currency: r.get::<String, _>("currency").trim_end().to_string(),
            duration_days: r.get("duration_days"),
            is_active: r.get("is_active"),
            created_at: r.get("created_at"),
        }))
    }
}
