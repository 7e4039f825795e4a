use async_trait::async_trait;
use chrono::NaiveDateTime;
use uuid::Uuid;

use crate::app_error::AppResult;

/// Plan data the payment core reads; plans are managed elsewhere.
#[derive(Debug, Clone)]
pub struct SubscriptionPlanProfile {
    pub id: Uuid,
    pub name: String,
    pub price_minor_units: i64,
    pub currency: String,
    pub duration_days: i32,
    pub is_active: bool,
    pub created_at: Option<NaiveDateTime>,
}

#[async_trait]
pub trait SubscriptionPlanRepo: Send + Sync {
    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<SubscriptionPlanProfile>>;
}
