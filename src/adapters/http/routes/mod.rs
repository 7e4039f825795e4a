pub mod payment_config;
pub mod payments;
pub mod public_payments;
pub mod webhooks;

use axum::{Json, Router, routing::get};
use serde_json::{Value, json};

use crate::adapters::http::app_state::AppState;

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .nest("/api/payments", payments::router())
        .nest("/api/public/payments", public_payments::router())
        .nest("/webhooks/payments", webhooks::router())
        .merge(payment_config::router())
}
