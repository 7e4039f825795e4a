//! Authenticated payment endpoints: a logged-in business owner renewing or
//! upgrading the subscription.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};

use crate::{
    adapters::http::{app_state::AppState, middleware::CurrentCaller},
    app_error::AppResult,
    domain::entities::credential_scope::CredentialScope,
    use_cases::{
        payment_initiation::CreatePaymentInput,
        reconciliation::{StatusAccess, TransactionView},
    },
};

/// GET /api/payments/config
async fn get_config(State(app_state): State<AppState>) -> AppResult<impl IntoResponse> {
    let config = app_state
        .credential_use_cases
        .get_public_config(CredentialScope::platform())
        .await?;
    Ok(Json(config))
}

/// POST /api/payments/transactions
async fn create_payment(
    State(app_state): State<AppState>,
    caller: CurrentCaller,
    Json(input): Json<CreatePaymentInput>,
) -> AppResult<impl IntoResponse> {
    let result = app_state
        .initiation_use_cases
        .create_authenticated_payment(&caller.0, input)
        .await?;
    Ok((StatusCode::CREATED, Json(result)))
}

/// GET /api/payments/transactions/{reference}/status
async fn get_status(
    State(app_state): State<AppState>,
    caller: CurrentCaller,
    Path(reference): Path<String>,
) -> AppResult<Json<TransactionView>> {
    let business_id = caller.0.require_business()?;
    let view = app_state
        .reconciliation_use_cases
        .check_status(&reference, StatusAccess::Business(business_id))
        .await?;
    Ok(Json(view))
}

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/config", get(get_config))
        .route("/transactions", post(create_payment))
        .route("/transactions/{reference}/status", get(get_status))
}
