use axum::{
    Json, Router,
    extract::State,
    routing::get,
};

use crate::{
    adapters::http::{app_state::AppState, middleware::CurrentCaller},
    app_error::AppResult,
    domain::entities::credential_scope::CredentialScope,
    use_cases::gateway_credentials::{CredentialStatus, UpsertCredentialsInput},
};

/// GET /api/payment-config
async fn get_business_config(
    State(app_state): State<AppState>,
    caller: CurrentCaller,
) -> AppResult<Json<CredentialStatus>> {
    let business_id = caller.owned_business()?;
    let status = app_state
        .credential_use_cases
        .status(CredentialScope::business(business_id))
        .await?;
    Ok(Json(status))
}

/// PUT /api/payment-config
async fn put_business_config(
    State(app_state): State<AppState>,
    caller: CurrentCaller,
    Json(input): Json<UpsertCredentialsInput>,
) -> AppResult<Json<CredentialStatus>> {
    let business_id = caller.owned_business()?;
    let status = app_state
        .credential_use_cases
        .upsert(CredentialScope::business(business_id), input)
        .await?;
    Ok(Json(status))
}

/// GET /api/admin/payment-config
async fn get_platform_config(
    State(app_state): State<AppState>,
    caller: CurrentCaller,
) -> AppResult<Json<CredentialStatus>> {
    caller.require_admin()?;
    let status = app_state
        .credential_use_cases
        .status(CredentialScope::platform())
        .await?;
    Ok(Json(status))
}

/// PUT /api/admin/payment-config
async fn put_platform_config(
    State(app_state): State<AppState>,
    caller: CurrentCaller,
    Json(input): Json<UpsertCredentialsInput>,
) -> AppResult<Json<CredentialStatus>> {
    caller.require_admin()?;
    let status = app_state
        .credential_use_cases
        .upsert(CredentialScope::platform(), input)
        .await?;
    Ok(Json(status))
}

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/api/payment-config",
            get(get_business_config).put(put_business_config),
        )
        .route(
            "/api/admin/payment-config",
            get(get_platform_config).put(put_platform_config),
        )
}
