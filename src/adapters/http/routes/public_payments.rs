//! Unauthenticated signup payments. The business does not exist yet, so the
//! transaction reference is the only handle the client holds.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::{HeaderValue, StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use serde_json::json;

use crate::{
    adapters::http::app_state::AppState,
    app_error::{AppError, AppResult, ErrorCode},
    use_cases::{
        challenge::{CHALLENGE_CONTENT_SECURITY_POLICY, render_challenge_page},
        payment_initiation::PublicRegistrationInput,
        reconciliation::{StatusAccess, TransactionView},
    },
};

/// POST /api/public/payments/registrations
async fn create_registration_payment(
    State(app_state): State<AppState>,
    Json(input): Json<PublicRegistrationInput>,
) -> AppResult<impl IntoResponse> {
    let result = app_state
        .initiation_use_cases
        .create_public_registration_payment(input)
        .await?;
    Ok((StatusCode::CREATED, Json(result)))
}

/// GET /api/public/payments/transactions/{reference}/status
async fn get_status(
    State(app_state): State<AppState>,
    Path(reference): Path<String>,
) -> AppResult<Json<TransactionView>> {
    let view = app_state
        .reconciliation_use_cases
        .check_status(&reference, StatusAccess::Public)
        .await?;
    Ok(Json(view))
}

/// GET /api/public/payments/transactions/{reference}/challenge
///
/// A payload that cannot be rendered leaves the transaction unresolved; the
/// client keeps polling.
async fn get_challenge(
    State(app_state): State<AppState>,
    Path(reference): Path<String>,
) -> AppResult<Response> {
    let challenge = app_state
        .reconciliation_use_cases
        .pending_challenge(&reference)
        .await?;

    match render_challenge_page(&reference, &challenge) {
        Ok(page) => {
            let mut response = Html(page).into_response();
            let headers = response.headers_mut();
            headers.insert(
                header::CONTENT_SECURITY_POLICY,
                HeaderValue::from_static(CHALLENGE_CONTENT_SECURITY_POLICY),
            );
            headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
            headers.insert(header::REFERRER_POLICY, HeaderValue::from_static("no-referrer"));
            Ok(response)
        }
        Err(AppError::ChallengeRender(message)) => {
            tracing::warn!(reference = %reference, error = %message, "Challenge could not be rendered");
            Ok((
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(json!({
                    "code": ErrorCode::ChallengeRenderError.as_str(),
                    "message": message,
                    "still_pending": true,
                })),
            )
                .into_response())
        }
        Err(e) => Err(e),
    }
}

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/registrations", post(create_registration_payment))
        .route("/transactions/{reference}/status", get(get_status))
        .route("/transactions/{reference}/challenge", get(get_challenge))
}
