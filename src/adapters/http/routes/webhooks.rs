//! Gateway webhook receiver, one URL per credential scope.
//!
//! The signature is checked synchronously against the tenant's own events
//! secret. Once it passes, the gateway gets its 200 and the event is
//! processed on a separate task; internal failures are only logged.

use axum::{
    Router,
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    routing::post,
};
use secrecy::ExposeSecret;
use tracing::{error, warn};

use crate::{
    adapters::http::app_state::AppState,
    app_error::{AppError, AppResult},
    domain::entities::{credential_scope::CredentialScope, webhook_event::WebhookEnvelope},
    infra::webhook_signature::{SIGNATURE_HEADER, verify_signature},
};

/// POST /webhooks/payments/{tenant}
async fn receive_payment_webhook(
    State(app_state): State<AppState>,
    Path(tenant): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<StatusCode> {
    let scope = CredentialScope::from_tenant_segment(&tenant).ok_or(AppError::NotFound)?;

    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            warn!(tenant = %tenant, "Webhook without signature header");
            AppError::SignatureInvalid
        })?;

    let secret = match app_state.credential_use_cases.events_secret(scope).await {
        Ok(secret) => secret,
        Err(AppError::ProviderNotConfigured) => {
            warn!(tenant = %tenant, "Webhook for tenant without gateway credentials");
            return Err(AppError::SignatureInvalid);
        }
        Err(e) => return Err(e),
    };

    if let Err(e) = verify_signature(secret.expose_secret(), &body, signature) {
        warn!(tenant = %tenant, "Webhook signature mismatch; event dropped");
        return Err(e);
    }

    let envelope: WebhookEnvelope = match serde_json::from_slice(&body) {
        Ok(envelope) => envelope,
        Err(e) => {
            warn!(tenant = %tenant, error = %e, "Signed webhook body is not a valid event");
            return Ok(StatusCode::OK);
        }
    };

    let reconciliation = app_state.reconciliation_use_cases.clone();
    tokio::spawn(async move {
        let event = envelope.event.clone();
        if let Err(e) = reconciliation.handle_webhook(scope, envelope).await {
            error!(scope = %scope, event = %event, error = %e, "Webhook processing failed");
        }
    });

    Ok(StatusCode::OK)
}

pub(crate) fn router() -> Router<AppState> {
    Router::new().route("/{tenant}", post(receive_payment_webhook))
}
