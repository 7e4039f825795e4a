use crate::app_error::{AppError, ErrorCode};
use axum::Json;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match &self {
            AppError::Database(_) | AppError::Internal(_) => {
                tracing::error!(error = ?self, "Request failed")
            }
            _ => tracing::warn!(error = %self, "Request failed"),
        }

        match self {
            AppError::Database(_) => {
                error_resp(StatusCode::INTERNAL_SERVER_ERROR, ErrorCode::DatabaseError, None)
            }
            AppError::InvalidCredentials => {
                error_resp(StatusCode::UNAUTHORIZED, ErrorCode::InvalidCredentials, None)
            }
            AppError::Forbidden => error_resp(StatusCode::FORBIDDEN, ErrorCode::Forbidden, None),
            AppError::Validation(msg) => {
                error_resp(StatusCode::BAD_REQUEST, ErrorCode::ValidationError, Some(msg))
            }
            AppError::NotFound => error_resp(StatusCode::NOT_FOUND, ErrorCode::NotFound, None),
            AppError::GatewayRejected(msg) => error_resp(
                StatusCode::PAYMENT_REQUIRED,
                ErrorCode::GatewayRejected,
                Some(msg),
            ),
            AppError::GatewayUnreachable(_) => error_resp(
                StatusCode::GATEWAY_TIMEOUT,
                ErrorCode::GatewayUnreachable,
                Some("Payment outcome unknown. Check the transaction status before retrying.".into()),
            ),
            AppError::SignatureInvalid => {
                error_resp(StatusCode::UNAUTHORIZED, ErrorCode::SignatureInvalid, None)
            }
            AppError::ChallengeRender(msg) => error_resp(
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorCode::ChallengeRenderError,
                Some(msg),
            ),
            AppError::ProviderNotConfigured => error_resp(
                StatusCode::BAD_REQUEST,
                ErrorCode::ProviderNotConfigured,
                Some("Payment provider is not configured".into()),
            ),
            AppError::Internal(_) => {
                error_resp(StatusCode::INTERNAL_SERVER_ERROR, ErrorCode::InternalError, None)
            }
        }
    }
}

fn error_resp(status: StatusCode, code: ErrorCode, message: Option<String>) -> Response {
    let body = match message {
        Some(msg) => serde_json::json!({ "code": code.as_str(), "message": msg }),
        None => serde_json::json!({ "code": code.as_str() }),
    };
    (status, Json(body)).into_response()
}
