use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Forbidden")]
    Forbidden,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found")]
    NotFound,

    /// The gateway refused the request before charging (bad token, bad signature).
    #[error("Gateway rejected the transaction: {0}")]
    GatewayRejected(String),

    /// Outcome unknown: the request may or may not have reached the gateway.
    #[error("Gateway unreachable: {0}")]
    GatewayUnreachable(String),

    #[error("Webhook signature invalid")]
    SignatureInvalid,

    #[error("Challenge could not be rendered: {0}")]
    ChallengeRender(String),

    #[error("Payment provider not configured")]
    ProviderNotConfigured,

    #[error("Internal error: {0}")]
    Internal(String),
}

#[derive(Clone, Copy, Debug)]
pub enum ErrorCode {
    DatabaseError,
    InvalidCredentials,
    Forbidden,
    ValidationError,
    NotFound,
    GatewayRejected,
    GatewayUnreachable,
    SignatureInvalid,
    ChallengeRenderError,
    ProviderNotConfigured,
    InternalError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::DatabaseError => "DATABASE_ERROR",
            ErrorCode::InvalidCredentials => "INVALID_CREDENTIALS",
            ErrorCode::Forbidden => "FORBIDDEN",
            ErrorCode::ValidationError => "VALIDATION_ERROR",
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::GatewayRejected => "GATEWAY_REJECTED",
            ErrorCode::GatewayUnreachable => "GATEWAY_UNREACHABLE",
            ErrorCode::SignatureInvalid => "SIGNATURE_INVALID",
            ErrorCode::ChallengeRenderError => "CHALLENGE_RENDER_ERROR",
            ErrorCode::ProviderNotConfigured => "PROVIDER_NOT_CONFIGURED",
            ErrorCode::InternalError => "INTERNAL_ERROR",
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;
