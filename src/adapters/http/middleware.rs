use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use axum_extra::extract::CookieJar;

use crate::{
    adapters::http::app_state::AppState,
    app_error::{AppError, AppResult},
    application::jwt::{self, CallerIdentity, ROLE_ADMIN, ROLE_OWNER},
};

pub const ACCESS_TOKEN_COOKIE: &str = "access_token";

/// Authenticated caller, from `Authorization: Bearer` or the access token cookie.
pub struct CurrentCaller(pub CallerIdentity);

impl FromRequestParts<AppState> for CurrentCaller {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let bearer = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::to_owned);

        let token = match bearer {
            Some(token) => token,
            None => CookieJar::from_headers(&parts.headers)
                .get(ACCESS_TOKEN_COOKIE)
                .map(|c| c.value().to_owned())
                .ok_or(AppError::InvalidCredentials)?,
        };

        jwt::verify(&token, &state.config.jwt_secret).map(CurrentCaller)
    }
}

impl CurrentCaller {
    /// Business owner acting on their own business.
    pub fn owned_business(&self) -> AppResult<uuid::Uuid> {
        if !self.0.has_role(ROLE_OWNER) {
            return Err(AppError::Forbidden);
        }
        self.0.require_business()
    }

    pub fn require_admin(&self) -> AppResult<()> {
        if self.0.has_role(ROLE_ADMIN) {
            Ok(())
        } else {
            Err(AppError::Forbidden)
        }
    }
}
