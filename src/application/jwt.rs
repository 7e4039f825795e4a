use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::app_error::{AppError, AppResult};

pub const ROLE_OWNER: &str = "owner";
pub const ROLE_ADMIN: &str = "admin";

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub business_id: Option<String>,
    #[serde(default)]
    pub roles: Vec<String>,
    pub exp: i64,
    pub iat: i64,
}

/// Verified identity of an authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerIdentity {
    pub user_id: Uuid,
    pub business_id: Option<Uuid>,
    pub roles: Vec<String>,
}

impl CallerIdentity {
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    pub fn require_business(&self) -> AppResult<Uuid> {
        self.business_id.ok_or(AppError::Forbidden)
    }
}

/// Issues an HS256 access token for `user_id`.
///
/// Production tokens come from the salon app's auth service with the same
/// claims and secret; this mirrors it for tests.
pub fn issue(
    user_id: Uuid,
    business_id: Option<Uuid>,
    roles: Vec<String>,
    secret: &SecretString,
    ttl: Duration,
) -> AppResult<String> {
    let now = OffsetDateTime::now_utc().unix_timestamp();
    let claims = Claims {
        sub: user_id.to_string(),
        business_id: business_id.map(|id| id.to_string()),
        roles,
        iat: now,
        exp: now + ttl.whole_seconds(),
    };
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.expose_secret().as_bytes()),
    )
    .map_err(|e| AppError::Internal(e.to_string()))
}

/// Validates signature and expiry and returns the caller's identity.
pub fn verify(token: &str, secret: &SecretString) -> AppResult<CallerIdentity> {
    let validation = Validation::new(Algorithm::HS256);
    let claims = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.expose_secret().as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|e| {
        tracing::debug!(error = %e, "Rejected access token");
        AppError::InvalidCredentials
    })?;

    let user_id = Uuid::parse_str(&claims.sub).map_err(|_| AppError::InvalidCredentials)?;
    let business_id = claims
        .business_id
        .as_deref()
        .map(Uuid::parse_str)
        .transpose()
        .map_err(|_| AppError::InvalidCredentials)?;

    Ok(CallerIdentity {
        user_id,
        business_id,
        roles: claims.roles,
    })
}
