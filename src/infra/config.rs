use std::net::SocketAddr;

use axum::http::HeaderValue;
use env_helpers::get_env_default;
use secrecy::SecretString;
use url::Url;

use super::InfraError;

pub struct AppConfig {
    pub database_url: String,
    pub bind_addr: SocketAddr,
    pub jwt_secret: SecretString,
    /// Base64 AES-256 key for gateway secrets at rest.
    pub credentials_key: SecretString,
    pub cors_origin: HeaderValue,
    /// Gateway REST root, e.g. `https://sandbox.wompi.co/v1`.
    pub wompi_api_base: Url,
    /// Public origin of this API; webhook URLs are built from it.
    pub public_api_origin: Url,
    pub default_currency: String,
    pub pending_sweep_interval_secs: u64,
    pub pending_sweep_min_age_secs: i64,
    pub pending_sweep_max_age_hours: i64,
    /// Emit JSON logs instead of the pretty console format.
    pub log_json: bool,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, InfraError> {
        let jwt_secret = SecretString::from(required("JWT_SECRET")?);
        let credentials_key = SecretString::from(required("CREDENTIALS_KEY")?);
        let database_url = required("DATABASE_URL")?;

        let cors_origin: HeaderValue =
            get_env_default("CORS_ORIGIN", String::from("http://localhost:3000"))
                .parse()
                .map_err(|e| InfraError::ConfigInvalid {
                    var: "CORS_ORIGIN",
                    reason: format!("{e}"),
                })?;

        let bind_addr: SocketAddr = get_env_default("BIND_ADDR", SocketAddr::from(([127, 0, 0, 1], 3001)));

        let wompi_api_base = parse_url(
            "WOMPI_API_BASE",
            get_env_default("WOMPI_API_BASE", String::from("https://sandbox.wompi.co/v1")),
        )?;
        let public_api_origin = parse_url(
            "PUBLIC_API_ORIGIN",
            get_env_default("PUBLIC_API_ORIGIN", String::from("http://localhost:3001")),
        )?;

        let default_currency: String = get_env_default("DEFAULT_CURRENCY", String::from("COP"));
        if default_currency.len() != 3 || !default_currency.chars().all(|c| c.is_ascii_uppercase()) {
            return Err(InfraError::ConfigInvalid {
                var: "DEFAULT_CURRENCY",
                reason: "expected a three-letter ISO code".into(),
            });
        }

        let log_json = get_env_default("LOG_FORMAT", String::from("pretty")).eq_ignore_ascii_case("json");

        Ok(Self {
            database_url,
            bind_addr,
            jwt_secret,
            credentials_key,
            cors_origin,
            wompi_api_base,
            public_api_origin,
            default_currency,
            pending_sweep_interval_secs: get_env_default("PENDING_SWEEP_INTERVAL_SECS", 30),
            pending_sweep_min_age_secs: get_env_default("PENDING_SWEEP_MIN_AGE_SECS", 60),
            pending_sweep_max_age_hours: get_env_default("PENDING_SWEEP_MAX_AGE_HOURS", 48),
            log_json,
        })
    }
}

fn required(var: &'static str) -> Result<String, InfraError> {
    std::env::var(var)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or(InfraError::ConfigMissing { var })
}

fn parse_url(var: &'static str, raw: String) -> Result<Url, InfraError> {
    Url::parse(&raw).map_err(|e| InfraError::ConfigInvalid {
        var,
        reason: e.to_string(),
    })
}
