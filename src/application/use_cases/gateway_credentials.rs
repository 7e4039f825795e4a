//! Credential/config provider.
//!
//! One code path serves every [`CredentialScope`]: the platform's own billing
//! account and each business's account for its customers. Secrets are
//! AES-GCM encrypted at rest and only decrypted into [`SecretString`]s for
//! the duration of a sign or verify.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::NaiveDateTime;
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    app_error::{AppError, AppResult},
    application::validators::require_non_empty,
    domain::entities::{credential_scope::CredentialScope, gateway_environment::GatewayEnvironment},
    infra::crypto::ProcessCipher,
};

type HmacSha256 = Hmac<Sha256>;

const PREVIEW_LEN: usize = 8;

#[derive(Debug, Clone)]
pub struct GatewayCredentialProfile {
    pub id: Uuid,
    pub scope: CredentialScope,
    pub environment: GatewayEnvironment,
    pub public_key: String,
    pub private_key_encrypted: String,
    pub integrity_secret_encrypted: String,
    pub events_secret_encrypted: String,
    pub created_at: Option<NaiveDateTime>,
    pub updated_at: Option<NaiveDateTime>,
}

/// Credential row as handed to the store: secrets already encrypted.
pub struct EncryptedCredentials<'a> {
    pub environment: GatewayEnvironment,
    pub public_key: &'a str,
    pub private_key_encrypted: &'a str,
    pub integrity_secret_encrypted: &'a str,
    pub events_secret_encrypted: &'a str,
}

#[async_trait]
pub trait GatewayCredentialRepo: Send + Sync {
    async fn get_by_scope(&self, scope: CredentialScope)
    -> AppResult<Option<GatewayCredentialProfile>>;

    async fn upsert(
        &self,
        scope: CredentialScope,
        credentials: EncryptedCredentials<'_>,
    ) -> AppResult<GatewayCredentialProfile>;
}

/// Public, cacheable configuration handed to checkout UIs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublicGatewayConfig {
    pub public_key: String,
    pub environment: GatewayEnvironment,
    pub currency: String,
}

/// Decrypted credentials. Never logged, never serialized.
pub struct GatewayCredentials {
    pub environment: GatewayEnvironment,
    pub public_key: String,
    pub private_key: SecretString,
    pub integrity_secret: SecretString,
    pub events_secret: SecretString,
}

/// Plaintext secrets as submitted by an owner or admin.
#[derive(Deserialize)]
pub struct UpsertCredentialsInput {
    pub environment: GatewayEnvironment,
    pub public_key: String,
    pub private_key: String,
    pub integrity_secret: String,
    pub events_secret: String,
}

/// What the configuration screens may show: masked previews only.
#[derive(Debug, Clone, Serialize)]
pub struct CredentialStatus {
    pub configured: bool,
    pub environment: Option<GatewayEnvironment>,
    pub public_key: Option<String>,
    pub private_key_preview: Option<String>,
    pub integrity_secret_preview: Option<String>,
    pub events_secret_preview: Option<String>,
    pub webhook_url: String,
}

/// Credential/config provider for every [`CredentialScope`].
///
/// Public config is cached per scope for the life of the process and
/// dropped on `upsert`. Private material is decrypted on demand and only
/// held in `SecretString`s.
///
/// SECURITY: nothing here logs or returns plaintext secrets; API responses
/// carry masked previews only.
pub struct GatewayCredentialUseCases {
    repo: Arc<dyn GatewayCredentialRepo>,
    cipher: Arc<ProcessCipher>,
    public_cache: RwLock<HashMap<CredentialScope, PublicGatewayConfig>>,
    currency: String,
    public_api_origin: String,
}

impl GatewayCredentialUseCases {
    pub fn new(
        repo: Arc<dyn GatewayCredentialRepo>,
        cipher: Arc<ProcessCipher>,
        currency: String,
        public_api_origin: String,
    ) -> Self {
        Self {
            repo,
            cipher,
            public_cache: RwLock::new(HashMap::new()),
            currency,
            public_api_origin: public_api_origin.trim_end_matches('/').to_string(),
        }
    }

    pub async fn get_public_config(&self, scope: CredentialScope) -> AppResult<PublicGatewayConfig> {
        if let Some(cached) = self.cached(scope) {
            return Ok(cached);
        }

        let profile = self
            .repo
            .get_by_scope(scope)
            .await?
            .ok_or(AppError::ProviderNotConfigured)?;

        let config = PublicGatewayConfig {
            public_key: profile.public_key,
            environment: profile.environment,
            currency: self.currency.clone(),
        };

        if let Ok(mut cache) = self.public_cache.write() {
            cache.insert(scope, config.clone());
        }
        Ok(config)
    }

    fn cached(&self, scope: CredentialScope) -> Option<PublicGatewayConfig> {
        self.public_cache
            .read()
            .ok()
            .and_then(|cache| cache.get(&scope).cloned())
    }

    fn invalidate(&self, scope: CredentialScope) {
        if let Ok(mut cache) = self.public_cache.write() {
            cache.remove(&scope);
        }
    }

    pub async fn resolve_private(&self, scope: CredentialScope) -> AppResult<GatewayCredentials> {
        let profile = self
            .repo
            .get_by_scope(scope)
            .await?
            .ok_or(AppError::ProviderNotConfigured)?;

        Ok(GatewayCredentials {
            environment: profile.environment,
            public_key: profile.public_key,
            private_key: self.decrypt(&profile.private_key_encrypted)?,
            integrity_secret: self.decrypt(&profile.integrity_secret_encrypted)?,
            events_secret: self.decrypt(&profile.events_secret_encrypted)?,
        })
    }

    /// Events secret for the tenant named in a webhook path.
    pub async fn events_secret(&self, scope: CredentialScope) -> AppResult<SecretString> {
        let profile = self
            .repo
            .get_by_scope(scope)
            .await?
            .ok_or(AppError::ProviderNotConfigured)?;
        self.decrypt(&profile.events_secret_encrypted)
    }

    fn decrypt(&self, encrypted: &str) -> AppResult<SecretString> {
        self.cipher.decrypt(encrypted).map(SecretString::from)
    }

    pub async fn upsert(
        &self,
        scope: CredentialScope,
        input: UpsertCredentialsInput,
    ) -> AppResult<CredentialStatus> {
        validate_credentials(&input)?;

        let private_key_encrypted = self.cipher.encrypt(input.private_key.trim())?;
        let integrity_secret_encrypted =
            self.cipher.encrypt(input.integrity_secret.trim())?;
        let events_secret_encrypted = self.cipher.encrypt(input.events_secret.trim())?;

        self.repo
            .upsert(
                scope,
                EncryptedCredentials {
                    environment: input.environment,
                    public_key: input.public_key.trim(),
                    private_key_encrypted: &private_key_encrypted,
                    integrity_secret_encrypted: &integrity_secret_encrypted,
                    events_secret_encrypted: &events_secret_encrypted,
                },
            )
            .await?;
        self.invalidate(scope);

        info!(scope = %scope, environment = %input.environment, "Gateway credentials updated");

        Ok(CredentialStatus {
            configured: true,
            environment: Some(input.environment),
            public_key: Some(input.public_key.trim().to_string()),
            private_key_preview: Some(mask_secret(input.private_key.trim())),
            integrity_secret_preview: Some(mask_secret(input.integrity_secret.trim())),
            events_secret_preview: Some(mask_secret(input.events_secret.trim())),
            webhook_url: self.webhook_url(scope),
        })
    }

    pub async fn status(&self, scope: CredentialScope) -> AppResult<CredentialStatus> {
        let webhook_url = self.webhook_url(scope);
        let Some(profile) = self.repo.get_by_scope(scope).await? else {
            return Ok(CredentialStatus {
                configured: false,
                environment: None,
                public_key: None,
                private_key_preview: None,
                integrity_secret_preview: None,
                events_secret_preview: None,
                webhook_url,
            });
        };

        let preview = |encrypted: &str| match self.cipher.decrypt(encrypted) {
            Ok(plain) => Some(mask_secret(&plain)),
            Err(e) => {
                warn!(scope = %scope, error = %e, "Stored gateway secret could not be decrypted");
                None
            }
        };

        Ok(CredentialStatus {
            configured: true,
            environment: Some(profile.environment),
            private_key_preview: preview(&profile.private_key_encrypted),
            integrity_secret_preview: preview(&profile.integrity_secret_encrypted),
            events_secret_preview: preview(&profile.events_secret_encrypted),
            public_key: Some(profile.public_key),
            webhook_url,
        })
    }

    pub fn webhook_url(&self, scope: CredentialScope) -> String {
        format!(
            "{}/webhooks/payments/{}",
            self.public_api_origin,
            scope.tenant_segment()
        )
    }
}

fn validate_credentials(input: &UpsertCredentialsInput) -> AppResult<()> {
    let env = input.environment;
    let checks = [
        ("public_key", input.public_key.trim(), env.public_key_prefix()),
        (
            "private_key",
            input.private_key.trim(),
            env.private_key_prefix(),
        ),
        (
            "integrity_secret",
            input.integrity_secret.trim(),
            env.integrity_secret_prefix(),
        ),
        (
            "events_secret",
            input.events_secret.trim(),
            env.events_secret_prefix(),
        ),
    ];

    for (field, value, prefix) in checks {
        require_non_empty(field, value)?;
        if !value.starts_with(prefix) || value.len() <= prefix.len() {
            return Err(AppError::Validation(format!(
                "{field} must start with '{prefix}' for the {env} environment"
            )));
        }
    }
    Ok(())
}

/// Integrity signature sent with every charge: hex HMAC-SHA-256 over
/// `reference + amount + currency`.
pub fn integrity_signature(
    reference: &str,
    amount_minor_units: i64,
    currency: &str,
    integrity_secret: &SecretString,
) -> AppResult<String> {
    let mut mac = HmacSha256::new_from_slice(integrity_secret.expose_secret().as_bytes())
        .map_err(|_| AppError::Internal("HMAC error".into()))?;
    mac.update(format!("{reference}{amount_minor_units}{currency}").as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Prefix of a secret, for display. Short values are fully hidden.
pub fn mask_secret(value: &str) -> String {
    if value.chars().count() <= PREVIEW_LEN {
        return "********".to_string();
    }
    let prefix: String = value.chars().take(PREVIEW_LEN).collect();
    format!("{prefix}…")
}
