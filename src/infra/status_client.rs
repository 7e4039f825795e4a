//! HTTP [`TransactionStatusSource`] for callers outside this process
//! (checkout frontends, the mobile app's backend-for-frontend, ops scripts).

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use url::Url;

use crate::{
    app_error::{AppError, AppResult},
    application::use_cases::{reconciliation::TransactionView, status_poller::TransactionStatusSource},
    infra::http_client::try_build_client,
};

pub struct PaymentStatusClient {
    client: Client,
    api_origin: String,
    access_token: Option<SecretString>,
}

impl PaymentStatusClient {
    /// Client for the public signup flow: the reference is the only credential.
    pub fn public(api_origin: &Url) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: try_build_client()?,
            api_origin: api_origin.as_str().trim_end_matches('/').to_string(),
            access_token: None,
        })
    }

    /// Client for the authenticated flow, sending the caller's access token.
    pub fn authenticated(api_origin: &Url, access_token: SecretString) -> Result<Self, reqwest::Error> {
        Ok(Self {
            access_token: Some(access_token),
            ..Self::public(api_origin)?
        })
    }

    fn status_url(&self, reference: &str) -> String {
        match self.access_token {
            Some(_) => format!("{}/api/payments/transactions/{reference}/status", self.api_origin),
            None => format!(
                "{}/api/public/payments/transactions/{reference}/status",
                self.api_origin
            ),
        }
    }
}

#[async_trait]
impl TransactionStatusSource for PaymentStatusClient {
    async fn fetch_status(&self, reference: &str) -> AppResult<TransactionView> {
        let mut request = self.client.get(self.status_url(reference));
        if let Some(token) = &self.access_token {
            request = request.bearer_auth(token.expose_secret());
        }

        let response = request
            .send()
            .await
            .map_err(|e| AppError::Internal(format!("Status request failed: {e}")))?;

        match response.status() {
            status if status.is_success() => response
                .json::<TransactionView>()
                .await
                .map_err(|e| AppError::Internal(format!("Failed to parse status response: {e}"))),
            StatusCode::NOT_FOUND => Err(AppError::NotFound),
            StatusCode::UNAUTHORIZED => Err(AppError::InvalidCredentials),
            StatusCode::FORBIDDEN => Err(AppError::Forbidden),
            status => Err(AppError::Internal(format!("Status endpoint returned {status}"))),
        }
    }
}
