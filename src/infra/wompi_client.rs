//! Wompi REST adapter for the [`PaymentGateway`] port.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::{
    application::{
        ports::{
            GatewayCharge, GatewayError, GatewayStatus, GatewayTransaction, PaymentGateway,
            ThreeDsChallenge,
        },
        use_cases::gateway_credentials::GatewayCredentials,
    },
    infra::http_client::try_build_client,
};

#[derive(Clone)]
pub struct WompiClient {
    client: Client,
    api_base: String,
}

impl WompiClient {
    pub fn new(api_base: &Url) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: try_build_client()?,
            api_base: api_base.as_str().trim_end_matches('/').to_string(),
        })
    }

    async fn read(response: reqwest::Response) -> Result<GatewayTransaction, GatewayError> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| GatewayError::Unreachable(format!("failed to read response: {e}")))?;
        parse_transaction_response(status, &body)
    }
}

#[derive(Serialize)]
struct CreateTransactionRequest<'a> {
    acceptance_token: &'a str,
    amount_in_cents: i64,
    currency: &'a str,
    signature: &'a str,
    customer_email: &'a str,
    reference: &'a str,
    payment_method: PaymentMethodRequest<'a>,
    is_three_ds: bool,
    browser_info: BrowserInfoRequest<'a>,
}

#[derive(Serialize)]
struct PaymentMethodRequest<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    token: &'a str,
    installments: u32,
}

/// The gateway expects every browser field as a string.
#[derive(Serialize)]
struct BrowserInfoRequest<'a> {
    browser_color_depth: String,
    browser_screen_height: String,
    browser_screen_width: String,
    browser_language: &'a str,
    browser_user_agent: &'a str,
    browser_tz: String,
}

impl<'a> CreateTransactionRequest<'a> {
    fn from_charge(charge: &'a GatewayCharge) -> Self {
        Self {
            acceptance_token: &charge.acceptance_token,
            amount_in_cents: charge.amount_minor_units,
            currency: &charge.currency,
            signature: &charge.integrity_signature,
            customer_email: &charge.customer_email,
            reference: &charge.reference,
            payment_method: PaymentMethodRequest {
                kind: "CARD",
                token: &charge.card_token,
                installments: charge.installments,
            },
            is_three_ds: true,
            browser_info: BrowserInfoRequest {
                browser_color_depth: charge.browser.color_depth.to_string(),
                browser_screen_height: charge.browser.screen_height.to_string(),
                browser_screen_width: charge.browser.screen_width.to_string(),
                browser_language: &charge.browser.language,
                browser_user_agent: &charge.browser.user_agent,
                browser_tz: charge.browser.timezone_offset_minutes.to_string(),
            },
        }
    }
}

#[derive(Deserialize)]
struct TransactionEnvelope {
    data: TransactionData,
}

#[derive(Deserialize)]
struct TransactionListEnvelope {
    #[serde(default)]
    data: Vec<TransactionData>,
}

#[derive(Deserialize)]
struct TransactionData {
    id: String,
    reference: String,
    status: String,
    status_message: Option<String>,
    payment_method: Option<PaymentMethodData>,
}

#[derive(Deserialize)]
struct PaymentMethodData {
    extra: Option<PaymentMethodExtra>,
}

#[derive(Deserialize)]
struct PaymentMethodExtra {
    three_ds_auth: Option<ThreeDsAuth>,
}

#[derive(Deserialize)]
struct ThreeDsAuth {
    current_step: Option<String>,
    three_ds_method_data: Option<String>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(rename = "type")]
    kind: Option<String>,
    reason: Option<String>,
    messages: Option<serde_json::Value>,
}

impl ErrorBody {
    fn describe(self) -> String {
        if let Some(reason) = self.reason {
            return reason;
        }
        if let Some(messages) = self.messages {
            let mut parts = Vec::new();
            collect_messages(&messages, &mut parts);
            if !parts.is_empty() {
                return parts.join("; ");
            }
        }
        self.kind.unwrap_or_else(|| "request rejected".to_string())
    }
}

fn collect_messages(value: &serde_json::Value, out: &mut Vec<String>) {
    match value {
        serde_json::Value::String(s) => out.push(s.clone()),
        serde_json::Value::Array(items) => items.iter().for_each(|v| collect_messages(v, out)),
        serde_json::Value::Object(map) => map.values().for_each(|v| collect_messages(v, out)),
        _ => {}
    }
}

/// Maps a non-success HTTP answer onto the port's error. 5xx, 408 and 429 are
/// ambiguous and count as unreachable; other 4xx are rejections.
fn check_response_status(status: StatusCode, body: &str) -> Result<(), GatewayError> {
    if status.is_server_error()
        || status == StatusCode::REQUEST_TIMEOUT
        || status == StatusCode::TOO_MANY_REQUESTS
    {
        tracing::warn!(status = %status, "Gateway answered with a retryable status");
        return Err(GatewayError::Unreachable(format!("gateway returned {status}")));
    }

    if !status.is_success() {
        let message = serde_json::from_str::<ErrorEnvelope>(body)
            .map(|e| e.error.describe())
            .unwrap_or_else(|_| format!("gateway returned {status}"));
        tracing::warn!(status = %status, message = %message, "Gateway rejected request");
        return Err(GatewayError::Rejected(message));
    }

    Ok(())
}

fn parse_body<T: serde::de::DeserializeOwned>(body: &str) -> Result<T, GatewayError> {
    serde_json::from_str(body).map_err(|e| {
        tracing::error!(error = %e, "Failed to parse gateway transaction");
        GatewayError::Unreachable(format!("unparseable gateway response: {e}"))
    })
}

fn into_gateway_transaction(data: TransactionData) -> Result<GatewayTransaction, GatewayError> {
    let gateway_status = GatewayStatus::parse(&data.status).ok_or_else(|| {
        GatewayError::Unreachable(format!("unknown gateway status {}", data.status))
    })?;

    let challenge = data
        .payment_method
        .and_then(|pm| pm.extra)
        .and_then(|extra| extra.three_ds_auth)
        .and_then(|auth| {
            let content = auth.three_ds_method_data.filter(|c| !c.trim().is_empty())?;
            Some(ThreeDsChallenge {
                current_step: auth.current_step.unwrap_or_else(|| "CHALLENGE".to_string()),
                iframe_content: content,
            })
        })
        .filter(|_| gateway_status == GatewayStatus::Pending);

    Ok(GatewayTransaction {
        id: data.id,
        reference: data.reference,
        status: gateway_status,
        status_message: data.status_message,
        challenge,
    })
}

/// Single-transaction answer (`POST /transactions`, `GET /transactions/{id}`).
fn parse_transaction_response(
    status: StatusCode,
    body: &str,
) -> Result<GatewayTransaction, GatewayError> {
    check_response_status(status, body)?;
    let envelope: TransactionEnvelope = parse_body(body)?;
    into_gateway_transaction(envelope.data)
}

/// Search answer (`GET /transactions?reference=`). Only rows carrying the
/// requested reference count; an empty list means the charge never landed.
fn parse_reference_search_response(
    status: StatusCode,
    body: &str,
    reference: &str,
) -> Result<Option<GatewayTransaction>, GatewayError> {
    check_response_status(status, body)?;
    let envelope: TransactionListEnvelope = parse_body(body)?;
    envelope
        .data
        .into_iter()
        .find(|data| data.reference == reference)
        .map(into_gateway_transaction)
        .transpose()
}

fn transport_error(e: reqwest::Error) -> GatewayError {
    GatewayError::Unreachable(format!("gateway request failed: {e}"))
}

#[async_trait]
impl PaymentGateway for WompiClient {
    async fn create_transaction(
        &self,
        credentials: &GatewayCredentials,
        charge: &GatewayCharge,
    ) -> Result<GatewayTransaction, GatewayError> {
        let response = self
            .client
            .post(format!("{}/transactions", self.api_base))
            .bearer_auth(credentials.private_key.expose_secret())
            .json(&CreateTransactionRequest::from_charge(charge))
            .send()
            .await
            .map_err(transport_error)?;

        Self::read(response).await
    }

    async fn get_transaction(
        &self,
        credentials: &GatewayCredentials,
        transaction_id: &str,
    ) -> Result<GatewayTransaction, GatewayError> {
        let response = self
            .client
            .get(format!("{}/transactions/{}", self.api_base, transaction_id))
            .bearer_auth(credentials.private_key.expose_secret())
            .send()
            .await
            .map_err(transport_error)?;

        Self::read(response).await
    }

    async fn find_transaction_by_reference(
        &self,
        credentials: &GatewayCredentials,
        reference: &str,
    ) -> Result<Option<GatewayTransaction>, GatewayError> {
        let response = self
            .client
            .get(format!("{}/transactions", self.api_base))
            .query(&[("reference", reference)])
            .bearer_auth(credentials.private_key.expose_secret())
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| GatewayError::Unreachable(format!("failed to read response: {e}")))?;
        parse_reference_search_response(status, &body, reference)
    }
}
