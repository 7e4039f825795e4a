//! Port for the card payment gateway.
//!
//! The use cases talk to the gateway only through [`PaymentGateway`]; the
//! Wompi REST adapter lives in `infra::wompi_client`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::application::use_cases::gateway_credentials::GatewayCredentials;
use crate::domain::entities::transaction_status::TransactionStatus;

/// Browser fingerprint required for 3-D Secure v2 risk assessment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrowserInfo {
    pub color_depth: u8,
    pub screen_height: u32,
    pub screen_width: u32,
    pub language: String,
    pub user_agent: String,
    /// Minutes offset from UTC as reported by the browser.
    pub timezone_offset_minutes: i32,
}

/// A signed charge ready to be submitted.
#[derive(Debug, Clone)]
pub struct GatewayCharge {
    pub reference: String,
    pub amount_minor_units: i64,
    pub currency: String,
    pub card_token: String,
    pub acceptance_token: String,
    pub customer_email: String,
    pub installments: u32,
    pub integrity_signature: String,
    pub browser: BrowserInfo,
}

/// Status as reported by the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayStatus {
    Pending,
    Approved,
    Declined,
    Error,
    Voided,
}

impl GatewayStatus {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.to_ascii_uppercase().as_str() {
            "PENDING" => Some(GatewayStatus::Pending),
            "APPROVED" => Some(GatewayStatus::Approved),
            "DECLINED" => Some(GatewayStatus::Declined),
            "ERROR" => Some(GatewayStatus::Error),
            "VOIDED" => Some(GatewayStatus::Voided),
            _ => None,
        }
    }

    /// Local status for an observation. A pending transaction only counts as
    /// `PENDING_3DS` when the gateway handed us challenge material.
    pub fn to_local(self, has_challenge: bool) -> TransactionStatus {
        match self {
            GatewayStatus::Pending if has_challenge => TransactionStatus::Pending3ds,
            GatewayStatus::Pending => TransactionStatus::Created,
            GatewayStatus::Approved => TransactionStatus::Approved,
            GatewayStatus::Declined => TransactionStatus::Declined,
            GatewayStatus::Error => TransactionStatus::Error,
            GatewayStatus::Voided => TransactionStatus::Voided,
        }
    }
}

/// Step-up authentication material attached to a pending transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreeDsChallenge {
    pub current_step: String,
    /// Base64-encoded issuer HTML, rendered inside an isolated frame.
    pub iframe_content: String,
}

#[derive(Debug, Clone)]
pub struct GatewayTransaction {
    pub id: String,
    pub reference: String,
    pub status: GatewayStatus,
    pub status_message: Option<String>,
    pub challenge: Option<ThreeDsChallenge>,
}

impl GatewayTransaction {
    pub fn local_status(&self) -> TransactionStatus {
        self.status.to_local(self.challenge.is_some())
    }
}

#[derive(Debug, Error)]
pub enum GatewayError {
    /// The gateway answered and refused the request.
    #[error("rejected: {0}")]
    Rejected(String),
    /// No usable answer (network failure, timeout, 5xx).
    #[error("unreachable: {0}")]
    Unreachable(String),
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_transaction(
        &self,
        credentials: &GatewayCredentials,
        charge: &GatewayCharge,
    ) -> Result<GatewayTransaction, GatewayError>;

    async fn get_transaction(
        &self,
        credentials: &GatewayCredentials,
        transaction_id: &str,
    ) -> Result<GatewayTransaction, GatewayError>;

    /// Looks a charge up by our own reference.
    ///
    /// Used when the create call's answer was lost and no gateway id was ever
    /// recorded. `Ok(None)` means the gateway never saw the charge.
    async fn find_transaction_by_reference(
        &self,
        credentials: &GatewayCredentials,
        reference: &str,
    ) -> Result<Option<GatewayTransaction>, GatewayError>;
}
