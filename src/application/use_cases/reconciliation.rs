//! Status reconciliation engine.
//!
//! Three observers feed the same path: client polls (through the status
//! endpoints), gateway webhooks, and the background sweeper. Each observation
//! goes through one conditional write on the transaction row and, when the
//! result is `APPROVED`, through [`ActivationUseCases::activate_once`]. No
//! ordering between observers is assumed.

use std::sync::Arc;

use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::{
    app_error::{AppError, AppResult},
    application::{
        ports::{GatewayStatus, GatewayTransaction, PaymentGateway, ThreeDsChallenge},
        use_cases::{
            activation::{ActivationOutcome, ActivationUseCases},
            gateway_credentials::GatewayCredentialUseCases,
            payment_initiation::{
                ConditionalUpdate, PaymentTransactionProfile, PaymentTransactionRepo, StatusUpdate,
            },
        },
    },
    domain::entities::{
        activation_source::ActivationSource,
        credential_scope::CredentialScope,
        payment_purpose::PaymentPurpose,
        transaction_status::TransactionStatus,
        webhook_event::{WebhookEnvelope, WebhookEventKind},
    },
};

/// Who is asking about a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusAccess {
    /// Signup flow: the reference alone is enough, registration payments only.
    Public,
    /// Authenticated flow: the transaction must belong to this business.
    Business(Uuid),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionView {
    pub reference: String,
    pub transaction_id: Option<String>,
    pub status: TransactionStatus,
    pub amount_minor_units: i64,
    pub currency: String,
    pub has_challenge: bool,
    /// True while no terminal status is known. Callers should check again.
    pub still_processing: bool,
    pub activated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_message: Option<String>,
}

impl TransactionView {
    fn new(tx: PaymentTransactionProfile, activated: bool) -> Self {
        Self {
            still_processing: !tx.status.is_terminal(),
            has_challenge: tx.status == TransactionStatus::Pending3ds
                && tx.three_ds_challenge.is_some(),
            reference: tx.reference,
            transaction_id: tx.gateway_transaction_id,
            status: tx.status,
            amount_minor_units: tx.amount_minor_units,
            currency: tx.currency,
            activated,
            failure_message: tx.failure_message,
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SweepReport {
    pub checked: usize,
    pub resolved: usize,
    pub activated: usize,
}

/// Status reconciliation engine. See the module docs.
pub struct ReconciliationUseCases {
    transactions: Arc<dyn PaymentTransactionRepo>,
    credentials: Arc<GatewayCredentialUseCases>,
    gateway: Arc<dyn PaymentGateway>,
    activation: Arc<ActivationUseCases>,
}

impl ReconciliationUseCases {
    pub fn new(
        transactions: Arc<dyn PaymentTransactionRepo>,
        credentials: Arc<GatewayCredentialUseCases>,
        gateway: Arc<dyn PaymentGateway>,
        activation: Arc<ActivationUseCases>,
    ) -> Self {
        Self {
            transactions,
            credentials,
            gateway,
            activation,
        }
    }

    /// Server side of both polling endpoints.
    ///
    /// A gateway failure is not a poll failure: the local view is returned
    /// with `still_processing` set and the caller simply asks again.
    pub async fn check_status(
        &self,
        reference: &str,
        access: StatusAccess,
    ) -> AppResult<TransactionView> {
        let tx = self.load_visible(reference, access).await?;
        let tx = if tx.status.is_terminal() {
            tx
        } else {
            self.refresh_from_gateway(tx).await?
        };

        let activation = self.ensure_activated(&tx, ActivationSource::Poll).await;
        Ok(TransactionView::new(tx, activation.is_some()))
    }

    /// Challenge material for a transaction still waiting on step-up.
    pub async fn pending_challenge(&self, reference: &str) -> AppResult<ThreeDsChallenge> {
        let tx = self
            .transactions
            .get_by_reference(reference)
            .await?
            .ok_or(AppError::NotFound)?;
        match (tx.status, tx.three_ds_challenge) {
            (TransactionStatus::Pending3ds, Some(challenge)) => Ok(challenge),
            _ => Err(AppError::NotFound),
        }
    }

    async fn load_visible(
        &self,
        reference: &str,
        access: StatusAccess,
    ) -> AppResult<PaymentTransactionProfile> {
        let tx = self
            .transactions
            .get_by_reference(reference)
            .await?
            .ok_or(AppError::NotFound)?;

        let visible = match access {
            StatusAccess::Public => tx.purpose == PaymentPurpose::Registration,
            StatusAccess::Business(business_id) => tx.business_id == Some(business_id),
        };
        if visible { Ok(tx) } else { Err(AppError::NotFound) }
    }

    /// Asks the gateway for the current state of an open transaction and
    /// records it. Rows without a gateway id (the create answer was lost) are
    /// looked up by reference instead.
    async fn refresh_from_gateway(
        &self,
        tx: PaymentTransactionProfile,
    ) -> AppResult<PaymentTransactionProfile> {
        let credentials = match self.credentials.resolve_private(tx.scope).await {
            Ok(c) => c,
            Err(e) => {
                warn!(reference = %tx.reference, scope = %tx.scope, error = %e, "Cannot resolve credentials for status check");
                return Ok(tx);
            }
        };

        let observed = match tx.gateway_transaction_id.as_deref() {
            Some(gateway_id) => self.gateway.get_transaction(&credentials, gateway_id).await.map(Some),
            None => {
                self.gateway
                    .find_transaction_by_reference(&credentials, &tx.reference)
                    .await
            }
        };

        match observed {
            Ok(Some(observed)) => Ok(self.record_observation(&tx.reference, &observed).await?.into_profile()),
            Ok(None) => {
                debug!(reference = %tx.reference, "Gateway has no charge for this reference yet");
                Ok(tx)
            }
            Err(e) => {
                warn!(reference = %tx.reference, error = %e, "Gateway status check failed");
                Ok(tx)
            }
        }
    }

    async fn record_observation(
        &self,
        reference: &str,
        observed: &GatewayTransaction,
    ) -> AppResult<ConditionalUpdate> {
        let observed_status = observed.local_status();
        let update = StatusUpdate {
            status: observed_status,
            gateway_transaction_id: Some(observed.id.clone()),
            three_ds_challenge: observed.challenge.clone(),
            failure_message: observed.status_message.clone(),
        };

        let result = self
            .transactions
            .update_status_if_open(reference, &update)
            .await?;

        match &result {
            ConditionalUpdate::Applied(tx) => debug!(
                reference = %reference,
                status = %tx.status,
                "Transaction status recorded"
            ),
            ConditionalUpdate::Unchanged(tx) if tx.status != observed_status => info!(
                reference = %reference,
                current = %tx.status,
                observed = %observed_status,
                "Ignoring observation that would move transaction backwards"
            ),
            ConditionalUpdate::Unchanged(_) => {}
        }
        Ok(result)
    }

    /// Conditional write plus activate-once. Shared by every observer.
    pub async fn apply_observation(
        &self,
        reference: &str,
        observed: &GatewayTransaction,
        source: ActivationSource,
    ) -> AppResult<PaymentTransactionProfile> {
        let tx = self.record_observation(reference, observed).await?.into_profile();
        self.ensure_activated(&tx, source).await;
        Ok(tx)
    }

    /// Activation failures are logged, not returned: the status itself is
    /// already stored and the sweeper retries approved rows without activation.
    async fn ensure_activated(
        &self,
        tx: &PaymentTransactionProfile,
        source: ActivationSource,
    ) -> Option<ActivationOutcome> {
        if tx.status != TransactionStatus::Approved {
            return None;
        }
        match self.activation.activate_once(tx, source).await {
            Ok(outcome) => Some(outcome),
            Err(e) => {
                error!(reference = %tx.reference, source = %source, error = %e, "Activation failed");
                None
            }
        }
    }

    /// Processes an authenticated webhook for `scope`.
    pub async fn handle_webhook(
        &self,
        scope: CredentialScope,
        envelope: WebhookEnvelope,
    ) -> AppResult<()> {
        let kind = envelope.kind();
        let payload = envelope.data.transaction;

        match kind {
            WebhookEventKind::TransactionCreated => {
                info!(
                    scope = %scope,
                    reference = payload.as_ref().map(|t| t.reference.as_str()),
                    "Gateway reported transaction created"
                );
                Ok(())
            }
            WebhookEventKind::Unknown(event) => {
                info!(scope = %scope, event = %event, "Ignoring unrecognized webhook event");
                Ok(())
            }
            WebhookEventKind::TransactionUpdated => {
                let Some(payload) = payload else {
                    warn!(scope = %scope, "transaction.updated without transaction data");
                    return Ok(());
                };
                let Some(status) = GatewayStatus::parse(&payload.status) else {
                    warn!(reference = %payload.reference, status = %payload.status, "Unknown gateway status");
                    return Ok(());
                };
                let Some(tx) = self.transactions.get_by_reference(&payload.reference).await? else {
                    warn!(reference = %payload.reference, "Webhook for unknown reference");
                    return Ok(());
                };
                if tx.scope != scope {
                    warn!(reference = %tx.reference, expected = %tx.scope, got = %scope, "Webhook scope mismatch");
                    return Ok(());
                }
                let amount_matches = payload
                    .amount_minor_units
                    .is_none_or(|amount| amount == tx.amount_minor_units);
                let currency_matches = payload
                    .currency
                    .as_deref()
                    .is_none_or(|currency| currency == tx.currency);
                if !amount_matches || !currency_matches {
                    warn!(
                        reference = %tx.reference,
                        amount = ?payload.amount_minor_units,
                        currency = ?payload.currency,
                        "Webhook amount does not match local transaction"
                    );
                    return Ok(());
                }

                let observed = GatewayTransaction {
                    id: payload.id,
                    reference: payload.reference,
                    status,
                    status_message: payload.status_message,
                    challenge: None,
                };
                self.apply_observation(&tx.reference, &observed, ActivationSource::Webhook)
                    .await?;
                Ok(())
            }
        }
    }

    /// Re-checks stale open transactions and approved ones whose activation
    /// never landed. Covers observers that gave up or webhooks that were lost.
    pub async fn sweep_pending(
        &self,
        min_age: Duration,
        max_age: Duration,
        batch_size: i64,
    ) -> AppResult<SweepReport> {
        let now = Utc::now().naive_utc();
        let mut report = SweepReport::default();

        let stale = self
            .transactions
            .list_unresolved(now - min_age, now - max_age, batch_size)
            .await?;

        for tx in stale {
            report.checked += 1;
            let before = tx.status;
            let reference = tx.reference.clone();
            let refreshed = match self.refresh_from_gateway(tx).await {
                Ok(t) => t,
                Err(e) => {
                    warn!(reference = %reference, error = %e, "Sweep check failed");
                    continue;
                }
            };
            if refreshed.status != before {
                report.resolved += 1;
            }
            if let Some(outcome) = self.ensure_activated(&refreshed, ActivationSource::Sweeper).await
            {
                report.activated += usize::from(outcome.is_new());
            }
        }

        for tx in self.activation.approved_without_activation(batch_size).await? {
            report.checked += 1;
            if let Some(outcome) = self.ensure_activated(&tx, ActivationSource::Sweeper).await {
                report.activated += usize::from(outcome.is_new());
            }
        }

        Ok(report)
    }
}
