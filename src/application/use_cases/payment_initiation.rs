//! Transaction initiator.
//!
//! The local row is written in `CREATED` before the gateway sees the charge,
//! then moved forward with the gateway's answer through the same conditional
//! write the observers use. Activation is never done here: the poll, the
//! webhook or the sweeper pick up approved transactions.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    app_error::{AppError, AppResult},
    application::{
        jwt::CallerIdentity,
        ports::{BrowserInfo, GatewayCharge, GatewayError, PaymentGateway, ThreeDsChallenge},
        use_cases::{
            gateway_credentials::{GatewayCredentialUseCases, integrity_signature},
            subscription_plans::SubscriptionPlanRepo,
        },
        validators,
    },
    domain::entities::{
        credential_scope::CredentialScope, payment_purpose::PaymentPurpose,
        transaction_status::TransactionStatus,
    },
};

const DEFAULT_INSTALLMENTS: u32 = 1;
const MAX_INSTALLMENTS: u32 = 36;

// ============================================================================
// Profiles and repository
// ============================================================================

#[derive(Debug, Clone)]
pub struct PaymentTransactionProfile {
    pub id: Uuid,
    pub reference: String,
    pub gateway_transaction_id: Option<String>,
    pub scope: CredentialScope,
    pub purpose: PaymentPurpose,
    pub business_id: Option<Uuid>,
    pub plan_id: Uuid,
    pub customer_email: String,
    pub amount_minor_units: i64,
    pub currency: String,
    pub status: TransactionStatus,
    pub three_ds_challenge: Option<ThreeDsChallenge>,
    pub failure_message: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub finalized_at: Option<NaiveDateTime>,
}

#[derive(Debug, Clone)]
pub struct NewPaymentTransaction {
    pub reference: String,
    pub scope: CredentialScope,
    pub purpose: PaymentPurpose,
    pub business_id: Option<Uuid>,
    pub plan_id: Uuid,
    pub customer_email: String,
    pub amount_minor_units: i64,
    pub currency: String,
}

/// Signup data kept server-side until the charge is approved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationDetails {
    pub business_name: String,
    pub owner_name: String,
    pub email: String,
    pub phone: Option<String>,
}

/// Fields written together with a status change.
#[derive(Debug, Clone)]
pub struct StatusUpdate {
    pub status: TransactionStatus,
    pub gateway_transaction_id: Option<String>,
    pub three_ds_challenge: Option<ThreeDsChallenge>,
    pub failure_message: Option<String>,
}

impl StatusUpdate {
    pub fn status_only(status: TransactionStatus) -> Self {
        Self {
            status,
            gateway_transaction_id: None,
            three_ds_challenge: None,
            failure_message: None,
        }
    }
}

#[derive(Debug, Clone)]
pub enum ConditionalUpdate {
    Applied(PaymentTransactionProfile),
    /// The stored status did not allow the write; carries the current row.
    Unchanged(PaymentTransactionProfile),
}

impl ConditionalUpdate {
    pub fn into_profile(self) -> PaymentTransactionProfile {
        match self {
            ConditionalUpdate::Applied(p) | ConditionalUpdate::Unchanged(p) => p,
        }
    }
}

#[async_trait]
pub trait PaymentTransactionRepo: Send + Sync {
    async fn get_by_reference(&self, reference: &str)
    -> AppResult<Option<PaymentTransactionProfile>>;

    /// Inserts the transaction, plus its pending registration in the same
    /// database transaction when one is given.
    async fn create(
        &self,
        transaction: &NewPaymentTransaction,
        registration: Option<&RegistrationDetails>,
    ) -> AppResult<PaymentTransactionProfile>;

    /// Writes `update` only if the stored status is one of `update.status`'s
    /// allowed predecessors. Unknown references are `NotFound`.
    async fn update_status_if_open(
        &self,
        reference: &str,
        update: &StatusUpdate,
    ) -> AppResult<ConditionalUpdate>;

    /// Open transactions created inside the given window, with or without a
    /// gateway id.
    async fn list_unresolved(
        &self,
        created_before: NaiveDateTime,
        created_after: NaiveDateTime,
        limit: i64,
    ) -> AppResult<Vec<PaymentTransactionProfile>>;
}

// ============================================================================
// Inputs and results
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePaymentInput {
    pub plan_id: Uuid,
    pub amount_minor_units: i64,
    pub currency: String,
    pub reference: Option<String>,
    pub card_token: String,
    pub acceptance_token: String,
    pub customer_email: String,
    pub installments: Option<u32>,
    pub browser_info: BrowserInfo,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicRegistrationInput {
    pub registration: RegistrationDetails,
    pub payment: CreatePaymentInput,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaymentResult {
    pub reference: String,
    pub transaction_id: Option<String>,
    pub status: TransactionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub three_ds_challenge: Option<ThreeDsChallenge>,
}

impl From<PaymentTransactionProfile> for PaymentResult {
    fn from(tx: PaymentTransactionProfile) -> Self {
        Self {
            reference: tx.reference,
            transaction_id: tx.gateway_transaction_id,
            status: tx.status,
            three_ds_challenge: tx.three_ds_challenge,
        }
    }
}

// ============================================================================
// Use cases
// ============================================================================

/// Transaction initiator.
///
/// Writes the `CREATED` row (and the pending registration, for signups)
/// before calling the gateway, then records whatever the gateway answered.
/// Initiation never activates; that is left to the observers.
pub struct PaymentInitiationUseCases {
    transactions: Arc<dyn PaymentTransactionRepo>,
    plans: Arc<dyn SubscriptionPlanRepo>,
    credentials: Arc<GatewayCredentialUseCases>,
    gateway: Arc<dyn PaymentGateway>,
}

impl PaymentInitiationUseCases {
    pub fn new(
        transactions: Arc<dyn PaymentTransactionRepo>,
        plans: Arc<dyn SubscriptionPlanRepo>,
        credentials: Arc<GatewayCredentialUseCases>,
        gateway: Arc<dyn PaymentGateway>,
    ) -> Self {
        Self {
            transactions,
            plans,
            credentials,
            gateway,
        }
    }

    /// Renewal or upgrade paid by an existing business.
    pub async fn create_authenticated_payment(
        &self,
        caller: &CallerIdentity,
        input: CreatePaymentInput,
    ) -> AppResult<PaymentResult> {
        let business_id = caller.require_business()?;
        self.initiate(PaymentPurpose::Subscription, Some(business_id), input, None)
            .await
    }

    /// Signup: no business exists yet, it is created when the charge is approved.
    pub async fn create_public_registration_payment(
        &self,
        input: PublicRegistrationInput,
    ) -> AppResult<PaymentResult> {
        let registration = input.registration;
        validators::require_non_empty("business_name", &registration.business_name)?;
        validators::require_non_empty("owner_name", &registration.owner_name)?;
        validators::validate_email(&registration.email)?;

        self.initiate(
            PaymentPurpose::Registration,
            None,
            input.payment,
            Some(&registration),
        )
        .await
    }

    async fn initiate(
        &self,
        purpose: PaymentPurpose,
        business_id: Option<Uuid>,
        input: CreatePaymentInput,
        registration: Option<&RegistrationDetails>,
    ) -> AppResult<PaymentResult> {
        validate_payment_input(&input)?;
        let reference = validators::resolve_reference(input.reference.as_deref())?;

        let plan = self
            .plans
            .get_by_id(input.plan_id)
            .await?
            .filter(|p| p.is_active)
            .ok_or_else(|| AppError::Validation("Unknown or inactive plan".into()))?;
        if plan.price_minor_units != input.amount_minor_units || plan.currency != input.currency {
            return Err(AppError::Validation(
                "Amount and currency must match the selected plan".into(),
            ));
        }

        if self.transactions.get_by_reference(&reference).await?.is_some() {
            return Err(AppError::Validation(format!(
                "Reference {reference} has already been used"
            )));
        }

        let scope = CredentialScope::platform();
        let credentials = self.credentials.resolve_private(scope).await?;

        let new_tx = NewPaymentTransaction {
            reference: reference.clone(),
            scope,
            purpose,
            business_id,
            plan_id: plan.id,
            customer_email: input.customer_email.trim().to_string(),
            amount_minor_units: input.amount_minor_units,
            currency: input.currency.clone(),
        };
        self.transactions.create(&new_tx, registration).await?;

        let charge = GatewayCharge {
            integrity_signature: integrity_signature(
                &reference,
                input.amount_minor_units,
                &input.currency,
                &credentials.integrity_secret,
            )?,
            reference: reference.clone(),
            amount_minor_units: input.amount_minor_units,
            currency: input.currency,
            card_token: input.card_token,
            acceptance_token: input.acceptance_token,
            customer_email: new_tx.customer_email,
            installments: input.installments.unwrap_or(DEFAULT_INSTALLMENTS),
            browser: input.browser_info,
        };

        match self.gateway.create_transaction(&credentials, &charge).await {
            Ok(gateway_tx) => {
                let status = gateway_tx.local_status();
                let update = StatusUpdate {
                    status,
                    gateway_transaction_id: Some(gateway_tx.id),
                    three_ds_challenge: gateway_tx.challenge,
                    failure_message: gateway_tx.status_message,
                };
                let stored = self
                    .transactions
                    .update_status_if_open(&reference, &update)
                    .await?
                    .into_profile();

                info!(
                    reference = %reference,
                    purpose = %purpose,
                    status = %stored.status,
                    "Payment initiated"
                );
                Ok(stored.into())
            }
            Err(GatewayError::Rejected(message)) => {
                warn!(reference = %reference, message = %message, "Gateway rejected payment");
                let update = StatusUpdate {
                    failure_message: Some(message.clone()),
                    ..StatusUpdate::status_only(TransactionStatus::Error)
                };
                self.transactions
                    .update_status_if_open(&reference, &update)
                    .await?;
                Err(AppError::GatewayRejected(message))
            }
            Err(GatewayError::Unreachable(message)) => {
                warn!(
                    reference = %reference,
                    message = %message,
                    "Gateway unreachable during initiation; transaction left CREATED"
                );
                Err(AppError::GatewayUnreachable(message))
            }
        }
    }
}

fn validate_payment_input(input: &CreatePaymentInput) -> AppResult<()> {
    validators::validate_amount(input.amount_minor_units)?;
    validators::validate_currency(&input.currency)?;
    validators::require_non_empty("card_token", &input.card_token)?;
    validators::require_non_empty("acceptance_token", &input.acceptance_token)?;
    validators::validate_email(&input.customer_email)?;
    validators::validate_browser_info(&input.browser_info)?;
    if let Some(installments) = input.installments {
        if installments == 0 || installments > MAX_INSTALLMENTS {
            return Err(AppError::Validation(format!(
                "installments must be between 1 and {MAX_INSTALLMENTS}"
            )));
        }
    }
    Ok(())
}
