//! In-memory implementations of the payment repositories and gateway port.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{Duration, NaiveDateTime, Utc};
use uuid::Uuid;

use crate::{
    app_error::{AppError, AppResult},
    application::ports::{
        GatewayCharge, GatewayError, GatewayStatus, GatewayTransaction, PaymentGateway,
    },
    domain::entities::{
        activation_source::ActivationSource, credential_scope::CredentialScope,
        payment_purpose::PaymentPurpose, transaction_status::TransactionStatus,
    },
    use_cases::{
        activation::{ActivationOutcome, ActivationRecord, ActivationRepo},
        gateway_credentials::{
            EncryptedCredentials, GatewayCredentialProfile, GatewayCredentialRepo,
            GatewayCredentials,
        },
        payment_initiation::{
            ConditionalUpdate, NewPaymentTransaction, PaymentTransactionProfile,
            PaymentTransactionRepo, RegistrationDetails, StatusUpdate,
        },
        subscription_plans::{SubscriptionPlanProfile, SubscriptionPlanRepo},
    },
};

// ============================================================================
// InMemoryPaymentStore
// ============================================================================

#[derive(Debug, Clone)]
pub struct StoredRegistration {
    pub reference: String,
    pub details: RegistrationDetails,
    pub plan_id: Uuid,
    pub consumed_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone)]
pub struct StoredSubscription {
    pub id: Uuid,
    pub plan_id: Uuid,
    pub current_period_end: NaiveDateTime,
}

#[derive(Default)]
struct PaymentState {
    transactions: HashMap<String, PaymentTransactionProfile>,
    registrations: HashMap<String, StoredRegistration>,
    activations: HashMap<String, ActivationRecord>,
    businesses: HashMap<Uuid, RegistrationDetails>,
    subscriptions: HashMap<Uuid, StoredSubscription>,
}

/// Transactions, pending signups, activations, businesses and subscriptions
/// behind one lock, so each repository call is atomic like its SQL version.
#[derive(Default)]
pub struct InMemoryPaymentStore {
    state: Mutex<PaymentState>,
}

impl InMemoryPaymentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn transaction(&self, reference: &str) -> Option<PaymentTransactionProfile> {
        self.state.lock().unwrap().transactions.get(reference).cloned()
    }

    pub fn pending_registration(&self, reference: &str) -> Option<StoredRegistration> {
        self.state.lock().unwrap().registrations.get(reference).cloned()
    }

    pub fn activation(&self, reference: &str) -> Option<ActivationRecord> {
        self.state.lock().unwrap().activations.get(reference).cloned()
    }

    pub fn activation_count(&self) -> usize {
        self.state.lock().unwrap().activations.len()
    }

    pub fn business_count(&self) -> usize {
        self.state.lock().unwrap().businesses.len()
    }

    pub fn subscription_count(&self) -> usize {
        self.state.lock().unwrap().subscriptions.len()
    }

    pub fn subscription(&self, business_id: Uuid) -> Option<StoredSubscription> {
        self.state.lock().unwrap().subscriptions.get(&business_id).cloned()
    }

    pub fn is_empty(&self) -> bool {
        let state = self.state.lock().unwrap();
        state.transactions.is_empty() && state.registrations.is_empty()
    }

    pub fn insert_transaction(&self, tx: PaymentTransactionProfile) {
        self.state
            .lock()
            .unwrap()
            .transactions
            .insert(tx.reference.clone(), tx);
    }

    pub fn insert_registration(&self, reference: &str, plan_id: Uuid, details: RegistrationDetails) {
        self.state.lock().unwrap().registrations.insert(
            reference.to_string(),
            StoredRegistration {
                reference: reference.to_string(),
                details,
                plan_id,
                consumed_at: None,
                created_at: Utc::now().naive_utc(),
            },
        );
    }

    pub fn update_transaction(&self, reference: &str, f: impl FnOnce(&mut PaymentTransactionProfile)) {
        if let Some(tx) = self.state.lock().unwrap().transactions.get_mut(reference) {
            f(tx);
        }
    }

    /// Moves `created_at` into the past.
    pub fn backdate(&self, reference: &str, by: Duration) {
        self.update_transaction(reference, |tx| tx.created_at -= by);
    }
}

#[async_trait]
impl PaymentTransactionRepo for InMemoryPaymentStore {
    async fn get_by_reference(
        &self,
        reference: &str,
    ) -> AppResult<Option<PaymentTransactionProfile>> {
        Ok(self.transaction(reference))
    }

    async fn create(
        &self,
        transaction: &NewPaymentTransaction,
        registration: Option<&RegistrationDetails>,
    ) -> AppResult<PaymentTransactionProfile> {
        let mut state = self.state.lock().unwrap();
        if state.transactions.contains_key(&transaction.reference) {
            return Err(AppError::Validation(
                "A record with this value already exists".into(),
            ));
        }

        let now = Utc::now().naive_utc();
        let profile = PaymentTransactionProfile {
            id: Uuid::new_v4(),
            reference: transaction.reference.clone(),
            gateway_transaction_id: None,
            scope: transaction.scope,
            purpose: transaction.purpose,
            business_id: transaction.business_id,
            plan_id: transaction.plan_id,
            customer_email: transaction.customer_email.clone(),
            amount_minor_units: transaction.amount_minor_units,
            currency: transaction.currency.clone(),
            status: Default::default(),
            three_ds_challenge: None,
            failure_message: None,
            created_at: now,
            updated_at: now,
            finalized_at: None,
        };
        state
            .transactions
            .insert(profile.reference.clone(), profile.clone());

        if let Some(details) = registration {
            state.registrations.insert(
                transaction.reference.clone(),
                StoredRegistration {
                    reference: transaction.reference.clone(),
                    details: details.clone(),
                    plan_id: transaction.plan_id,
                    consumed_at: None,
                    created_at: now,
                },
            );
        }
        Ok(profile)
    }

    async fn update_status_if_open(
        &self,
        reference: &str,
        update: &StatusUpdate,
    ) -> AppResult<ConditionalUpdate> {
        let mut state = self.state.lock().unwrap();
        let tx = state
            .transactions
            .get_mut(reference)
            .ok_or(AppError::NotFound)?;

        if !tx.status.can_transition_to(update.status) {
            return Ok(ConditionalUpdate::Unchanged(tx.clone()));
        }

        let now = Utc::now().naive_utc();
        tx.status = update.status;
        if let Some(id) = &update.gateway_transaction_id {
            tx.gateway_transaction_id = Some(id.clone());
        }
        if let Some(challenge) = &update.three_ds_challenge {
            tx.three_ds_challenge = Some(challenge.clone());
        }
        if let Some(message) = &update.failure_message {
            tx.failure_message = Some(message.clone());
        }
        if update.status.is_terminal() && tx.finalized_at.is_none() {
            tx.finalized_at = Some(now);
        }
        tx.updated_at = now;
        Ok(ConditionalUpdate::Applied(tx.clone()))
    }

    async fn list_unresolved(
        &self,
        created_before: NaiveDateTime,
        created_after: NaiveDateTime,
        limit: i64,
    ) -> AppResult<Vec<PaymentTransactionProfile>> {
        let state = self.state.lock().unwrap();
        let mut open: Vec<_> = state
            .transactions
            .values()
            .filter(|t| !t.status.is_terminal())
            .filter(|t| t.created_at <= created_before && t.created_at >= created_after)
            .cloned()
            .collect();
        open.sort_by_key(|t| t.created_at);
        open.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(open)
    }
}

#[async_trait]
impl ActivationRepo for InMemoryPaymentStore {
    async fn activate(
        &self,
        transaction: &PaymentTransactionProfile,
        plan: &SubscriptionPlanProfile,
        source: ActivationSource,
    ) -> AppResult<ActivationOutcome> {
        let mut state = self.state.lock().unwrap();
        if let Some(existing) = state.activations.get(&transaction.reference) {
            return Ok(ActivationOutcome::AlreadyApplied(existing.clone()));
        }

        let now = Utc::now().naive_utc();
        let business_id = match transaction.purpose {
            PaymentPurpose::Registration => {
                let pending = state
                    .registrations
                    .get_mut(&transaction.reference)
                    .filter(|p| p.consumed_at.is_none())
                    .ok_or_else(|| AppError::Internal("No unconsumed registration".into()))?;
                pending.consumed_at = Some(now);
                let details = pending.details.clone();
                let business_id = Uuid::new_v4();
                state.businesses.insert(business_id, details);
                business_id
            }
            PaymentPurpose::Subscription => transaction
                .business_id
                .ok_or_else(|| AppError::Internal("Subscription payment has no business".into()))?,
        };

        let period = Duration::days(i64::from(plan.duration_days));
        let subscription = state
            .subscriptions
            .entry(business_id)
            .and_modify(|s| {
                s.plan_id = plan.id;
                s.current_period_end = s.current_period_end.max(now) + period;
            })
            .or_insert_with(|| StoredSubscription {
                id: Uuid::new_v4(),
                plan_id: plan.id,
                current_period_end: now + period,
            })
            .clone();

        let record = ActivationRecord {
            reference: transaction.reference.clone(),
            business_id: Some(business_id),
            subscription_id: Some(subscription.id),
            source,
            created_at: now,
        };
        state
            .activations
            .insert(record.reference.clone(), record.clone());
        Ok(ActivationOutcome::Applied(record))
    }

    async fn list_approved_without_activation(
        &self,
        limit: i64,
    ) -> AppResult<Vec<PaymentTransactionProfile>> {
        let state = self.state.lock().unwrap();
        let mut orphaned: Vec<_> = state
            .transactions
            .values()
            .filter(|t| t.status == TransactionStatus::Approved)
            .filter(|t| !state.activations.contains_key(&t.reference))
            .cloned()
            .collect();
        orphaned.sort_by_key(|t| t.finalized_at);
        orphaned.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(orphaned)
    }
}

// ============================================================================
// InMemorySubscriptionPlanRepo
// ============================================================================

#[derive(Default)]
pub struct InMemorySubscriptionPlanRepo {
    pub plans: Mutex<HashMap<Uuid, SubscriptionPlanProfile>>,
}

impl InMemorySubscriptionPlanRepo {
    pub fn with_plans(plans: Vec<SubscriptionPlanProfile>) -> Self {
        Self {
            plans: Mutex::new(plans.into_iter().map(|p| (p.id, p)).collect()),
        }
    }
}

#[async_trait]
impl SubscriptionPlanRepo for InMemorySubscriptionPlanRepo {
    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<SubscriptionPlanProfile>> {
        Ok(self.plans.lock().unwrap().get(&id).cloned())
    }
}

// ============================================================================
// InMemoryGatewayCredentialRepo
// ============================================================================

#[derive(Default)]
pub struct InMemoryGatewayCredentialRepo {
    pub configs: Mutex<HashMap<CredentialScope, GatewayCredentialProfile>>,
}

impl InMemoryGatewayCredentialRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_configs(configs: Vec<GatewayCredentialProfile>) -> Self {
        Self {
            configs: Mutex::new(configs.into_iter().map(|c| (c.scope, c)).collect()),
        }
    }
}

#[async_trait]
impl GatewayCredentialRepo for InMemoryGatewayCredentialRepo {
    async fn get_by_scope(
        &self,
        scope: CredentialScope,
    ) -> AppResult<Option<GatewayCredentialProfile>> {
        Ok(self.configs.lock().unwrap().get(&scope).cloned())
    }

    async fn upsert(
        &self,
        scope: CredentialScope,
        credentials: EncryptedCredentials<'_>,
    ) -> AppResult<GatewayCredentialProfile> {
        let now = Utc::now().naive_utc();
        let mut configs = self.configs.lock().unwrap();
        let (id, created_at) = configs
            .get(&scope)
            .map(|c| (c.id, c.created_at))
            .unwrap_or_else(|| (Uuid::new_v4(), Some(now)));
        let profile = GatewayCredentialProfile {
            id,
            scope,
            environment: credentials.environment,
            public_key: credentials.public_key.to_string(),
            private_key_encrypted: credentials.private_key_encrypted.to_string(),
            integrity_secret_encrypted: credentials.integrity_secret_encrypted.to_string(),
            events_secret_encrypted: credentials.events_secret_encrypted.to_string(),
            created_at,
            updated_at: Some(now),
        };
        configs.insert(scope, profile.clone());
        Ok(profile)
    }
}

// ============================================================================
// ScriptedGateway
// ============================================================================

enum CreateScript {
    Fixed(Result<GatewayTransaction, GatewayError>),
    Echo(GatewayStatus),
}

/// Gateway double. `create_transaction` plays back queued answers (echoing
/// a pending charge when the queue is empty); `get_transaction` reports the
/// status set for an id, `PENDING` otherwise. Lookups by reference count as
/// gets.
#[derive(Default)]
pub struct ScriptedGateway {
    creates: Mutex<VecDeque<CreateScript>>,
    statuses: Mutex<HashMap<String, GatewayStatus>>,
    failing_gets: AtomicBool,
    create_calls: AtomicUsize,
    get_calls: AtomicUsize,
}

impl ScriptedGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_create(&self, result: Result<GatewayTransaction, GatewayError>) {
        self.creates
            .lock()
            .unwrap()
            .push_back(CreateScript::Fixed(result));
    }

    /// Answers the next charge with `status` under id `wompi-<reference>`.
    pub fn push_create_echo(&self, status: GatewayStatus) {
        self.creates
            .lock()
            .unwrap()
            .push_back(CreateScript::Echo(status));
    }

    pub fn set_status(&self, transaction_id: &str, status: GatewayStatus) {
        self.statuses
            .lock()
            .unwrap()
            .insert(transaction_id.to_string(), status);
    }

    pub fn fail_gets(&self) {
        self.failing_gets.store(true, Ordering::SeqCst);
    }

    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    pub fn get_calls(&self) -> usize {
        self.get_calls.load(Ordering::SeqCst)
    }
}

fn echo(charge: &GatewayCharge, status: GatewayStatus) -> GatewayTransaction {
    GatewayTransaction {
        id: format!("wompi-{}", charge.reference),
        reference: charge.reference.clone(),
        status,
        status_message: None,
        challenge: None,
    }
}

#[async_trait]
impl PaymentGateway for ScriptedGateway {
    async fn create_transaction(
        &self,
        _credentials: &GatewayCredentials,
        charge: &GatewayCharge,
    ) -> Result<GatewayTransaction, GatewayError> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        let next = self.creates.lock().unwrap().pop_front();
        match next {
            Some(CreateScript::Fixed(result)) => result,
            Some(CreateScript::Echo(status)) => Ok(echo(charge, status)),
            None => Ok(echo(charge, GatewayStatus::Pending)),
        }
    }

    async fn get_transaction(
        &self,
        _credentials: &GatewayCredentials,
        transaction_id: &str,
    ) -> Result<GatewayTransaction, GatewayError> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_gets.load(Ordering::SeqCst) {
            return Err(GatewayError::Unreachable("scripted outage".into()));
        }
        let status = self
            .statuses
            .lock()
            .unwrap()
            .get(transaction_id)
            .copied()
            .unwrap_or(GatewayStatus::Pending);
        Ok(GatewayTransaction {
            id: transaction_id.to_string(),
            reference: transaction_id
                .strip_prefix("wompi-")
                .unwrap_or(transaction_id)
                .to_string(),
            status,
            status_message: None,
            challenge: None,
        })
    }

    /// Only references whose `wompi-<reference>` id has a scripted status are
    /// known to the gateway.
    async fn find_transaction_by_reference(
        &self,
        _credentials: &GatewayCredentials,
        reference: &str,
    ) -> Result<Option<GatewayTransaction>, GatewayError> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_gets.load(Ordering::SeqCst) {
            return Err(GatewayError::Unreachable("scripted outage".into()));
        }
        let id = format!("wompi-{reference}");
        let status = self.statuses.lock().unwrap().get(&id).copied();
        Ok(status.map(|status| GatewayTransaction {
            id,
            reference: reference.to_string(),
            status,
            status_message: None,
            challenge: None,
        }))
    }
}
