//! The single "activate once" operation shared by every observer.
//!
//! Exactly-once is enforced by the store: the activation row keyed by
//! transaction reference is inserted with insert-if-absent inside the same
//! database transaction that creates the business or extends the
//! subscription. A caller that loses the race gets the winner's record back.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use serde::Serialize;
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    app_error::{AppError, AppResult},
    application::use_cases::{
        payment_initiation::PaymentTransactionProfile,
        subscription_plans::{SubscriptionPlanProfile, SubscriptionPlanRepo},
    },
    domain::entities::{activation_source::ActivationSource, transaction_status::TransactionStatus},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivationRecord {
    pub reference: String,
    pub business_id: Option<Uuid>,
    pub subscription_id: Option<Uuid>,
    pub source: ActivationSource,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActivationOutcome {
    Applied(ActivationRecord),
    /// Another observer got there first. Not an error.
    AlreadyApplied(ActivationRecord),
}

impl ActivationOutcome {
    pub fn record(&self) -> &ActivationRecord {
        match self {
            ActivationOutcome::Applied(r) | ActivationOutcome::AlreadyApplied(r) => r,
        }
    }

    pub fn is_new(&self) -> bool {
        matches!(self, ActivationOutcome::Applied(_))
    }
}

#[async_trait]
pub trait ActivationRepo: Send + Sync {
    /// Atomically records the activation for `transaction.reference` and
    /// applies its effect, or returns the existing record.
    async fn activate(
        &self,
        transaction: &PaymentTransactionProfile,
        plan: &SubscriptionPlanProfile,
        source: ActivationSource,
    ) -> AppResult<ActivationOutcome>;

    async fn list_approved_without_activation(
        &self,
        limit: i64,
    ) -> AppResult<Vec<PaymentTransactionProfile>>;
}

/// Activation entry point for poll, webhook and sweeper observers.
pub struct ActivationUseCases {
    repo: Arc<dyn ActivationRepo>,
    plans: Arc<dyn SubscriptionPlanRepo>,
}

impl ActivationUseCases {
    pub fn new(repo: Arc<dyn ActivationRepo>, plans: Arc<dyn SubscriptionPlanRepo>) -> Self {
        Self { repo, plans }
    }

    pub async fn activate_once(
        &self,
        transaction: &PaymentTransactionProfile,
        source: ActivationSource,
    ) -> AppResult<ActivationOutcome> {
        if transaction.status != TransactionStatus::Approved {
            return Err(AppError::Validation(format!(
                "Transaction {} is {}, only approved payments activate",
                transaction.reference, transaction.status
            )));
        }

        let plan = self
            .plans
            .get_by_id(transaction.plan_id)
            .await?
            .ok_or_else(|| {
                AppError::Internal(format!("Plan {} disappeared", transaction.plan_id))
            })?;

        let outcome = self.repo.activate(transaction, &plan, source).await?;
        let record = outcome.record();
        if outcome.is_new() {
            info!(
                reference = %record.reference,
                purpose = %transaction.purpose,
                source = %source,
                business_id = ?record.business_id,
                "Payment activated"
            );
        } else {
            debug!(
                reference = %record.reference,
                source = %source,
                first_source = %record.source,
                "Activation already applied"
            );
        }
        Ok(outcome)
    }

    pub async fn approved_without_activation(
        &self,
        limit: i64,
    ) -> AppResult<Vec<PaymentTransactionProfile>> {
        self.repo.list_approved_without_activation(limit).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::payment_purpose::PaymentPurpose;
    use crate::test_utils::{TestPaymentHarness, create_test_transaction};

    #[tokio::test]
    async fn second_activation_returns_first_result() {
        let harness = TestPaymentHarness::new();
        let tx = harness.seed_registration_transaction("R1", TransactionStatus::Approved);

        let first = harness
            .activation
            .activate_once(&tx, ActivationSource::Poll)
            .await
            .unwrap();
        let second = harness
            .activation
            .activate_once(&tx, ActivationSource::Webhook)
            .await
            .unwrap();

        assert!(first.is_new());
        assert!(!second.is_new());
        assert_eq!(first.record(), second.record());
        assert_eq!(second.record().source, ActivationSource::Poll);
        assert_eq!(harness.store.business_count(), 1);
        assert_eq!(harness.store.subscription_count(), 1);
    }

    #[tokio::test]
    async fn racing_observers_create_exactly_one_business() {
        let harness = TestPaymentHarness::new();
        let tx = harness.seed_registration_transaction("R-race", TransactionStatus::Approved);

        let mut handles = Vec::new();
        for source in [
            ActivationSource::Poll,
            ActivationSource::Webhook,
            ActivationSource::Sweeper,
            ActivationSource::Webhook,
        ] {
            let activation = harness.activation.clone();
            let tx = tx.clone();
            handles.push(tokio::spawn(async move {
                activation.activate_once(&tx, source).await
            }));
        }

        let mut applied = 0;
        for handle in handles {
            if handle.await.unwrap().unwrap().is_new() {
                applied += 1;
            }
        }

        assert_eq!(applied, 1);
        assert_eq!(harness.store.business_count(), 1);
    }

    #[tokio::test]
    async fn registration_consumes_pending_signup() {
        let harness = TestPaymentHarness::new();
        let tx = harness.seed_registration_transaction("R2", TransactionStatus::Approved);

        let outcome = harness
            .activation
            .activate_once(&tx, ActivationSource::Webhook)
            .await
            .unwrap();

        assert!(outcome.record().business_id.is_some());
        assert!(
            harness
                .store
                .pending_registration("R2")
                .unwrap()
                .consumed_at
                .is_some()
        );
    }

    #[tokio::test]
    async fn subscription_payment_extends_existing_business() {
        let harness = TestPaymentHarness::new();
        let tx = create_test_transaction(|t| {
            t.reference = "R3".into();
            t.purpose = PaymentPurpose::Subscription;
            t.business_id = Some(harness.business_id);
            t.plan_id = harness.plan.id;
            t.status = TransactionStatus::Approved;
        });
        harness.store.insert_transaction(tx.clone());

        let outcome = harness
            .activation
            .activate_once(&tx, ActivationSource::Poll)
            .await
            .unwrap();

        assert_eq!(outcome.record().business_id, Some(harness.business_id));
        assert!(outcome.record().subscription_id.is_some());
        assert_eq!(harness.store.business_count(), 0);
    }

    #[tokio::test]
    async fn only_approved_transactions_activate() {
        let harness = TestPaymentHarness::new();
        let tx = harness.seed_registration_transaction("R4", TransactionStatus::Declined);

        let result = harness
            .activation
            .activate_once(&tx, ActivationSource::Webhook)
            .await;

        assert!(matches!(result, Err(AppError::Validation(_))));
        assert_eq!(harness.store.activation_count(), 0);
    }
}
