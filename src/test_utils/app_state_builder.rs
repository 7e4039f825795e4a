//! Use case harness and `AppState` builder over the in-memory mocks.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::HeaderValue;
use secrecy::SecretString;
use time::Duration;
use url::Url;
use uuid::Uuid;

use crate::{
    adapters::http::app_state::AppState,
    application::jwt,
    domain::entities::{
        credential_scope::CredentialScope, payment_purpose::PaymentPurpose,
        transaction_status::TransactionStatus,
    },
    infra::config::AppConfig,
    test_utils::{
        InMemoryGatewayCredentialRepo, InMemoryPaymentStore, InMemorySubscriptionPlanRepo,
        ScriptedGateway, TEST_CREDENTIALS_KEY, TEST_JWT_SECRET, create_test_credentials,
        create_test_plan, create_test_registration, create_test_transaction, test_challenge,
        test_cipher, test_credentials_input,
    },
    use_cases::{
        activation::ActivationUseCases, gateway_credentials::GatewayCredentialUseCases,
        payment_initiation::{PaymentInitiationUseCases, PaymentTransactionProfile},
        reconciliation::ReconciliationUseCases,
    },
};

pub const TEST_PUBLIC_API_ORIGIN: &str = "https://api.salon.test";

// ============================================================================
// TestPaymentHarness
// ============================================================================

/// All payment use cases wired over one shared in-memory store, one plan,
/// one existing business and (unless built `without_credentials`) sandbox
/// platform credentials.
pub struct TestPaymentHarness {
    pub store: Arc<InMemoryPaymentStore>,
    pub gateway: Arc<ScriptedGateway>,
    pub plan: crate::use_cases::subscription_plans::SubscriptionPlanProfile,
    pub business_id: Uuid,
    pub credentials: Arc<GatewayCredentialUseCases>,
    pub initiation: Arc<PaymentInitiationUseCases>,
    pub activation: Arc<ActivationUseCases>,
    pub reconciliation: Arc<ReconciliationUseCases>,
}

impl TestPaymentHarness {
    pub fn new() -> Self {
        let cipher = test_cipher();
        let platform = create_test_credentials(
            &cipher,
            CredentialScope::platform(),
            &test_credentials_input(),
        );
        Self::with_credential_repo(InMemoryGatewayCredentialRepo::with_configs(vec![platform]))
    }

    pub fn without_credentials() -> Self {
        Self::with_credential_repo(InMemoryGatewayCredentialRepo::new())
    }

    fn with_credential_repo(credential_repo: InMemoryGatewayCredentialRepo) -> Self {
        let store = Arc::new(InMemoryPaymentStore::new());
        let gateway = Arc::new(ScriptedGateway::new());
        let plan = create_test_plan(|_| {});
        let plans = Arc::new(InMemorySubscriptionPlanRepo::with_plans(vec![plan.clone()]));

        let credentials = Arc::new(GatewayCredentialUseCases::new(
            Arc::new(credential_repo),
            Arc::new(test_cipher()),
            "COP".into(),
            TEST_PUBLIC_API_ORIGIN.into(),
        ));
        let activation = Arc::new(ActivationUseCases::new(store.clone(), plans.clone()));
        let initiation = Arc::new(PaymentInitiationUseCases::new(
            store.clone(),
            plans,
            credentials.clone(),
            gateway.clone(),
        ));
        let reconciliation = Arc::new(ReconciliationUseCases::new(
            store.clone(),
            credentials.clone(),
            gateway.clone(),
            activation.clone(),
        ));

        Self {
            store,
            gateway,
            plan,
            business_id: Uuid::new_v4(),
            credentials,
            initiation,
            activation,
            reconciliation,
        }
    }

    fn seed(
        &self,
        reference: &str,
        status: TransactionStatus,
        purpose: PaymentPurpose,
    ) -> PaymentTransactionProfile {
        let tx = create_test_transaction(|t| {
            t.reference = reference.to_string();
            t.gateway_transaction_id = Some(format!("wompi-{reference}"));
            t.purpose = purpose;
            t.business_id = match purpose {
                PaymentPurpose::Subscription => Some(self.business_id),
                PaymentPurpose::Registration => None,
            };
            t.plan_id = self.plan.id;
            t.amount_minor_units = self.plan.price_minor_units;
            t.currency = self.plan.currency.clone();
            t.status = status;
            if status == TransactionStatus::Pending3ds {
                t.three_ds_challenge = Some(test_challenge());
            }
            if status.is_terminal() {
                t.finalized_at = Some(t.updated_at);
            }
        });
        self.store.insert_transaction(tx.clone());
        tx
    }

    /// Signup payment with its pending registration, as the initiator stores it.
    pub fn seed_registration_transaction(
        &self,
        reference: &str,
        status: TransactionStatus,
    ) -> PaymentTransactionProfile {
        let tx = self.seed(reference, status, PaymentPurpose::Registration);
        self.store
            .insert_registration(reference, self.plan.id, create_test_registration());
        tx
    }

    /// Renewal paid by the harness business.
    pub fn seed_subscription_transaction(
        &self,
        reference: &str,
        status: TransactionStatus,
    ) -> PaymentTransactionProfile {
        self.seed(reference, status, PaymentPurpose::Subscription)
    }

    pub fn token_for(&self, business_id: Option<Uuid>, roles: &[&str]) -> String {
        jwt::issue(
            Uuid::new_v4(),
            business_id,
            roles.iter().map(|r| r.to_string()).collect(),
            &SecretString::from(TEST_JWT_SECRET.to_string()),
            Duration::minutes(15),
        )
        .unwrap()
    }

    /// Owner of the harness business.
    pub fn owner_token(&self) -> String {
        self.token_for(Some(self.business_id), &[jwt::ROLE_OWNER])
    }
}

impl Default for TestPaymentHarness {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// TestAppStateBuilder
// ============================================================================

pub fn test_config() -> AppConfig {
    AppConfig {
        database_url: "postgres://unused".into(),
        bind_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
        jwt_secret: SecretString::from(TEST_JWT_SECRET.to_string()),
        credentials_key: SecretString::from(TEST_CREDENTIALS_KEY.to_string()),
        cors_origin: HeaderValue::from_static("http://localhost:3000"),
        wompi_api_base: Url::parse("https://sandbox.wompi.test/v1").unwrap(),
        public_api_origin: Url::parse(TEST_PUBLIC_API_ORIGIN).unwrap(),
        default_currency: "COP".into(),
        pending_sweep_interval_secs: 60,
        pending_sweep_min_age_secs: 60,
        pending_sweep_max_age_hours: 48,
        log_json: false,
    }
}

/// Builds an `AppState` whose use cases are the harness's.
///
/// ```ignore
/// let (app_state, harness) = TestAppStateBuilder::new().build();
/// harness.gateway.push_create(Ok(gateway_transaction("wompi-1", "R1", GatewayStatus::Approved)));
/// let server = TestServer::new(router().with_state(app_state)).unwrap();
/// ```
pub struct TestAppStateBuilder {
    harness: TestPaymentHarness,
}

impl TestAppStateBuilder {
    pub fn new() -> Self {
        Self {
            harness: TestPaymentHarness::new(),
        }
    }

    pub fn without_credentials() -> Self {
        Self {
            harness: TestPaymentHarness::without_credentials(),
        }
    }

    pub fn build(self) -> (AppState, TestPaymentHarness) {
        let app_state = AppState {
            config: Arc::new(test_config()),
            credential_use_cases: self.harness.credentials.clone(),
            initiation_use_cases: self.harness.initiation.clone(),
            reconciliation_use_cases: self.harness.reconciliation.clone(),
        };
        (app_state, self.harness)
    }
}

impl Default for TestAppStateBuilder {
    fn default() -> Self {
        Self::new()
    }
}
