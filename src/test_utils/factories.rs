//! Fixture factories. Each takes an `overrides` closure applied last.

use base64::{Engine as _, engine::general_purpose::STANDARD};
use chrono::Utc;
use uuid::Uuid;

use crate::{
    application::ports::{BrowserInfo, GatewayStatus, GatewayTransaction, ThreeDsChallenge},
    domain::entities::{
        credential_scope::CredentialScope, gateway_environment::GatewayEnvironment,
        payment_purpose::PaymentPurpose, transaction_status::TransactionStatus,
    },
    infra::crypto::ProcessCipher,
    use_cases::{
        gateway_credentials::{GatewayCredentialProfile, UpsertCredentialsInput},
        payment_initiation::{CreatePaymentInput, PaymentTransactionProfile, RegistrationDetails},
        subscription_plans::SubscriptionPlanProfile,
    },
};

pub const TEST_CREDENTIALS_KEY: &str = "AQIDBAUGBwgJCgsMDQ4PEBESExQVFhcYGRobHB0eHyA=";
pub const TEST_JWT_SECRET: &str = "test-jwt-secret-for-route-tests";
pub const PLATFORM_EVENTS_SECRET: &str = "test_events_platformsecret";

pub fn test_cipher() -> ProcessCipher {
    ProcessCipher::new_from_base64(TEST_CREDENTIALS_KEY).unwrap()
}

pub fn test_browser_info() -> BrowserInfo {
    BrowserInfo {
        color_depth: 24,
        screen_height: 1080,
        screen_width: 1920,
        language: "es-CO".into(),
        user_agent: "Mozilla/5.0 (X11; Linux x86_64) Firefox/128.0".into(),
        timezone_offset_minutes: -300,
    }
}

/// Sandbox credentials for the platform account.
pub fn test_credentials_input() -> UpsertCredentialsInput {
    UpsertCredentialsInput {
        environment: GatewayEnvironment::Sandbox,
        public_key: "pub_test_platformkey123".into(),
        private_key: "prv_test_platformkey123".into(),
        integrity_secret: "test_integrity_platformsecret".into(),
        events_secret: PLATFORM_EVENTS_SECRET.into(),
    }
}

/// Stored form of `input`, encrypted with `cipher`.
pub fn create_test_credentials(
    cipher: &ProcessCipher,
    scope: CredentialScope,
    input: &UpsertCredentialsInput,
) -> GatewayCredentialProfile {
    let now = Utc::now().naive_utc();
    GatewayCredentialProfile {
        id: Uuid::new_v4(),
        scope,
        environment: input.environment,
        public_key: input.public_key.clone(),
        private_key_encrypted: cipher.encrypt(&input.private_key).unwrap(),
        integrity_secret_encrypted: cipher.encrypt(&input.integrity_secret).unwrap(),
        events_secret_encrypted: cipher.encrypt(&input.events_secret).unwrap(),
        created_at: Some(now),
        updated_at: Some(now),
    }
}

pub fn create_test_plan(overrides: impl FnOnce(&mut SubscriptionPlanProfile)) -> SubscriptionPlanProfile {
    let mut plan = SubscriptionPlanProfile {
        id: Uuid::new_v4(),
        name: "Plan Profesional".into(),
        price_minor_units: 9_990_000,
        currency: "COP".into(),
        duration_days: 30,
        is_active: true,
        created_at: Some(Utc::now().naive_utc()),
    };
    overrides(&mut plan);
    plan
}

pub fn create_test_transaction(
    overrides: impl FnOnce(&mut PaymentTransactionProfile),
) -> PaymentTransactionProfile {
    let now = Utc::now().naive_utc();
    let reference = format!("sp_{}", Uuid::new_v4().simple());
    let mut tx = PaymentTransactionProfile {
        id: Uuid::new_v4(),
        gateway_transaction_id: Some(format!("wompi-{reference}")),
        reference,
        scope: CredentialScope::platform(),
        purpose: PaymentPurpose::Registration,
        business_id: None,
        plan_id: Uuid::new_v4(),
        customer_email: "ana@salonaurora.test".into(),
        amount_minor_units: 9_990_000,
        currency: "COP".into(),
        status: TransactionStatus::Created,
        three_ds_challenge: None,
        failure_message: None,
        created_at: now,
        updated_at: now,
        finalized_at: None,
    };
    overrides(&mut tx);
    tx
}

/// A valid card payment for `plan`.
pub fn create_test_payment_input(
    plan: &SubscriptionPlanProfile,
    overrides: impl FnOnce(&mut CreatePaymentInput),
) -> CreatePaymentInput {
    let mut input = CreatePaymentInput {
        plan_id: plan.id,
        amount_minor_units: plan.price_minor_units,
        currency: plan.currency.clone(),
        reference: None,
        card_token: "tok_test_4242".into(),
        acceptance_token: "acc_test_eyJhbGciOi".into(),
        customer_email: "ana@salonaurora.test".into(),
        installments: Some(1),
        browser_info: test_browser_info(),
    };
    overrides(&mut input);
    input
}

pub fn create_test_registration() -> RegistrationDetails {
    RegistrationDetails {
        business_name: "Salon Aurora".into(),
        owner_name: "Ana Restrepo".into(),
        email: "ana@salonaurora.test".into(),
        phone: Some("+573001234567".into()),
    }
}

pub fn test_challenge() -> ThreeDsChallenge {
    ThreeDsChallenge {
        current_step: "CHALLENGE".into(),
        iframe_content: STANDARD.encode(
            r#"<html><body><form id="acs" action="https://acs.bank.test/challenge"></form></body></html>"#,
        ),
    }
}

pub fn gateway_transaction(id: &str, reference: &str, status: GatewayStatus) -> GatewayTransaction {
    GatewayTransaction {
        id: id.into(),
        reference: reference.into(),
        status,
        status_message: None,
        challenge: None,
    }
}
