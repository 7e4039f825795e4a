use std::sync::Arc;

use secrecy::ExposeSecret;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::{
    adapters::http::app_state::AppState,
    application::{
        ports::PaymentGateway,
        use_cases::{
            activation::{ActivationRepo, ActivationUseCases},
            gateway_credentials::{GatewayCredentialRepo, GatewayCredentialUseCases},
            payment_initiation::{PaymentInitiationUseCases, PaymentTransactionRepo},
            reconciliation::ReconciliationUseCases,
            subscription_plans::SubscriptionPlanRepo,
        },
    },
    infra::{
        InfraError, config::AppConfig, crypto::ProcessCipher, postgres_persistence,
        wompi_client::WompiClient,
    },
};

pub async fn init_app_state() -> anyhow::Result<AppState> {
    let config = AppConfig::from_env()?;
    init_tracing(config.log_json);

    let cipher = Arc::new(
        ProcessCipher::new_from_base64(config.credentials_key.expose_secret())
            .map_err(InfraError::CipherInit)?,
    );
    let postgres_arc = Arc::new(postgres_persistence(&config.database_url).await?);
    let gateway = Arc::new(
        WompiClient::new(&config.wompi_api_base).map_err(InfraError::HttpClient)?,
    ) as Arc<dyn PaymentGateway>;

    let transaction_repo = postgres_arc.clone() as Arc<dyn PaymentTransactionRepo>;
    let activation_repo = postgres_arc.clone() as Arc<dyn ActivationRepo>;
    let credential_repo = postgres_arc.clone() as Arc<dyn GatewayCredentialRepo>;
    let plan_repo = postgres_arc.clone() as Arc<dyn SubscriptionPlanRepo>;

    let credential_use_cases = Arc::new(GatewayCredentialUseCases::new(
        credential_repo,
        cipher,
        config.default_currency.clone(),
        config.public_api_origin.to_string(),
    ));

    let activation_use_cases = Arc::new(ActivationUseCases::new(activation_repo, plan_repo.clone()));

    let initiation_use_cases = PaymentInitiationUseCases::new(
        transaction_repo.clone(),
        plan_repo,
        credential_use_cases.clone(),
        gateway.clone(),
    );

    let reconciliation_use_cases = ReconciliationUseCases::new(
        transaction_repo,
        credential_use_cases.clone(),
        gateway,
        activation_use_cases,
    );

    Ok(AppState {
        config: Arc::new(config),
        credential_use_cases,
        initiation_use_cases: Arc::new(initiation_use_cases),
        reconciliation_use_cases: Arc::new(reconciliation_use_cases),
    })
}

pub fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "salonpay=debug,tower_http=info".into());

    let registry = tracing_subscriber::registry().with(filter);

    if json {
        // Structured logs for the log shipper
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(true),
            )
            .try_init()
            .ok();
    } else {
        registry
            .with(fmt::layer().with_target(false).with_level(true).pretty())
            .try_init()
            .ok();
    }
}
