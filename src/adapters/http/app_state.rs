use std::sync::Arc;

use crate::{
    infra::config::AppConfig,
    use_cases::{
        gateway_credentials::GatewayCredentialUseCases,
        payment_initiation::PaymentInitiationUseCases, reconciliation::ReconciliationUseCases,
    },
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub credential_use_cases: Arc<GatewayCredentialUseCases>,
    pub initiation_use_cases: Arc<PaymentInitiationUseCases>,
    pub reconciliation_use_cases: Arc<ReconciliationUseCases>,
}
