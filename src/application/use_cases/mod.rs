pub mod activation;
pub mod challenge;
pub mod gateway_credentials;
pub mod payment_initiation;
pub mod reconciliation;
pub mod status_poller;
pub mod subscription_plans;
