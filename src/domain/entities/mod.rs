pub mod activation_source;
pub mod credential_scope;
pub mod gateway_environment;
pub mod payment_purpose;
pub mod transaction_status;
pub mod webhook_event;
