use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    AsRefStr,
    Display,
    EnumString,
    sqlx::Type,
)]
#[sqlx(type_name = "gateway_environment", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum GatewayEnvironment {
    Sandbox,
    Production,
}

impl GatewayEnvironment {
    pub fn public_key_prefix(&self) -> &'static str {
        match self {
            GatewayEnvironment::Sandbox => "pub_test_",
            GatewayEnvironment::Production => "pub_prod_",
        }
    }

    pub fn private_key_prefix(&self) -> &'static str {
        match self {
            GatewayEnvironment::Sandbox => "prv_test_",
            GatewayEnvironment::Production => "prv_prod_",
        }
    }

    pub fn integrity_secret_prefix(&self) -> &'static str {
        match self {
            GatewayEnvironment::Sandbox => "test_integrity_",
            GatewayEnvironment::Production => "prod_integrity_",
        }
    }

    pub fn events_secret_prefix(&self) -> &'static str {
        match self {
            GatewayEnvironment::Sandbox => "test_events_",
            GatewayEnvironment::Production => "prod_events_",
        }
    }
}
