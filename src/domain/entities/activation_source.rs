use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

/// Which observer applied an activation first.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    AsRefStr,
    Display,
    EnumString,
    sqlx::Type,
)]
#[sqlx(type_name = "activation_source", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ActivationSource {
    Poll,
    Webhook,
    Sweeper,
}
