use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

/// What a successful charge activates.
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
#[sqlx(type_name = "payment_purpose", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PaymentPurpose {
    /// Renewal or upgrade for a business that already exists.
    Subscription,
    /// Public signup; the business is created once the charge is approved.
    Registration,
}
