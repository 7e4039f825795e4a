use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

/// Local lifecycle of a card transaction.
///
/// `CREATED -> PENDING_3DS -> {APPROVED | DECLINED | ERROR | VOIDED}`, with
/// `CREATED` also allowed to jump straight to a terminal state. Terminal
/// states are absorbing.
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
#[sqlx(type_name = "transaction_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum TransactionStatus {
    Created,
    #[sqlx(rename = "PENDING_3DS")]
    #[serde(rename = "PENDING_3DS")]
    #[strum(serialize = "PENDING_3DS")]
    Pending3ds,
    Approved,
    Declined,
    Error,
    Voided,
}

const CREATED_ONLY: &[TransactionStatus] = &[TransactionStatus::Created];
const OPEN_STATES: &[TransactionStatus] =
    &[TransactionStatus::Created, TransactionStatus::Pending3ds];

impl TransactionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TransactionStatus::Approved
                | TransactionStatus::Declined
                | TransactionStatus::Error
                | TransactionStatus::Voided
        )
    }

    /// States a stored transaction may be in for a write of `self` to be accepted.
    ///
    /// Re-writing an open state onto itself is allowed so the gateway id and
    /// fresh challenge material can be recorded. Nothing moves backwards.
    pub fn allowed_predecessors(&self) -> &'static [TransactionStatus] {
        match self {
            TransactionStatus::Created => CREATED_ONLY,
            _ => OPEN_STATES,
        }
    }

    pub fn can_transition_to(&self, next: TransactionStatus) -> bool {
        next.allowed_predecessors().contains(self)
    }
}

impl Default for TransactionStatus {
    fn default() -> Self {
        TransactionStatus::Created
    }
}
