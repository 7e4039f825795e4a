use std::fmt;

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

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
#[sqlx(type_name = "credential_owner_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum OwnerType {
    /// A business collecting payments from its own customers.
    Business,
    /// The platform billing businesses for their subscription.
    Platform,
}

/// Owner of one set of gateway credentials.
///
/// The platform scope always uses the nil UUID as owner id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CredentialScope {
    pub owner_type: OwnerType,
    pub owner_id: Uuid,
}

const PLATFORM_SEGMENT: &str = "platform";

impl CredentialScope {
    pub fn platform() -> Self {
        Self {
            owner_type: OwnerType::Platform,
            owner_id: Uuid::nil(),
        }
    }

    pub fn business(business_id: Uuid) -> Self {
        Self {
            owner_type: OwnerType::Business,
            owner_id: business_id,
        }
    }

    /// Path segment used in webhook URLs (`/webhooks/payments/{tenant}`).
    pub fn tenant_segment(&self) -> String {
        match self.owner_type {
            OwnerType::Platform => PLATFORM_SEGMENT.to_string(),
            OwnerType::Business => self.owner_id.to_string(),
        }
    }

    pub fn from_tenant_segment(segment: &str) -> Option<Self> {
        if segment.eq_ignore_ascii_case(PLATFORM_SEGMENT) {
            return Some(Self::platform());
        }
        Uuid::parse_str(segment)
            .ok()
            .filter(|id| !id.is_nil())
            .map(Self::business)
    }
}

impl fmt::Display for CredentialScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.owner_type, self.tenant_segment())
    }
}
