//! Client-side polling observer.
//!
//! Asks a [`TransactionStatusSource`] for the transaction on a fixed interval
//! until a terminal status shows up, the attempt budget runs out, or the
//! caller cancels. Running out of attempts is not a payment failure:
//! [`PollError::Timeout`] means "still processing" and calling
//! [`StatusPoller::poll`] again resumes observation.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::{
    app_error::AppResult,
    application::use_cases::reconciliation::{
        ReconciliationUseCases, StatusAccess, TransactionView,
    },
    domain::entities::transaction_status::TransactionStatus,
};

/// Delay between status checks.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(3);
const AUTHENTICATED_MAX_ATTEMPTS: u32 = 10;
const PUBLIC_REGISTRATION_MAX_ATTEMPTS: u32 = 20;

#[async_trait]
pub trait TransactionStatusSource: Send + Sync {
    async fn fetch_status(&self, reference: &str) -> AppResult<TransactionView>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl PollConfig {
    pub fn authenticated() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            max_attempts: AUTHENTICATED_MAX_ATTEMPTS,
        }
    }

    pub fn public_registration() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            max_attempts: PUBLIC_REGISTRATION_MAX_ATTEMPTS,
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum PollError {
    #[error("payment still processing after {attempts} status checks")]
    Timeout {
        attempts: u32,
        last_status: Option<TransactionStatus>,
    },
    #[error("status polling cancelled")]
    Cancelled,
}

/// Client-side polling observer over any [`TransactionStatusSource`].
///
/// Each `poll` call is bounded by `max_attempts`; a timeout leaves nothing
/// behind, so calling `poll` again simply resumes observation.
pub struct StatusPoller<S> {
    source: S,
    config: PollConfig,
}

impl<S: TransactionStatusSource> StatusPoller<S> {
    pub fn new(source: S, config: PollConfig) -> Self {
        Self { source, config }
    }

    pub async fn poll(
        &self,
        reference: &str,
        cancel: &CancellationToken,
    ) -> Result<TransactionView, PollError> {
        let mut last_status = None;

        for attempt in 1..=self.config.max_attempts {
            if cancel.is_cancelled() {
                return Err(PollError::Cancelled);
            }

            match self.source.fetch_status(reference).await {
                Ok(view) if view.status.is_terminal() => return Ok(view),
                Ok(view) => {
                    debug!(reference = %reference, attempt, status = %view.status, "Transaction still open");
                    last_status = Some(view.status);
                }
                Err(e) => {
                    warn!(reference = %reference, attempt, error = %e, "Status check failed");
                }
            }

            if attempt == self.config.max_attempts {
                break;
            }

            tokio::select! {
                _ = cancel.cancelled() => return Err(PollError::Cancelled),
                _ = tokio::time::sleep(self.config.interval) => {}
            }
        }

        Err(PollError::Timeout {
            attempts: self.config.max_attempts,
            last_status,
        })
    }
}

/// Polls the reconciliation engine directly, without going over HTTP.
pub struct InProcessStatusSource {
    reconciliation: Arc<ReconciliationUseCases>,
    access: StatusAccess,
}

impl InProcessStatusSource {
    pub fn new(reconciliation: Arc<ReconciliationUseCases>, access: StatusAccess) -> Self {
        Self {
            reconciliation,
            access,
        }
    }
}

#[async_trait]
impl TransactionStatusSource for InProcessStatusSource {
    async fn fetch_status(&self, reference: &str) -> AppResult<TransactionView> {
        self.reconciliation.check_status(reference, self.access).await
    }
}
