//! HTTP client factory with consistent timeout configuration.
//!
//! Outbound clients (the gateway adapter, the status client) are built here
//! instead of constructing `reqwest::Client` directly.

use reqwest::Client;
use std::time::Duration;

/// Connect timeout (TCP handshake + TLS).
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Total request/response time.
///
/// Gateway calls are expected to answer within seconds. A create call that
/// exceeds this surfaces as `GatewayUnreachable` and leaves the transaction
/// `CREATED`; the reconciliation engine later finds the charge by reference.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Build an HTTP client with default timeouts.
///
/// Returns `Result` so startup can report a TLS misconfiguration as an
/// `InfraError` instead of panicking.
pub fn try_build_client() -> Result<Client, reqwest::Error> {
    Client::builder()
        .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
        .timeout(DEFAULT_REQUEST_TIMEOUT)
        .build()
}
