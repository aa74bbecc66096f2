//! Outbound HTTP client construction
//!
//! One pooled `reqwest::Client` is built at startup and shared by every
//! upstream integration.

use std::time::Duration;

/// Default per-request timeout for upstream calls
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Build the shared HTTP client
pub fn build_client(timeout: Duration) -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(concat!("moscow-life/", env!("CARGO_PKG_VERSION")))
        .build()
}
