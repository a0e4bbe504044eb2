//! HTTP client construction

use reqwest::blocking::Client;
use std::time::Duration;

pub const USER_AGENT: &str = concat!("depforge/", env!("CARGO_PKG_VERSION"));

/// Build a blocking client bounded by `timeout`.
///
/// The blocking client applies `timeout` to the wait for response headers
/// and again to every body read, so a server that stalls mid-transfer fails
/// the read instead of hanging.
pub fn build_client(timeout: Duration) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(USER_AGENT)
        .connect_timeout(timeout)
        .timeout(timeout)
        .build()
}
