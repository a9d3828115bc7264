use reqwest::Client;
use std::time::Duration;

/// Shared client for alert webhooks and remote metric queries. The overall
/// timeout bounds every request so a slow endpoint cannot stall a tick.
pub fn build_http_client(timeout: Duration) -> Client {
    Client::builder()
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(10)))
        .pool_max_idle_per_host(4)
        .pool_idle_timeout(Duration::from_secs(90))
        .tcp_keepalive(Duration::from_secs(60))
        .user_agent(concat!("recovery-watchdog/", env!("CARGO_PKG_VERSION")))
        .build()
        .unwrap_or_else(|_| Client::new())
}

pub fn build_http_client_with_timeout(timeout_secs: u64) -> Client {
    build_http_client(Duration::from_secs(timeout_secs.max(1)))
}
