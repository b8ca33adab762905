use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use super::{ProbeOutcome, ProbeRequest, Prober};

/// Probe executor backed by a pooled reqwest client.
///
/// The hard deadline is enforced per request from `ProbeRequest::timeout_ms`;
/// the shared client only carries the connect timeout and pool settings.
#[derive(Debug, Clone)]
pub struct HttpProber {
    client: Client,
}

impl HttpProber {
    pub fn new(connect_timeout: Duration) -> Self {
        Self {
            client: Self::build_client(connect_timeout),
        }
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    pub fn build_client(connect_timeout: Duration) -> Client {
        Client::builder()
            .connect_timeout(connect_timeout)
            .pool_max_idle_per_host(20)
            .gzip(true)
            .build()
            .expect("Failed to build HTTP client")
    }
}

impl Default for HttpProber {
    fn default() -> Self {
        Self::new(Duration::from_secs(5))
    }
}

#[async_trait]
impl Prober for HttpProber {
    async fn probe(&self, request: &ProbeRequest) -> ProbeOutcome {
        let timeout = Duration::from_millis(request.timeout_ms);
        let start = Instant::now();

        let result = self
            .client
            .request(request.method.into(), &request.url)
            .timeout(timeout)
            .send()
            .await;

        match result {
            Ok(response) => {
                let response_time_ms = start.elapsed().as_millis() as u64;
                let status_code = response.status().as_u16();

                // The body is not inspected; drain it so the connection can
                // be returned to the pool. Read errors are irrelevant here.
                let _ = response.bytes().await;

                if status_code == request.expected_status {
                    ProbeOutcome::up(status_code, response_time_ms)
                } else {
                    ProbeOutcome::down(
                        Some(status_code),
                        response_time_ms,
                        format!(
                            "Unexpected status code: {} (expected {})",
                            status_code, request.expected_status
                        ),
                    )
                }
            }
            Err(e) => {
                let response_time_ms = start.elapsed().as_millis() as u64;
                debug!(url = %request.url, error = %e, "Probe request failed");

                if e.is_timeout() {
                    ProbeOutcome::down(
                        None,
                        response_time_ms,
                        format!("timeout after {}ms", request.timeout_ms),
                    )
                } else {
                    ProbeOutcome::down(None, response_time_ms, e.to_string())
                }
            }
        }
    }
}
