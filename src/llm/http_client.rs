// src/llm/http_client.rs
// Shared HTTP client with retry for all LLM providers

use crate::error::{FixFastError, Result};
use reqwest::Client;
use std::time::Duration;
use tracing::warn;

/// Default number of sends per request, counting the first one
const DEFAULT_MAX_ATTEMPTS: u32 = 3;
/// Default base backoff duration between retries (doubles each attempt)
const DEFAULT_BASE_BACKOFF_SECS: u64 = 1;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 300;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 30;

pub struct LlmHttpClient {
    client: Client,
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
    /// Total sends per request, the first included. Zero behaves like one.
    pub max_attempts: u32,
    pub base_backoff: Duration,
}

impl Default for LlmHttpClient {
    fn default() -> Self {
        Self::new(
            Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
        )
    }
}

impl LlmHttpClient {
    pub fn new(request_timeout: Duration, connect_timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(request_timeout)
            .connect_timeout(connect_timeout)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            request_timeout,
            connect_timeout,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_backoff: Duration::from_secs(DEFAULT_BASE_BACKOFF_SECS),
        }
    }

    /// Execute HTTP request with retry logic using Bearer auth.
    /// Returns the response body as text on success.
    pub async fn execute_with_retry(
        &self,
        request_id: &str,
        url: &str,
        api_key: &str,
        body: String,
    ) -> Result<String> {
        self.execute_request_with_retry(request_id, body, |client, body| {
            client
                .post(url)
                .header("Authorization", format!("Bearer {}", api_key))
                .header("Content-Type", "application/json")
                .body(body)
        })
        .await
    }

    /// Execute HTTP request with retry logic using a custom request builder.
    ///
    /// `build_request` runs on every attempt, so callers choose the URL,
    /// headers and auth scheme.
    pub async fn execute_request_with_retry<F>(
        &self,
        request_id: &str,
        body: String,
        build_request: F,
    ) -> Result<String>
    where
        F: Fn(&Client, String) -> reqwest::RequestBuilder,
    {
        let mut attempts = 1;
        let mut backoff = self.base_backoff;

        loop {
            match build_request(&self.client, body.clone()).send().await {
                Ok(response) => {
                    let status = response.status();
                    if !status.is_success() {
                        let error_body = response.text().await.unwrap_or_default();

                        if attempts < self.max_attempts
                            && (status.as_u16() == 429 || status.is_server_error())
                        {
                            warn!(
                                request_id = %request_id,
                                status = %status,
                                error = %error_body,
                                "Transient error, retrying in {:?}...",
                                backoff
                            );
                            tokio::time::sleep(backoff).await;
                            attempts += 1;
                            backoff *= 2;
                            continue;
                        }

                        return Err(FixFastError::Transport(format!(
                            "API error {}: {}",
                            status, error_body
                        )));
                    }

                    return response
                        .text()
                        .await
                        .map_err(|e| FixFastError::Transport(format!("Failed to read body: {}", e)));
                }
                Err(e) => {
                    // Only connect/timeout failures are safe to resend
                    if attempts < self.max_attempts && (e.is_connect() || e.is_timeout()) {
                        warn!(
                            request_id = %request_id,
                            error = %e,
                            "Request failed (connect/timeout), retrying in {:?}...",
                            backoff
                        );
                        tokio::time::sleep(backoff).await;
                        attempts += 1;
                        backoff *= 2;
                        continue;
                    }
                    return Err(FixFastError::Transport(format!(
                        "Request failed after retries: {}",
                        e
                    )));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn fast_client(max_attempts: u32) -> LlmHttpClient {
        LlmHttpClient {
            client: Client::new(),
            request_timeout: Duration::from_millis(500),
            connect_timeout: Duration::from_millis(200),
            max_attempts,
            base_backoff: Duration::from_millis(10),
        }
    }

    #[test]
    fn test_client_creation() {
        let client = LlmHttpClient::new(Duration::from_secs(10), Duration::from_secs(5));
        assert_eq!(client.max_attempts, DEFAULT_MAX_ATTEMPTS);
        assert_eq!(client.base_backoff, Duration::from_secs(1));
        assert_eq!(client.request_timeout, Duration::from_secs(10));
        assert_eq!(client.connect_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_default_timeouts() {
        let client = LlmHttpClient::default();
        assert_eq!(client.request_timeout, Duration::from_secs(300));
        assert_eq!(client.connect_timeout, Duration::from_secs(30));
    }

    #[tokio::test]
    async fn test_connection_refused_is_transport_error() {
        let err = fast_client(1)
            .execute_with_retry("test", "http://127.0.0.1:1", "key", "{}".into())
            .await
            .unwrap_err();
        assert!(matches!(err, FixFastError::Transport(_)));
        assert!(!err.is_recoverable());
    }

    /// Local server answering every request with 503, counting requests
    async fn always_unavailable() -> (String, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        tokio::spawn(async move {
            while let Ok((mut stream, _)) = listener.accept().await {
                let mut buf = [0u8; 4096];
                let _ = stream.read(&mut buf).await;
                counter.fetch_add(1, Ordering::SeqCst);
                let _ = stream
                    .write_all(
                        b"HTTP/1.1 503 Service Unavailable\r\nContent-Length: 4\r\nConnection: close\r\n\r\nbusy",
                    )
                    .await;
                let _ = stream.shutdown().await;
            }
        });
        (url, hits)
    }

    #[tokio::test]
    async fn test_max_attempts_counts_every_send() {
        let (url, hits) = always_unavailable().await;
        let err = fast_client(3)
            .execute_with_retry("test", &url, "key", "{}".into())
            .await
            .unwrap_err();
        assert!(matches!(err, FixFastError::Transport(ref m) if m.contains("503")));
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_single_attempt_never_retries() {
        let (url, hits) = always_unavailable().await;
        for max_attempts in [0, 1] {
            let _ = fast_client(max_attempts)
                .execute_with_retry("test", &url, "key", "{}".into())
                .await;
        }
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_custom_builder_without_retries() {
        let result = fast_client(0)
            .execute_request_with_retry("test", "{}".into(), |c, body| {
                c.post("http://127.0.0.1:1")
                    .header("Content-Type", "application/json")
                    .body(body)
            })
            .await;
        assert!(result.is_err());
    }
}
