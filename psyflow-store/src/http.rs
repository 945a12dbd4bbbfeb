use std::time::Duration;

use async_trait::async_trait;
use psyflow_core::{Record, SaveError};
use reqwest::Client;
use serde_json::json;
use tracing::{debug, warn};

use crate::adapter::PersistenceAdapter;

/// Retry schedule for the bulk save. Partial saves are sent once.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub initial_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            initial_backoff: Duration::from_millis(250),
        }
    }
}

impl RetryPolicy {
    /// Backoff before attempt `n` (1-based), doubling each time.
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.initial_backoff * 2u32.saturating_pow(attempt.saturating_sub(1))
    }
}

/// JSON-over-HTTP backend. Posts to `{endpoint}/partial` and
/// `{endpoint}/complete`.
#[derive(Debug, Clone)]
pub struct HttpStore {
    client: Client,
    endpoint: String,
    retry: RetryPolicy,
}

impl HttpStore {
    pub fn new(endpoint: impl Into<String>) -> Result<Self, SaveError> {
        let client = Client::builder()
            .user_agent(concat!("psyflow/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(20))
            .build()
            .map_err(|e| SaveError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            retry: RetryPolicy::default(),
        })
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn url(&self, route: &str) -> String {
        format!("{}/{}", self.endpoint, route)
    }

    async fn post(&self, route: &str, body: &serde_json::Value) -> Result<(), SaveError> {
        let res = self
            .client
            .post(self.url(route))
            .json(body)
            .send()
            .await
            .map_err(|e| SaveError::Transport(e.to_string()))?;

        let status = res.status();
        if status.is_success() {
            return Ok(());
        }
        let text = res.text().await.unwrap_or_default();
        Err(SaveError::Rejected(format!("{status}: {text}")))
    }
}

#[async_trait]
impl PersistenceAdapter for HttpStore {
    fn name(&self) -> &str {
        "http"
    }

    async fn save_partial(&self, record: Record) -> Result<(), SaveError> {
        let body = serde_json::to_value(&record)?;
        self.post("partial", &body).await
    }

    async fn save_complete(&self, records: Vec<Record>) -> Result<(), SaveError> {
        let body = json!({ "records": records });
        let attempts = self.retry.attempts.max(1);
        let mut attempt = 1;
        loop {
            match self.post("complete", &body).await {
                Ok(()) => {
                    debug!(attempt, "bulk save accepted");
                    return Ok(());
                }
                Err(e) if attempt < attempts => {
                    let wait = self.retry.backoff(attempt);
                    warn!(attempt, error = %e, ?wait, "bulk save failed, retrying");
                    tokio::time::sleep(wait).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles() {
        let p = RetryPolicy {
            attempts: 4,
            initial_backoff: Duration::from_millis(100),
        };
        assert_eq!(p.backoff(1), Duration::from_millis(100));
        assert_eq!(p.backoff(2), Duration::from_millis(200));
        assert_eq!(p.backoff(3), Duration::from_millis(400));
    }

    #[test]
    fn routes_join_without_double_slash() {
        let store = HttpStore::new("https://data.example.org/api/").unwrap();
        assert_eq!(store.url("partial"), "https://data.example.org/api/partial");
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_transport_error() {
        let store = HttpStore::new("http://127.0.0.1:9")
            .unwrap()
            .with_retry(RetryPolicy {
                attempts: 1,
                initial_backoff: Duration::ZERO,
            });
        let err = store.save_complete(Vec::new()).await.unwrap_err();
        assert!(matches!(err, SaveError::Transport(_)));
    }
}
