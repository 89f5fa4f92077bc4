//! Resilient retrieval of raw source documents
//!
//! One JSON document per (legislature, entity type) partition. Transient
//! failures are retried with exponential backoff plus jitter; permanent ones
//! fail the partition immediately. A document is either fully retrieved and
//! persisted to the raw tier, or the partition fails; there is no partial
//! document handling.

use crate::config::{EtlConfig, USER_AGENT};
use crate::error::FetchError;
use parlamento_common::Partition;
use rand::Rng;
use reqwest::Client;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Whether a failed attempt should be retried, and after how long.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    Retry(Duration),
    Fail,
}

/// Explicit retry policy: a pure function of the attempt count and the error
/// classification. The fetch loop applies it; nothing is wrapped implicitly.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum attempts, first try included
    pub max_attempts: u32,
    /// Base delay; doubles with each further attempt
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn decide(&self, attempt: u32, error: &FetchError) -> RetryDecision {
        if !error.is_transient() || attempt >= self.max_attempts {
            return RetryDecision::Fail;
        }
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        RetryDecision::Retry(self.base_delay.saturating_mul(factor))
    }
}

/// Spread retries out so concurrent partitions don't storm the source in
/// lockstep after a shared outage.
fn with_jitter(delay: Duration) -> Duration {
    let cap = delay.as_millis().min(1000) as u64;
    let jitter_ms = rand::rng().random_range(0..=cap);
    delay + Duration::from_millis(jitter_ms)
}

/// A fully retrieved source document.
#[derive(Debug)]
pub struct FetchedDocument {
    /// Raw bytes of the JSON payload
    pub bytes: Vec<u8>,
    /// Raw-tier artifact path
    pub path: PathBuf,
    /// True when the raw tier already had the document and no request was made
    pub cached: bool,
}

/// HTTP fetcher for source documents.
pub struct Fetcher {
    client: Client,
    config: Arc<EtlConfig>,
    policy: RetryPolicy,
}

impl Fetcher {
    pub fn new(config: Arc<EtlConfig>) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(config.fetch_timeout)
            .user_agent(USER_AGENT)
            .build()?;
        let policy = RetryPolicy {
            max_attempts: config.fetch_retries,
            base_delay: config.fetch_retry_delay,
        };
        Ok(Self {
            client,
            config,
            policy,
        })
    }

    /// Retrieve the raw document for one partition.
    ///
    /// Reuses the raw-tier artifact when present unless `force` is set.
    /// On a fresh download the document is validated as a JSON array and
    /// persisted atomically (temp file + rename), so re-running overwrites
    /// the prior artifact without side effects elsewhere.
    pub async fn fetch(
        &self,
        partition: &Partition,
        force: bool,
    ) -> Result<FetchedDocument, FetchError> {
        let legislature = self
            .config
            .legislature(&partition.legislature)
            .ok_or_else(|| FetchError::UnknownLegislature(partition.legislature.clone()))?;

        let bronze_dir = self.config.bronze_dir();
        let path = bronze_dir.join(format!("{}.json", partition.file_stem()));

        if path.exists() && !force {
            info!(partition = %partition, path = %path.display(), "file_exists");
            let bytes = tokio::fs::read(&path).await?;
            return Ok(FetchedDocument {
                bytes,
                path,
                cached: true,
            });
        }

        let url = legislature.entity_url(partition.entity);
        info!(partition = %partition, url = %url, "fetching");

        let bytes = self.fetch_with_retry(&url).await?;

        tokio::fs::create_dir_all(&bronze_dir).await?;
        let temp_path = bronze_dir.join(format!("{}.json.tmp", partition.file_stem()));
        tokio::fs::write(&temp_path, &bytes).await?;
        tokio::fs::rename(&temp_path, &path).await?;

        info!(
            partition = %partition,
            size_mb = format!("{:.2}", bytes.len() as f64 / 1_000_000.0),
            "fetch_complete"
        );

        Ok(FetchedDocument {
            bytes,
            path,
            cached: false,
        })
    }

    async fn fetch_with_retry(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let mut attempt = 1u32;
        loop {
            match self.attempt(url).await {
                Ok(bytes) => return Ok(bytes),
                Err(err) => match self.policy.decide(attempt, &err) {
                    RetryDecision::Retry(delay) => {
                        let delay = with_jitter(delay);
                        warn!(
                            attempt,
                            max_attempts = self.policy.max_attempts,
                            error = %err,
                            delay_ms = delay.as_millis() as u64,
                            "fetch_retry"
                        );
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                    }
                    RetryDecision::Fail => return Err(err),
                },
            }
        }
    }

    /// One attempt, with its own timeout on the client.
    async fn attempt(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status { status });
        }

        let bytes = response.bytes().await.map_err(|e| self.classify(e))?.to_vec();
        validate_document(&bytes)?;
        Ok(bytes)
    }

    fn classify(&self, err: reqwest::Error) -> FetchError {
        if err.is_timeout() {
            FetchError::Timeout(self.config.fetch_timeout)
        } else {
            FetchError::Request(err)
        }
    }
}

/// A document must be a well-formed JSON array of records. Validation
/// streams through the bytes without building a DOM.
fn validate_document(bytes: &[u8]) -> Result<(), FetchError> {
    match bytes.iter().find(|b| !b.is_ascii_whitespace()) {
        Some(b'[') => {}
        _ => {
            return Err(FetchError::InvalidDocument(
                "expected a top-level JSON array".to_string(),
            ))
        }
    }
    serde_json::from_slice::<serde::de::IgnoredAny>(bytes)
        .map_err(|e| FetchError::InvalidDocument(format!("malformed JSON: {e}")))?;
    Ok(())
}
