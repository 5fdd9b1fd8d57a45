//! Reqwest-backed fetcher.
//!
//! Retry policy
//! ------------
//! Failed attempts are retried with exponential backoff (base delay doubled
//! per attempt, capped) up to `max_retries` times. Each attempt is bounded
//! by `request_timeout`, separately for the request and for collecting the
//! body. Non-success HTTP statuses are failures like any other and are
//! retried the same way.
//!
//! The fetcher is deliberately whole-blob: resources handled by this crate
//! are small enough that streaming or range requests buy nothing.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use tokio::time::timeout;
use tracing::debug;

use crate::error::{FetchError, FetchResult};
use crate::fetcher::Fetcher;

/// Default timeout for a single fetch attempt.
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Default number of retries after the initial attempt.
const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default base delay for exponential backoff between attempts.
const DEFAULT_RETRY_BASE_DELAY: Duration = Duration::from_millis(100);

/// Default cap for the backoff delay.
const DEFAULT_MAX_RETRY_DELAY: Duration = Duration::from_secs(5);

/// HTTP fetcher with per-attempt timeouts and bounded retries.
#[derive(Clone, Debug)]
pub struct HttpFetcher {
    client: Client,
    request_timeout: Duration,
    max_retries: u32,
    retry_base_delay: Duration,
    max_retry_delay: Duration,
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpFetcher {
    /// Create a fetcher with a fresh client and the default retry policy.
    pub fn new() -> Self {
        Self {
            client: Client::new(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_base_delay: DEFAULT_RETRY_BASE_DELAY,
            max_retry_delay: DEFAULT_MAX_RETRY_DELAY,
        }
    }

    /// Use a preconfigured client (connection pooling, proxies, TLS).
    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    /// Set the timeout applied to each attempt.
    pub fn with_request_timeout(mut self, request_timeout: Duration) -> Self {
        self.request_timeout = request_timeout;
        self
    }

    /// Set the number of retries after the initial attempt (0 disables
    /// retrying).
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set the base delay for exponential backoff between attempts.
    pub fn with_retry_base_delay(mut self, retry_base_delay: Duration) -> Self {
        self.retry_base_delay = retry_base_delay;
        self
    }

    /// Cap the backoff delay.
    pub fn with_max_retry_delay(mut self, max_retry_delay: Duration) -> Self {
        self.max_retry_delay = max_retry_delay;
        self
    }

    async fn fetch_with_retries(&self, url: &str) -> FetchResult<Bytes> {
        // Parse eagerly: an unparseable key never becomes retryable work.
        let parsed = url::Url::parse(url).map_err(|source| FetchError::InvalidUrl {
            url: url.to_string(),
            source,
        })?;

        let mut last_error: Option<FetchError> = None;
        let mut delay = self.retry_base_delay;

        for attempt in 0..=self.max_retries {
            match self.try_fetch_once(parsed.clone()).await {
                Ok(bytes) => {
                    if attempt > 0 {
                        debug!(
                            url = url,
                            attempts = attempt + 1,
                            "fetch succeeded after retry"
                        );
                    }
                    return Ok(bytes);
                }
                Err(e) => {
                    debug!(
                        url = url,
                        attempt = attempt + 1,
                        max_attempts = self.max_retries + 1,
                        "fetch attempt failed: {}",
                        e
                    );
                    last_error = Some(e);

                    if attempt < self.max_retries {
                        tokio::time::sleep(delay).await;
                        delay = (delay * 2).min(self.max_retry_delay);
                    }
                }
            }
        }

        debug!(
            url = url,
            attempts = self.max_retries + 1,
            "fetch giving up after retries"
        );

        Err(last_error.unwrap_or_else(|| FetchError::msg("fetch failed with no error")))
    }

    async fn try_fetch_once(&self, url: reqwest::Url) -> FetchResult<Bytes> {
        let url_str = url.to_string();

        let response = match timeout(self.request_timeout, self.client.get(url).send()).await {
            Ok(Ok(response)) => response,
            Ok(Err(source)) => {
                return Err(FetchError::Transport {
                    url: url_str,
                    source,
                });
            }
            Err(_) => return Err(FetchError::Timeout(url_str)),
        };

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Http {
                status: status.as_u16(),
                url: url_str,
            });
        }

        match timeout(self.request_timeout, response.bytes()).await {
            Ok(Ok(bytes)) => Ok(bytes),
            Ok(Err(source)) => Err(FetchError::Transport {
                url: url_str,
                source,
            }),
            Err(_) => Err(FetchError::Timeout(url_str)),
        }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> FetchResult<Bytes> {
        self.fetch_with_retries(url).await
    }
}
