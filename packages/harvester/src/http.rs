//! HTTP transport for fetching source pages.

use std::thread;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, REFERER};

use crate::config::HTTP_TIMEOUT_SECS;
use crate::error::{HarvesterError, Result};

/// User agent string identifying this harvester.
const USER_AGENT: &str = concat!("tafseer-harvester/", env!("CARGO_PKG_VERSION"));

/// Maximum number of attempts for transient failures.
const MAX_RETRIES: u32 = 3;

/// Base delay for exponential backoff (milliseconds).
const RETRY_BASE_DELAY_MS: u64 = 500;

/// Supplies raw page markup to the traversal driver.
pub trait PageSource {
    /// Fetch one page.
    ///
    /// Returns `Ok(None)` when the server answers but has no page to give
    /// (client error status). Transport failures are errors.
    fn fetch(&self, url: &str, referer: &str) -> Result<Option<String>>;
}

/// Create a configured HTTP client.
///
/// # Returns
/// A `reqwest::blocking::Client` with timeout, user agent and Arabic
/// content negotiation headers.
pub fn create_client() -> Result<Client> {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT,
        HeaderValue::from_static("text/html,application/xhtml+xml;q=0.9,*/*;q=0.8"),
    );
    headers.insert(
        ACCEPT_LANGUAGE,
        HeaderValue::from_static("ar,en-US;q=0.9,en;q=0.8"),
    );

    let client = Client::builder()
        .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
        .user_agent(USER_AGENT)
        .default_headers(headers)
        .build()?;
    Ok(client)
}

/// [`PageSource`] backed by a blocking HTTP client with retries.
#[derive(Debug, Clone)]
pub struct HttpSource {
    client: Client,
    max_retries: u32,
    retry_base_delay: Duration,
}

impl HttpSource {
    /// Create a source with the default retry policy.
    pub fn new() -> Result<Self> {
        Ok(Self {
            client: create_client()?,
            max_retries: MAX_RETRIES,
            retry_base_delay: Duration::from_millis(RETRY_BASE_DELAY_MS),
        })
    }

    /// Override the retry policy.
    #[must_use]
    pub fn with_retry(mut self, max_retries: u32, base_delay: Duration) -> Self {
        self.max_retries = max_retries.max(1);
        self.retry_base_delay = base_delay;
        self
    }
}

impl PageSource for HttpSource {
    /// Download a page with retry logic.
    ///
    /// Uses exponential backoff for transient failures (connection errors,
    /// timeouts, 5xx responses). Client errors (4xx) are not retried.
    fn fetch(&self, url: &str, referer: &str) -> Result<Option<String>> {
        let mut last_error: Option<String> = None;

        for attempt in 0..self.max_retries {
            if attempt > 0 {
                // Exponential backoff: base, 2x base, 4x base, ...
                let delay = self.retry_base_delay * (1 << (attempt - 1));
                tracing::debug!(attempt, delay_ms = delay.as_millis() as u64, "Retrying after delay");
                thread::sleep(delay);
            }

            match self.client.get(url).header(REFERER, referer).send() {
                Ok(response) => {
                    let status = response.status();

                    if status.is_server_error() {
                        tracing::warn!(
                            url,
                            status = %status,
                            attempt = attempt + 1,
                            max_retries = self.max_retries,
                            "Server error, will retry"
                        );
                        last_error = Some(format!("Server error: {status}"));
                        continue;
                    }

                    if !status.is_success() {
                        tracing::warn!(url, status = %status, "Page not available");
                        return Ok(None);
                    }

                    let body = response
                        .text()
                        .map_err(|source| HarvesterError::PageDownload {
                            url: url.to_string(),
                            source,
                        })?;
                    tracing::debug!(url, bytes = body.len(), "Fetched page");
                    return Ok(Some(body));
                }
                Err(e) => {
                    if e.is_connect() || e.is_timeout() {
                        tracing::warn!(
                            url,
                            error = %e,
                            attempt = attempt + 1,
                            max_retries = self.max_retries,
                            "Connection error, will retry"
                        );
                        last_error = Some(e.to_string());
                        continue;
                    }
                    return Err(HarvesterError::PageDownload {
                        url: url.to_string(),
                        source: e,
                    });
                }
            }
        }

        Err(HarvesterError::RetriesExhausted {
            attempts: self.max_retries,
            message: last_error.unwrap_or_else(|| "Unknown error".to_string()),
        })
    }
}
