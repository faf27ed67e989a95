//! Core HTTP operations with rate limiting and retry logic
//!
//! Every GET issued by the pipeline goes through [`HttpHandler`]: requests are
//! paced by a token bucket, transient statuses (429, 503) and transport errors
//! are retried with exponential backoff, and timeouts are reported as
//! [`NetworkError::Timeout`].

use std::num::NonZeroU32;
use std::time::Duration;

use governor::{clock::DefaultClock, state::InMemoryState, Jitter, Quota, RateLimiter};
use reqwest::{Client, Response, StatusCode};
use url::Url;

use crate::app::client::config::ClientConfig;
use crate::errors::{ConfigError, NetworkError, NetworkResult, Result};

type DirectRateLimiter = RateLimiter<governor::state::NotKeyed, InMemoryState, DefaultClock>;

/// HTTP operations handler with resilience patterns
#[derive(Debug)]
pub struct HttpHandler {
    client: Client,
    rate_limiter: DirectRateLimiter,
    config: ClientConfig,
}

impl HttpHandler {
    /// Creates a new HttpHandler from a client configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the client cannot be built or the rate limit is zero
    pub fn new(config: ClientConfig) -> Result<Self> {
        let client = config.build_http_client()?;
        let rate_limiter = Self::build_rate_limiter(config.rate_limit_rps)?;
        Ok(Self {
            client,
            rate_limiter,
            config,
        })
    }

    /// Builds the rate limiter with the specified rate limit
    fn build_rate_limiter(
        rate_limit_rps: u32,
    ) -> std::result::Result<DirectRateLimiter, ConfigError> {
        let rps = NonZeroU32::new(rate_limit_rps).ok_or_else(|| ConfigError::InvalidValue {
            field: "client.rate_limit_rps".to_string(),
            value: rate_limit_rps.to_string(),
            reason: "Rate limit must be non-zero".to_string(),
        })?;
        Ok(RateLimiter::direct(Quota::per_second(rps)))
    }

    /// Fetches the HTTP response with rate limiting and retry logic
    ///
    /// The response is returned whatever its final status; callers that need a
    /// success status use [`HttpHandler::get_success`].
    pub async fn get_response(&self, url: &Url) -> NetworkResult<Response> {
        self.rate_limiter
            .until_ready_with_jitter(Jitter::up_to(Duration::from_millis(100)))
            .await;

        let max_retries = self.config.max_retries;
        let mut retries = 0;
        loop {
            match self.client.get(url.as_str()).send().await {
                Ok(response) => {
                    let status = response.status();
                    if status == StatusCode::TOO_MANY_REQUESTS
                        || status == StatusCode::SERVICE_UNAVAILABLE
                    {
                        if retries < max_retries {
                            retries += 1;
                            let delay = self.config.retry_delay(retries);
                            tracing::warn!(
                                "{} answered HTTP {}. Backing off for {}ms",
                                url,
                                status,
                                delay.as_millis()
                            );
                            tokio::time::sleep(delay).await;
                            continue;
                        }
                        return Err(if status == StatusCode::TOO_MANY_REQUESTS {
                            NetworkError::RateLimitExceeded
                        } else {
                            NetworkError::ServerOverloaded
                        });
                    }

                    tracing::debug!("Fetched {} ({})", url, status);
                    return Ok(response);
                }
                Err(e) if e.is_timeout() => {
                    tracing::error!("Request to {} timed out", url);
                    return Err(self.timeout_error(url));
                }
                Err(e) if retries < max_retries => {
                    retries += 1;
                    let delay = self.config.retry_delay(retries);
                    tracing::warn!(
                        "Request failed (attempt {}/{}): {}. Retrying in {}ms",
                        retries,
                        max_retries,
                        e,
                        delay.as_millis()
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) if max_retries == 0 => return Err(NetworkError::Http(e)),
                Err(e) => {
                    tracing::error!("Request failed after {} retries: {}", max_retries, e);
                    return Err(NetworkError::MaxRetriesExceeded {
                        url: url.to_string(),
                        max_retries,
                    });
                }
            }
        }
    }

    /// Fetches a response and rejects any non-2xx status
    pub async fn get_success(&self, url: &Url) -> NetworkResult<Response> {
        let response = self.get_response(url).await?;
        if !response.status().is_success() {
            return Err(NetworkError::Status {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }
        Ok(response)
    }

    /// Fetches the body of a page as text, requiring a success status
    pub async fn get_page(&self, url: &Url) -> NetworkResult<String> {
        let response = self.get_success(url).await?;
        let text = response.text().await.map_err(|e| self.map_body_error(url, e))?;
        tracing::debug!("Fetched page {} ({} bytes)", url, text.len());
        Ok(text)
    }

    /// Classify an error raised while reading a body
    pub fn map_body_error(&self, url: &Url, error: reqwest::Error) -> NetworkError {
        if error.is_timeout() {
            self.timeout_error(url)
        } else {
            NetworkError::Http(error)
        }
    }

    fn timeout_error(&self, url: &Url) -> NetworkError {
        NetworkError::Timeout {
            url: url.to_string(),
            seconds: self.config.request_timeout.as_secs(),
        }
    }
}
