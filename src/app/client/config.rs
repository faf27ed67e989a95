//! HTTP client configuration and building logic
//!
//! This module handles the configuration and construction of the HTTP client
//! shared by the index fetcher, the archive key resolver and the downloader.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::constants::{http, limits};
use crate::errors::{NetworkError, NetworkResult};

/// Configuration for the HTTP client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// TCP nodelay (disable Nagle's algorithm)
    pub tcp_nodelay: bool,
    /// Connection pool idle timeout
    pub pool_idle_timeout: Option<Duration>,
    /// Deadline for a whole request, covering the body of a download
    pub request_timeout: Duration,
    /// Connect timeout
    pub connect_timeout: Duration,
    /// Rate limit (requests per second)
    pub rate_limit_rps: u32,
    /// Retries for transport failures, 429 and 503
    pub max_retries: u32,
    /// Base delay of the exponential backoff
    pub retry_base_delay: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            tcp_nodelay: true,
            pool_idle_timeout: Some(http::POOL_IDLE_TIMEOUT),
            request_timeout: http::DEFAULT_TIMEOUT,
            connect_timeout: http::CONNECT_TIMEOUT,
            rate_limit_rps: limits::DEFAULT_RATE_LIMIT_RPS,
            max_retries: limits::MAX_RETRIES,
            retry_base_delay: Duration::from_millis(limits::RETRY_BASE_DELAY_MS),
        }
    }
}

impl ClientConfig {
    /// Builds the HTTP client with the specified configuration
    pub fn build_http_client(&self) -> NetworkResult<Client> {
        let mut client_builder = Client::builder()
            .timeout(self.request_timeout)
            .connect_timeout(self.connect_timeout)
            .user_agent(http::USER_AGENT)
            .tcp_nodelay(self.tcp_nodelay);

        // Configure connection pool idle timeout
        if let Some(idle_timeout) = self.pool_idle_timeout {
            client_builder = client_builder.pool_idle_timeout(idle_timeout);
        }

        client_builder.build().map_err(NetworkError::Http)
    }

    /// Backoff delay before retry number `attempt` (1-based), capped at
    /// [`limits::MAX_BACKOFF_SECS`]
    pub fn retry_delay(&self, attempt: u32) -> Duration {
        self.retry_base_delay
            .saturating_mul(2_u32.saturating_pow(attempt))
            .min(Duration::from_secs(limits::MAX_BACKOFF_SECS))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_config_default() {
        let config = ClientConfig::default();
        assert!(config.tcp_nodelay);
        assert_eq!(config.rate_limit_rps, limits::DEFAULT_RATE_LIMIT_RPS);
        assert_eq!(config.request_timeout, http::DEFAULT_TIMEOUT);
    }

    #[test]
    fn test_http_client_with_custom_config() {
        let config = ClientConfig {
            request_timeout: Duration::from_secs(5),
            connect_timeout: Duration::from_secs(2),
            pool_idle_timeout: None,
            ..Default::default()
        };

        assert!(config.build_http_client().is_ok());
    }

    #[test]
    fn test_exponential_backoff_calculation() {
        let config = ClientConfig {
            retry_base_delay: Duration::from_millis(1000),
            ..Default::default()
        };

        assert_eq!(config.retry_delay(1).as_millis(), 2000);
        assert_eq!(config.retry_delay(2).as_millis(), 4000);
        assert_eq!(config.retry_delay(3).as_millis(), 8000);
    }

    #[test]
    fn test_backoff_is_capped() {
        let config = ClientConfig {
            retry_base_delay: Duration::from_millis(1000),
            max_retries: 20,
            ..Default::default()
        };

        let cap = Duration::from_secs(limits::MAX_BACKOFF_SECS);
        assert_eq!(config.retry_delay(6), cap);
        assert_eq!(config.retry_delay(20), cap);
        assert_eq!(config.retry_delay(u32::MAX), cap);
    }
}
