//! Error types for GRIB Fetcher
//!
//! Every stage of the pipeline reports failures through one of the enums below.
//! Nothing in the pipeline panics on bad input or a misbehaving server: errors
//! travel as values up to the pipeline, which turns them into a progress line
//! and a process exit code.

use std::path::PathBuf;
use thiserror::Error;

/// HTTP transport and status errors for any GET (index, key lookup or download)
#[derive(Error, Debug)]
pub enum NetworkError {
    /// Transport level failure reported by reqwest
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Server answered with a non-success status
    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },

    /// Request did not complete within the configured timeout
    #[error("Request to {url} timed out after {seconds} seconds")]
    Timeout { url: String, seconds: u64 },

    /// URL could not be parsed or composed
    #[error("Invalid URL: {url} - {error}")]
    InvalidUrl { url: String, error: String },

    /// Server kept answering HTTP 429
    #[error("Rate limit exceeded. Server responded with HTTP 429")]
    RateLimitExceeded,

    /// Server kept answering HTTP 503
    #[error("Server overloaded. Server responded with HTTP 503")]
    ServerOverloaded,

    /// Transport failures exhausted the retry budget
    #[error("Maximum retry attempts ({max_retries}) exceeded for {url}")]
    MaxRetriesExceeded { url: String, max_retries: u32 },
}

/// User supplied input that does not describe a fetchable timestamp
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ValidationError {
    /// Input is not of the shape YYYYMMDD-HHMM
    #[error("Invalid timestamp '{input}'. Expected format YYYYMMDD-HHMM")]
    MalformedTimestamp { input: String },

    /// Shape is fine but the digits are not a calendar date and hour
    #[error("Timestamp '{input}' is not a valid calendar date and hour")]
    InvalidCalendarDate { input: String },

    /// Timestamp is older than the first archived day
    #[error("Archive data is only available after {earliest}")]
    BeforeArchiveStart { earliest: String },

    /// Timestamp is too recent to have been archived yet
    #[error("Archive data is only available {delay_hours} hours before the current time")]
    TooRecent { delay_hours: u32 },
}

/// A lookup completed but did not produce anything to download
#[derive(Error, Debug)]
pub enum ResolutionError {
    /// Directory listing had no usable forecast files
    #[error("No available files found at {url}")]
    NoAvailableFiles { url: String },

    /// Bucket listing returned no object for the prefix
    #[error("File not found: no archived {product} object matches prefix {prefix}")]
    ArchiveKeyNotFound { product: String, prefix: String },

    /// Bucket listing body could not be decoded
    #[error("Malformed bucket listing: {reason}")]
    MalformedListing { reason: String },
}

/// Errors while streaming a file to disk
#[derive(Error, Debug)]
pub enum DownloadError {
    /// Network failure while requesting or streaming
    #[error(transparent)]
    Network(#[from] NetworkError),

    /// I/O error during file operations
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Atomic rename of the finished temp file failed
    #[error("Atomic file operation failed: could not rename {temp_path} to {final_path}")]
    AtomicOperationFailed {
        temp_path: PathBuf,
        final_path: PathBuf,
    },

    /// Server returned a success status but no bytes
    #[error("Empty response body for {url}")]
    EmptyBody { url: String },

    /// Body length did not match Content-Length
    #[error("Incomplete download: received {received} bytes, expected {expected} bytes")]
    IncompleteDownload { received: u64, expected: u64 },

    /// Gzip stream could not be decoded
    #[error("Failed to decompress {path}: {reason}")]
    Decompression { path: PathBuf, reason: String },
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    NotFound { path: PathBuf },

    /// Configuration file could not be read
    #[error("Failed to read configuration file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Invalid configuration format
    #[error("Invalid configuration format: {0}")]
    InvalidFormat(#[from] toml::de::Error),

    /// Invalid configuration value
    #[error("Invalid configuration value for {field}: {value}. {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Top-level application error that can represent any error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Network(#[from] NetworkError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    #[error(transparent)]
    Download(#[from] DownloadError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Generic I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl AppError {
    /// Check if the error is transient and a later attempt may succeed
    pub fn is_recoverable(&self) -> bool {
        match self {
            AppError::Network(NetworkError::Timeout { .. })
            | AppError::Network(NetworkError::Http(_))
            | AppError::Network(NetworkError::RateLimitExceeded)
            | AppError::Network(NetworkError::ServerOverloaded)
            | AppError::Download(DownloadError::Network(_))
            | AppError::Download(DownloadError::IncompleteDownload { .. })
            | AppError::Download(DownloadError::EmptyBody { .. }) => true,

            // Published files appear a while after their nominal hour
            AppError::Resolution(ResolutionError::NoAvailableFiles { .. })
            | AppError::Resolution(ResolutionError::ArchiveKeyNotFound { .. }) => true,

            _ => false,
        }
    }

    /// Get error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            AppError::Network(_) => "network",
            AppError::Validation(_) => "validation",
            AppError::Resolution(_) => "resolution",
            AppError::Download(_) => "download",
            AppError::Config(_) => "config",
            AppError::Io(_) => "io",
        }
    }

    /// Process exit code the host uses to tell failure kinds apart
    pub fn exit_code(&self) -> i32 {
        match self {
            AppError::Network(_) | AppError::Download(_) | AppError::Io(_) => 1,
            AppError::Validation(_) => 2,
            AppError::Resolution(_) => 3,
            AppError::Config(_) => 4,
        }
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, AppError>;

/// Network result type alias
pub type NetworkResult<T> = std::result::Result<T, NetworkError>;

/// Download result type alias
pub type DownloadOpResult<T> = std::result::Result<T, DownloadError>;

/// Resolution result type alias
pub type ResolutionResult<T> = std::result::Result<T, ResolutionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes_distinguish_failure_kinds() {
        let validation = AppError::from(ValidationError::MalformedTimestamp {
            input: "nope".to_string(),
        });
        let resolution = AppError::from(ResolutionError::NoAvailableFiles {
            url: "https://example.com/".to_string(),
        });
        let network = AppError::from(NetworkError::Status {
            url: "https://example.com/".to_string(),
            status: 404,
        });

        assert_eq!(validation.exit_code(), 2);
        assert_eq!(resolution.exit_code(), 3);
        assert_eq!(network.exit_code(), 1);
    }

    #[test]
    fn test_error_categories() {
        let error = AppError::from(DownloadError::EmptyBody {
            url: "https://example.com/a.grib2".to_string(),
        });
        assert_eq!(error.category(), "download");
        assert!(error.is_recoverable());

        let error = AppError::from(ValidationError::TooRecent { delay_hours: 2 });
        assert_eq!(error.category(), "validation");
        assert!(!error.is_recoverable());
    }

    #[test]
    fn test_not_found_message() {
        let error = ResolutionError::ArchiveKeyNotFound {
            product: "PrecipFlag".to_string(),
            prefix: "CONUS/PrecipFlag_00.00/20241203/".to_string(),
        };
        assert!(error.to_string().starts_with("File not found"));
    }
}
