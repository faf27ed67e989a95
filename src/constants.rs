//! Application constants for GRIB Fetcher
//!
//! This module centralizes all constants used throughout the application,
//! organized by functional domain. Values that a deployment may need to change
//! (endpoints, directories, timeouts) are only defaults here and are carried
//! at runtime by `FetchConfig`.

use std::time::Duration;

/// HTTP client configuration constants
pub mod http {
    use super::Duration;

    /// Default user agent for all HTTP requests
    pub const USER_AGENT: &str = "GRIB-Fetcher/0.1.0 (GIS Weather Visualisation)";

    /// Default HTTP request timeout, a deadline for the whole transfer
    /// including the body of a 13 MB RAP file on a slow link
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

    /// Connection establishment timeout
    pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

    /// Connection pool idle timeout
    pub const POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(90);
}

/// Rate limiting and retry configuration
pub mod limits {
    /// NOMADS blocks clients that exceed roughly 120 hits per minute
    pub const DEFAULT_RATE_LIMIT_RPS: u32 = 2;

    /// Maximum retry attempts for transient failures
    pub const MAX_RETRIES: u32 = 3;

    /// Base delay for exponential backoff (milliseconds)
    pub const RETRY_BASE_DELAY_MS: u64 = 1000;

    /// Maximum backoff delay (seconds)
    pub const MAX_BACKOFF_SECS: u64 = 60;
}

/// NOAA endpoints
pub mod noaa {
    /// Placeholder substituted with a `YYYYMMDD` date
    pub const DATE_PLACEHOLDER: &str = "{date}";

    /// Placeholder substituted with a two digit hour
    pub const HOUR_PLACEHOLDER: &str = "{hour}";

    /// NOMADS directory holding today's RAP runs
    pub const NOMADS_RAP_DIR_TEMPLATE: &str =
        "https://nomads.ncep.noaa.gov/pub/data/nccf/com/rap/prod/rap.{date}/";

    /// RAP analysis (forecast hour 00) on the NOAA open data bucket
    pub const RAP_S3_TEMPLATE: &str =
        "https://noaa-rap-pds.s3.amazonaws.com/rap.{date}/rap.t{hour}z.awip32f00.grib2";

    /// Public base URL of the MRMS open data bucket
    pub const MRMS_BUCKET_URL: &str = "https://noaa-mrms-pds.s3.amazonaws.com";

    /// Region directory inside the MRMS bucket
    pub const MRMS_REGION: &str = "CONUS";

    /// Base URL of the always-current MRMS products
    pub const MRMS_LATEST_BASE_URL: &str = "https://mrms.ncep.noaa.gov/data/2D";
}

/// Directory listing parsing
pub mod listing {
    /// Substring identifying first forecast hour AWIPS 32 km files
    pub const PRODUCT_SUFFIX_MARKER: &str = ".awip32f01.grib";

    /// Sidecar index files share the marker and are never downloaded
    pub const INDEX_SIDECAR_SUFFIX: &str = ".idx";

    /// CSS selector for anchors in an index page
    pub const ANCHOR_SELECTOR: &str = "a[href]";
}

/// File operation constants
pub mod files {
    /// Temporary file suffix for atomic operations
    pub const TEMP_FILE_SUFFIX: &str = ".tmp";

    /// Suffix of gzip compressed products
    pub const GZIP_SUFFIX: &str = ".gz";

    /// Write buffer size for streamed downloads
    pub const DOWNLOAD_CHUNK_SIZE: usize = 8 * 1024;

    /// Default root of all produced files
    pub const DEFAULT_DATA_DIR: &str = "Data";

    /// Compressed downloads below the data root
    pub const ZIPPED_DIR: &str = "Zipped";

    /// GRIB2 files below the data root
    pub const UNZIPPED_DIR: &str = "Unzipped";

    /// Fixed slot for the live RAP download
    pub const LIVE_RAP_FILE_NAME: &str = "RAP_CloudCover.latest.grib2";
}

/// Progress protocol
pub mod progress {
    /// Prefix of every protocol line
    pub const LINE_PREFIX: &str = "Progress";

    /// First message of every run
    pub const INITIALIZING: &str = "Initializing...";

    /// Last message of a successful run
    pub const DONE: &str = "Done!";
}

/// Environment variables
pub mod env {
    /// Overrides `output.data_dir`
    pub const DATA_DIR: &str = "GRIB_FETCHER_DATA_DIR";

    /// Overrides `client.request_timeout_secs`
    pub const TIMEOUT_SECS: &str = "GRIB_FETCHER_TIMEOUT_SECS";
}

// Re-export commonly used constants for convenience
pub use files::TEMP_FILE_SUFFIX;
pub use http::{DEFAULT_TIMEOUT as HTTP_TIMEOUT, USER_AGENT};
pub use limits::{DEFAULT_RATE_LIMIT_RPS, MAX_RETRIES, RETRY_BASE_DELAY_MS};
