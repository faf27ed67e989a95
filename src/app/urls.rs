//! Download URL composition and output layout
//!
//! Four strategies produce the final URL of a product:
//! - live directory: today's NOMADS RAP directory plus the href picked from its index
//! - direct path: the RAP analysis file on S3, filled from a timestamp
//! - archived: an MRMS object key on S3, resolved by listing the bucket
//! - latest pointer: the always-current MRMS object

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::app::models::{DateBasis, DownloadRequest, Product, RunClock};
use crate::app::timestamp::Timestamp;
use crate::constants::{files, noaa};
use crate::errors::{NetworkError, NetworkResult};

/// Remote endpoints, overridable from the `[endpoints]` config section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    /// NOMADS directory template, `{date}` is replaced by `YYYYMMDD`
    pub nomads_rap_dir_template: String,
    /// S3 RAP analysis template with `{date}` and `{hour}`
    pub rap_s3_template: String,
    pub mrms_bucket_url: String,
    pub mrms_region: String,
    pub mrms_latest_base_url: String,
    /// Calendar used for the live directory date
    pub live_date_basis: DateBasis,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            nomads_rap_dir_template: noaa::NOMADS_RAP_DIR_TEMPLATE.to_string(),
            rap_s3_template: noaa::RAP_S3_TEMPLATE.to_string(),
            mrms_bucket_url: noaa::MRMS_BUCKET_URL.to_string(),
            mrms_region: noaa::MRMS_REGION.to_string(),
            mrms_latest_base_url: noaa::MRMS_LATEST_BASE_URL.to_string(),
            live_date_basis: DateBasis::default(),
        }
    }
}

/// Where produced files go below the data root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLayout {
    data_dir: PathBuf,
}

impl Default for OutputLayout {
    fn default() -> Self {
        Self::new(files::DEFAULT_DATA_DIR)
    }
}

impl OutputLayout {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Compressed downloads
    pub fn zipped_dir(&self) -> PathBuf {
        self.data_dir.join(files::ZIPPED_DIR)
    }

    /// GRIB2 files read by the GIS stage
    pub fn unzipped_dir(&self) -> PathBuf {
        self.data_dir.join(files::UNZIPPED_DIR)
    }

    /// Destination of a downloaded file, by compression
    pub fn destination_for(&self, file_name: &str) -> PathBuf {
        if file_name.ends_with(files::GZIP_SUFFIX) {
            self.zipped_dir().join(file_name)
        } else {
            self.unzipped_dir().join(file_name)
        }
    }

    /// Request saving `url` under its own file name
    pub fn request(&self, url: &str, file_name: &str) -> DownloadRequest {
        DownloadRequest::new(url, self.destination_for(file_name), file_name)
    }
}

/// Last path segment of a URL or key
pub fn file_name_of(location: &str) -> &str {
    let path = location.split(['?', '#']).next().unwrap_or(location);
    path.trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or(path)
}

/// Composes download URLs from the configured endpoints
pub struct UrlBuilder<'a> {
    endpoints: &'a Endpoints,
}

impl<'a> UrlBuilder<'a> {
    pub fn new(endpoints: &'a Endpoints) -> Self {
        Self { endpoints }
    }

    /// Today's NOMADS RAP directory
    ///
    /// The date comes from the clock's local calendar unless the endpoints ask
    /// for UTC, so near midnight the local date can point at a directory that
    /// does not exist yet (or at yesterday's).
    pub fn live_directory_url(&self, clock: &RunClock) -> NetworkResult<Url> {
        let date = clock.listing_date(self.endpoints.live_date_basis);
        let mut raw = self
            .endpoints
            .nomads_rap_dir_template
            .replace(noaa::DATE_PLACEHOLDER, &date);
        if !raw.ends_with('/') {
            raw.push('/');
        }
        parse_url(&raw)
    }

    /// Directory URL joined with an href from its index
    pub fn live_file_url(&self, directory: &Url, href: &str) -> NetworkResult<Url> {
        directory.join(href).map_err(|e| NetworkError::InvalidUrl {
            url: format!("{}{}", directory, href),
            error: e.to_string(),
        })
    }

    /// RAP analysis (f00) file on S3 for a timestamp; no lookup needed
    pub fn direct_path_url(&self, timestamp: &Timestamp) -> String {
        self.endpoints
            .rap_s3_template
            .replace(noaa::DATE_PLACEHOLDER, timestamp.date_part())
            .replace(noaa::HOUR_PLACEHOLDER, timestamp.hour_part())
    }

    /// Output name of a direct path file; S3 reuses the same name every day
    pub fn direct_path_file_name(&self, timestamp: &Timestamp) -> String {
        let url = self.direct_path_url(timestamp);
        let name = file_name_of(&url);
        match name.strip_prefix("rap.") {
            Some(rest) => format!("rap.{}.{}", timestamp.date_part(), rest),
            None => format!("{}_{}", timestamp.date_part(), name),
        }
    }

    /// Public URL of an archived MRMS object key
    pub fn archived_url(&self, key: &str) -> String {
        format!(
            "{}/{}",
            self.endpoints.mrms_bucket_url.trim_end_matches('/'),
            key.trim_start_matches('/')
        )
    }

    /// Always-current MRMS object of a product
    pub fn latest_pointer_url(&self, product: Product) -> Option<String> {
        let name = product.mrms_name()?;
        Some(format!(
            "{}/{name}/MRMS_{name}.latest.grib2.gz",
            self.endpoints.mrms_latest_base_url.trim_end_matches('/')
        ))
    }
}

fn parse_url(raw: &str) -> NetworkResult<Url> {
    Url::parse(raw).map_err(|e| NetworkError::InvalidUrl {
        url: raw.to_string(),
        error: e.to_string(),
    })
}
