//! Data models for the resolution-and-retrieval pipeline
//!
//! All values here are transient: they are built while resolving one fetch
//! and dropped when it finishes. The only durable state of a run is the set of
//! files written to the data directory.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::{DateTime, Local, NaiveDate, Timelike, Utc};
use serde::{Deserialize, Serialize};

/// A GRIB2 product this tool knows how to locate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Product {
    /// RAP model AWIPS 32 km grid, read downstream for cloud layers (LCDC@LCY etc.)
    CloudCover,
    /// MRMS reflectivity at lowest altitude
    Reflectivity,
    /// MRMS surface precipitation type flag
    PrecipFlag,
}

impl Product {
    /// Product name as used in MRMS bucket keys and file names
    pub fn mrms_name(&self) -> Option<&'static str> {
        match self {
            Product::CloudCover => None,
            Product::Reflectivity => Some("ReflectivityAtLowestAltitude"),
            Product::PrecipFlag => Some("PrecipFlag"),
        }
    }

    /// Resolution token that follows the product name in MRMS keys
    pub fn resolution_token(&self) -> Option<&'static str> {
        match self {
            Product::CloudCover => None,
            Product::Reflectivity => Some("00.50"),
            Product::PrecipFlag => Some("00.00"),
        }
    }

    /// Short human label used in progress messages
    pub fn label(&self) -> &'static str {
        match self {
            Product::CloudCover => "cloud cover",
            Product::Reflectivity => "reflectivity",
            Product::PrecipFlag => "precipitation flag",
        }
    }

    /// URL strategy used for this product in the given mode
    pub fn strategy(&self, mode: FetchMode) -> UrlStrategy {
        match (self, mode) {
            (Product::CloudCover, FetchMode::Live) => UrlStrategy::LiveDirectory,
            (Product::CloudCover, FetchMode::Archive) => UrlStrategy::DirectPath,
            (_, FetchMode::Live) => UrlStrategy::LatestPointer,
            (_, FetchMode::Archive) => UrlStrategy::Archived,
        }
    }
}

impl fmt::Display for Product {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.mrms_name() {
            Some(name) => write!(f, "{}", name),
            None => write!(f, "RAP_CloudCover"),
        }
    }
}

/// Group of products fetched by one invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductSet {
    /// RAP model file only
    Clouds,
    /// Reflectivity followed by precipitation flag
    Radar,
}

impl ProductSet {
    pub fn products(&self) -> &'static [Product] {
        match self {
            ProductSet::Clouds => &[Product::CloudCover],
            ProductSet::Radar => &[Product::Reflectivity, Product::PrecipFlag],
        }
    }
}

impl FromStr for ProductSet {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "clouds" => Ok(ProductSet::Clouds),
            "radar" => Ok(ProductSet::Radar),
            other => Err(format!("unknown product set '{}' (expected clouds or radar)", other)),
        }
    }
}

impl fmt::Display for ProductSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProductSet::Clouds => write!(f, "clouds"),
            ProductSet::Radar => write!(f, "radar"),
        }
    }
}

/// Whether the caller asked for today's data or an archived timestamp
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchMode {
    Live,
    Archive,
}

/// How the final download URL is composed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UrlStrategy {
    /// NOMADS directory listing plus closest forecast hour
    LiveDirectory,
    /// Fixed S3 template filled from the timestamp
    DirectPath,
    /// S3 bucket listing resolves the real object key
    Archived,
    /// Always-current MRMS object
    LatestPointer,
}

/// Which calendar the live directory date is taken from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DateBasis {
    /// Local machine date (NOMADS directories are UTC dated, so this lags near midnight)
    #[default]
    Local,
    Utc,
}

/// Wall clock captured once at the start of an invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunClock {
    pub now_utc: DateTime<Utc>,
    pub today_local: NaiveDate,
}

impl RunClock {
    /// Capture the current instant
    pub fn capture() -> Self {
        Self {
            now_utc: Utc::now(),
            today_local: Local::now().date_naive(),
        }
    }

    /// Fixed clock, used by tests and replays
    pub fn fixed(now_utc: DateTime<Utc>, today_local: NaiveDate) -> Self {
        Self {
            now_utc,
            today_local,
        }
    }

    /// Current Zulu hour
    pub fn utc_hour(&self) -> u32 {
        self.now_utc.hour()
    }

    /// `YYYYMMDD` of the live directory to list
    pub fn listing_date(&self, basis: DateBasis) -> String {
        let date = match basis {
            DateBasis::Local => self.today_local,
            DateBasis::Utc => self.now_utc.date_naive(),
        };
        date.format("%Y%m%d").to_string()
    }
}

/// One anchor scraped from an index page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingEntry {
    pub link_text: String,
    pub href: String,
}

/// Anchors of one remote index page, in server order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectoryListing {
    pub entries: Vec<ListingEntry>,
}

impl DirectoryListing {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Forecast hour parsed from a listing href
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForecastHourCandidate {
    pub hour: u32,
    pub href: String,
}

/// What to download and where to put it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    url: String,
    destination: PathBuf,
    display_name: String,
}

impl DownloadRequest {
    pub fn new(
        url: impl Into<String>,
        destination: impl Into<PathBuf>,
        display_name: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into(),
            destination: destination.into(),
            display_name: display_name.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn destination(&self) -> &Path {
        &self.destination
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Whether the payload must be gunzipped before downstream use
    pub fn is_compressed(&self) -> bool {
        self.display_name
            .ends_with(crate::constants::files::GZIP_SUFFIX)
    }
}

/// Outcome of one download
#[derive(Debug)]
pub struct DownloadResult {
    pub destination: PathBuf,
    pub bytes_written: u64,
    pub failure: Option<crate::errors::DownloadError>,
}

impl DownloadResult {
    pub fn succeeded(destination: PathBuf, bytes_written: u64) -> Self {
        Self {
            destination,
            bytes_written,
            failure: None,
        }
    }

    pub fn failed(destination: PathBuf, error: crate::errors::DownloadError) -> Self {
        Self {
            destination,
            bytes_written: 0,
            failure: Some(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.failure.is_none()
    }

    /// Human readable failure reason, if any
    pub fn failure_reason(&self) -> Option<String> {
        self.failure.as_ref().map(|e| e.to_string())
    }

    /// Convert into a `Result`, keeping the byte count on success
    pub fn into_result(self) -> crate::errors::DownloadOpResult<u64> {
        match self.failure {
            None => Ok(self.bytes_written),
            Some(error) => Err(error),
        }
    }
}

/// A file produced for the downstream GIS stage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedFile {
    pub product: Product,
    pub source_url: String,
    /// File the downstream stage reads (decompressed when applicable)
    pub path: PathBuf,
    pub bytes_downloaded: u64,
}
