//! Core application logic for GRIB Fetcher
//!
//! This module contains the resolution-and-retrieval pipeline: the HTTP
//! client, directory index parsing, hour selection, timestamp validation,
//! archive key lookup, URL composition, downloads and decompression.
//!
//! # Examples
//!
//! ```rust,no_run
//! use grib_fetcher::app::{FetchConfig, Pipeline, ProductSet, StdoutReporter};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let reporter = StdoutReporter;
//! let pipeline = Pipeline::new(FetchConfig::default(), &reporter)?;
//!
//! // Radar products for 15z on 3 December 2024
//! let files = pipeline
//!     .run(ProductSet::Radar, Some("20241203-1500"))
//!     .await
//!     .into_result()?;
//! for file in files {
//!     println!("{} -> {}", file.product, file.path.display());
//! }
//! # Ok(())
//! # }
//! ```

pub mod archive;
pub mod client;
pub mod decompress;
pub mod hours;
pub mod index;
pub mod models;
pub mod pipeline;
pub mod progress;
pub mod timestamp;
pub mod urls;

// Re-export main public API
pub use archive::ArchiveKeyResolver;
pub use client::{ClientConfig, DownloadHandler, HttpHandler};
pub use hours::{resolve_candidate, resolve_hour};
pub use index::DirectoryIndexFetcher;
pub use models::{
    DateBasis, DirectoryListing, DownloadRequest, DownloadResult, FetchMode, FetchedFile,
    ForecastHourCandidate, Product, ProductSet, RunClock, UrlStrategy,
};
pub use pipeline::{FetchConfig, FetchOutcome, Pipeline};
pub use progress::{MemoryReporter, ProgressBand, ProgressReporter, StdoutReporter};
pub use timestamp::{is_valid_timestamp, ArchiveWindow, Timestamp};
pub use urls::{Endpoints, OutputLayout, UrlBuilder};
