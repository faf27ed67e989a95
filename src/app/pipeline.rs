//! One fetch invocation, from request to files on disk
//!
//! A run handles one product set in one mode. Stages execute strictly in
//! sequence and every stage announces itself with a protocol checkpoint:
//!
//! ```text
//! clouds: 10 index/validate  20 select/build  30..85 download  100 done
//! radar:  10 prepare  20 resolve  30..40 download  40 decompress
//!                     55 resolve  65..75 download  75 decompress  85 ready  100 done
//! ```
//!
//! Failures are reported on the protocol at the current percentage, logged,
//! and returned inside [`FetchOutcome::Failed`]. `Done!` is only emitted when
//! every product was produced.

use url::Url;

use crate::app::archive::ArchiveKeyResolver;
use crate::app::client::config::ClientConfig;
use crate::app::client::download::DownloadHandler;
use crate::app::client::http::HttpHandler;
use crate::app::decompress::gunzip_into;
use crate::app::hours::resolve_candidate;
use crate::app::index::DirectoryIndexFetcher;
use crate::app::models::{
    DownloadRequest, FetchMode, FetchedFile, Product, ProductSet, RunClock, UrlStrategy,
};
use crate::app::progress::{ProgressBand, ProgressReporter};
use crate::app::timestamp::{ArchiveWindow, Timestamp};
use crate::app::urls::{file_name_of, Endpoints, OutputLayout, UrlBuilder};
use crate::constants::files;
use crate::errors::{AppError, ResolutionError, Result};

/// Runtime configuration of a fetch
#[derive(Debug, Clone, Default)]
pub struct FetchConfig {
    pub client: ClientConfig,
    pub endpoints: Endpoints,
    pub output: OutputLayout,
    pub archive: ArchiveWindow,
}

/// Result of one invocation
#[derive(Debug)]
pub enum FetchOutcome {
    /// Every product was produced, in product order
    Completed(Vec<FetchedFile>),
    /// The failure that stopped the run
    Failed(AppError),
}

impl FetchOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, FetchOutcome::Completed(_))
    }

    /// Process exit code for this outcome
    pub fn exit_code(&self) -> i32 {
        match self {
            FetchOutcome::Completed(_) => 0,
            FetchOutcome::Failed(e) => e.exit_code(),
        }
    }

    pub fn into_result(self) -> Result<Vec<FetchedFile>> {
        match self {
            FetchOutcome::Completed(files) => Ok(files),
            FetchOutcome::Failed(e) => Err(e),
        }
    }
}

/// Checkpoints owned by one product
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Stages {
    resolve: u8,
    download: u8,
    /// End of the download band; decompression is reported here
    finish: u8,
}

const CLOUDS_STAGES: [Stages; 1] = [Stages {
    resolve: 20,
    download: 30,
    finish: 85,
}];

const RADAR_STAGES: [Stages; 2] = [
    Stages {
        resolve: 20,
        download: 30,
        finish: 40,
    },
    Stages {
        resolve: 55,
        download: 65,
        finish: 75,
    },
];

const PREPARE_PERCENT: u8 = 10;
const READY_PERCENT: u8 = 85;

/// Orchestrates the stages of one invocation
pub struct Pipeline<'r> {
    config: FetchConfig,
    http_handler: HttpHandler,
    reporter: &'r dyn ProgressReporter,
    clock: RunClock,
}

impl<'r> Pipeline<'r> {
    /// Creates a pipeline, capturing the wall clock for this invocation
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built from `config.client`
    pub fn new(config: FetchConfig, reporter: &'r dyn ProgressReporter) -> Result<Self> {
        let http_handler = HttpHandler::new(config.client.clone())?;
        Ok(Self {
            config,
            http_handler,
            reporter,
            clock: RunClock::capture(),
        })
    }

    /// Replace the captured clock
    pub fn with_clock(mut self, clock: RunClock) -> Self {
        self.clock = clock;
        self
    }

    /// Fetch `product_set`, live when `timestamp` is `None`
    pub async fn run(&self, product_set: ProductSet, timestamp: Option<&str>) -> FetchOutcome {
        self.reporter.initializing();
        let mode = if timestamp.is_some() {
            FetchMode::Archive
        } else {
            FetchMode::Live
        };
        tracing::info!("Starting {} fetch in {:?} mode", product_set, mode);

        match self.execute(product_set, timestamp).await {
            Ok(files) => {
                self.reporter.done();
                tracing::info!("Fetch finished with {} file(s)", files.len());
                FetchOutcome::Completed(files)
            }
            Err(e) => {
                tracing::error!("Fetch failed ({}): {}", e.category(), e);
                FetchOutcome::Failed(e)
            }
        }
    }

    async fn execute(
        &self,
        product_set: ProductSet,
        timestamp: Option<&str>,
    ) -> Result<Vec<FetchedFile>> {
        let timestamp = match timestamp {
            Some(raw) => {
                self.reporter
                    .checkpoint(PREPARE_PERCENT, "Validating timestamp...");
                Some(self.validate(raw)?)
            }
            None => {
                let message = match product_set {
                    ProductSet::Clouds => "Fetching available files...",
                    ProductSet::Radar => "Preparing latest radar download...",
                };
                self.reporter.checkpoint(PREPARE_PERCENT, message);
                None
            }
        };

        let stages: &[Stages] = match product_set {
            ProductSet::Clouds => &CLOUDS_STAGES,
            ProductSet::Radar => &RADAR_STAGES,
        };

        let mut fetched = Vec::with_capacity(stages.len());
        for (product, stages) in product_set.products().iter().zip(stages) {
            fetched.push(
                self.fetch_product(*product, timestamp.as_ref(), *stages)
                    .await?,
            );
        }

        let message = match product_set {
            ProductSet::Clouds => "Download complete.",
            ProductSet::Radar => "Radar files ready.",
        };
        self.reporter.checkpoint(READY_PERCENT, message);
        Ok(fetched)
    }

    fn validate(&self, raw: &str) -> Result<Timestamp> {
        let timestamp = Timestamp::parse(raw).map_err(|e| {
            self.reporter
                .checkpoint(PREPARE_PERCENT, &format!("Invalid timestamp format: {}", raw));
            e
        })?;

        self.config
            .archive
            .check(&timestamp, self.clock.now_utc)
            .map_err(|e| {
                self.reporter.checkpoint(PREPARE_PERCENT, &e.to_string());
                e
            })?;

        tracing::debug!(
            "Timestamp {} -> date {} hour {}",
            timestamp,
            timestamp.date_part(),
            timestamp.hour_part()
        );
        Ok(timestamp)
    }

    async fn fetch_product(
        &self,
        product: Product,
        timestamp: Option<&Timestamp>,
        stages: Stages,
    ) -> Result<FetchedFile> {
        let request = self.build_request(product, timestamp, stages).await?;

        self.reporter.checkpoint(
            stages.download,
            &format!("Downloading {}...", product.label()),
        );
        let result = DownloadHandler::new(&self.http_handler)
            .download(
                &request,
                ProgressBand::new(stages.download, stages.finish),
                self.reporter,
            )
            .await;
        let bytes = match result.into_result() {
            Ok(bytes) => bytes,
            Err(e) => {
                self.reporter.checkpoint(
                    stages.download,
                    &format!("Failed to download {}: {}", request.display_name(), e),
                );
                return Err(e.into());
            }
        };

        let path = if request.is_compressed() {
            self.reporter.checkpoint(
                stages.finish,
                &format!("Decompressing {}...", product.label()),
            );
            gunzip_into(request.destination(), &self.config.output.unzipped_dir())
                .await
                .map_err(|e| {
                    self.reporter.checkpoint(
                        stages.finish,
                        &format!("Failed to decompress {}", request.display_name()),
                    );
                    e
                })?
        } else {
            request.destination().to_path_buf()
        };

        Ok(FetchedFile {
            product,
            source_url: request.url().to_string(),
            path,
            bytes_downloaded: bytes,
        })
    }

    /// Resolve the URL of `product` and where to store it
    async fn build_request(
        &self,
        product: Product,
        timestamp: Option<&Timestamp>,
        stages: Stages,
    ) -> Result<DownloadRequest> {
        let urls = UrlBuilder::new(&self.config.endpoints);
        let output = &self.config.output;
        let mode = match timestamp {
            Some(_) => FetchMode::Archive,
            None => FetchMode::Live,
        };

        match (product.strategy(mode), timestamp) {
            (UrlStrategy::LiveDirectory, _) => {
                let directory = urls.live_directory_url(&self.clock)?;
                let href = self.select_live_href(&directory, stages).await?;
                let url = urls.live_file_url(&directory, &href)?;
                let destination = output.unzipped_dir().join(files::LIVE_RAP_FILE_NAME);
                Ok(DownloadRequest::new(
                    url.as_str(),
                    destination,
                    file_name_of(&href),
                ))
            }
            (UrlStrategy::DirectPath, Some(timestamp)) => {
                self.reporter
                    .checkpoint(stages.resolve, "Building download URL...");
                let url = urls.direct_path_url(timestamp);
                Ok(output.request(&url, &urls.direct_path_file_name(timestamp)))
            }
            (UrlStrategy::Archived, Some(timestamp)) => {
                self.reporter.checkpoint(
                    stages.resolve,
                    &format!("Resolving archived {} file...", product.label()),
                );
                let resolver = ArchiveKeyResolver::new(
                    &self.http_handler,
                    &self.config.endpoints.mrms_bucket_url,
                    &self.config.endpoints.mrms_region,
                );
                let key = resolver
                    .resolve_key(product, timestamp)
                    .await
                    .map_err(|e| {
                        self.reporter.checkpoint(stages.resolve, &e.to_string());
                        e
                    })?;
                Ok(output.request(&urls.archived_url(&key), file_name_of(&key)))
            }
            (UrlStrategy::LatestPointer, _) => {
                self.reporter.checkpoint(
                    stages.resolve,
                    &format!("Locating latest {} file...", product.label()),
                );
                let url = urls.latest_pointer_url(product).ok_or_else(|| {
                    AppError::from(ResolutionError::ArchiveKeyNotFound {
                        product: product.to_string(),
                        prefix: self.config.endpoints.mrms_latest_base_url.clone(),
                    })
                })?;
                let name = file_name_of(&url).to_string();
                Ok(output.request(&url, &name))
            }
            (UrlStrategy::DirectPath | UrlStrategy::Archived, None) => {
                // Archive strategies are only chosen when a timestamp exists
                Err(ResolutionError::NoAvailableFiles {
                    url: product.to_string(),
                }
                .into())
            }
        }
    }

    /// Href of the published file closest to the current UTC hour
    async fn select_live_href(&self, directory: &Url, stages: Stages) -> Result<String> {
        let candidates = DirectoryIndexFetcher::new(&self.http_handler)
            .fetch_candidates(directory, PREPARE_PERCENT, self.reporter)
            .await;

        if candidates.is_empty() {
            self.reporter
                .checkpoint(PREPARE_PERCENT, "No available files found.");
            return Err(ResolutionError::NoAvailableFiles {
                url: directory.to_string(),
            }
            .into());
        }

        self.reporter
            .checkpoint(stages.resolve, "Selecting closest forecast hour...");
        let current_hour = self.clock.utc_hour();
        let chosen = resolve_candidate(&candidates, current_hour).ok_or_else(|| {
            ResolutionError::NoAvailableFiles {
                url: directory.to_string(),
            }
        })?;
        tracing::info!(
            "Current UTC hour {:02}, closest published run {:02}z ({})",
            current_hour,
            chosen.hour,
            chosen.href
        );
        Ok(chosen.href.clone())
    }
}
