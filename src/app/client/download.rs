//! Streamed file downloads with atomic replacement
//!
//! The destination of a download is a fixed slot that every run overwrites.
//! Bytes are streamed into a sibling `.tmp` file and only renamed over the
//! destination once the body is complete, so an interrupted or failed transfer
//! leaves the previous file in place.

use std::path::{Path, PathBuf};

use reqwest::Response;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use url::Url;

use crate::app::client::http::HttpHandler;
use crate::app::models::{DownloadRequest, DownloadResult};
use crate::app::progress::{ProgressBand, ProgressReporter, TransferProgress};
use crate::constants::files;
use crate::errors::{DownloadError, DownloadOpResult, NetworkError};

/// File download operations handler
pub struct DownloadHandler<'a> {
    http_handler: &'a HttpHandler,
}

impl<'a> DownloadHandler<'a> {
    /// Creates a new DownloadHandler with the given HTTP handler
    pub fn new(http_handler: &'a HttpHandler) -> Self {
        Self { http_handler }
    }

    /// Downloads `request` to its destination
    ///
    /// Never returns an error: failures are carried in the returned
    /// [`DownloadResult`]. Progress lines are interpolated inside `band` when
    /// the server sends a `Content-Length`.
    pub async fn download(
        &self,
        request: &DownloadRequest,
        band: ProgressBand,
        reporter: &dyn ProgressReporter,
    ) -> DownloadResult {
        tracing::info!(
            "Downloading {} from {}...",
            request.display_name(),
            request.url()
        );

        match self.download_file(request, band, reporter).await {
            Ok(bytes) => {
                tracing::info!(
                    "Download completed: {} ({} bytes)",
                    request.destination().display(),
                    bytes
                );
                DownloadResult::succeeded(request.destination().to_path_buf(), bytes)
            }
            Err(e) => {
                tracing::error!("Failed to download {}: {}", request.display_name(), e);
                DownloadResult::failed(request.destination().to_path_buf(), e)
            }
        }
    }

    async fn download_file(
        &self,
        request: &DownloadRequest,
        band: ProgressBand,
        reporter: &dyn ProgressReporter,
    ) -> DownloadOpResult<u64> {
        let url = Url::parse(request.url()).map_err(|e| NetworkError::InvalidUrl {
            url: request.url().to_string(),
            error: e.to_string(),
        })?;
        let destination = request.destination();

        // Create parent directory if it doesn't exist
        if let Some(parent) = destination.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        // A non-2xx answer returns here, before anything touches the disk
        let response = self.http_handler.get_success(&url).await?;
        let expected = response.content_length();

        let temp_path = temp_path_for(destination);
        let mut progress =
            TransferProgress::new(reporter, band, request.display_name(), expected);

        let written = match self
            .stream_to_file(response, &url, &temp_path, &mut progress)
            .await
            .and_then(|written| check_length(&url, written, expected))
        {
            Ok(written) => written,
            Err(e) => {
                if tokio::fs::try_exists(&temp_path).await.unwrap_or(false) {
                    let _ = tokio::fs::remove_file(&temp_path).await;
                }
                return Err(e);
            }
        };

        tokio::fs::rename(&temp_path, destination)
            .await
            .map_err(|_| DownloadError::AtomicOperationFailed {
                temp_path: temp_path.clone(),
                final_path: destination.to_path_buf(),
            })?;

        Ok(written)
    }

    async fn stream_to_file(
        &self,
        mut response: Response,
        url: &Url,
        temp_path: &Path,
        progress: &mut TransferProgress<'_>,
    ) -> DownloadOpResult<u64> {
        let file = File::create(temp_path).await?;
        let mut writer = BufWriter::with_capacity(files::DOWNLOAD_CHUNK_SIZE, file);

        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| self.http_handler.map_body_error(url, e))?
        {
            writer.write_all(&chunk).await?;
            progress.advance(chunk.len() as u64);
        }

        writer.flush().await?;
        writer.into_inner().sync_all().await?;
        Ok(progress.downloaded())
    }
}

/// `<destination>.tmp`, next to the destination so the rename stays on one filesystem
pub fn temp_path_for(destination: &Path) -> PathBuf {
    let mut name = destination.file_name().unwrap_or_default().to_os_string();
    name.push(files::TEMP_FILE_SUFFIX);
    destination.with_file_name(name)
}

fn check_length(url: &Url, written: u64, expected: Option<u64>) -> DownloadOpResult<u64> {
    if written == 0 {
        return Err(DownloadError::EmptyBody {
            url: url.to_string(),
        });
    }
    match expected {
        Some(expected) if expected != written => Err(DownloadError::IncompleteDownload {
            received: written,
            expected,
        }),
        _ => Ok(written),
    }
}
