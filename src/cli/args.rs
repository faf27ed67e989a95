//! Command-line argument parsing for GRIB Fetcher
//!
//! This module defines the CLI structure using clap derive macros. The tool
//! is launched by a host process, so the surface is a single flat command:
//! an optional archive timestamp plus the product set to fetch.

use std::path::PathBuf;

use clap::{Args, Parser};

use crate::app::ProductSet;

/// GRIB Fetcher - Download NOAA GRIB2 weather grids
#[derive(Parser, Debug)]
#[command(
    name = "grib_fetcher",
    version,
    about = "Download NOAA RAP and MRMS GRIB2 files for GIS processing",
    long_about = "Resolves and downloads NOAA GRIB2 grids. Without a timestamp the most recent
published files are fetched; with a YYYYMMDD-HHMM timestamp the archived files for that hour
are fetched. Progress lines for the host process are written to stdout."
)]
pub struct Cli {
    /// Global options
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Fetch options
    #[command(flatten)]
    pub fetch: FetchArgs,
}

/// Options shared by every invocation
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Very verbose logging (debug level)
    #[arg(long)]
    pub very_verbose: bool,

    /// Quiet mode - only errors are logged
    #[arg(short, long)]
    pub quiet: bool,

    /// Configuration file path
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

/// What to fetch and where to put it
#[derive(Args, Debug, Clone)]
pub struct FetchArgs {
    /// Archive timestamp (YYYYMMDD-HHMM, UTC); omit for the latest files
    #[arg(value_name = "TIMESTAMP")]
    pub timestamp: Option<String>,

    /// Product set to fetch: clouds or radar
    #[arg(short, long, default_value = "clouds", value_name = "PRODUCT")]
    pub product: ProductSet,

    /// Root directory for Zipped/ and Unzipped/ output
    #[arg(long, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    /// Draw a byte progress bar on stderr (terminal only)
    #[arg(long)]
    pub progress_bar: bool,

    /// Write a default configuration file and exit
    #[arg(long, conflicts_with = "timestamp")]
    pub init_config: bool,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Logging level requested by flags, if any
    pub fn log_level_override(&self) -> Option<tracing::Level> {
        if self.global.quiet {
            Some(tracing::Level::ERROR)
        } else if self.global.very_verbose {
            Some(tracing::Level::DEBUG)
        } else if self.global.verbose {
            Some(tracing::Level::INFO)
        } else {
            None
        }
    }

    /// Get the logging level based on global arguments
    pub fn log_level(&self) -> tracing::Level {
        self.log_level_override().unwrap_or(tracing::Level::WARN)
    }
}
