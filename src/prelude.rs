//! Prelude module for GRIB Fetcher Library
//!
//! This module re-exports the most commonly used items from the library,
//! providing a convenient way to import everything needed for typical usage
//! with a single `use grib_fetcher::prelude::*;` statement.
//!
//! # Usage
//!
//! ```rust,no_run
//! use grib_fetcher::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let reporter = StdoutReporter;
//!     let pipeline = Pipeline::new(FetchConfig::default(), &reporter)?;
//!     let files = pipeline.run(ProductSet::Clouds, None).await.into_result()?;
//!     println!("{} file(s) ready", files.len());
//!     Ok(())
//! }
//! ```

// Core result types
pub use crate::errors::{AppError, Result};

// Pipeline and its configuration
pub use crate::app::{
    FetchConfig, FetchOutcome, FetchedFile, OutputLayout, Pipeline, Product, ProductSet,
};

// Progress protocol
pub use crate::app::{MemoryReporter, ProgressReporter, StdoutReporter};

// Configuration loading
pub use crate::config::AppConfig;
