//! GRIB Fetcher Library
//!
//! A Rust library for locating and downloading NOAA GRIB2 grids (RAP model
//! output and MRMS radar mosaics) for downstream GIS processing. Live runs
//! pick the most recent published file; archive runs resolve the exact file
//! for a `YYYYMMDD-HHMM` timestamp.

pub mod app;
pub mod cli;
pub mod config;
pub mod constants;
pub mod errors;
pub mod prelude;

// Re-export commonly used types for convenience
pub use errors::{AppError, Result};
