//! Command-line interface components
//!
//! This module contains CLI-specific code for the GRIB Fetcher application:
//! argument parsing, the optional terminal progress bar, and command handlers.

pub mod args;
pub mod commands;
pub mod progress;

pub use args::{Cli, FetchArgs, GlobalArgs};
pub use commands::{handle_fetch, handle_init_config};
pub use progress::ProgressDisplay;
