//! GRIB Fetcher CLI application
//!
//! Command-line interface for downloading NOAA GRIB2 grids. Progress lines
//! for the host process go to stdout, logs go to stderr, and the exit code
//! tells the host which kind of failure happened.

use std::process;

use tracing::{info, Level};
use tracing_subscriber::{fmt, EnvFilter};

use grib_fetcher::cli::{handle_fetch, handle_init_config, Cli};
use grib_fetcher::config::{AppConfig, LoggingConfig};
use grib_fetcher::errors::Result;

#[tokio::main]
async fn main() {
    let code = match run().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            e.exit_code()
        }
    };
    process::exit(code);
}

/// Main application logic, returning the process exit code
async fn run() -> Result<i32> {
    // Load environment variables from .env file if it exists
    dotenv::dotenv().ok();

    let cli = Cli::parse_args();

    if cli.fetch.init_config {
        init_logging(&cli, &LoggingConfig::default());
        handle_init_config(cli.global.config.clone()).await?;
        return Ok(0);
    }

    let config = AppConfig::load(cli.global.config.clone()).await;
    let logging = config
        .as_ref()
        .map(|c| c.logging.clone())
        .unwrap_or_default();
    init_logging(&cli, &logging);
    let config = config?;

    info!("GRIB Fetcher v{} starting", env!("CARGO_PKG_VERSION"));

    let outcome = handle_fetch(&cli.fetch, config).await?;
    Ok(outcome.exit_code())
}

/// Initialize logging on stderr; stdout carries only protocol lines
fn init_logging(cli: &Cli, logging: &LoggingConfig) {
    let level = cli
        .log_level_override()
        .or_else(|| logging.level.parse::<Level>().ok())
        .unwrap_or(Level::WARN);

    let mut filter = EnvFilter::from_default_env();
    if let Ok(directive) = format!("grib_fetcher={}", level).parse() {
        filter = filter.add_directive(directive);
    }

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(logging.colored_output && atty::is(atty::Stream::Stderr))
        .with_target(false)
        .with_level(cli.global.very_verbose)
        .init();

    if cli.global.very_verbose {
        info!("Very verbose logging enabled");
    } else if cli.global.verbose {
        info!("Verbose logging enabled");
    }
}
