//! Command handlers for GRIB Fetcher CLI
//!
//! This module connects parsed CLI arguments and the loaded configuration to
//! the fetch pipeline.

use std::path::PathBuf;
use std::time::Instant;

use tracing::{error, info};

use crate::app::{FetchOutcome, Pipeline, StdoutReporter};
use crate::cli::{FetchArgs, ProgressDisplay};
use crate::config::AppConfig;
use crate::errors::{ConfigError, Result};

/// Handle a fetch
///
/// CLI values override the configuration, then the pipeline runs with
/// protocol lines on stdout. Errors returned here happened before the
/// pipeline started; pipeline failures are inside the outcome.
pub async fn handle_fetch(args: &FetchArgs, mut config: AppConfig) -> Result<FetchOutcome> {
    let start_time = Instant::now();

    if let Some(data_dir) = &args.data_dir {
        config.output.data_dir = data_dir.clone();
    }
    let fetch_config = config.to_runtime_config()?;
    info!(
        "Fetching {} into {}",
        args.product,
        fetch_config.output.data_dir().display()
    );

    let reporter = ProgressDisplay::new(StdoutReporter, args.progress_bar);
    let pipeline = Pipeline::new(fetch_config, &reporter)?;
    let outcome = pipeline.run(args.product, args.timestamp.as_deref()).await;

    match &outcome {
        FetchOutcome::Completed(files) => {
            for file in files {
                info!(
                    "{}: {} ({} bytes from {})",
                    file.product,
                    file.path.display(),
                    file.bytes_downloaded,
                    file.source_url
                );
            }
            info!("Fetch completed in {:?}", start_time.elapsed());
        }
        FetchOutcome::Failed(e) => {
            error!(
                "Fetch failed after {:?}: {} (exit code {}, {})",
                start_time.elapsed(),
                e,
                e.exit_code(),
                if e.is_recoverable() {
                    "a later attempt may succeed"
                } else {
                    "retrying will not help"
                }
            );
        }
    }

    Ok(outcome)
}

/// Handle `--init-config`: write the default configuration file
pub async fn handle_init_config(path: Option<PathBuf>) -> Result<PathBuf> {
    let path = match path.or_else(AppConfig::get_default_config_path) {
        Some(path) => path,
        None => {
            return Err(ConfigError::InvalidValue {
                field: "config".to_string(),
                value: String::new(),
                reason: "Could not determine user config directory; pass --config".to_string(),
            }
            .into())
        }
    };

    AppConfig::write_default(&path).await?;
    eprintln!("Created default configuration file: {}", path.display());
    Ok(path)
}
