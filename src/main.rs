//! Appraisal server.
//!
//! Classifies pasted text against a hot-swappable reference catalog.
//!
//! # Architecture Overview
//!
//! ```text
//!   plain / encrypted listener            management listener
//!            │                                    │
//!            ▼                                    ▼
//!   ┌─────────────────┐                  ┌─────────────────┐
//!   │ http (appraisal)│                  │ admin (status,  │
//!   └────────┬────────┘                  │ refresh, ...)   │
//!            │                           └────────┬────────┘
//!            ▼                                    │ RefreshTrigger
//!   ┌─────────────────┐   current()     ┌─────────▼────────┐
//!   │ classify        │◀────────────────│ catalog          │◀── source (file / url)
//!   │ dispatcher      │                 │ hot-swap + loop  │◀── watcher
//!   └────────┬────────┘                 └──────────────────┘
//!            ▼
//!   ┌─────────────────┐
//!   │ store           │  appraisals, lookup cache
//!   └─────────────────┘
//!
//!   lifecycle: ResourceLedger (stores → fetchers → listeners), bounded drain
//! ```

use std::path::PathBuf;

use clap::Parser;

use appraisal_server::config::{load_config, validate_config, AppConfig, ConfigError};
use appraisal_server::lifecycle::{run_service, signals};
use appraisal_server::observability::logging::init_logging;

#[derive(Parser)]
#[command(name = "appraisal-server")]
#[command(about = "Classifies pasted item lists against a hot-swappable reference catalog", long_about = None)]
struct Cli {
    /// TOML configuration file; built-in defaults when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Validate the configuration and exit.
    #[arg(long)]
    check: bool,
}

fn load(path: Option<&PathBuf>) -> Result<AppConfig, ConfigError> {
    match path {
        Some(path) => load_config(path),
        None => {
            let config = AppConfig::default();
            validate_config(&config).map_err(ConfigError::Validation)?;
            Ok(config)
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match load(cli.config.as_ref()) {
        Ok(config) => config,
        Err(ConfigError::Validation(errors)) => {
            eprintln!("Configuration is invalid:");
            for error in &errors {
                eprintln!("  - {}", error);
            }
            return Err(ConfigError::Validation(errors).into());
        }
        Err(e) => return Err(e.into()),
    };

    if cli.check {
        println!("Configuration OK ({} listener(s))", config.listeners.len());
        return Ok(());
    }

    init_logging(&config.observability);

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "appraisal-server starting");
    tracing::info!(
        db_path = %config.db_path,
        listeners = config.listeners.len(),
        grace_secs = config.shutdown.grace_secs,
        recognizers = ?config.classifier.order,
        "Configuration loaded"
    );

    run_service(config, signals::wait_for_termination()).await?;
    Ok(())
}
