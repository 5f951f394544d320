//! Main application entry point (CLI binary).
//!
//! This is a thin wrapper around the `site_patrol` library that handles:
//! - Command-line argument parsing
//! - Logger initialization
//! - User-facing output formatting
//!
//! All core functionality is implemented in the library crate.

use anyhow::{Context, Result};
use clap::Parser;
use std::process;

use site_patrol::initialization::{init_crypto_provider, init_logger_with};
use site_patrol::{run_patrol, Config};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::parse();

    let log_level = config.log_level.clone();
    let log_format = config.log_format.clone();
    init_logger_with(log_level.into(), log_format).context("Failed to initialize logger")?;

    // Initialize crypto provider for TLS operations
    init_crypto_provider();

    match run_patrol(config).await {
        Ok(report) => {
            println!(
                "Checked {} URL{} in {:.1}s: {} up, {} degraded, {} down, {} escalated, {} failed",
                report.total,
                if report.total == 1 { "" } else { "s" },
                report.elapsed_seconds,
                report.up,
                report.degraded,
                report.down,
                report.escalated,
                report.failed
            );
            Ok(())
        }
        Err(e) => {
            eprintln!("site_patrol error: {e:#}");
            process::exit(1);
        }
    }
}
