//! Sitecheck CLI - Main Entry Point
//!
//! Serves the site locally, runs every browser suite against it and writes
//! the markdown report (plus a bug ticket draft when something is badly
//! broken) to the reports directory.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};

use sitecheck_e2e::config::DEFAULT_CONFIG_FILE;
use sitecheck_e2e::playwright::PlaywrightDriver;
use sitecheck_e2e::{E2eResult, Orchestrator, RunOutcome, SitecheckConfig};

mod output;

/// Sitecheck - automated checks and reporting for a static site
#[derive(Parser, Debug)]
#[command(name = "sitecheck")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file (missing file means defaults)
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE, env = "SITECHECK_CONFIG")]
    config: PathBuf,

    /// Directory holding the site to serve
    #[arg(long)]
    site_dir: Option<PathBuf>,

    /// Port for the local site server
    #[arg(long)]
    port: Option<u16>,

    /// Directory reports are written to
    #[arg(long)]
    reports_dir: Option<PathBuf>,

    /// Output format
    #[arg(long, default_value = "text")]
    format: output::OutputFormat,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    /// Load the configuration file and apply command line overrides
    fn config(&self) -> anyhow::Result<SitecheckConfig> {
        let mut config = SitecheckConfig::load_or_default(&self.config)
            .with_context(|| format!("loading {}", self.config.display()))?;

        if let Some(dir) = &self.site_dir {
            config.server.site_dir = dir.clone();
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(dir) = &self.reports_dir {
            config.reports.dir = dir.clone();
        }

        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = cli.config()?;
    info!(
        "Site: {} (port {}), reports: {}",
        config.server.site_dir.display(),
        config.server.port,
        config.reports.dir.display()
    );

    // Suites still run without Playwright; each one records the failure
    let driver = PlaywrightDriver::new(config.playwright.clone());
    if let Err(e) = driver.check_installed().await {
        warn!("{}", e);
    }

    let mut orchestrator = Orchestrator::from_config(config);
    exit_result(orchestrator.run().await, cli.format)
}

/// Report a finished run; only an aborted run is an error
///
/// A run that found problems still succeeds, whatever its overall status.
fn exit_result(result: E2eResult<RunOutcome>, format: output::OutputFormat) -> anyhow::Result<()> {
    match result {
        Ok(outcome) => {
            output::print_outcome(&outcome, format);
            Ok(())
        }
        Err(e) => {
            output::print_error(&format!("Test run aborted: {}", e));
            Err(e.into())
        }
    }
}
