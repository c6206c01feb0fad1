//! Run configuration
//!
//! Loaded once from a TOML file (every field optional) and passed down to
//! the orchestrator. The sections mirror the components they configure.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{E2eError, E2eResult};
use crate::playwright::PlaywrightConfig;
use crate::server::ServerConfig;
use crate::suites::{SiteConfig, SuitesConfig};

/// Default configuration file name, looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "sitecheck.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SitecheckConfig {
    pub server: ServerConfig,
    pub playwright: PlaywrightConfig,
    pub site: SiteConfig,
    pub suites: SuitesConfig,
    pub reports: ReportsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportsConfig {
    /// Directory rendered reports are written to
    pub dir: PathBuf,
}

impl Default for ReportsConfig {
    fn default() -> Self {
        Self {
            dir: sitecheck_common::default_reports_dir(),
        }
    }
}

impl SitecheckConfig {
    /// Parse a configuration document
    pub fn from_toml(text: &str) -> E2eResult<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file
    pub fn load(path: &Path) -> E2eResult<Self> {
        info!("Loading configuration from {}", path.display());
        let text = std::fs::read_to_string(path)?;
        Self::from_toml(&text)
    }

    /// Load `path` if it exists, otherwise fall back to defaults
    pub fn load_or_default(path: &Path) -> E2eResult<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            debug!("No configuration at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    pub fn validate(&self) -> E2eResult<()> {
        if self.playwright.script_timeout_secs == 0 {
            return Err(E2eError::Config("playwright.script_timeout_secs must be > 0".into()));
        }
        if self.server.startup_timeout_secs == 0 {
            return Err(E2eError::Config("server.startup_timeout_secs must be > 0".into()));
        }
        if self.suites.browsers.is_empty() {
            return Err(E2eError::Config("suites.browsers must list at least one browser".into()));
        }
        Ok(())
    }
}
