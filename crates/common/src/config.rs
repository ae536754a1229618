//! Report and driver configuration

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::environment::EnvironmentVariables;
use crate::error::Result;
use crate::types::DriverKind;

pub const SOURCE_DIRECTORY_PROPERTY: &str = "annalist.source.directory";
pub const OUTPUT_DIRECTORY_PROPERTY: &str = "annalist.output.directory";
pub const DRIVER_PROPERTY: &str = "webdriver.driver";
pub const BASE_URL_PROPERTY: &str = "webdriver.base.url";

/// Annalist configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnalistConfig {
    /// Directory outcome artifacts are read from
    pub source_dir: PathBuf,

    /// Directory aggregate reports are written to
    pub output_dir: PathBuf,

    /// Driver used when a test does not supply its own
    pub driver: DriverKind,

    /// Page opened by `Pages::start`
    pub base_url: Option<String>,
}

impl Default for AnnalistConfig {
    fn default() -> Self {
        Self {
            source_dir: crate::default_report_path(),
            output_dir: crate::default_report_path(),
            driver: DriverKind::default(),
            base_url: None,
        }
    }
}

impl AnnalistConfig {
    /// Load configuration from file
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Self = toml::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Defaults overridden by whatever properties are set
    pub fn from_environment(env: &dyn EnvironmentVariables) -> Result<Self> {
        Self::default().apply_environment(env)
    }

    pub fn apply_environment(mut self, env: &dyn EnvironmentVariables) -> Result<Self> {
        if let Some(dir) = env.property(SOURCE_DIRECTORY_PROPERTY) {
            self.source_dir = PathBuf::from(dir);
        }
        if let Some(dir) = env.property(OUTPUT_DIRECTORY_PROPERTY) {
            self.output_dir = PathBuf::from(dir);
        }
        if let Some(driver) = env.property(DRIVER_PROPERTY) {
            self.driver = driver.parse()?;
        }
        if let Some(url) = env.property(BASE_URL_PROPERTY) {
            self.base_url = Some(url);
        }
        Ok(self)
    }
}
