//! Page objects bound to an existing driver

use std::sync::Arc;

use tracing::debug;

use annalist_common::Result;

use crate::driver::WebDriver;

/// A collection of page objects sharing one driver.
///
/// A listener given a `Pages` uses its driver directly instead of asking
/// the proxy factory for one.
#[derive(Clone)]
pub struct Pages {
    driver: Arc<dyn WebDriver>,
    default_base_url: Option<String>,
}

impl Pages {
    pub fn new(driver: Arc<dyn WebDriver>) -> Self {
        Self {
            driver,
            default_base_url: None,
        }
    }

    pub fn with_default_base_url(mut self, url: impl Into<String>) -> Self {
        self.default_base_url = Some(url.into());
        self
    }

    pub fn driver(&self) -> Arc<dyn WebDriver> {
        Arc::clone(&self.driver)
    }

    pub fn default_base_url(&self) -> Option<&str> {
        self.default_base_url.as_deref()
    }

    /// Open the default page, if one is configured
    pub async fn start(&self) -> Result<()> {
        if let Some(url) = &self.default_base_url {
            debug!("Opening start page {}", url);
            self.driver.navigate(url).await?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for Pages {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pages")
            .field("driver", &self.driver.name())
            .field("default_base_url", &self.default_base_url)
            .finish()
    }
}
