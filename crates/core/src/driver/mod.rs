//! Browser driver capability
//!
//! Test code talks to a [`WebDriver`]. Concrete drivers are built by a
//! [`DriverProvider`]; the [`ProxyFactory`] hands out [`DriverProxy`]s that
//! only ask the provider for a driver when the first command arrives.

pub mod playwright;
pub mod proxy;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use annalist_common::{DriverKind, Result};

pub use playwright::{PlaywrightConfig, PlaywrightDriver, PlaywrightProvider};
pub use proxy::{DriverProxy, ProxyFactory};

/// An element located on the current page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebElement {
    pub selector: String,
    pub text: Option<String>,
}

/// Commands every browser driver supports
#[async_trait]
pub trait WebDriver: Send + Sync {
    /// Driver name recorded on test outcomes
    fn name(&self) -> &str;

    async fn navigate(&self, url: &str) -> Result<()>;

    async fn find_element(&self, selector: &str) -> Result<WebElement>;

    async fn current_url(&self) -> Result<Option<String>>;

    async fn close(&self) -> Result<()>;
}

/// Creates concrete drivers. This is where browsers actually get launched.
#[async_trait]
pub trait DriverProvider: Send + Sync {
    async fn create(&self, kind: DriverKind) -> Result<Box<dyn WebDriver>>;
}

/// Which driver a listener should bind to
#[derive(Clone)]
pub enum DriverDescriptor {
    /// Proxy a driver of this kind, created on first use
    Declared(DriverKind),
    /// Use an already configured driver as-is
    Instance(Arc<dyn WebDriver>),
}

impl std::fmt::Debug for DriverDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DriverDescriptor::Declared(kind) => f.debug_tuple("Declared").field(kind).finish(),
            DriverDescriptor::Instance(driver) => {
                f.debug_tuple("Instance").field(&driver.name()).finish()
            }
        }
    }
}

impl From<DriverKind> for DriverDescriptor {
    fn from(kind: DriverKind) -> Self {
        DriverDescriptor::Declared(kind)
    }
}
