//! Lazily created driver proxies

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::OnceCell;
use tracing::{debug, info};

use annalist_common::{DriverKind, Error, Result};

use super::{DriverProvider, PlaywrightProvider, WebDriver, WebElement};

/// Stand-in for a driver that is not created until a command needs it.
///
/// The inner cell is either empty (nothing launched) or holds the driver
/// every later call is forwarded to. A failed creation leaves the cell empty,
/// so the error reaches the caller of that command and the next command
/// tries again.
pub struct DriverProxy {
    kind: DriverKind,
    provider: Arc<dyn DriverProvider>,
    driver: OnceCell<Box<dyn WebDriver>>,
}

impl DriverProxy {
    pub fn new(kind: DriverKind, provider: Arc<dyn DriverProvider>) -> Self {
        Self {
            kind,
            provider,
            driver: OnceCell::new(),
        }
    }

    pub fn kind(&self) -> DriverKind {
        self.kind
    }

    /// Whether the underlying driver has been created
    pub fn is_instantiated(&self) -> bool {
        self.driver.initialized()
    }

    async fn driver(&self) -> Result<&dyn WebDriver> {
        let driver = self
            .driver
            .get_or_try_init(|| async {
                info!("Starting {} driver", self.kind);
                self.provider.create(self.kind).await.map_err(|e| match e {
                    Error::DriverProvisioning { .. } => e,
                    other => Error::DriverProvisioning {
                        driver: self.kind.to_string(),
                        reason: other.to_string(),
                    },
                })
            })
            .await?;
        Ok(driver.as_ref())
    }
}

#[async_trait]
impl WebDriver for DriverProxy {
    fn name(&self) -> &str {
        self.kind.as_str()
    }

    async fn navigate(&self, url: &str) -> Result<()> {
        self.driver().await?.navigate(url).await
    }

    async fn find_element(&self, selector: &str) -> Result<WebElement> {
        self.driver().await?.find_element(selector).await
    }

    async fn current_url(&self) -> Result<Option<String>> {
        self.driver().await?.current_url().await
    }

    async fn close(&self) -> Result<()> {
        // Nothing to shut down if no command was ever sent.
        match self.driver.get() {
            Some(driver) => driver.close().await,
            None => Ok(()),
        }
    }
}

/// Issues independent [`DriverProxy`]s backed by one provider
pub struct ProxyFactory {
    provider: Arc<dyn DriverProvider>,
    last_requested: Mutex<Option<DriverKind>>,
    requested: AtomicUsize,
}

impl ProxyFactory {
    pub fn new(provider: Arc<dyn DriverProvider>) -> Self {
        Self {
            provider,
            last_requested: Mutex::new(None),
            requested: AtomicUsize::new(0),
        }
    }

    /// Returns a proxy for `kind` without launching anything
    pub fn proxy_for(&self, kind: DriverKind) -> Arc<DriverProxy> {
        debug!("Creating {} driver proxy", kind);
        *self.last_requested.lock() = Some(kind);
        self.requested.fetch_add(1, Ordering::Relaxed);
        Arc::new(DriverProxy::new(kind, Arc::clone(&self.provider)))
    }

    pub fn last_requested(&self) -> Option<DriverKind> {
        *self.last_requested.lock()
    }

    pub fn requested_count(&self) -> usize {
        self.requested.load(Ordering::Relaxed)
    }
}

impl Default for ProxyFactory {
    fn default() -> Self {
        Self::new(Arc::new(PlaywrightProvider::default()))
    }
}
