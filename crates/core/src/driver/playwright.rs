//! Playwright browser automation
//!
//! Each command runs a short Node script against a headless browser, so the
//! driver itself only remembers which page is loaded.

use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Deserialize;
use tokio::process::Command;
use tracing::debug;

use annalist_common::{DriverKind, Error, Result};

use super::{DriverProvider, WebDriver, WebElement};

/// Configuration for Playwright
#[derive(Debug, Clone)]
pub struct PlaywrightConfig {
    pub viewport_width: u32,
    pub viewport_height: u32,
    pub headless: bool,
    pub timeout: Duration,
}

impl Default for PlaywrightConfig {
    fn default() -> Self {
        Self {
            viewport_width: 1280,
            viewport_height: 720,
            headless: true,
            timeout: Duration::from_secs(5),
        }
    }
}

/// Launches Playwright-backed drivers
#[derive(Debug, Clone, Default)]
pub struct PlaywrightProvider {
    config: PlaywrightConfig,
}

impl PlaywrightProvider {
    pub fn new(config: PlaywrightConfig) -> Self {
        Self { config }
    }

    /// Check if Playwright is installed
    async fn check_playwright_installed(kind: DriverKind) -> Result<()> {
        let status = Command::new("npx")
            .args(["playwright", "--version"])
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .status()
            .await;

        match status {
            Ok(status) if status.success() => Ok(()),
            _ => Err(Error::DriverProvisioning {
                driver: kind.to_string(),
                reason: "Playwright not found. Install with: npx playwright install".to_string(),
            }),
        }
    }
}

#[async_trait]
impl DriverProvider for PlaywrightProvider {
    async fn create(&self, kind: DriverKind) -> Result<Box<dyn WebDriver>> {
        Self::check_playwright_installed(kind).await?;
        Ok(Box::new(PlaywrightDriver::new(kind, self.config.clone())))
    }
}

/// Playwright browser handle
pub struct PlaywrightDriver {
    kind: DriverKind,
    config: PlaywrightConfig,
    current_url: Mutex<Option<String>>,
}

#[derive(Debug, Deserialize)]
struct ScriptReport {
    success: bool,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

impl PlaywrightDriver {
    pub fn new(kind: DriverKind, config: PlaywrightConfig) -> Self {
        Self {
            kind,
            config,
            current_url: Mutex::new(None),
        }
    }

    fn browser_name(&self) -> &'static str {
        match self.kind {
            DriverKind::Firefox => "firefox",
            DriverKind::Chrome => "chromium",
            DriverKind::Webkit => "webkit",
        }
    }

    /// Build a script that opens `url` and runs `body` against `page`.
    /// The body sets `report` to whatever should be printed on success.
    pub fn build_script(&self, url: &str, body: &str) -> String {
        format!(
            r#"
const {{ chromium, firefox, webkit }} = require('playwright');

(async () => {{
  const browser = await {browser}.launch({{ headless: {headless} }});
  const context = await browser.newContext({{
    viewport: {{ width: {width}, height: {height} }}
  }});
  const page = await context.newPage();
  page.setDefaultTimeout({timeout});
  let report = {{ success: true }};

  try {{
    await page.goto({url});
{body}
    console.log(JSON.stringify(report));
  }} catch (error) {{
    console.log(JSON.stringify({{ success: false, error: error.message }}));
    process.exitCode = 1;
  }} finally {{
    await browser.close();
  }}
}})();
"#,
            browser = self.browser_name(),
            headless = self.config.headless,
            width = self.config.viewport_width,
            height = self.config.viewport_height,
            timeout = self.config.timeout.as_millis(),
            url = js_string(url),
            body = body,
        )
    }

    /// Execute the full script via node and return its report
    async fn run_script(&self, script: &str) -> Result<ScriptReport> {
        let temp_dir = tempfile::tempdir()?;
        let script_path = temp_dir.path().join("step.js");
        std::fs::write(&script_path, script)?;

        debug!("Running Playwright script: {}", script_path.display());

        let output = Command::new("node")
            .arg(&script_path)
            .current_dir(temp_dir.path())
            .output()
            .await?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let report = stdout
            .lines()
            .rev()
            .find_map(|line| serde_json::from_str::<ScriptReport>(line).ok());

        match report {
            Some(report) if report.success => Ok(report),
            Some(report) => Err(Error::Driver(
                report.error.unwrap_or_else(|| "unknown error".to_string()),
            )),
            None => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                Err(Error::Driver(format!(
                    "Script failed:\nstdout: {}\nstderr: {}",
                    stdout, stderr
                )))
            }
        }
    }

    fn loaded_url(&self) -> Result<String> {
        self.current_url
            .lock()
            .clone()
            .ok_or_else(|| Error::Driver("No page loaded; navigate first".to_string()))
    }
}

#[async_trait]
impl WebDriver for PlaywrightDriver {
    fn name(&self) -> &str {
        self.kind.as_str()
    }

    async fn navigate(&self, url: &str) -> Result<()> {
        let script = self.build_script(url, "");
        self.run_script(&script).await?;
        *self.current_url.lock() = Some(url.to_string());
        Ok(())
    }

    async fn find_element(&self, selector: &str) -> Result<WebElement> {
        let url = self.loaded_url()?;
        let body = format!(
            r#"    const element = page.locator({selector}).first();
    await element.waitFor({{ state: 'attached' }});
    report.text = await element.textContent();"#,
            selector = js_string(selector),
        );
        let report = self.run_script(&self.build_script(&url, &body)).await?;

        Ok(WebElement {
            selector: selector.to_string(),
            text: report.text,
        })
    }

    async fn current_url(&self) -> Result<Option<String>> {
        Ok(self.current_url.lock().clone())
    }

    async fn close(&self) -> Result<()> {
        // Browsers are closed at the end of every script.
        self.current_url.lock().take();
        Ok(())
    }
}

/// Quote a value as a JavaScript string literal
fn js_string(value: &str) -> String {
    serde_json::Value::String(value.to_string()).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_uses_browser_and_viewport() {
        let driver = PlaywrightDriver::new(
            DriverKind::Chrome,
            PlaywrightConfig {
                viewport_width: 1920,
                viewport_height: 1080,
                ..Default::default()
            },
        );
        let script = driver.build_script("http://localhost:8080/login", "");

        assert!(script.contains("await chromium.launch({ headless: true })"));
        assert!(script.contains("viewport: { width: 1920, height: 1080 }"));
        assert!(script.contains(r#"await page.goto("http://localhost:8080/login");"#));
        assert!(script.contains("page.setDefaultTimeout(5000);"));
    }

    #[test]
    fn test_js_string_escapes_quotes() {
        assert_eq!(js_string(r#"[data-testid="login"]"#), r#""[data-testid=\"login\"]""#);
        assert_eq!(js_string("it's"), r#""it's""#);
    }

    #[tokio::test]
    async fn test_find_element_requires_a_loaded_page() {
        let driver = PlaywrightDriver::new(DriverKind::Firefox, PlaywrightConfig::default());
        let err = driver.find_element("#search").await.unwrap_err();
        assert!(matches!(err, Error::Driver(_)));
        assert_eq!(driver.current_url().await.unwrap(), None);
    }
}
