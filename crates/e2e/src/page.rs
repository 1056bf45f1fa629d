//! The browser tab a test drives

use std::path::Path;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::driver::protocol::{Command, Fulfillment, LoadState, Viewport};
use crate::driver::{Driver, DriverConfig};
use crate::error::{E2eError, E2eResult};
use crate::locator::Locator;
use crate::selector::{Role, RoleOptions, Segment, TextMatch};

/// Main-frame response of a navigation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    pub status: u16,
    pub url: String,
}

impl Response {
    pub fn ok(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// One isolated browser session with a single page
#[derive(Clone)]
pub struct Page {
    driver: Driver,
    base_url: String,
}

impl Page {
    /// Launch a fresh browser and page
    pub async fn launch(config: &DriverConfig) -> E2eResult<Self> {
        let driver = Driver::launch(config).await?;
        Ok(Self::new(driver, &config.base_url))
    }

    pub fn new(driver: Driver, base_url: &str) -> Self {
        Self {
            driver,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn expect_timeout(&self) -> Duration {
        self.driver.expect_timeout()
    }

    /// Absolute URL for an application path, e.g. `/vets.html`
    pub fn url_for(&self, path: &str) -> E2eResult<reqwest::Url> {
        reqwest::Url::parse(&self.base_url)
            .and_then(|base| base.join(path))
            .map_err(|e| E2eError::Config(format!("bad URL {}{}: {}", self.base_url, path, e)))
    }

    // ---- navigation ----

    /// Navigate and wait for the `load` event
    pub async fn goto(&self, url: &str) -> E2eResult<Option<Response>> {
        self.goto_until(url, LoadState::Load).await
    }

    pub async fn goto_until(&self, url: &str, wait_until: LoadState) -> E2eResult<Option<Response>> {
        debug!("goto {}", url);
        self.driver
            .request(Command::Goto { url: url.to_string(), wait_until })
            .await
    }

    pub async fn url(&self) -> E2eResult<String> {
        self.driver.request(Command::Url).await
    }

    /// Path component of the current URL
    pub async fn pathname(&self) -> E2eResult<String> {
        let url = self.url().await?;
        let parsed = reqwest::Url::parse(&url)
            .map_err(|e| E2eError::Protocol(format!("page reported bad URL {}: {}", url, e)))?;
        Ok(parsed.path().to_string())
    }

    pub async fn wait_for_load_state(&self, state: LoadState) -> E2eResult<()> {
        let _: serde_json::Value = self
            .driver
            .request(Command::WaitForLoadState { state })
            .await?;
        Ok(())
    }

    pub async fn set_viewport_size(&self, viewport: Viewport) -> E2eResult<()> {
        let _: serde_json::Value = self
            .driver
            .request(Command::SetViewportSize { width: viewport.width, height: viewport.height })
            .await?;
        Ok(())
    }

    // ---- locators ----

    pub fn locator(&self, selector: &str) -> Locator {
        Locator::new(self.driver.clone(), vec![Segment::Css { selector: selector.to_string() }])
    }

    pub fn get_by_role(&self, role: Role, options: RoleOptions) -> Locator {
        Locator::new(
            self.driver.clone(),
            vec![Segment::Role { role, name: options.name, level: options.level }],
        )
    }

    pub fn get_by_label(&self, text: impl Into<TextMatch>) -> Locator {
        Locator::new(self.driver.clone(), vec![Segment::Label { text: text.into() }])
    }

    pub fn get_by_text(&self, text: impl Into<TextMatch>) -> Locator {
        Locator::new(self.driver.clone(), vec![Segment::Text { text: text.into() }])
    }

    pub fn get_by_test_id(&self, id: &str) -> Locator {
        Locator::new(self.driver.clone(), vec![Segment::TestId { id: id.to_string() }])
    }

    // ---- page-level reads ----

    /// Evaluate a JavaScript expression in the page
    pub async fn evaluate<T: DeserializeOwned>(&self, expression: &str) -> E2eResult<T> {
        self.driver
            .request(Command::Evaluate { expression: expression.to_string(), locator: None })
            .await
    }

    pub async fn session_storage_item(&self, key: &str) -> E2eResult<Option<String>> {
        let key = serde_json::to_string(key)?;
        self.evaluate(&format!("window.sessionStorage.getItem({})", key)).await
    }

    /// Full-page screenshot; parent directories are created
    pub async fn screenshot(&self, path: &Path, full_page: bool) -> E2eResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let _: serde_json::Value = self
            .driver
            .request(Command::Screenshot { path: path.to_path_buf(), full_page, locator: None })
            .await?;
        Ok(())
    }

    // ---- interception ----

    /// Answer every request matching `pattern` with `fulfillment`
    pub async fn route(&self, pattern: &str, fulfillment: Fulfillment) -> E2eResult<()> {
        self.install_route(pattern, fulfillment, false).await.map(|_| ())
    }

    /// Like [`Page::route`], but matching requests stay pending until the
    /// returned gate is released
    pub async fn route_gated(&self, pattern: &str, fulfillment: Fulfillment) -> E2eResult<RouteGate> {
        self.install_route(pattern, fulfillment, true).await
    }

    async fn install_route(
        &self,
        pattern: &str,
        fulfillment: Fulfillment,
        gated: bool,
    ) -> E2eResult<RouteGate> {
        let id = self.driver.next_id();
        let _: serde_json::Value = self
            .driver
            .request(Command::Route { id, pattern: pattern.to_string(), fulfillment, gated })
            .await?;
        Ok(RouteGate { driver: self.driver.clone(), id })
    }

    pub async fn unroute(&self, pattern: &str) -> E2eResult<()> {
        let _: serde_json::Value = self
            .driver
            .request(Command::Unroute { pattern: pattern.to_string() })
            .await?;
        Ok(())
    }

    pub(crate) fn driver(&self) -> &Driver {
        &self.driver
    }

    /// Close the browser session
    pub async fn close(&self) -> E2eResult<()> {
        self.driver.close().await
    }
}

/// Holds back the fulfillment of a gated route
pub struct RouteGate {
    driver: Driver,
    id: u64,
}

impl RouteGate {
    /// Let held and future matching requests complete
    pub async fn release(self) -> E2eResult<()> {
        let _: serde_json::Value = self
            .driver
            .request(Command::ReleaseRoute { id: self.id })
            .await?;
        Ok(())
    }
}
