//! Suite configuration
//!
//! Layered as defaults, then the YAML file, then environment variables; the
//! binary applies command-line flags last.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::driver::protocol::{Browser, Viewport};
use crate::driver::DriverConfig;
use crate::error::{E2eError, E2eResult};
use crate::server::WebServerConfig;

/// Runner configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Origin of the application under test
    pub base_url: String,

    /// Budget for one test attempt
    pub test_timeout_ms: u64,

    /// Budget for auto-waiting assertions
    pub expect_timeout_ms: u64,

    /// Playwright action timeout
    pub action_timeout_ms: u64,

    /// Playwright navigation timeout
    pub navigation_timeout_ms: u64,

    /// Extra attempts after a failure
    pub retries: u32,

    /// Tests run concurrently
    pub workers: usize,

    /// Reports, screenshots and per-test artifacts
    pub output_dir: PathBuf,

    /// Budget for the suite-wide readiness gate
    pub ready_timeout_ms: u64,

    pub browser: Browser,
    pub headless: bool,
    pub viewport: Viewport,

    /// Fail the accessibility scenario on critical violations
    pub a11y_fail_on_critical: bool,

    /// Node binary running the Playwright bridge
    pub node: PathBuf,

    /// Directory whose node_modules holds playwright and axe-core
    pub node_root: PathBuf,

    pub web_server: WebServerConfig,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            test_timeout_ms: 30_000,
            expect_timeout_ms: 5_000,
            action_timeout_ms: 10_000,
            navigation_timeout_ms: 30_000,
            retries: 0,
            workers: default_workers(),
            output_dir: PathBuf::from("test-results"),
            ready_timeout_ms: 120_000,
            browser: Browser::Chromium,
            headless: true,
            viewport: Viewport::default(),
            a11y_fail_on_critical: false,
            node: PathBuf::from("node"),
            node_root: PathBuf::from("."),
            web_server: WebServerConfig::default(),
        }
    }
}

/// Half the available cores, at least one
fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| (n.get() / 2).max(1))
        .unwrap_or(1)
}

impl RunnerConfig {
    /// Load from a YAML file; a missing or empty file yields the defaults
    pub fn load(path: &Path) -> E2eResult<Self> {
        if !path.exists() {
            debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(&content)?)
    }

    /// Overlay environment variables read through `lookup`
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let set = |key: &str| lookup(key).filter(|v| !v.is_empty());

        if let Some(url) = set("E2E_BASE_URL") {
            self.base_url = url;
        }
        if set("CI").is_some() {
            self.retries = 2;
            self.workers = 2;
        }
        if let Some(flag) = set("PW_A11Y_FAIL_ON_CRITICAL") {
            self.a11y_fail_on_critical = flag == "true";
        }
        if let Some(node) = set("E2E_NODE") {
            self.node = PathBuf::from(node);
        }
        if let Some(root) = set("E2E_NODE_ROOT") {
            self.node_root = PathBuf::from(root);
        }
    }

    /// [`RunnerConfig::load`] followed by the process environment
    pub fn from_env(path: &Path) -> E2eResult<Self> {
        let mut config = Self::load(path)?;
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn validate(&self) -> E2eResult<()> {
        reqwest::Url::parse(&self.base_url)
            .map_err(|e| E2eError::Config(format!("base_url {:?}: {}", self.base_url, e)))?;
        if self.workers == 0 {
            return Err(E2eError::Config("workers must be at least 1".into()));
        }
        if self.test_timeout_ms == 0 || self.expect_timeout_ms == 0 {
            return Err(E2eError::Config("timeouts must be positive".into()));
        }
        Ok(())
    }

    pub fn test_timeout(&self) -> Duration {
        Duration::from_millis(self.test_timeout_ms)
    }

    pub fn ready_timeout(&self) -> Duration {
        Duration::from_millis(self.ready_timeout_ms)
    }

    /// Where per-test artifacts go
    pub fn artifacts_dir(&self) -> PathBuf {
        self.output_dir.join("artifacts")
    }

    pub fn driver_config(&self) -> DriverConfig {
        DriverConfig {
            base_url: self.base_url.clone(),
            node: self.node.clone(),
            node_root: self.node_root.clone(),
            browser: self.browser,
            headless: self.headless,
            viewport: self.viewport,
            action_timeout: Duration::from_millis(self.action_timeout_ms),
            navigation_timeout: Duration::from_millis(self.navigation_timeout_ms),
            expect_timeout: Duration::from_millis(self.expect_timeout_ms),
        }
    }
}
