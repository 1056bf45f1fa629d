//! Main test runner that orchestrates the app server, browsers and scenarios

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::FutureExt;
use parking_lot::Mutex;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::config::RunnerConfig;
use crate::driver::protocol::{LoadState, Viewport};
use crate::error::{E2eError, E2eResult};
use crate::page::Page;
use crate::readiness::wait_for_http_ok;
use crate::server::WebServer;

pub type ScenarioFn = fn(TestContext) -> BoxFuture<'static, E2eResult<()>>;

/// One registered test
#[derive(Clone)]
pub struct Scenario {
    pub suite: &'static str,
    pub name: &'static str,
    pub tags: &'static [&'static str],
    pub run: ScenarioFn,
}

impl Scenario {
    /// `Suite > name`, as shown in logs and reports
    pub fn title(&self) -> String {
        format!("{} > {}", self.suite, self.name)
    }
}

impl std::fmt::Debug for Scenario {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scenario")
            .field("suite", &self.suite)
            .field("name", &self.name)
            .field("tags", &self.tags)
            .finish()
    }
}

/// Which scenarios to run
#[derive(Debug, Clone, Default)]
pub struct Filter {
    grep: Option<Regex>,
    tag: Option<String>,
}

impl Filter {
    /// `grep` is a case-insensitive pattern over the title
    pub fn new(grep: Option<&str>, tag: Option<&str>) -> E2eResult<Self> {
        let grep = grep
            .map(|g| RegexBuilder::new(g).case_insensitive(true).build())
            .transpose()?;
        Ok(Self { grep, tag: tag.map(str::to_string) })
    }

    pub fn matches(&self, scenario: &Scenario) -> bool {
        let grep_ok = self
            .grep
            .as_ref()
            .map(|re| re.is_match(&scenario.title()))
            .unwrap_or(true);
        let tag_ok = self
            .tag
            .as_deref()
            .map(|tag| scenario.tags.contains(&tag))
            .unwrap_or(true);
        grep_ok && tag_ok
    }

    pub fn select(&self, scenarios: Vec<Scenario>) -> Vec<Scenario> {
        scenarios.into_iter().filter(|s| self.matches(s)).collect()
    }
}

/// Note attached to a test result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation {
    #[serde(rename = "type")]
    pub kind: String,
    pub description: String,
}

/// What a scenario gets to work with
#[derive(Clone)]
pub struct TestContext {
    pub page: Page,
    pub config: Arc<RunnerConfig>,
    /// Zero-based; greater than zero on retries
    pub attempt: u32,
    output_dir: PathBuf,
    annotations: Arc<Mutex<Vec<Annotation>>>,
}

impl TestContext {
    pub fn new(page: Page, config: Arc<RunnerConfig>, output_dir: PathBuf, attempt: u32) -> Self {
        Self {
            page,
            config,
            attempt,
            output_dir,
            annotations: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Path for an artifact of this attempt
    pub fn output_path(&self, name: &str) -> PathBuf {
        self.output_dir.join(name)
    }

    pub fn annotate(&self, kind: &str, description: impl Into<String>) {
        self.annotations.lock().push(Annotation {
            kind: kind.to_string(),
            description: description.into(),
        });
    }

    pub fn annotations(&self) -> Vec<Annotation> {
        self.annotations.lock().clone()
    }
}

/// Opens a fresh, isolated browser session per test attempt
#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    async fn launch(&self, config: &RunnerConfig) -> E2eResult<Page>;
}

/// Real browsers through the Playwright bridge
pub struct PlaywrightLauncher;

#[async_trait]
impl BrowserLauncher for PlaywrightLauncher {
    async fn launch(&self, config: &RunnerConfig) -> E2eResult<Page> {
        Page::launch(&config.driver_config()).await
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestStatus {
    Passed,
    /// Failed at least once, then passed on a retry
    Flaky,
    Failed,
}

/// Result of running a single test
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestResult {
    pub suite: String,
    pub name: String,
    pub tags: Vec<String>,
    pub status: TestStatus,
    pub attempts: u32,
    pub duration_ms: u64,
    pub error: Option<String>,
    pub annotations: Vec<Annotation>,
}

impl TestResult {
    pub fn title(&self) -> String {
        format!("{} > {}", self.suite, self.name)
    }
}

/// Result of running all tests
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteResult {
    pub total: usize,
    pub passed: usize,
    pub flaky: usize,
    pub failed: usize,
    pub duration_ms: u64,
    pub results: Vec<TestResult>,
}

impl SuiteResult {
    pub fn from_results(results: Vec<TestResult>, duration_ms: u64) -> Self {
        let count = |status| results.iter().filter(|r| r.status == status).count();
        Self {
            total: results.len(),
            passed: count(TestStatus::Passed),
            flaky: count(TestStatus::Flaky),
            failed: count(TestStatus::Failed),
            duration_ms,
            results,
        }
    }

    pub fn success(&self) -> bool {
        self.failed == 0
    }
}

/// Main E2E test runner
pub struct TestRunner {
    config: Arc<RunnerConfig>,
    launcher: Arc<dyn BrowserLauncher>,
    server: Option<WebServer>,
}

impl TestRunner {
    pub fn new(config: RunnerConfig) -> Self {
        Self::with_launcher(config, Arc::new(PlaywrightLauncher))
    }

    pub fn with_launcher(config: RunnerConfig, launcher: Arc<dyn BrowserLauncher>) -> Self {
        Self {
            config: Arc::new(config),
            launcher,
            server: None,
        }
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Once per suite: get the app running, wait until it answers, and
    /// capture the home page as a smoke artifact
    pub async fn global_setup(&mut self) -> E2eResult<()> {
        let url = self.config.base_url.clone();
        std::fs::create_dir_all(&self.config.output_dir)?;

        if self.server.is_none() {
            self.server = WebServer::ensure(&self.config.web_server, &url).await?;
        }
        wait_for_http_ok(&url, self.config.ready_timeout()).await?;

        let page = self.launcher.launch(&self.config).await?;
        let shot = self.config.output_dir.join("home-page.png");
        let captured = async {
            page.goto_until(&url, LoadState::DomContentLoaded).await?;
            page.set_viewport_size(Viewport { width: 1280, height: 720 }).await?;
            page.screenshot(&shot, true).await
        }
        .await;
        page.close().await?;
        captured?;

        info!("Home page captured at {}", shot.display());
        Ok(())
    }

    /// Stop a web server this runner started
    pub async fn stop_server(&mut self) -> E2eResult<()> {
        if let Some(mut server) = self.server.take() {
            server.stop().await?;
        }
        Ok(())
    }

    /// Run `scenarios` on up to `workers` concurrent browser sessions
    pub async fn run(&self, scenarios: Vec<Scenario>) -> SuiteResult {
        let start = Instant::now();
        let workers = self.config.workers.max(1);
        info!("Running {} test(s) using {} worker(s)", scenarios.len(), workers);

        let semaphore = Arc::new(Semaphore::new(workers));
        let mut tasks = JoinSet::new();
        let catalogue = scenarios.clone();

        for (index, scenario) in scenarios.into_iter().enumerate() {
            let semaphore = semaphore.clone();
            let config = self.config.clone();
            let launcher = self.launcher.clone();
            tasks.spawn(async move {
                let _permit = semaphore.acquire_owned().await;
                let result = run_with_retries(&scenario, &config, launcher.as_ref()).await;
                (index, result)
            });
        }

        let mut results = Vec::new();
        let mut lost = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(pair) => results.push(pair),
                Err(e) => {
                    error!("Test task panicked: {}", e);
                    lost.push(e.to_string());
                }
            }
        }

        // A task that died outside its attempt still gets a failed result
        if !lost.is_empty() {
            let reason = lost.join("; ");
            for (index, scenario) in catalogue.iter().enumerate() {
                if !results.iter().any(|(i, _)| *i == index) {
                    error!("✗ {} - test panicked: {}", scenario.title(), reason);
                    results.push((index, panicked_result(scenario, &reason)));
                }
            }
        }
        results.sort_by_key(|(index, _)| *index);

        let suite = SuiteResult::from_results(
            results.into_iter().map(|(_, r)| r).collect(),
            start.elapsed().as_millis() as u64,
        );

        info!("");
        info!(
            "Test Results: {} passed, {} flaky, {} failed ({} ms)",
            suite.passed, suite.flaky, suite.failed, suite.duration_ms
        );
        suite
    }
}

async fn run_with_retries(
    scenario: &Scenario,
    config: &Arc<RunnerConfig>,
    launcher: &dyn BrowserLauncher,
) -> TestResult {
    let start = Instant::now();
    let title = scenario.title();
    let mut failures = Vec::new();
    let mut annotations = Vec::new();
    let mut status = TestStatus::Failed;
    let mut attempts = 0;

    for attempt in 0..=config.retries {
        attempts += 1;
        if attempt > 0 {
            warn!("Retrying {} (retry #{})", title, attempt);
        }
        let dir = attempt_dir(&config.artifacts_dir(), &title, attempt);
        let (outcome, notes) = run_attempt(scenario, config, launcher, dir, attempt).await;
        annotations = notes;

        match outcome {
            Ok(()) => {
                status = if attempt == 0 { TestStatus::Passed } else { TestStatus::Flaky };
                break;
            }
            Err(e) => failures.push(e.to_string()),
        }
    }

    let duration_ms = start.elapsed().as_millis() as u64;
    match status {
        TestStatus::Passed => info!("✓ {} ({} ms)", title, duration_ms),
        TestStatus::Flaky => warn!("~ {} passed on attempt {} ({} ms)", title, attempts, duration_ms),
        TestStatus::Failed => error!(
            "✗ {} - {}",
            title,
            failures.last().map(String::as_str).unwrap_or("unknown error")
        ),
    }

    TestResult {
        suite: scenario.suite.to_string(),
        name: scenario.name.to_string(),
        tags: scenario.tags.iter().map(|t| t.to_string()).collect(),
        status,
        attempts,
        duration_ms,
        error: if status == TestStatus::Passed { None } else { failures.last().cloned() },
        annotations,
    }
}

async fn run_attempt(
    scenario: &Scenario,
    config: &Arc<RunnerConfig>,
    launcher: &dyn BrowserLauncher,
    output_dir: PathBuf,
    attempt: u32,
) -> (E2eResult<()>, Vec<Annotation>) {
    debug!("Running test: {} (attempt {})", scenario.title(), attempt + 1);

    let page = match launcher.launch(config).await {
        Ok(page) => page,
        Err(e) => return (Err(e), Vec::new()),
    };
    let ctx = TestContext::new(page.clone(), config.clone(), output_dir, attempt);

    let run = scenario.run;
    let run_ctx = ctx.clone();
    let guarded = AssertUnwindSafe(async move { run(run_ctx).await }).catch_unwind();

    let outcome = match tokio::time::timeout(config.test_timeout(), guarded).await {
        Ok(Ok(result)) => result,
        Ok(Err(payload)) => Err(E2eError::Panicked(panic_message(payload.as_ref()))),
        Err(_) => Err(E2eError::Timeout(format!(
            "test exceeded {} ms",
            config.test_timeout_ms
        ))),
    };

    if outcome.is_err() && !page.driver().is_closed() {
        let shot = ctx.output_path("test-failed.png");
        if let Err(e) = page.screenshot(&shot, true).await {
            debug!("No failure screenshot for {}: {}", scenario.title(), e);
        }
    }
    if let Err(e) = page.close().await {
        warn!("Closing browser for {} failed: {}", scenario.title(), e);
    }

    (outcome, ctx.annotations())
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

fn panicked_result(scenario: &Scenario, reason: &str) -> TestResult {
    TestResult {
        suite: scenario.suite.to_string(),
        name: scenario.name.to_string(),
        tags: scenario.tags.iter().map(|t| t.to_string()).collect(),
        status: TestStatus::Failed,
        attempts: 1,
        duration_ms: 0,
        error: Some(format!("test panicked: {}", reason)),
        annotations: Vec::new(),
    }
}

/// `<artifacts>/<slug>[-retryN]`
fn attempt_dir(root: &Path, title: &str, attempt: u32) -> PathBuf {
    let mut slug = String::new();
    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.ends_with('-') {
            slug.push('-');
        }
    }
    let slug = slug.trim_matches('-');
    if attempt == 0 {
        root.join(slug)
    } else {
        root.join(format!("{}-retry{}", slug, attempt))
    }
}
