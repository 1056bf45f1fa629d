//! Runner behaviour against an in-process stand-in for the Playwright bridge

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::routing::get;
use axum::Router;
use futures::FutureExt;
use parking_lot::Mutex;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream};

use petclinic_e2e::driver::Driver;
use petclinic_e2e::runner::{BrowserLauncher, TestStatus};
use petclinic_e2e::{E2eError, E2eResult, Page, RunnerConfig, Scenario, TestContext, TestRunner};

/// Every method the fake bridges received, across sessions
type Log = Arc<Mutex<Vec<String>>>;

/// Answers every request with a null result
async fn fake_bridge(stream: DuplexStream, log: Log) {
    let (read, mut write) = tokio::io::split(stream);
    let mut lines = BufReader::new(read).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        let Ok(request) = serde_json::from_str::<serde_json::Value>(&line) else {
            break;
        };
        if let Some(method) = request["method"].as_str() {
            log.lock().push(method.to_string());
        }
        let reply = serde_json::json!({ "id": request["id"], "result": null });
        if write.write_all(format!("{}\n", reply).as_bytes()).await.is_err() {
            break;
        }
    }
}

#[derive(Default)]
struct FakeLauncher {
    log: Log,
    launches: Mutex<u32>,
}

#[async_trait]
impl BrowserLauncher for FakeLauncher {
    async fn launch(&self, config: &RunnerConfig) -> E2eResult<Page> {
        *self.launches.lock() += 1;
        let (ours, theirs) = tokio::io::duplex(64 * 1024);
        tokio::spawn(fake_bridge(theirs, self.log.clone()));
        let (read, write) = tokio::io::split(ours);
        let driver = Driver::connect(read, write, Duration::from_millis(config.expect_timeout_ms));
        Ok(Page::new(driver, &config.base_url))
    }
}

async fn visits_home(ctx: TestContext) -> E2eResult<()> {
    ctx.page.goto("/").await?;
    ctx.annotate("a11y", "critical=0, serious=1");
    Ok(())
}

async fn fails_first_attempt(ctx: TestContext) -> E2eResult<()> {
    if ctx.attempt == 0 {
        return Err(E2eError::AssertionFailed("first attempt".into()));
    }
    Ok(())
}

async fn always_fails(_ctx: TestContext) -> E2eResult<()> {
    Err(E2eError::AssertionFailed("owner not listed".into()))
}

async fn panics(_ctx: TestContext) -> E2eResult<()> {
    let owners: Vec<u32> = Vec::new();
    let third = owners[3];
    assert_eq!(third, 0);
    Ok(())
}

async fn hangs(_ctx: TestContext) -> E2eResult<()> {
    tokio::time::sleep(Duration::from_secs(60)).await;
    Ok(())
}

fn scenarios() -> Vec<Scenario> {
    vec![
        Scenario {
            suite: "Home",
            name: "visits home",
            tags: &["navigation"],
            run: |ctx| visits_home(ctx).boxed(),
        },
        Scenario {
            suite: "Chat Widget",
            name: "flaky on first attempt",
            tags: &["chat"],
            run: |ctx| fails_first_attempt(ctx).boxed(),
        },
        Scenario {
            suite: "Owner Management",
            name: "always fails",
            tags: &["owners"],
            run: |ctx| always_fails(ctx).boxed(),
        },
        Scenario {
            suite: "Owner Management",
            name: "hangs",
            tags: &["owners"],
            run: |ctx| hangs(ctx).boxed(),
        },
    ]
}

fn config(output: &std::path::Path) -> RunnerConfig {
    RunnerConfig {
        test_timeout_ms: 300,
        retries: 1,
        workers: 2,
        output_dir: output.to_path_buf(),
        ..Default::default()
    }
}

#[tokio::test]
async fn run_classifies_results_and_keeps_order() {
    let dir = tempfile::tempdir().unwrap();
    let launcher = Arc::new(FakeLauncher::default());
    let runner = TestRunner::with_launcher(config(dir.path()), launcher.clone());

    let suite = runner.run(scenarios()).await;

    assert_eq!(suite.total, 4);
    assert_eq!((suite.passed, suite.flaky, suite.failed), (1, 1, 2));
    assert!(!suite.success());

    let names: Vec<&str> = suite.results.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, ["visits home", "flaky on first attempt", "always fails", "hangs"]);

    let home = &suite.results[0];
    assert_eq!(home.status, TestStatus::Passed);
    assert_eq!(home.attempts, 1);
    assert!(home.error.is_none());
    assert_eq!(home.annotations[0].kind, "a11y");

    let flaky = &suite.results[1];
    assert_eq!(flaky.status, TestStatus::Flaky);
    assert_eq!(flaky.attempts, 2);
    assert!(flaky.error.as_deref().unwrap().contains("first attempt"));

    let failed = &suite.results[2];
    assert_eq!(failed.status, TestStatus::Failed);
    assert_eq!(failed.attempts, 2);
    assert!(failed.error.as_deref().unwrap().contains("owner not listed"));

    let hung = &suite.results[3];
    assert_eq!(hung.status, TestStatus::Failed);
    assert!(hung.error.as_deref().unwrap().contains("test exceeded 300 ms"));

    // one fresh session per attempt: 1 + 2 + 2 + 2
    assert_eq!(*launcher.launches.lock(), 7);
}

#[tokio::test]
async fn failed_attempts_capture_a_screenshot() {
    let dir = tempfile::tempdir().unwrap();
    let launcher = Arc::new(FakeLauncher::default());
    let mut config = config(dir.path());
    config.retries = 0;
    let runner = TestRunner::with_launcher(config, launcher.clone());

    let failing: Vec<Scenario> = scenarios().into_iter().filter(|s| s.name == "always fails").collect();
    let suite = runner.run(failing).await;
    assert_eq!(suite.failed, 1);

    let log = launcher.log.lock().clone();
    assert_eq!(log, ["screenshot", "close"]);
    assert!(dir
        .path()
        .join("artifacts")
        .join("owner-management-always-fails")
        .is_dir());
}

#[tokio::test]
async fn panicking_scenario_is_reported_as_failed() {
    let dir = tempfile::tempdir().unwrap();
    let launcher = Arc::new(FakeLauncher::default());
    let runner = TestRunner::with_launcher(config(dir.path()), launcher.clone());

    let mut selected = scenarios();
    selected.insert(
        1,
        Scenario {
            suite: "Owner Management",
            name: "panics",
            tags: &["owners"],
            run: |ctx| panics(ctx).boxed(),
        },
    );
    selected.truncate(2);
    let suite = runner.run(selected).await;

    assert_eq!(suite.total, 2);
    assert_eq!((suite.passed, suite.failed), (1, 1));
    assert!(!suite.success());

    let panicked = &suite.results[1];
    assert_eq!(panicked.name, "panics");
    assert_eq!(panicked.status, TestStatus::Failed);
    assert_eq!(panicked.attempts, 2);
    let error = panicked.error.as_deref().unwrap();
    assert!(error.starts_with("test panicked: "), "got: {}", error);
    assert!(error.contains("index out of bounds"), "got: {}", error);

    // each panicking attempt still got its screenshot and a clean close
    let log = launcher.log.lock().clone();
    assert_eq!(log.iter().filter(|m| *m == "screenshot").count(), 2);
    assert_eq!(log.iter().filter(|m| *m == "close").count(), 3);
}

#[tokio::test]
async fn passing_attempts_skip_the_screenshot() {
    let dir = tempfile::tempdir().unwrap();
    let launcher = Arc::new(FakeLauncher::default());
    let runner = TestRunner::with_launcher(config(dir.path()), launcher.clone());

    let passing: Vec<Scenario> = scenarios().into_iter().take(1).collect();
    let suite = runner.run(passing).await;
    assert!(suite.success());

    assert_eq!(launcher.log.lock().clone(), ["goto", "close"]);
}

#[tokio::test]
async fn global_setup_reuses_running_app_and_captures_home() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base_url = format!("http://{}", listener.local_addr().unwrap());
    let app = Router::new().route("/", get(|| async { "Welcome to Emerald Grove" }));
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let dir = tempfile::tempdir().unwrap();
    let mut config = config(&dir.path().join("results"));
    config.base_url = base_url;
    config.ready_timeout_ms = 5_000;

    let launcher = Arc::new(FakeLauncher::default());
    let mut runner = TestRunner::with_launcher(config, launcher.clone());
    runner.global_setup().await.unwrap();
    runner.stop_server().await.unwrap();

    assert!(dir.path().join("results").is_dir());
    assert_eq!(
        launcher.log.lock().clone(),
        ["goto", "setViewportSize", "screenshot", "close"]
    );
}

#[tokio::test]
async fn global_setup_fails_when_app_never_answers() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let base_url = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);

    let dir = tempfile::tempdir().unwrap();
    let mut config = config(dir.path());
    config.base_url = base_url;
    config.ready_timeout_ms = 300;
    config.web_server.command = None;

    let launcher = Arc::new(FakeLauncher::default());
    let mut runner = TestRunner::with_launcher(config, launcher.clone());
    let err = runner.global_setup().await.unwrap_err();

    assert!(matches!(err, E2eError::EnvironmentNotReady { .. }));
    assert_eq!(*launcher.launches.lock(), 0);
}
