//! Playwright browser automation
//!
//! The browser is driven by a small Node.js bridge (`bridge.js`, embedded in
//! this crate) that owns one Playwright browser, context and page. Requests
//! and responses travel as JSON lines over the bridge's stdin/stdout and are
//! matched up by id, so several requests may be in flight at once.

pub mod protocol;

use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command as TokioCommand};
use tokio::sync::{oneshot, Mutex};
use tracing::{debug, info, warn};

use crate::error::{E2eError, E2eResult};
use protocol::{Browser, Command, Incoming, Request, Viewport};

const BRIDGE_SCRIPT: &str = include_str!("bridge.js");

type Reply = Result<serde_json::Value, E2eError>;

/// Configuration for launching a browser session
#[derive(Debug, Clone)]
pub struct DriverConfig {
    /// Base URL relative navigations resolve against
    pub base_url: String,

    /// Node binary
    pub node: PathBuf,

    /// Directory whose `node_modules` provides `playwright` and `axe-core`
    pub node_root: PathBuf,

    pub browser: Browser,
    pub headless: bool,
    pub viewport: Viewport,

    /// Playwright action timeout (click, fill, waitFor)
    pub action_timeout: Duration,

    /// Playwright navigation timeout (goto, waitForLoadState)
    pub navigation_timeout: Duration,

    /// Budget for auto-waiting assertions
    pub expect_timeout: Duration,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            node: PathBuf::from("node"),
            node_root: PathBuf::from("."),
            browser: Browser::Chromium,
            headless: true,
            viewport: Viewport::default(),
            action_timeout: Duration::from_secs(10),
            navigation_timeout: Duration::from_secs(30),
            expect_timeout: Duration::from_secs(5),
        }
    }
}

/// Handle to a bridge connection. Cloning shares the connection.
#[derive(Clone)]
pub struct Driver {
    inner: Arc<DriverInner>,
}

struct DriverInner {
    writer: Mutex<Box<dyn AsyncWrite + Send + Unpin>>,
    pending: parking_lot::Mutex<HashMap<u64, oneshot::Sender<Reply>>>,
    next_id: AtomicU64,
    closed: AtomicBool,
    expect_timeout: Duration,
    child: parking_lot::Mutex<Option<Child>>,

    /// Keeps the materialised bridge script alive for the session
    _script_dir: Option<tempfile::TempDir>,
}

impl Driver {
    /// Spawn the bridge and launch a browser session
    pub async fn launch(config: &DriverConfig) -> E2eResult<Self> {
        Self::check_node_installed(config).await?;

        let script_dir = tempfile::tempdir()?;
        let script_path = script_dir.path().join("bridge.js");
        std::fs::write(&script_path, BRIDGE_SCRIPT)?;

        let node_root = std::fs::canonicalize(&config.node_root)
            .unwrap_or_else(|_| config.node_root.clone());

        debug!("Starting Playwright bridge: {}", script_path.display());

        let mut child = TokioCommand::new(&config.node)
            .arg(&script_path)
            .current_dir(&node_root)
            .env("E2E_NODE_ROOT", &node_root)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| E2eError::DriverNotFound(format!("{}: {}", config.node.display(), e)))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| E2eError::Protocol("bridge stdin unavailable".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| E2eError::Protocol("bridge stdout unavailable".into()))?;

        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    debug!("[bridge] {}", line);
                }
            });
        }

        let driver = Self::start(stdout, stdin, config.expect_timeout, Some(child), Some(script_dir));

        let launched: serde_json::Value = driver
            .request(Command::Launch {
                browser: config.browser,
                headless: config.headless,
                viewport: config.viewport,
                base_url: config.base_url.clone(),
                action_timeout_ms: config.action_timeout.as_millis() as u64,
                navigation_timeout_ms: config.navigation_timeout.as_millis() as u64,
            })
            .await?;

        info!(
            "Launched {} {}",
            config.browser.as_str(),
            launched.get("version").and_then(|v| v.as_str()).unwrap_or("")
        );
        Ok(driver)
    }

    /// Attach to an already-running bridge over arbitrary streams
    pub fn connect<R, W>(reader: R, writer: W, expect_timeout: Duration) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        Self::start(reader, writer, expect_timeout, None, None)
    }

    fn start<R, W>(
        reader: R,
        writer: W,
        expect_timeout: Duration,
        child: Option<Child>,
        script_dir: Option<tempfile::TempDir>,
    ) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        let inner = Arc::new(DriverInner {
            writer: Mutex::new(Box::new(writer)),
            pending: parking_lot::Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            closed: AtomicBool::new(false),
            expect_timeout,
            child: parking_lot::Mutex::new(child),
            _script_dir: script_dir,
        });

        let weak = Arc::downgrade(&inner);
        tokio::spawn(async move {
            let mut lines = BufReader::new(reader).lines();
            loop {
                let line = match lines.next_line().await {
                    Ok(Some(line)) => line,
                    Ok(None) => break,
                    Err(e) => {
                        warn!("Bridge read error: {}", e);
                        break;
                    }
                };
                let Some(inner) = weak.upgrade() else { break };
                inner.dispatch(&line);
            }
            if let Some(inner) = weak.upgrade() {
                inner.shutdown();
            }
        });

        Self { inner }
    }

    async fn check_node_installed(config: &DriverConfig) -> E2eResult<()> {
        let status = TokioCommand::new(&config.node)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await;

        match status {
            Ok(status) if status.success() => Ok(()),
            Ok(status) => Err(E2eError::DriverNotFound(format!(
                "{} --version exited with {}",
                config.node.display(),
                status
            ))),
            Err(e) => Err(E2eError::DriverNotFound(format!("{}: {}", config.node.display(), e))),
        }
    }

    /// Timeout for auto-waiting assertions made through this session
    pub fn expect_timeout(&self) -> Duration {
        self.inner.expect_timeout
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    /// Allocate an id for a bridge-side object (routes)
    pub(crate) fn next_id(&self) -> u64 {
        self.inner.next_id.fetch_add(1, Ordering::SeqCst)
    }

    /// Send a command and wait for its result
    pub async fn request<T: DeserializeOwned>(&self, command: Command) -> E2eResult<T> {
        let value = self.request_value(&command).await?;
        serde_json::from_value(value).map_err(|e| {
            E2eError::Protocol(format!("unexpected {} result: {}", command.name(), e))
        })
    }

    async fn request_value(&self, command: &Command) -> E2eResult<serde_json::Value> {
        if self.is_closed() {
            return Err(E2eError::DriverClosed);
        }

        let id = self.next_id();
        let mut line = serde_json::to_string(&Request { id, command })?;
        line.push('\n');

        let rx = self.inner.register(id)?;

        debug!("-> #{} {}", id, command.name());

        let written = {
            let mut writer = self.inner.writer.lock().await;
            match writer.write_all(line.as_bytes()).await {
                Ok(()) => writer.flush().await,
                Err(e) => Err(e),
            }
        };
        if let Err(e) = written {
            self.inner.pending.lock().remove(&id);
            warn!("Bridge write failed: {}", e);
            return Err(E2eError::DriverClosed);
        }

        rx.await.map_err(|_| E2eError::DriverClosed)?
    }

    /// Close the browser and stop the bridge
    pub async fn close(&self) -> E2eResult<()> {
        if self.is_closed() {
            return Ok(());
        }

        let result: E2eResult<serde_json::Value> = self.request(Command::Close).await;

        let child = self.inner.child.lock().take();
        if let Some(mut child) = child {
            match tokio::time::timeout(Duration::from_secs(5), child.wait()).await {
                Ok(_) => {}
                Err(_) => {
                    warn!("Bridge did not exit after close, killing it");
                    let _ = child.kill().await;
                }
            }
        }
        self.inner.shutdown();

        match result {
            Ok(_) | Err(E2eError::DriverClosed) => Ok(()),
            Err(e) => Err(e),
        }
    }
}

impl DriverInner {
    /// Park a response slot for `id`. `shutdown` may have drained the map
    /// after the caller's closed check, so the flag is read again once the
    /// slot is in place.
    fn register(&self, id: u64) -> E2eResult<oneshot::Receiver<Reply>> {
        let (tx, rx) = oneshot::channel();
        self.pending.lock().insert(id, tx);
        if self.closed.load(Ordering::SeqCst) {
            self.pending.lock().remove(&id);
            return Err(E2eError::DriverClosed);
        }
        Ok(rx)
    }

    fn dispatch(&self, line: &str) {
        let incoming: Incoming = match serde_json::from_str(line) {
            Ok(incoming) => incoming,
            Err(e) => {
                warn!("Ignoring malformed bridge line ({}): {}", e, line);
                return;
            }
        };

        let Some(id) = incoming.id else {
            let event = incoming.event.as_deref().unwrap_or("event");
            debug!("[page] {}: {}", event, incoming.text.unwrap_or_default());
            return;
        };

        let Some(tx) = self.pending.lock().remove(&id) else {
            warn!("Response for unknown request #{}", id);
            return;
        };

        let reply = match incoming.error {
            Some(err) if err.name == "TimeoutError" => Err(E2eError::Timeout(err.message)),
            Some(err) => Err(E2eError::Driver(err.message)),
            None => Ok(incoming.result.unwrap_or(serde_json::Value::Null)),
        };
        debug!("<- #{} {}", id, if reply.is_ok() { "ok" } else { "error" });

        let _ = tx.send(reply);
    }

    /// Fail every in-flight request; later requests fail fast
    fn shutdown(&self) {
        self.closed.store(true, Ordering::SeqCst);
        let pending: Vec<_> = self.pending.lock().drain().collect();
        for (_, tx) in pending {
            let _ = tx.send(Err(E2eError::DriverClosed));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    /// Minimal in-process bridge: writes back every line `respond` returns
    fn fake_bridge<F>(respond: F) -> Driver
    where
        F: Fn(&serde_json::Value) -> Vec<serde_json::Value> + Send + 'static,
    {
        let (client, server) = tokio::io::duplex(64 * 1024);
        let (client_read, client_write) = tokio::io::split(client);
        let (server_read, mut server_write) = tokio::io::split(server);

        tokio::spawn(async move {
            let mut lines = BufReader::new(server_read).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                let request: serde_json::Value = serde_json::from_str(&line).unwrap();
                for reply in respond(&request) {
                    let out = format!("{}\n", reply);
                    server_write.write_all(out.as_bytes()).await.unwrap();
                }
            }
        });

        Driver::connect(client_read, client_write, Duration::from_millis(200))
    }

    #[tokio::test]
    async fn test_request_roundtrip() {
        let driver = fake_bridge(|req| {
            assert_eq!(req["method"], "url");
            vec![json!({ "id": req["id"], "result": "http://localhost:8080/owners/find" })]
        });

        let url: String = driver.request(Command::Url).await.unwrap();
        assert_eq!(url, "http://localhost:8080/owners/find");
    }

    #[tokio::test]
    async fn test_timeout_error_is_classified() {
        let driver = fake_bridge(|req| {
            vec![json!({
                "id": req["id"],
                "error": { "name": "TimeoutError", "message": "locator.click: Timeout 10000ms exceeded" }
            })]
        });

        let err = driver.request::<serde_json::Value>(Command::Url).await.unwrap_err();
        assert!(matches!(err, E2eError::Timeout(msg) if msg.contains("locator.click")));
    }

    #[tokio::test]
    async fn test_events_and_noise_are_skipped() {
        let driver = fake_bridge(|req| {
            vec![
                json!({ "event": "console", "text": "log: hi" }),
                json!(["not", "a", "message"]),
                json!({ "id": 999_999, "result": "stray" }),
                json!({ "id": req["id"], "result": 3 }),
            ]
        });

        let count: u32 = driver.request(Command::Url).await.unwrap();
        assert_eq!(count, 3);
    }

    #[tokio::test]
    async fn test_driver_error_is_classified() {
        let driver = fake_bridge(|req| {
            vec![json!({
                "id": req["id"],
                "error": { "name": "Error", "message": "strict mode violation" }
            })]
        });

        let err = driver.request::<serde_json::Value>(Command::Url).await.unwrap_err();
        assert!(matches!(err, E2eError::Driver(msg) if msg.contains("strict mode")));
    }

    #[tokio::test]
    async fn test_out_of_order_responses() {
        let (client, server) = tokio::io::duplex(64 * 1024);
        let (client_read, client_write) = tokio::io::split(client);
        let (server_read, mut server_write) = tokio::io::split(server);

        // Hold the first request and answer it only after the second one
        tokio::spawn(async move {
            let mut lines = BufReader::new(server_read).lines();
            let first: serde_json::Value =
                serde_json::from_str(&lines.next_line().await.unwrap().unwrap()).unwrap();
            let second: serde_json::Value =
                serde_json::from_str(&lines.next_line().await.unwrap().unwrap()).unwrap();
            for (req, value) in [(&second, "second"), (&first, "first")] {
                let line = format!("{}\n", json!({ "id": req["id"], "result": value }));
                server_write.write_all(line.as_bytes()).await.unwrap();
            }
        });

        let driver = Driver::connect(client_read, client_write, Duration::from_secs(1));
        let d1 = driver.clone();
        let first = tokio::spawn(async move { d1.request::<String>(Command::Url).await });
        tokio::time::sleep(Duration::from_millis(20)).await;
        let second: String = driver.request(Command::Url).await.unwrap();

        assert_eq!(second, "second");
        assert_eq!(first.await.unwrap().unwrap(), "first");
    }

    #[tokio::test]
    async fn test_eof_fails_pending_requests() {
        let (client, server) = tokio::io::duplex(1024);
        let (client_read, client_write) = tokio::io::split(client);

        let driver = Driver::connect(client_read, client_write, Duration::from_secs(1));
        let d1 = driver.clone();
        let pending = tokio::spawn(async move { d1.request::<serde_json::Value>(Command::Url).await });

        tokio::time::sleep(Duration::from_millis(20)).await;
        drop(server);

        let err = pending.await.unwrap().unwrap_err();
        assert!(matches!(err, E2eError::DriverClosed));

        let err = driver.request::<serde_json::Value>(Command::Url).await.unwrap_err();
        assert!(matches!(err, E2eError::DriverClosed));
    }

    #[tokio::test]
    async fn test_register_after_shutdown_is_refused() {
        let driver = fake_bridge(|_| vec![]);

        // Shutdown lands between the caller's closed check and the insert
        driver.inner.shutdown();
        let err = driver.inner.register(42).unwrap_err();

        assert!(matches!(err, E2eError::DriverClosed));
        assert!(driver.inner.pending.lock().is_empty());
    }

    #[tokio::test]
    async fn test_register_while_open_parks_slot() {
        let driver = fake_bridge(|_| vec![]);

        let rx = driver.inner.register(7).unwrap();
        assert!(driver.inner.pending.lock().contains_key(&7));

        driver.inner.shutdown();
        assert!(matches!(rx.await.unwrap(), Err(E2eError::DriverClosed)));
    }
}
