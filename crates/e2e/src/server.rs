//! Server management - reusing or spawning the application under test

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

use crate::error::{E2eError, E2eResult};
use crate::readiness::wait_for_http_ok;

/// How to obtain a running application
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WebServerConfig {
    /// Shell command that starts the app; `None` means never spawn
    pub command: Option<String>,

    /// Use an app that already answers at the base URL
    pub reuse_existing: bool,

    /// Startup budget for a spawned app
    pub timeout_ms: u64,

    /// Working directory for `command`
    pub cwd: Option<PathBuf>,
}

impl Default for WebServerConfig {
    fn default() -> Self {
        Self {
            command: Some("../mvnw spring-boot:run".to_string()),
            reuse_existing: true,
            timeout_ms: 120_000,
            cwd: None,
        }
    }
}

/// Handle to a spawned application process
pub struct WebServer {
    child: Child,
    command: String,
}

impl WebServer {
    /// Make sure something answers at `url`.
    ///
    /// Returns `None` when an existing app is reused or when no command is
    /// configured; the readiness gate reports the latter.
    pub async fn ensure(config: &WebServerConfig, url: &str) -> E2eResult<Option<Self>> {
        let already_up = is_up(url).await;

        if already_up {
            if config.reuse_existing {
                info!("Reusing application already running at {}", url);
                return Ok(None);
            }
            return Err(E2eError::ServerStartup(format!(
                "{} is already in use; stop it or set web_server.reuse_existing",
                url
            )));
        }

        let Some(command) = config.command.as_deref() else {
            debug!("No web server command configured");
            return Ok(None);
        };

        let mut server = Self::spawn(command, config.cwd.as_ref())?;
        let timeout = Duration::from_millis(config.timeout_ms);

        tokio::select! {
            ready = wait_for_http_ok(url, timeout) => ready?,
            status = server.child.wait() => {
                let status = status?;
                return Err(E2eError::ServerStartup(format!(
                    "`{}` exited with {} before {} became ready",
                    server.command, status, url
                )));
            }
        }

        info!("Application is up at {}", url);
        Ok(Some(server))
    }

    /// Start `command` under `sh -c` in its own process group
    pub fn spawn(command: &str, cwd: Option<&PathBuf>) -> E2eResult<Self> {
        info!("Starting web server: {}", command);

        let mut cmd = Command::new("sh");
        cmd.arg("-c")
            .arg(command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(unix)]
        cmd.process_group(0);
        if let Some(dir) = cwd {
            cmd.current_dir(dir);
        }

        let mut child = cmd.spawn().map_err(|e| {
            E2eError::ServerStartup(format!("Failed to spawn `{}`: {}", command, e))
        })?;

        if let Some(stdout) = child.stdout.take() {
            forward_output(stdout);
        }
        if let Some(stderr) = child.stderr.take() {
            forward_output(stderr);
        }

        Ok(Self { child, command: command.to_string() })
    }

    pub fn pid(&self) -> Option<u32> {
        self.child.id()
    }

    /// SIGTERM the process group, then kill whatever is left
    pub async fn stop(&mut self) -> E2eResult<()> {
        let Some(pid) = self.child.id() else {
            return Ok(());
        };
        info!("Stopping web server (pid: {})", pid);

        signal_group(pid);
        match tokio::time::timeout(Duration::from_secs(5), self.child.wait()).await {
            Ok(status) => {
                debug!("Web server exited: {:?}", status);
            }
            Err(_) => {
                warn!("Web server ignored SIGTERM, killing it");
                self.child.kill().await?;
            }
        }
        Ok(())
    }
}

impl Drop for WebServer {
    fn drop(&mut self) {
        if let Some(pid) = self.child.id() {
            signal_group(pid);
            let _ = self.child.start_kill();
        }
    }
}

async fn is_up(url: &str) -> bool {
    let client = match reqwest::Client::builder()
        .timeout(Duration::from_secs(2))
        .build()
    {
        Ok(client) => client,
        Err(_) => return false,
    };
    matches!(client.get(url).send().await, Ok(resp) if resp.status().is_success())
}

fn forward_output<R>(stream: R)
where
    R: AsyncRead + Send + Unpin + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(stream).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            debug!("[webserver] {}", line);
        }
    });
}

#[cfg(unix)]
fn signal_group(pid: u32) {
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    let _ = killpg(Pid::from_raw(pid as i32), Signal::SIGTERM);
}

#[cfg(not(unix))]
fn signal_group(_pid: u32) {}

#[cfg(test)]
mod tests {
    use super::*;

    // Nothing listens on port 9 on a test machine
    const DEAD_URL: &str = "http://127.0.0.1:9/";

    #[tokio::test]
    async fn test_no_command_is_not_an_error() {
        let config = WebServerConfig { command: None, ..Default::default() };
        let server = WebServer::ensure(&config, DEAD_URL).await.unwrap();
        assert!(server.is_none());
    }

    #[tokio::test]
    async fn test_command_exiting_early_fails_fast() {
        let config = WebServerConfig {
            command: Some("echo booting; exit 3".into()),
            timeout_ms: 30_000,
            ..Default::default()
        };
        let started = std::time::Instant::now();
        let err = WebServer::ensure(&config, DEAD_URL).await.err().unwrap();
        assert!(matches!(err, E2eError::ServerStartup(ref m) if m.contains("exit")), "{}", err);
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_stop_terminates_process() {
        let mut server = WebServer::spawn("sleep 30", None).unwrap();
        assert!(server.pid().is_some());
        let started = std::time::Instant::now();
        server.stop().await.unwrap();
        assert!(started.elapsed() < Duration::from_secs(6));
        assert!(server.child.try_wait().unwrap().is_some());
    }

    #[test]
    fn test_config_defaults() {
        let config: WebServerConfig = serde_yaml::from_str("reuse_existing: false").unwrap();
        assert!(!config.reuse_existing);
        assert_eq!(config.timeout_ms, 120_000);
        assert_eq!(config.command.as_deref(), Some("../mvnw spring-boot:run"));
    }
}
