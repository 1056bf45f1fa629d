//! Error types for E2E testing

use thiserror::Error;

#[derive(Error, Debug)]
pub enum E2eError {
    #[error("Application at {url} not ready: {last_error}")]
    EnvironmentNotReady { url: String, last_error: String },

    #[error("Server failed to start: {0}")]
    ServerStartup(String),

    #[error("Node.js not found ({0}). Install Node and run: npm install playwright axe-core")]
    DriverNotFound(String),

    #[error("Playwright driver error: {0}")]
    Driver(String),

    #[error("Playwright driver connection closed")]
    DriverClosed,

    #[error("Driver protocol error: {0}")]
    Protocol(String),

    #[error("Timeout waiting for: {0}")]
    Timeout(String),

    #[error("Assertion failed: {0}")]
    AssertionFailed(String),

    #[error("test panicked: {0}")]
    Panicked(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid pattern: {0}")]
    Regex(#[from] regex::Error),
}

impl E2eError {
    /// Whether the browser session is gone and further calls are pointless
    pub fn is_fatal_to_session(&self) -> bool {
        matches!(self, E2eError::DriverClosed | E2eError::Protocol(_))
    }
}

pub type E2eResult<T> = Result<T, E2eError>;
