//! JSON-lines protocol spoken with the Playwright bridge
//!
//! Every request is one line: `{"id": 7, "method": "action", "params": {...}}`.
//! Every response is one line carrying the same id and either `result` or
//! `error`. Lines without an id are events (console output, page errors).

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::selector::Segment;

/// Browser engine to launch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Browser {
    #[default]
    Chromium,
    Firefox,
    Webkit,
}

impl Browser {
    pub fn as_str(&self) -> &'static str {
        match self {
            Browser::Chromium => "chromium",
            Browser::Firefox => "firefox",
            Browser::Webkit => "webkit",
        }
    }
}

impl std::str::FromStr for Browser {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "chromium" | "chrome" => Ok(Browser::Chromium),
            "firefox" => Ok(Browser::Firefox),
            "webkit" => Ok(Browser::Webkit),
            other => Err(format!("unknown browser '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self { width: 1280, height: 720 }
    }
}

/// Page load milestones
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoadState {
    #[default]
    #[serde(rename = "load")]
    Load,
    #[serde(rename = "domcontentloaded")]
    DomContentLoaded,
    #[serde(rename = "networkidle")]
    NetworkIdle,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaitState {
    #[default]
    Visible,
    Hidden,
    Attached,
    Detached,
}

/// Something done to the element a locator resolves to
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Action {
    Click,
    Fill { value: String },
    SelectOption { value: String },
    Press { key: String },
    Check,
    Hover,
    WaitFor {
        state: WaitState,
        #[serde(skip_serializing_if = "Option::is_none")]
        timeout_ms: Option<u64>,
    },
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Action::Click => "click",
            Action::Fill { .. } => "fill",
            Action::SelectOption { .. } => "select",
            Action::Press { .. } => "press",
            Action::Check => "check",
            Action::Hover => "hover",
            Action::WaitFor { .. } => "wait",
        }
    }
}

/// A read of element state. Queries never wait for the element to appear.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Query {
    Count,
    IsVisible,
    IsEnabled,
    TextContent,
    InnerText,
    InputValue,
    AllTextContents,
    GetAttribute { name: String },
}

/// Synthetic response served for an intercepted request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fulfillment {
    pub status: u16,
    pub headers: BTreeMap<String, String>,
    pub body: String,
    #[serde(default)]
    pub delay_ms: u64,
}

impl Fulfillment {
    /// 200 response with the given content type and body
    pub fn ok(content_type: &str, body: impl Into<String>) -> Self {
        let mut headers = BTreeMap::new();
        headers.insert("Content-Type".to_string(), content_type.to_string());
        Self {
            status: 200,
            headers,
            body: body.into(),
            delay_ms: 0,
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.insert(name.to_string(), value.to_string());
        self
    }

    pub fn with_delay_ms(mut self, delay_ms: u64) -> Self {
        self.delay_ms = delay_ms;
        self
    }
}

/// Requests understood by the bridge
#[derive(Debug, Clone, Serialize)]
#[serde(
    tag = "method",
    content = "params",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum Command {
    /// Launch the browser and open the single page of this session
    Launch {
        browser: Browser,
        headless: bool,
        viewport: Viewport,
        base_url: String,
        action_timeout_ms: u64,
        navigation_timeout_ms: u64,
    },

    Goto {
        url: String,
        wait_until: LoadState,
    },

    Url,

    WaitForLoadState {
        state: LoadState,
    },

    SetViewportSize {
        width: u32,
        height: u32,
    },

    Screenshot {
        path: PathBuf,
        full_page: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        locator: Option<Vec<Segment>>,
    },

    /// Evaluate an expression in the page, or a function against an element
    Evaluate {
        expression: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        locator: Option<Vec<Segment>>,
    },

    Action {
        locator: Vec<Segment>,
        action: Action,
    },

    Query {
        locator: Vec<Segment>,
        query: Query,
    },

    /// Intercept requests matching `pattern`; gated routes hold the
    /// fulfillment until a matching `ReleaseRoute`
    Route {
        id: u64,
        pattern: String,
        fulfillment: Fulfillment,
        gated: bool,
    },

    ReleaseRoute {
        id: u64,
    },

    Unroute {
        pattern: String,
    },

    /// Inject axe-core and run it with the given rule tags
    AxeScan {
        tags: Vec<String>,
    },

    Close,
}

impl Command {
    /// Short name used in logs and error messages
    pub fn name(&self) -> &'static str {
        match self {
            Command::Launch { .. } => "launch",
            Command::Goto { .. } => "goto",
            Command::Url => "url",
            Command::WaitForLoadState { .. } => "waitForLoadState",
            Command::SetViewportSize { .. } => "setViewportSize",
            Command::Screenshot { .. } => "screenshot",
            Command::Evaluate { .. } => "evaluate",
            Command::Action { action, .. } => action.name(),
            Command::Query { .. } => "query",
            Command::Route { .. } => "route",
            Command::ReleaseRoute { .. } => "releaseRoute",
            Command::Unroute { .. } => "unroute",
            Command::AxeScan { .. } => "axeScan",
            Command::Close => "close",
        }
    }
}

/// Outgoing request line
#[derive(Debug, Serialize)]
pub struct Request<'a> {
    pub id: u64,
    #[serde(flatten)]
    pub command: &'a Command,
}

/// Incoming line: a response when `id` is present, an event otherwise
#[derive(Debug, Deserialize)]
pub struct Incoming {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub result: Option<serde_json::Value>,
    #[serde(default)]
    pub error: Option<RemoteError>,
    #[serde(default)]
    pub event: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RemoteError {
    #[serde(default)]
    pub name: String,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selector::{Role, RoleOptions, TextMatch};

    #[test]
    fn test_request_envelope() {
        let command = Command::Goto {
            url: "/owners/find".to_string(),
            wait_until: LoadState::Load,
        };
        let line = serde_json::to_value(Request { id: 3, command: &command }).unwrap();
        assert_eq!(line["id"], 3);
        assert_eq!(line["method"], "goto");
        assert_eq!(line["params"]["url"], "/owners/find");
        assert_eq!(line["params"]["waitUntil"], "load");
    }

    #[test]
    fn test_unit_command_has_no_params() {
        let line = serde_json::to_value(Request { id: 1, command: &Command::Url }).unwrap();
        assert_eq!(line["method"], "url");
        assert!(line.get("params").is_none());
    }

    #[test]
    fn test_action_wire_format() {
        let opts = RoleOptions::named(TextMatch::pattern("Find Owner"));
        let command = Command::Action {
            locator: vec![crate::selector::Segment::Role {
                role: Role::Button,
                name: opts.name,
                level: opts.level,
            }],
            action: Action::Fill { value: "Davis".to_string() },
        };
        let line = serde_json::to_value(Request { id: 9, command: &command }).unwrap();
        assert_eq!(line["params"]["action"]["type"], "fill");
        assert_eq!(line["params"]["action"]["value"], "Davis");
        assert_eq!(line["params"]["locator"][0]["role"], "button");
    }

    #[test]
    fn test_wait_for_timeout_field() {
        let action = Action::WaitFor { state: WaitState::Hidden, timeout_ms: Some(250) };
        let json = serde_json::to_value(&action).unwrap();
        assert_eq!(json["type"], "waitFor");
        assert_eq!(json["state"], "hidden");
        assert_eq!(json["timeoutMs"], 250);
    }

    #[test]
    fn test_incoming_event_and_error() {
        let event: Incoming =
            serde_json::from_str(r#"{"event":"console","text":"hello"}"#).unwrap();
        assert!(event.id.is_none());
        assert_eq!(event.event.as_deref(), Some("console"));

        let failure: Incoming = serde_json::from_str(
            r#"{"id":4,"error":{"name":"TimeoutError","message":"locator.click: Timeout 5000ms exceeded"}}"#,
        )
        .unwrap();
        assert_eq!(failure.id, Some(4));
        assert_eq!(failure.error.unwrap().name, "TimeoutError");
    }

    #[test]
    fn test_browser_from_str() {
        assert_eq!("firefox".parse::<Browser>().unwrap(), Browser::Firefox);
        assert!("lynx".parse::<Browser>().is_err());
    }
}
