//! Chat API mocking
//!
//! The chat widget reads `POST /api/chat` as a server-sent event stream:
//! one `data: {"token": "..."}` frame per fragment, then `data: [DONE]`.
//! These helpers fabricate such streams and install them as route
//! fulfillments so chat scenarios never depend on a live model.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::driver::protocol::Fulfillment;
use crate::error::{E2eError, E2eResult};
use crate::page::{Page, RouteGate};

/// Route the chat widget posts to
pub const CHAT_ROUTE: &str = "/api/chat";

/// Terminal frame payload
pub const DONE_SENTINEL: &str = "[DONE]";

pub const EVENT_STREAM: &str = "text/event-stream";

/// Reply used when a scenario does not care what the bot says
pub const DEFAULT_TOKENS: [&str; 7] = ["Hello", "!", " How", " can", " I", " help", "?"];

#[derive(Serialize, Deserialize)]
struct TokenFrame<'a> {
    token: Cow<'a, str>,
}

/// An ordered bot reply, split the way the server would stream it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatStream {
    tokens: Vec<String>,
}

impl ChatStream {
    pub fn new<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { tokens: tokens.into_iter().map(Into::into).collect() }
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    /// What the widget should render once the stream completes
    pub fn full_reply(&self) -> String {
        self.tokens.concat()
    }

    /// Encode as an event stream body
    pub fn to_event_stream(&self) -> E2eResult<String> {
        let mut body = String::new();
        for token in &self.tokens {
            body.push_str("data: ");
            body.push_str(&serde_json::to_string(&TokenFrame { token: Cow::Borrowed(token) })?);
            body.push_str("\n\n");
        }
        body.push_str("data: ");
        body.push_str(DONE_SENTINEL);
        body.push_str("\n\n");
        Ok(body)
    }

    pub fn fulfillment(&self) -> E2eResult<Fulfillment> {
        Ok(Fulfillment::ok(EVENT_STREAM, self.to_event_stream()?)
            .with_header("Cache-Control", "no-cache"))
    }
}

impl Default for ChatStream {
    fn default() -> Self {
        Self::new(DEFAULT_TOKENS)
    }
}

/// Decode an event stream body back into its token fragments.
///
/// Frames after the sentinel are ignored; a body without the sentinel is an
/// error because the widget would never leave its streaming state.
pub fn parse_event_stream(body: &str) -> E2eResult<Vec<String>> {
    let mut tokens = Vec::new();
    for frame in body.split("\n\n") {
        let frame = frame.trim();
        if frame.is_empty() {
            continue;
        }
        let data = frame
            .strip_prefix("data:")
            .map(str::trim_start)
            .ok_or_else(|| E2eError::Protocol(format!("not a data frame: {:?}", frame)))?;
        if data == DONE_SENTINEL {
            return Ok(tokens);
        }
        let parsed: TokenFrame<'_> = serde_json::from_str(data)?;
        tokens.push(parsed.token.into_owned());
    }
    Err(E2eError::Protocol("event stream ended without [DONE]".into()))
}

/// Answer chat requests with `stream`, optionally after `delay_ms`
pub async fn mock_chat_api(page: &Page, stream: &ChatStream, delay_ms: u64) -> E2eResult<()> {
    debug!("Mocking {} with {} token(s)", CHAT_ROUTE, stream.tokens().len());
    page.route(CHAT_ROUTE, stream.fulfillment()?.with_delay_ms(delay_ms))
        .await
}

/// Like [`mock_chat_api`], but requests hang until the gate is released
pub async fn mock_chat_api_gated(page: &Page, stream: &ChatStream) -> E2eResult<RouteGate> {
    page.route_gated(CHAT_ROUTE, stream.fulfillment()?).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_stream_framing() {
        let body = ChatStream::new(["ok"]).to_event_stream().unwrap();
        assert_eq!(body, "data: {\"token\":\"ok\"}\n\ndata: [DONE]\n\n");
    }

    #[test]
    fn test_sentinel_is_last_frame() {
        let body = ChatStream::default().to_event_stream().unwrap();
        let frames: Vec<&str> = body.split("\n\n").filter(|f| !f.is_empty()).collect();
        assert_eq!(frames.len(), DEFAULT_TOKENS.len() + 1);
        assert_eq!(*frames.last().unwrap(), "data: [DONE]");
    }

    #[test]
    fn test_default_reply_concatenates() {
        let stream = ChatStream::default();
        assert_eq!(stream.full_reply(), "Hello! How can I help?");

        let decoded = parse_event_stream(&stream.to_event_stream().unwrap()).unwrap();
        assert_eq!(decoded.concat(), stream.full_reply());
    }

    #[test]
    fn test_tokens_needing_json_escapes() {
        let stream = ChatStream::new(["say \"hi\"", "\n", "naïve"]);
        let body = stream.to_event_stream().unwrap();
        assert!(body.contains(r#"data: {"token":"say \"hi\""}"#));
        assert_eq!(parse_event_stream(&body).unwrap().concat(), "say \"hi\"\nnaïve");
    }

    #[test]
    fn test_zero_tokens_is_just_the_sentinel() {
        let body = ChatStream::new(Vec::<String>::new()).to_event_stream().unwrap();
        assert_eq!(body, "data: [DONE]\n\n");
        assert!(parse_event_stream(&body).unwrap().is_empty());
    }

    #[test]
    fn test_parse_requires_sentinel() {
        let err = parse_event_stream("data: {\"token\":\"a\"}\n\n").unwrap_err();
        assert!(matches!(err, E2eError::Protocol(_)));
    }

    #[test]
    fn test_fulfillment_headers() {
        let f = ChatStream::default().fulfillment().unwrap().with_delay_ms(300);
        assert_eq!(f.status, 200);
        assert_eq!(f.headers.get("Content-Type").map(String::as_str), Some(EVENT_STREAM));
        assert_eq!(f.headers.get("Cache-Control").map(String::as_str), Some("no-cache"));
        assert_eq!(f.delay_ms, 300);
    }
}
