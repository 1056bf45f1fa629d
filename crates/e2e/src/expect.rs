//! Auto-waiting assertions
//!
//! Each assertion re-reads element state until it holds or the expect
//! timeout runs out, then fails with the locator and the last value seen.
//! Plain value checks use [`ensure!`](crate::ensure) instead.

use std::future::Future;
use std::time::{Duration, Instant};

use tokio::time::sleep;

use crate::error::{E2eError, E2eResult};
use crate::locator::Locator;
use crate::page::Page;
use crate::selector::TextMatch;

/// Re-check interval while an assertion is not yet satisfied
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Fail the current test unless `cond` holds
#[macro_export]
macro_rules! ensure {
    ($cond:expr, $($arg:tt)+) => {
        if !$cond {
            return Err($crate::error::E2eError::AssertionFailed(format!($($arg)+)));
        }
    };
}

/// Fail the current test unless both sides are equal
#[macro_export]
macro_rules! ensure_eq {
    ($left:expr, $right:expr $(,)?) => {{
        let (left, right) = (&$left, &$right);
        if left != right {
            return Err($crate::error::E2eError::AssertionFailed(format!(
                "expected {:?}, got {:?} ({})",
                right,
                left,
                stringify!($left)
            )));
        }
    }};
}

pub fn expect(locator: &Locator) -> LocatorAssertions {
    LocatorAssertions {
        timeout: locator.driver().expect_timeout(),
        locator: locator.clone(),
        negate: false,
    }
}

pub fn expect_page(page: &Page) -> PageAssertions {
    PageAssertions {
        timeout: page.expect_timeout(),
        page: page.clone(),
    }
}

/// Poll `probe` until its verdict equals `want` or `timeout` passes.
///
/// `probe` yields `(verdict, observed)`; `observed` ends up in the failure
/// message. Probe errors count as "not yet" unless the session is gone.
pub async fn poll_until<F, Fut>(
    timeout: Duration,
    want: bool,
    describe: impl FnOnce() -> String,
    mut probe: F,
) -> E2eResult<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = E2eResult<(bool, String)>>,
{
    let deadline = Instant::now() + timeout;
    let mut observed = String::from("<never evaluated>");

    loop {
        match probe().await {
            Ok::<_, E2eError>((verdict, seen)) => {
                if verdict == want {
                    return Ok(());
                }
                observed = seen;
            }
            Err(e) if e.is_fatal_to_session() => return Err(e),
            Err(e) => observed = format!("error: {}", e),
        }

        if Instant::now() >= deadline {
            return Err(E2eError::AssertionFailed(format!(
                "{} (waited {} ms, last observed: {})",
                describe(),
                timeout.as_millis(),
                observed
            )));
        }
        sleep(POLL_INTERVAL).await;
    }
}

pub struct LocatorAssertions {
    locator: Locator,
    timeout: Duration,
    negate: bool,
}

impl LocatorAssertions {
    /// Invert the next assertion
    #[allow(clippy::should_implement_trait)]
    pub fn not(mut self) -> Self {
        self.negate = !self.negate;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn check<F, Fut>(&self, expectation: String, probe: F) -> E2eResult<()>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = E2eResult<(bool, String)>>,
    {
        let locator = self.locator.to_string();
        let negate = self.negate;
        poll_until(
            self.timeout,
            !negate,
            || format!("expected {} {}{}", locator, if negate { "not " } else { "" }, expectation),
            probe,
        )
        .await
    }

    pub async fn to_be_visible(&self) -> E2eResult<()> {
        let loc = &self.locator;
        self.check("to be visible".into(), || async move {
            let visible = loc.is_visible().await?;
            Ok::<_, E2eError>((visible, format!("visible={}", visible)))
        })
        .await
    }

    /// Hidden or absent
    pub async fn to_be_hidden(&self) -> E2eResult<()> {
        let loc = &self.locator;
        self.check("to be hidden".into(), || async move {
            let visible = loc.is_visible().await?;
            Ok::<_, E2eError>((!visible, format!("visible={}", visible)))
        })
        .await
    }

    pub async fn to_be_enabled(&self) -> E2eResult<()> {
        let loc = &self.locator;
        self.check("to be enabled".into(), || async move {
            let enabled = loc.is_enabled().await?;
            Ok::<_, E2eError>((enabled, format!("enabled={}", enabled)))
        })
        .await
    }

    /// Present and disabled
    pub async fn to_be_disabled(&self) -> E2eResult<()> {
        let loc = &self.locator;
        self.check("to be disabled".into(), || async move {
            if loc.count().await? == 0 {
                return Ok::<_, E2eError>((false, "no element".to_string()));
            }
            let enabled = loc.is_enabled().await?;
            Ok::<_, E2eError>((!enabled, format!("enabled={}", enabled)))
        })
        .await
    }

    /// Whole text content matches
    pub async fn to_have_text(&self, expected: impl Into<TextMatch>) -> E2eResult<()> {
        let expected = expected.into();
        let loc = &self.locator;
        let m = &expected;
        self.check(format!("to have text {}", expected), || async move {
            let text = loc.text_content().await?.unwrap_or_default();
            Ok::<_, E2eError>((m.matches(&text, true)?, format!("{:?}", text)))
        })
        .await
    }

    /// Text content contains the expected text
    pub async fn to_contain_text(&self, expected: impl Into<TextMatch>) -> E2eResult<()> {
        let expected = match expected.into() {
            // Playwright's toContainText with a string is case-sensitive
            TextMatch::Text { value, .. } => TextMatch::exact(value),
            other => other,
        };
        let loc = &self.locator;
        let m = &expected;
        self.check(format!("to contain text {}", expected), || async move {
            let text = loc.all_text_contents().await?.join(" ");
            Ok::<_, E2eError>((m.matches(&text, false)?, format!("{:?}", truncate(&text, 200))))
        })
        .await
    }

    pub async fn to_have_count(&self, expected: usize) -> E2eResult<()> {
        let loc = &self.locator;
        self.check(format!("to have count {}", expected), || async move {
            let count = loc.count().await?;
            Ok::<_, E2eError>((count == expected, format!("count={}", count)))
        })
        .await
    }

    /// No text content
    pub async fn to_be_empty(&self) -> E2eResult<()> {
        let loc = &self.locator;
        self.check("to be empty".into(), || async move {
            let text = loc.text_content().await?.unwrap_or_default();
            Ok::<_, E2eError>((text.trim().is_empty(), format!("{:?}", truncate(&text, 200))))
        })
        .await
    }

    pub async fn to_have_value(&self, expected: &str) -> E2eResult<()> {
        let loc = &self.locator;
        self.check(format!("to have value {:?}", expected), || async move {
            let value = loc.input_value().await?;
            Ok::<_, E2eError>((value == expected, format!("{:?}", value)))
        })
        .await
    }
}

pub struct PageAssertions {
    page: Page,
    timeout: Duration,
}

impl PageAssertions {
    pub async fn to_have_url(&self, expected: impl Into<TextMatch>) -> E2eResult<()> {
        let expected = expected.into();
        let page = &self.page;
        let m = &expected;
        poll_until(
            self.timeout,
            true,
            || format!("expected page to have URL {}", expected),
            || async move {
                let url = page.url().await?;
                Ok::<_, E2eError>((m.matches(&url, false)?, url))
            },
        )
        .await
    }
}

fn truncate(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => format!("{}…", &text[..idx]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn test_poll_until_succeeds_after_retries() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        poll_until(Duration::from_secs(2), true, || "never".into(), || async move {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            Ok::<_, E2eError>((n >= 2, n.to_string()))
        })
        .await
        .unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_poll_until_reports_last_observation() {
        let err = poll_until(
            Duration::from_millis(250),
            true,
            || "expected table#vets to have count 2".into(),
            || async { Ok::<_, E2eError>((false, "count=6".to_string())) },
        )
        .await
        .unwrap_err();

        let msg = err.to_string();
        assert!(msg.contains("table#vets"), "{}", msg);
        assert!(msg.contains("count=6"), "{}", msg);
    }

    #[tokio::test]
    async fn test_poll_until_negated() {
        poll_until(Duration::from_millis(100), false, || "x".into(), || async {
            Ok::<_, E2eError>((false, "absent".to_string()))
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_poll_until_aborts_when_session_is_gone() {
        let started = Instant::now();
        let err = poll_until(Duration::from_secs(5), true, || "x".into(), || async {
            Err::<(bool, String), _>(E2eError::DriverClosed)
        })
        .await
        .unwrap_err();
        assert!(matches!(err, E2eError::DriverClosed));
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_poll_until_tolerates_transient_errors() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        poll_until(Duration::from_secs(2), true, || "x".into(), || async move {
            if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(E2eError::Driver("element detached".into()))
            } else {
                Ok::<_, E2eError>((true, String::new()))
            }
        })
        .await
        .unwrap();
    }

    fn check_ensure(duration_ms: u64) -> E2eResult<()> {
        ensure!(duration_ms < 3_000, "search took {} ms", duration_ms);
        Ok::<_, E2eError>(())
    }

    fn check_ensure_eq(active: &str) -> E2eResult<()> {
        ensure_eq!(active, "EN");
        Ok::<_, E2eError>(())
    }

    #[test]
    fn test_ensure_macros() {
        assert!(check_ensure(120).is_ok());
        assert!(matches!(check_ensure(4_000), Err(E2eError::AssertionFailed(m)) if m.contains("4000")));
        assert!(check_ensure_eq("EN").is_ok());
        assert!(check_ensure_eq("ES").is_err());
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("abc", 5), "abc");
        assert_eq!(truncate("abcdef", 3), "abc…");
    }
}
