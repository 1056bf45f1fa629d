//! Lazily-resolved element handles
//!
//! A [`Locator`] is a selector chain plus the session it belongs to. Nothing
//! is looked up until an action or query is sent, so a locator can be built
//! before the element exists and reused across re-renders.

use std::fmt;
use std::path::Path;

use serde::de::DeserializeOwned;

use crate::driver::protocol::{Action, Command, Query, WaitState};
use crate::driver::Driver;
use crate::error::E2eResult;
use crate::selector::{describe_chain, Role, RoleOptions, Segment, TextMatch};

#[derive(Clone)]
pub struct Locator {
    driver: Driver,
    chain: Vec<Segment>,
}

impl Locator {
    pub(crate) fn new(driver: Driver, chain: Vec<Segment>) -> Self {
        Self { driver, chain }
    }

    pub(crate) fn driver(&self) -> &Driver {
        &self.driver
    }

    pub fn chain(&self) -> &[Segment] {
        &self.chain
    }

    fn then(&self, segment: Segment) -> Self {
        let mut chain = self.chain.clone();
        chain.push(segment);
        Self::new(self.driver.clone(), chain)
    }

    // ---- composition ----

    /// Descendants matching a CSS (or other engine) selector
    pub fn locator(&self, selector: &str) -> Self {
        self.then(Segment::Css { selector: selector.to_string() })
    }

    pub fn get_by_role(&self, role: Role, options: RoleOptions) -> Self {
        self.then(Segment::Role { role, name: options.name, level: options.level })
    }

    pub fn get_by_label(&self, text: impl Into<TextMatch>) -> Self {
        self.then(Segment::Label { text: text.into() })
    }

    pub fn get_by_text(&self, text: impl Into<TextMatch>) -> Self {
        self.then(Segment::Text { text: text.into() })
    }

    /// Keep only matches containing `text` somewhere inside
    pub fn filter_has_text(&self, text: impl Into<TextMatch>) -> Self {
        self.then(Segment::Filter { has_text: Some(text.into()), has: None })
    }

    /// Keep only matches containing an element matching `inner`
    pub fn filter_has(&self, inner: &Locator) -> Self {
        self.then(Segment::Filter { has_text: None, has: Some(inner.chain.clone()) })
    }

    pub fn nth(&self, index: i32) -> Self {
        self.then(Segment::Nth { index })
    }

    pub fn first(&self) -> Self {
        self.then(Segment::First)
    }

    pub fn last(&self) -> Self {
        self.then(Segment::Last)
    }

    // ---- actions ----

    async fn act(&self, action: Action) -> E2eResult<()> {
        let _: serde_json::Value = self
            .driver
            .request(Command::Action { locator: self.chain.clone(), action })
            .await?;
        Ok(())
    }

    pub async fn click(&self) -> E2eResult<()> {
        self.act(Action::Click).await
    }

    pub async fn fill(&self, value: &str) -> E2eResult<()> {
        self.act(Action::Fill { value: value.to_string() }).await
    }

    pub async fn select_option(&self, value: &str) -> E2eResult<()> {
        self.act(Action::SelectOption { value: value.to_string() }).await
    }

    pub async fn press(&self, key: &str) -> E2eResult<()> {
        self.act(Action::Press { key: key.to_string() }).await
    }

    pub async fn check(&self) -> E2eResult<()> {
        self.act(Action::Check).await
    }

    pub async fn hover(&self) -> E2eResult<()> {
        self.act(Action::Hover).await
    }

    /// Wait until the element reaches `state`, using the action timeout
    pub async fn wait_for(&self, state: WaitState) -> E2eResult<()> {
        self.act(Action::WaitFor { state, timeout_ms: None }).await
    }

    // ---- queries (no auto-wait) ----

    async fn query<T: DeserializeOwned>(&self, query: Query) -> E2eResult<T> {
        self.driver
            .request(Command::Query { locator: self.chain.clone(), query })
            .await
    }

    pub async fn count(&self) -> E2eResult<usize> {
        self.query(Query::Count).await
    }

    pub async fn is_visible(&self) -> E2eResult<bool> {
        self.query(Query::IsVisible).await
    }

    pub async fn is_enabled(&self) -> E2eResult<bool> {
        self.query(Query::IsEnabled).await
    }

    pub async fn text_content(&self) -> E2eResult<Option<String>> {
        self.query(Query::TextContent).await
    }

    pub async fn inner_text(&self) -> E2eResult<String> {
        self.query(Query::InnerText).await
    }

    pub async fn input_value(&self) -> E2eResult<String> {
        self.query(Query::InputValue).await
    }

    pub async fn all_text_contents(&self) -> E2eResult<Vec<String>> {
        self.query(Query::AllTextContents).await
    }

    pub async fn get_attribute(&self, name: &str) -> E2eResult<Option<String>> {
        self.query(Query::GetAttribute { name: name.to_string() }).await
    }

    /// Run a JavaScript function (source text) against the element
    pub async fn evaluate<T: DeserializeOwned>(&self, function: &str) -> E2eResult<T> {
        self.driver
            .request(Command::Evaluate {
                expression: function.to_string(),
                locator: Some(self.chain.clone()),
            })
            .await
    }

    /// Computed style property of the element, e.g. `fontFamily`
    pub async fn computed_style(&self, property: &str) -> E2eResult<String> {
        self.evaluate(&format!(
            "(element) => window.getComputedStyle(element).{}",
            property
        ))
        .await
    }

    pub async fn screenshot(&self, path: &Path) -> E2eResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let _: serde_json::Value = self
            .driver
            .request(Command::Screenshot {
                path: path.to_path_buf(),
                full_page: false,
                locator: Some(self.chain.clone()),
            })
            .await?;
        Ok(())
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", describe_chain(&self.chain))
    }
}

impl fmt::Debug for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Locator({})", describe_chain(&self.chain))
    }
}
