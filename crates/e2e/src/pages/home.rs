use crate::driver::protocol::{LoadState, WaitState};
use crate::error::E2eResult;
use crate::expect::expect;
use crate::locator::Locator;
use crate::page::Page;
use crate::pages::BasePage;

/// Landing page, which also hosts the chat widget
pub struct HomePage {
    page: Page,
}

impl BasePage for HomePage {
    fn page(&self) -> &Page {
        &self.page
    }
}

impl HomePage {
    pub fn new(page: &Page) -> Self {
        Self { page: page.clone() }
    }

    pub async fn open(&self) -> E2eResult<()> {
        self.goto("/").await?;
        self.page.locator("nav.navbar").wait_for(WaitState::Visible).await?;
        self.page.wait_for_load_state(LoadState::NetworkIdle).await
    }

    // ---- chat widget ----

    pub fn chat_toggle(&self) -> Locator {
        self.page.get_by_test_id("chat-toggle")
    }

    pub fn chat_panel(&self) -> Locator {
        self.page.get_by_test_id("chat-panel")
    }

    pub fn chat_input(&self) -> Locator {
        self.page.get_by_test_id("chat-input")
    }

    pub fn chat_send(&self) -> Locator {
        self.page.get_by_test_id("chat-send")
    }

    pub fn chat_messages(&self) -> Locator {
        self.page.get_by_test_id("chat-messages")
    }

    /// Messages the user sent that contain `text`
    pub fn user_message(&self, text: &str) -> Locator {
        self.chat_messages()
            .locator(r#"[data-role="user"]"#)
            .filter_has_text(text)
    }

    pub fn last_bot_message(&self) -> Locator {
        self.chat_messages().locator(r#"[data-role="bot"]"#).last()
    }

    /// Open the panel unless it already is
    pub async fn open_chat(&self) -> E2eResult<()> {
        if !self.chat_panel().is_visible().await? {
            self.chat_toggle().click().await?;
        }
        expect(&self.chat_panel()).to_be_visible().await
    }

    /// Type `text` and press send. Returns once the click lands; the reply
    /// may still be streaming.
    pub async fn send_message(&self, text: &str) -> E2eResult<()> {
        self.chat_input().fill(text).await?;
        self.chat_send().click().await
    }
}
