use std::path::Path;

use async_trait::async_trait;

use crate::driver::protocol::LoadState;
use crate::error::E2eResult;
use crate::locator::Locator;
use crate::page::{Page, Response};
use crate::selector::{Role, RoleOptions, TextMatch};

const LANG_SELECTOR: &str = r#"[data-testid="lang-selector"]"#;

/// Capabilities every screen shares.
///
/// Implementors only provide [`BasePage::page`]; the navigation bar and the
/// language menu are on every page of the application.
#[async_trait]
pub trait BasePage: Send + Sync {
    fn page(&self) -> &Page;

    /// Navigate to `path` relative to the base URL
    async fn goto(&self, path: &str) -> E2eResult<Option<Response>> {
        self.page().goto(path).await
    }

    /// A link inside the top navigation bar only; page bodies reuse the same
    /// labels for call-to-action buttons
    fn nav_link(&self, name: TextMatch) -> Locator {
        self.page()
            .locator("nav.navbar")
            .get_by_role(Role::Link, RoleOptions::named(name))
    }

    async fn go_home(&self) -> E2eResult<()> {
        self.nav_link(TextMatch::pattern("Home")).click().await
    }

    async fn go_find_owners(&self) -> E2eResult<()> {
        self.nav_link(TextMatch::pattern("Find Owners")).click().await
    }

    async fn go_veterinarians(&self) -> E2eResult<()> {
        self.nav_link(TextMatch::pattern("Veterinarians")).click().await
    }

    async fn screenshot(&self, path: &Path) -> E2eResult<()> {
        self.page().screenshot(path, true).await
    }

    fn language_selector_toggle(&self) -> Locator {
        self.page()
            .locator(&format!("{} .dropdown-toggle", LANG_SELECTOR))
    }

    /// Open the language menu, pick `code`, and wait for the reload to settle
    async fn switch_language(&self, code: &str) -> E2eResult<()> {
        self.language_selector_toggle().click().await?;
        self.page()
            .locator(&format!("{} .dropdown-item", LANG_SELECTOR))
            .filter_has_text(code)
            .click()
            .await?;
        self.page().wait_for_load_state(LoadState::NetworkIdle).await
    }

    /// Label shown on the language toggle, e.g. `EN`
    async fn active_language(&self) -> E2eResult<String> {
        let text = self.language_selector_toggle().text_content().await?;
        Ok(text.unwrap_or_default().trim().to_string())
    }

    async fn open_with_language(&self, lang: &str) -> E2eResult<()> {
        self.goto(&format!("/?lang={}", lang)).await?;
        self.page().wait_for_load_state(LoadState::NetworkIdle).await
    }
}
