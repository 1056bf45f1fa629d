use crate::error::E2eResult;
use crate::locator::Locator;
use crate::page::Page;
use crate::pages::BasePage;
use crate::selector::TextMatch;

/// Friendly page shown for unknown owners and pets
pub struct ErrorPage {
    page: Page,
}

impl BasePage for ErrorPage {
    fn page(&self) -> &Page {
        &self.page
    }
}

impl ErrorPage {
    pub fn new(page: &Page) -> Self {
        Self { page: page.clone() }
    }

    pub fn not_found_message(&self) -> Locator {
        self.page
            .get_by_text(TextMatch::pattern("couldn't find that pet or owner"))
    }

    /// The page-body button, not the navigation link with the same label
    pub fn find_owners_action(&self) -> Locator {
        self.page.locator(".btn-primary").filter_has_text("Find Owners")
    }

    pub async fn body_text(&self) -> E2eResult<String> {
        Ok(self.page.locator("body").text_content().await?.unwrap_or_default())
    }
}
