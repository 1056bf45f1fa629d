use crate::driver::protocol::{LoadState, WaitState};
use crate::error::E2eResult;
use crate::locator::Locator;
use crate::page::Page;
use crate::pages::BasePage;
use crate::selector::{Role, RoleOptions, TextMatch};

/// Veterinarian directory with its specialty filter
pub struct VetPage {
    page: Page,
}

impl BasePage for VetPage {
    fn page(&self) -> &Page {
        &self.page
    }
}

impl VetPage {
    pub fn new(page: &Page) -> Self {
        Self { page: page.clone() }
    }

    pub fn heading(&self) -> Locator {
        self.page
            .get_by_role(Role::Heading, RoleOptions::named(TextMatch::pattern("Veterinarians")))
    }

    pub fn vets_table(&self) -> Locator {
        self.page.locator("table#vets")
    }

    pub fn rows(&self) -> Locator {
        self.vets_table().locator("tbody tr")
    }

    pub fn specialty_filter(&self) -> Locator {
        self.page.locator(r#"select[name="specialty"]"#)
    }

    pub async fn open(&self) -> E2eResult<()> {
        self.goto("/vets.html").await?;
        self.heading().wait_for(WaitState::Visible).await
    }

    /// Deep link with `?specialty=`; the value is percent-encoded
    pub async fn open_with_filter(&self, specialty: &str) -> E2eResult<()> {
        let mut url = self.page.url_for("/vets.html")?;
        url.query_pairs_mut().append_pair("specialty", specialty);
        self.goto(url.as_str()).await?;
        self.heading().wait_for(WaitState::Visible).await
    }

    /// Pick `value` (empty for all) and submit the filter form
    pub async fn filter_by_specialty(&self, value: &str) -> E2eResult<()> {
        self.specialty_filter().select_option(value).await?;
        self.page
            .locator(r#"form[action="/vets.html"] button[type="submit"]"#)
            .click()
            .await?;
        self.page.wait_for_load_state(LoadState::NetworkIdle).await
    }

    pub async fn selected_filter(&self) -> E2eResult<String> {
        self.specialty_filter().input_value().await
    }
}
