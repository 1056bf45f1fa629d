use crate::driver::protocol::WaitState;
use crate::error::E2eResult;
use crate::locator::Locator;
use crate::page::Page;
use crate::pages::BasePage;
use crate::selector::{Role, RoleOptions, TextMatch};

/// New-visit form of a pet
pub struct VisitPage {
    page: Page,
}

impl BasePage for VisitPage {
    fn page(&self) -> &Page {
        &self.page
    }
}

impl VisitPage {
    pub fn new(page: &Page) -> Self {
        Self { page: page.clone() }
    }

    pub fn heading(&self) -> Locator {
        self.page
            .get_by_role(Role::Heading, RoleOptions::named(TextMatch::pattern("Visit")))
            .first()
    }

    /// `YYYY-MM-DD`
    pub async fn fill_visit_date(&self, date: &str) -> E2eResult<()> {
        self.page.locator("input#date").fill(date).await
    }

    pub async fn fill_description(&self, description: &str) -> E2eResult<()> {
        self.page.locator("input#description").fill(description).await
    }

    pub async fn submit(&self) -> E2eResult<()> {
        self.page
            .get_by_role(Role::Button, RoleOptions::named(TextMatch::pattern("Add Visit")))
            .click()
            .await
    }
}

/// Clinic-wide list of scheduled visits
pub struct UpcomingVisitsPage {
    page: Page,
}

impl BasePage for UpcomingVisitsPage {
    fn page(&self) -> &Page {
        &self.page
    }
}

impl UpcomingVisitsPage {
    pub fn new(page: &Page) -> Self {
        Self { page: page.clone() }
    }

    pub async fn open(&self) -> E2eResult<()> {
        self.goto("/visits/upcoming").await?;
        self.heading().wait_for(WaitState::Visible).await
    }

    pub fn heading(&self) -> Locator {
        self.page.locator("h2")
    }

    pub fn table(&self) -> Locator {
        self.page.locator("table.liatrio-table")
    }

    pub fn rows(&self) -> Locator {
        self.table().locator("tbody tr")
    }

    /// Cell `index` of row `row`
    pub fn cell(&self, row: i32, index: i32) -> Locator {
        self.rows().nth(row).locator("td").nth(index)
    }
}
