use serde::{Deserialize, Serialize};

use crate::driver::protocol::WaitState;
use crate::error::E2eResult;
use crate::locator::Locator;
use crate::page::Page;
use crate::pages::BasePage;
use crate::selector::{Role, RoleOptions, TextMatch};

/// Values for the add/edit owner form
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnerForm {
    pub first_name: String,
    pub last_name: String,
    pub address: String,
    pub city: String,
    pub telephone: String,
}

impl OwnerForm {
    /// How the owner is listed and linked, e.g. `Betty Davis`
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Find Owners search fields; `None` leaves a field untouched
#[derive(Debug, Clone, Default)]
pub struct OwnerSearch {
    pub last_name: Option<String>,
    pub telephone: Option<String>,
    pub city: Option<String>,
}

/// Owner search, list, details and add/edit form
pub struct OwnerPage {
    page: Page,
}

impl BasePage for OwnerPage {
    fn page(&self) -> &Page {
        &self.page
    }
}

impl OwnerPage {
    pub fn new(page: &Page) -> Self {
        Self { page: page.clone() }
    }

    pub fn heading(&self) -> Locator {
        self.page.get_by_role(Role::Heading, RoleOptions::level(2))
    }

    pub fn owners_table(&self) -> Locator {
        self.page.locator("table#owners")
    }

    pub fn owner_information_heading(&self) -> Locator {
        self.page
            .get_by_role(Role::Heading, RoleOptions::named(TextMatch::pattern("Owner Information")))
    }

    pub fn pets_and_visits_heading(&self) -> Locator {
        self.page
            .get_by_role(Role::Heading, RoleOptions::named(TextMatch::pattern("Pets and Visits")))
    }

    pub async fn open_find_owners(&self) -> E2eResult<()> {
        self.goto("/owners/find").await?;
        self.page
            .get_by_role(Role::Heading, RoleOptions::named(TextMatch::pattern("Find Owners")))
            .wait_for(WaitState::Visible)
            .await
    }

    /// Details page of owner `id`
    pub async fn open_owner(&self, id: u32) -> E2eResult<()> {
        self.goto(&format!("/owners/{}", id)).await?;
        self.owner_information_heading().wait_for(WaitState::Visible).await
    }

    pub async fn open_new_owner_form(&self) -> E2eResult<()> {
        self.goto("/owners/new").await?;
        Ok(())
    }

    // ---- search ----

    fn find_owner_button(&self) -> Locator {
        self.page
            .get_by_role(Role::Button, RoleOptions::named(TextMatch::pattern("Find Owner")))
    }

    pub async fn search_by_last_name(&self, last_name: &str) -> E2eResult<()> {
        self.search_by_filters(&OwnerSearch {
            last_name: Some(last_name.to_string()),
            ..Default::default()
        })
        .await
    }

    pub async fn search_by_telephone(&self, telephone: &str) -> E2eResult<()> {
        self.search_by_filters(&OwnerSearch {
            telephone: Some(telephone.to_string()),
            ..Default::default()
        })
        .await
    }

    pub async fn search_by_city(&self, city: &str) -> E2eResult<()> {
        self.search_by_filters(&OwnerSearch {
            city: Some(city.to_string()),
            ..Default::default()
        })
        .await
    }

    /// Fill the provided fields, leave the rest as they are, submit once
    pub async fn search_by_filters(&self, search: &OwnerSearch) -> E2eResult<()> {
        let fields = [
            ("input#lastName", &search.last_name),
            ("input#telephone", &search.telephone),
            ("input#city", &search.city),
        ];
        for (selector, value) in fields {
            if let Some(value) = value {
                self.page.locator(selector).fill(value).await?;
            }
        }
        self.find_owner_button().click().await
    }

    /// Inline error under the search form
    pub fn telephone_validation_error(&self) -> Locator {
        self.page
            .locator("#search-owner-form .help-inline")
            .filter_has_text(TextMatch::pattern("telephone|digit"))
    }

    pub fn pagination_controls(&self) -> Locator {
        self.page.locator("div.liatrio-pagination")
    }

    pub async fn click_next_page(&self) -> E2eResult<()> {
        self.pagination_controls().locator(r#"a[title="Next"]"#).click().await
    }

    pub async fn click_previous_page(&self) -> E2eResult<()> {
        self.pagination_controls().locator(r#"a[title="Previous"]"#).click().await
    }

    pub fn active_filter_badge(&self) -> Locator {
        self.page.locator(".liatrio-active-filter")
    }

    pub async fn open_owner_details_by_name(&self, full_name: &str) -> E2eResult<()> {
        self.owners_table()
            .get_by_role(Role::Link, RoleOptions::named(full_name))
            .click()
            .await
    }

    // ---- add / edit ----

    pub async fn click_add_owner(&self) -> E2eResult<()> {
        self.page
            .get_by_role(Role::Link, RoleOptions::named(TextMatch::pattern("Add Owner")))
            .click()
            .await
    }

    pub async fn click_edit_owner(&self) -> E2eResult<()> {
        self.page
            .get_by_role(Role::Link, RoleOptions::named(TextMatch::pattern("Edit Owner")))
            .click()
            .await
    }

    /// Fields are found by their label text
    pub async fn fill_owner_form(&self, owner: &OwnerForm) -> E2eResult<()> {
        let fields = [
            ("First Name", &owner.first_name),
            ("Last Name", &owner.last_name),
            ("Address", &owner.address),
            ("City", &owner.city),
            ("Telephone", &owner.telephone),
        ];
        for (label, value) in fields {
            self.page.get_by_label(TextMatch::pattern(label)).fill(value).await?;
        }
        Ok(())
    }

    pub async fn fill_city(&self, city: &str) -> E2eResult<()> {
        self.page.get_by_label(TextMatch::pattern("City")).fill(city).await
    }

    pub fn submit_button(&self) -> Locator {
        self.page.get_by_role(
            Role::Button,
            RoleOptions::named(TextMatch::pattern("Add Owner|Update Owner")),
        )
    }

    pub async fn submit_owner_form(&self) -> E2eResult<()> {
        self.submit_button().click().await
    }

    pub fn duplicate_error_banner(&self) -> Locator {
        self.page.locator(".alert.alert-danger")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_name() {
        let owner = OwnerForm {
            first_name: "Betty".into(),
            last_name: "Davis".into(),
            address: "638 Cardinal Ave.".into(),
            city: "Sun Prairie".into(),
            telephone: "6085551749".into(),
        };
        assert_eq!(owner.full_name(), "Betty Davis");
    }
}
