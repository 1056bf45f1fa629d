use crate::error::E2eResult;
use crate::expect::expect;
use crate::page::Page;
use crate::pages::BasePage;
use crate::selector::{Role, RoleOptions, TextMatch};

/// Pet actions on the owner details page
pub struct PetPage {
    page: Page,
}

impl BasePage for PetPage {
    fn page(&self) -> &Page {
        &self.page
    }
}

impl PetPage {
    pub fn new(page: &Page) -> Self {
        Self { page: page.clone() }
    }

    /// Delete button in the row describing `pet_name`
    pub async fn click_delete_pet_button(&self, pet_name: &str) -> E2eResult<()> {
        let name = self.page.locator("dd").filter_has_text(pet_name);
        self.page
            .locator("tr")
            .filter_has(&name)
            .get_by_role(Role::Button, RoleOptions::named(TextMatch::pattern("Delete Pet")))
            .first()
            .click()
            .await
    }

    pub async fn confirm_deletion(&self) -> E2eResult<()> {
        let modal = self.page.locator("#deletePetModal");
        expect(&modal).to_be_visible().await?;
        modal
            .get_by_role(Role::Button, RoleOptions::named(TextMatch::pattern("Confirm Delete")))
            .click()
            .await
    }
}
