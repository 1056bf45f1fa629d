use futures::FutureExt;

use crate::driver::protocol::Viewport;
use crate::error::{E2eError, E2eResult};
use crate::expect::{expect, expect_page};
use crate::factory::{create_owner, unique_city, unique_prefix, OwnerOverrides};
use crate::helpers::measure_ms;
use crate::pages::{OwnerForm, OwnerPage, OwnerSearch};
use crate::runner::{Scenario, TestContext};
use crate::selector::{Role, RoleOptions, TextMatch};
use crate::{ensure, ensure_eq};

const DUPLICATE_OWNER_MESSAGE: &str =
    "An owner with this name already exists. Please search for the existing owner.";

const CSV_HEADER: &str = "id,firstName,lastName,address,city,telephone";

pub fn scenarios() -> Vec<Scenario> {
    vec![
        Scenario {
            suite: "Owner Management",
            name: "can search for an existing owner and view pets/visits",
            tags: &["owners", "seed-data"],
            run: |ctx| search_existing_owner(ctx).boxed(),
        },
        Scenario {
            suite: "Owner Management",
            name: "can add a new owner and then edit owner info",
            tags: &["owners"],
            run: |ctx| add_then_edit_owner(ctx).boxed(),
        },
        Scenario {
            suite: "Owner Management",
            name: "shows validation error for invalid telephone",
            tags: &["owners", "validation"],
            run: |ctx| invalid_telephone_on_form(ctx).boxed(),
        },
        Scenario {
            suite: "Owner Management",
            name: "owner form is usable in a mobile viewport",
            tags: &["owners", "responsive"],
            run: |ctx| mobile_owner_form(ctx).boxed(),
        },
        Scenario {
            suite: "Duplicate Owner Prevention",
            name: "blocks creating an owner with the same name and telephone",
            tags: &["owners", "validation"],
            run: |ctx| duplicate_on_create(ctx).boxed(),
        },
        Scenario {
            suite: "Duplicate Owner Prevention",
            name: "blocks renaming an owner to another owner's name and telephone",
            tags: &["owners", "validation"],
            run: |ctx| duplicate_on_rename(ctx).boxed(),
        },
        Scenario {
            suite: "Multi-Field Owner Search",
            name: "can find an owner by telephone number",
            tags: &["owners", "search"],
            run: |ctx| find_by_telephone(ctx).boxed(),
        },
        Scenario {
            suite: "Multi-Field Owner Search",
            name: "can find owners by city prefix",
            tags: &["owners", "search"],
            run: |ctx| find_by_city(ctx).boxed(),
        },
        Scenario {
            suite: "Multi-Field Owner Search",
            name: "can find an owner by combined telephone and city filters",
            tags: &["owners", "search"],
            run: |ctx| find_by_combined_filters(ctx).boxed(),
        },
        Scenario {
            suite: "Multi-Field Owner Search",
            name: "shows inline telephone validation error for invalid telephone input",
            tags: &["owners", "search", "validation"],
            run: |ctx| invalid_telephone_search(ctx).boxed(),
        },
        Scenario {
            suite: "Owner Filter Pagination",
            name: "preserves lastName filter across forward and backward pagination",
            tags: &["owners", "search"],
            run: |ctx| filter_survives_pagination(ctx).boxed(),
        },
        Scenario {
            suite: "Owner Page",
            name: "can search owners by last name and open owner details",
            tags: &["owners", "seed-data"],
            run: |ctx| owner_page_search(ctx).boxed(),
        },
        Scenario {
            suite: "Owner CSV Export",
            name: "GET /owners.csv returns text/csv with header row",
            tags: &["owners", "api"],
            run: |ctx| csv_export(ctx).boxed(),
        },
    ]
}

/// Add `owner` through the form and wait for its details page
async fn create_via_form(owners: &OwnerPage, owner: &OwnerForm) -> E2eResult<()> {
    owners.open_find_owners().await?;
    owners.click_add_owner().await?;
    owners.fill_owner_form(owner).await?;
    owners.submit_owner_form().await?;
    expect(&owners.owner_information_heading()).to_be_visible().await
}

/// Details page of `owner` and nobody else. Searches redirect there only on
/// a single match; several matches render the owners list instead.
async fn expect_details_of(ctx: &TestContext, owners: &OwnerPage, owner: &OwnerForm) -> E2eResult<()> {
    expect(&owners.owner_information_heading()).to_be_visible().await?;
    for text in [owner.full_name(), owner.telephone.clone()] {
        expect(&ctx.page.get_by_role(Role::Cell, RoleOptions::named(TextMatch::exact(text))))
            .to_be_visible()
            .await?;
    }
    Ok(())
}

async fn search_existing_owner(ctx: TestContext) -> E2eResult<()> {
    let owners = OwnerPage::new(&ctx.page);
    owners.open_find_owners().await?;

    let (searched, duration_ms) = measure_ms(async {
        owners.search_by_last_name("Davis").await?;
        expect(&owners.owners_table()).to_be_visible().await
    })
    .await;
    searched?;

    ctx.page
        .screenshot(&ctx.output_path("owner-search-results.png"), true)
        .await?;
    ensure!(duration_ms < 3_000, "search took {} ms, budget is 3000 ms", duration_ms);

    owners.open_owner_details_by_name("Betty Davis").await?;
    expect(&owners.owner_information_heading()).to_be_visible().await?;
    expect(&owners.pets_and_visits_heading()).to_be_visible().await
}

async fn add_then_edit_owner(ctx: TestContext) -> E2eResult<()> {
    let owners = OwnerPage::new(&ctx.page);
    let owner = create_owner(OwnerOverrides::default());

    owners.open_find_owners().await?;
    owners.click_add_owner().await?;
    owners.fill_owner_form(&owner).await?;
    ctx.page
        .screenshot(&ctx.output_path("new-owner-form-filled.png"), true)
        .await?;
    owners.submit_owner_form().await?;

    expect(&owners.owner_information_heading()).to_be_visible().await?;
    expect(&ctx.page.get_by_role(Role::Cell, RoleOptions::named(owner.full_name())))
        .to_be_visible()
        .await?;

    owners.click_edit_owner().await?;
    owners.fill_city("Updated City").await?;
    owners.submit_owner_form().await?;

    expect(&owners.owner_information_heading()).to_be_visible().await?;
    expect(&ctx.page.get_by_role(Role::Cell, RoleOptions::named(TextMatch::pattern("Updated City"))))
        .to_be_visible()
        .await?;

    ctx.page
        .screenshot(&ctx.output_path("owner-details-after-edit.png"), true)
        .await
}

async fn invalid_telephone_on_form(ctx: TestContext) -> E2eResult<()> {
    let owners = OwnerPage::new(&ctx.page);
    let owner = create_owner(OwnerOverrides::default().telephone("123"));

    owners.open_find_owners().await?;
    owners.click_add_owner().await?;
    owners.fill_owner_form(&owner).await?;
    owners.submit_owner_form().await?;

    expect(&ctx.page.get_by_text(TextMatch::pattern("Telephone must be a 10-digit number")))
        .to_be_visible()
        .await
}

async fn mobile_owner_form(ctx: TestContext) -> E2eResult<()> {
    let owners = OwnerPage::new(&ctx.page);
    ctx.page
        .set_viewport_size(Viewport { width: 375, height: 812 })
        .await?;

    owners.open_find_owners().await?;
    owners.click_add_owner().await?;

    expect(&ctx.page.get_by_role(Role::Button, RoleOptions::named(TextMatch::pattern("Add Owner"))))
        .to_be_visible()
        .await
}

async fn expect_duplicate_banner(owners: &OwnerPage) -> E2eResult<()> {
    let banner = owners.duplicate_error_banner();
    expect(&banner).to_be_visible().await?;
    expect(&banner).to_contain_text(DUPLICATE_OWNER_MESSAGE).await
}

async fn duplicate_on_create(ctx: TestContext) -> E2eResult<()> {
    let owners = OwnerPage::new(&ctx.page);
    // Same object twice so the second submission matches the first exactly
    let owner = create_owner(
        OwnerOverrides::default()
            .first_name("Duplicate")
            .last_name("DetectionTest"),
    );

    create_via_form(&owners, &owner).await?;

    owners.open_find_owners().await?;
    owners.click_add_owner().await?;
    owners.fill_owner_form(&owner).await?;
    owners.submit_owner_form().await?;

    expect_duplicate_banner(&owners).await?;
    ctx.page
        .screenshot(&ctx.output_path("create-duplicate-error.png"), true)
        .await?;

    // Still exactly one record with this telephone
    owners.open_find_owners().await?;
    owners.search_by_telephone(&owner.telephone).await?;
    expect_details_of(&ctx, &owners, &owner).await
}

async fn duplicate_on_rename(ctx: TestContext) -> E2eResult<()> {
    let owners = OwnerPage::new(&ctx.page);
    let first = create_owner(
        OwnerOverrides::default()
            .first_name("Original")
            .last_name("OwnerRecord"),
    );
    let second = create_owner(
        OwnerOverrides::default()
            .first_name("Another")
            .last_name("PersonRecord"),
    );

    create_via_form(&owners, &first).await?;
    create_via_form(&owners, &second).await?;

    owners.click_edit_owner().await?;
    owners
        .fill_owner_form(&OwnerForm {
            first_name: first.first_name.clone(),
            last_name: first.last_name.clone(),
            telephone: first.telephone.clone(),
            ..second.clone()
        })
        .await?;
    owners.submit_owner_form().await?;

    expect_duplicate_banner(&owners).await?;
    ctx.page
        .screenshot(&ctx.output_path("edit-duplicate-error.png"), true)
        .await
}

async fn find_by_telephone(ctx: TestContext) -> E2eResult<()> {
    let owners = OwnerPage::new(&ctx.page);
    let owner = create_owner(OwnerOverrides::default());
    create_via_form(&owners, &owner).await?;

    // A unique match redirects straight to the details page
    owners.open_find_owners().await?;
    owners.search_by_telephone(&owner.telephone).await?;

    expect_details_of(&ctx, &owners, &owner).await?;
    ctx.page
        .screenshot(&ctx.output_path("e2e-find-by-telephone.png"), true)
        .await
}

async fn find_by_city(ctx: TestContext) -> E2eResult<()> {
    let owners = OwnerPage::new(&ctx.page);
    let city = unique_city();
    let owner = create_owner(OwnerOverrides::default().city(city.clone()));
    create_via_form(&owners, &owner).await?;

    owners.open_find_owners().await?;
    owners.search_by_city(&city).await?;
    expect_details_of(&ctx, &owners, &owner).await?;
    ctx.page
        .screenshot(&ctx.output_path("e2e-find-by-city.png"), true)
        .await?;

    // A strict prefix of the unique city still finds only this owner
    let prefix = &city[..city.len() - 2];
    owners.open_find_owners().await?;
    owners.search_by_city(prefix).await?;
    expect_details_of(&ctx, &owners, &owner).await
}

async fn find_by_combined_filters(ctx: TestContext) -> E2eResult<()> {
    let owners = OwnerPage::new(&ctx.page);
    let owner = create_owner(OwnerOverrides::default());
    create_via_form(&owners, &owner).await?;

    owners.open_find_owners().await?;
    owners
        .search_by_filters(&OwnerSearch {
            telephone: Some(owner.telephone.clone()),
            city: Some(owner.city.clone()),
            ..Default::default()
        })
        .await?;

    expect_details_of(&ctx, &owners, &owner).await?;
    ctx.page
        .screenshot(&ctx.output_path("e2e-find-by-combined.png"), true)
        .await
}

async fn invalid_telephone_search(ctx: TestContext) -> E2eResult<()> {
    let owners = OwnerPage::new(&ctx.page);
    owners.open_find_owners().await?;
    owners.search_by_telephone("123").await?;

    let error = owners.telephone_validation_error();
    expect(&error).to_be_visible().await?;
    expect(&error).to_contain_text("10-digit").await
}

async fn filter_survives_pagination(ctx: TestContext) -> E2eResult<()> {
    let owners = OwnerPage::new(&ctx.page);

    // Six owners under one prefix; the list shows five per page
    let prefix = unique_prefix("PageTest");
    for i in 0..6 {
        owners.open_new_owner_form().await?;
        let owner = create_owner(OwnerOverrides::default().last_name(format!("{}{}", prefix, i)));
        owners.fill_owner_form(&owner).await?;
        owners.submit_owner_form().await?;
        expect(&owners.owner_information_heading()).to_be_visible().await?;
    }

    owners.open_find_owners().await?;
    owners.search_by_last_name(&prefix).await?;

    let last_name_param = format!("lastName={}", prefix);
    let page = expect_page(&ctx.page);
    let badge = owners.active_filter_badge();

    expect(&owners.owners_table()).to_be_visible().await?;
    page.to_have_url(TextMatch::exact(last_name_param.clone())).await?;
    expect(&badge).to_be_visible().await?;
    expect(&badge).to_contain_text(prefix.clone()).await?;

    owners.click_next_page().await?;
    page.to_have_url(TextMatch::exact("page=2")).await?;
    expect(&owners.owners_table()).to_be_visible().await?;
    page.to_have_url(TextMatch::exact(last_name_param.clone())).await?;
    expect(&badge).to_be_visible().await?;

    ctx.page
        .screenshot(&ctx.output_path("filter-pagination-url.png"), false)
        .await?;
    owners
        .pagination_controls()
        .screenshot(&ctx.output_path("filter-pagination-links.png"))
        .await?;

    owners.click_previous_page().await?;
    page.to_have_url(TextMatch::exact("page=1")).await?;
    expect(&owners.owners_table()).to_be_visible().await?;
    page.to_have_url(TextMatch::exact(last_name_param)).await?;
    expect(&badge).to_be_visible().await?;
    expect(&badge).to_contain_text(prefix).await?;

    ctx.page
        .screenshot(&ctx.output_path("filter-pagination-page1.png"), true)
        .await
}

async fn owner_page_search(ctx: TestContext) -> E2eResult<()> {
    let owners = OwnerPage::new(&ctx.page);
    owners.open_find_owners().await?;
    owners.search_by_last_name("Davis").await?;

    let table = owners.owners_table();
    expect(&table).to_be_visible().await?;
    expect(&table.locator("tbody tr")).to_have_count(2).await?;

    owners.open_owner_details_by_name("Betty Davis").await?;
    expect(&owners.heading().filter_has_text(TextMatch::pattern("Owner Information")))
        .to_be_visible()
        .await?;

    ctx.page
        .screenshot(&ctx.output_path("owner-details.png"), true)
        .await
}

async fn csv_export(ctx: TestContext) -> E2eResult<()> {
    let url = ctx.page.url_for("/owners.csv")?;
    let response = reqwest::get(url).await?;

    ensure_eq!(response.status().as_u16(), 200);
    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    ensure!(
        content_type.contains("text/csv"),
        "expected text/csv, got {:?}",
        content_type
    );

    let body = response.text().await?;
    let header = body
        .lines()
        .next()
        .map(|line| line.trim_start_matches('\u{feff}').trim_end())
        .ok_or_else(|| E2eError::AssertionFailed("CSV body is empty".into()))?;
    ensure_eq!(header, CSV_HEADER);
    Ok(())
}
