use chrono::Utc;
use futures::FutureExt;
use regex::Regex;

use crate::ensure;
use crate::error::{E2eError, E2eResult};
use crate::expect::{expect, expect_page};
use crate::helpers::{one_year_from_today, today, yesterday};
use crate::pages::{OwnerPage, UpcomingVisitsPage, VisitPage};
use crate::runner::{Scenario, TestContext};
use crate::selector::{Role, RoleOptions, TextMatch};

pub fn scenarios() -> Vec<Scenario> {
    vec![
        Scenario {
            suite: "Visit Scheduling",
            name: "can schedule a visit for an existing pet",
            tags: &["visits", "seed-data"],
            run: |ctx| schedule_visit(ctx).boxed(),
        },
        Scenario {
            suite: "Visit Scheduling",
            name: "validates visit description is required",
            tags: &["visits", "validation", "seed-data"],
            run: |ctx| description_required(ctx).boxed(),
        },
        Scenario {
            suite: "Visit Scheduling",
            name: "rejects a past date and shows a validation error",
            tags: &["visits", "validation", "seed-data"],
            run: |ctx| past_date_rejected(ctx).boxed(),
        },
        Scenario {
            suite: "Visit Scheduling",
            name: "accepts today's date and redirects to the owner page",
            tags: &["visits", "seed-data"],
            run: |ctx| today_accepted(ctx).boxed(),
        },
        Scenario {
            suite: "Visit Scheduling",
            name: "accepts a future date and redirects to the owner page",
            tags: &["visits", "seed-data"],
            run: |ctx| future_date_accepted(ctx).boxed(),
        },
        Scenario {
            suite: "Upcoming Visits",
            name: "navigates to page via nav link and shows heading",
            tags: &["visits", "navigation"],
            run: |ctx| upcoming_via_nav(ctx).boxed(),
        },
        Scenario {
            suite: "Upcoming Visits",
            name: "displays at least one visit row from seed data",
            tags: &["visits", "seed-data"],
            run: |ctx| upcoming_rows(ctx).boxed(),
        },
    ]
}

/// Owner 1's details page, then the first pet's Add Visit form
async fn open_add_visit(ctx: &TestContext) -> E2eResult<VisitPage> {
    OwnerPage::new(&ctx.page).open_owner(1).await?;
    ctx.page
        .get_by_role(Role::Link, RoleOptions::named(TextMatch::pattern("Add Visit")))
        .first()
        .click()
        .await?;
    Ok(VisitPage::new(&ctx.page))
}

async fn schedule_visit(ctx: TestContext) -> E2eResult<()> {
    let owners = OwnerPage::new(&ctx.page);
    let visit = VisitPage::new(&ctx.page);

    // Direct URL instead of a last-name search, which may redirect on a single match
    owners.open_owner(1).await?;

    let add_visit = ctx
        .page
        .get_by_role(Role::Link, RoleOptions::named(TextMatch::pattern("^Add Visit$")))
        .first();
    let href = add_visit
        .get_attribute("href")
        .await?
        .ok_or_else(|| E2eError::AssertionFailed("Add Visit link has no href".into()))?;
    let pet_id = Regex::new(r"pets/(\d+)/")?
        .captures(&href)
        .map(|c| c[1].to_string())
        .ok_or_else(|| {
            E2eError::AssertionFailed(format!("Add Visit href has no pet id: {}", href))
        })?;

    add_visit.click().await?;
    expect(&visit.heading()).to_be_visible().await?;

    let date = one_year_from_today();
    let description = format!("E2E visit {}", Utc::now().timestamp_millis());
    visit.fill_visit_date(&date).await?;
    visit.fill_description(&description).await?;
    ctx.page
        .screenshot(&ctx.output_path("visit-scheduling-form.png"), true)
        .await?;
    visit.submit().await?;

    expect(&owners.pets_and_visits_heading()).to_be_visible().await?;

    let pet_visits = ctx
        .page
        .locator(&format!(r#"a[href*="pets/{}/visits/new"]"#, pet_id))
        .first()
        .locator("xpath=ancestor::table[1]");
    let row = pet_visits
        .locator("tr")
        .filter_has_text(TextMatch::exact(date))
        .filter_has_text(TextMatch::exact(description));
    expect(&row).to_have_count(1).await
}

async fn description_required(ctx: TestContext) -> E2eResult<()> {
    let visit = open_add_visit(&ctx).await?;
    visit.fill_visit_date(&one_year_from_today()).await?;
    visit.submit().await?;

    expect(&ctx.page.get_by_text(TextMatch::pattern("must not be blank")))
        .to_be_visible()
        .await
}

async fn past_date_rejected(ctx: TestContext) -> E2eResult<()> {
    let visit = open_add_visit(&ctx).await?;
    visit.fill_visit_date(&yesterday()).await?;
    visit.fill_description("Past date test").await?;
    visit.submit().await?;

    expect(&ctx.page.get_by_text(TextMatch::pattern(
        "Invalid date: please choose today or a future date",
    )))
    .to_be_visible()
    .await?;

    ctx.page
        .screenshot(&ctx.output_path("past-date-validation-error.png"), false)
        .await
}

async fn today_accepted(ctx: TestContext) -> E2eResult<()> {
    let visit = open_add_visit(&ctx).await?;
    visit.fill_visit_date(&today()).await?;
    visit.fill_description("Same-day urgent visit").await?;
    visit.submit().await?;

    expect(&OwnerPage::new(&ctx.page).pets_and_visits_heading())
        .to_be_visible()
        .await
}

async fn future_date_accepted(ctx: TestContext) -> E2eResult<()> {
    let visit = open_add_visit(&ctx).await?;
    visit.fill_visit_date(&one_year_from_today()).await?;
    visit.fill_description("Scheduled future visit").await?;
    visit.submit().await?;

    expect(&OwnerPage::new(&ctx.page).pets_and_visits_heading())
        .to_be_visible()
        .await
}

async fn upcoming_via_nav(ctx: TestContext) -> E2eResult<()> {
    let upcoming = UpcomingVisitsPage::new(&ctx.page);

    // Start from the vet list so the navigation bar is present
    ctx.page.goto("/vets.html").await?;
    ctx.page
        .get_by_role(Role::Link, RoleOptions::named(TextMatch::pattern("upcoming visits")))
        .click()
        .await?;

    expect_page(&ctx.page)
        .to_have_url(TextMatch::regex("/visits/upcoming"))
        .await?;
    expect(&upcoming.heading())
        .to_contain_text(TextMatch::pattern("upcoming visits"))
        .await?;

    ctx.page
        .screenshot(&ctx.output_path("upcoming-visits-nav.png"), true)
        .await
}

async fn upcoming_rows(ctx: TestContext) -> E2eResult<()> {
    let upcoming = UpcomingVisitsPage::new(&ctx.page);
    upcoming.open().await?;

    expect(&upcoming.table()).to_be_visible().await?;
    let rows = upcoming.rows().count().await?;
    ensure!(rows > 0, "Expected seeded upcoming visits to be present");

    // owner link, pet link, date, description
    expect(&upcoming.cell(0, 0).locator("a")).to_be_visible().await?;
    expect(&upcoming.cell(0, 1).locator("a")).to_be_visible().await?;
    expect(&upcoming.cell(0, 2)).not().to_be_empty().await?;
    expect(&upcoming.cell(0, 3)).not().to_be_empty().await?;

    ctx.page
        .screenshot(&ctx.output_path("upcoming-visits-data.png"), true)
        .await
}
