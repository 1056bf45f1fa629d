use futures::FutureExt;
use regex::RegexBuilder;

use crate::error::E2eResult;
use crate::expect::{expect, expect_page};
use crate::pages::ErrorPage;
use crate::runner::{Scenario, TestContext};
use crate::selector::TextMatch;
use crate::{ensure, ensure_eq};

/// Must never appear on an error page
const LEAKED_INTERNALS: [&str; 4] = ["exception", "java", "stack trace", r"org\.springframework"];

pub fn scenarios() -> Vec<Scenario> {
    vec![
        Scenario {
            suite: "404 Error Handling",
            name: "should show friendly 404 page for non-existent owner",
            tags: &["errors"],
            run: |ctx| unknown_owner(ctx).boxed(),
        },
        Scenario {
            suite: "404 Error Handling",
            name: "should show Find Owners link on 404 page",
            tags: &["errors", "navigation"],
            run: |ctx| find_owners_action(ctx).boxed(),
        },
        Scenario {
            suite: "404 Error Handling",
            name: "should not expose stack traces or technical details",
            tags: &["errors"],
            run: |ctx| no_leaked_internals(ctx).boxed(),
        },
        Scenario {
            suite: "404 Error Handling",
            name: "should show 404 for non-existent pet",
            tags: &["errors", "seed-data"],
            run: |ctx| unknown_pet(ctx).boxed(),
        },
    ]
}

async fn expect_not_found(ctx: &TestContext, path: &str) -> E2eResult<()> {
    let response = ctx.page.goto(path).await?;
    ensure_eq!(response.map(|r| r.status), Some(404));
    expect(&ErrorPage::new(&ctx.page).not_found_message())
        .to_be_visible()
        .await
}

async fn unknown_owner(ctx: TestContext) -> E2eResult<()> {
    expect_not_found(&ctx, "/owners/99999").await
}

async fn unknown_pet(ctx: TestContext) -> E2eResult<()> {
    expect_not_found(&ctx, "/owners/1/pets/99999/edit").await
}

async fn find_owners_action(ctx: TestContext) -> E2eResult<()> {
    let error = ErrorPage::new(&ctx.page);
    ctx.page.goto("/owners/99999").await?;

    let action = error.find_owners_action();
    expect(&action).to_be_visible().await?;
    action.click().await?;

    expect_page(&ctx.page)
        .to_have_url(TextMatch::regex(r"/owners/find"))
        .await
}

async fn no_leaked_internals(ctx: TestContext) -> E2eResult<()> {
    let error = ErrorPage::new(&ctx.page);
    ctx.page.goto("/owners/99999").await?;

    let body = error.body_text().await?;
    for pattern in LEAKED_INTERNALS {
        let re = RegexBuilder::new(pattern).case_insensitive(true).build()?;
        ensure!(!re.is_match(&body), "404 page leaks /{}/i", pattern);
    }
    Ok(())
}
