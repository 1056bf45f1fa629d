use futures::FutureExt;

use crate::ensure_eq;
use crate::error::E2eResult;
use crate::expect::{expect, expect_page};
use crate::pages::{BasePage, HomePage, OwnerPage, VetPage};
use crate::runner::{Scenario, TestContext};
use crate::selector::TextMatch;

pub fn scenarios() -> Vec<Scenario> {
    vec![Scenario {
        suite: "Navigation",
        name: "navigation links route to expected pages",
        tags: &["navigation"],
        run: |ctx| nav_links_route(ctx).boxed(),
    }]
}

async fn nav_links_route(ctx: TestContext) -> E2eResult<()> {
    let home = HomePage::new(&ctx.page);
    let owners = OwnerPage::new(&ctx.page);
    let vets = VetPage::new(&ctx.page);

    home.open().await?;

    home.go_find_owners().await?;
    expect(&owners.heading()).to_have_text(TextMatch::pattern("Find Owners")).await?;

    owners.go_veterinarians().await?;
    expect(&vets.heading()).to_be_visible().await?;

    vets.go_home().await?;
    expect_page(&ctx.page)
        .to_have_url(TextMatch::regex(r"^[a-z]+://[^/]+/(\?.*)?$"))
        .await?;
    ensure_eq!(ctx.page.pathname().await?, "/");
    Ok(())
}
