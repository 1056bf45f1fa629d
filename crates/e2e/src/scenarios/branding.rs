use futures::FutureExt;

use crate::error::E2eResult;
use crate::pages::{HomePage, OwnerPage};
use crate::runner::{Scenario, TestContext};
use crate::selector::{Role, RoleOptions, TextMatch};
use crate::{ensure, ensure_eq};

const BRAND_FONT: &str = "DM Sans";

pub fn scenarios() -> Vec<Scenario> {
    vec![Scenario {
        suite: "Branding",
        name: "uses Emerald Grove logo, colors, and typography",
        tags: &["branding"],
        run: |ctx| emerald_grove_branding(ctx).boxed(),
    }]
}

async fn emerald_grove_branding(ctx: TestContext) -> E2eResult<()> {
    let home = HomePage::new(&ctx.page);
    let owners = OwnerPage::new(&ctx.page);
    home.open().await?;

    let logo = ctx
        .page
        .locator(".navbar-brand-logo")
        .computed_style("backgroundImage")
        .await?;
    ensure!(
        logo.to_lowercase().contains("emerald-grove"),
        "logo background is {:?}",
        logo
    );

    let body = ctx.page.locator("body");
    let body_font = body.computed_style("fontFamily").await?;
    ensure!(body_font.contains(BRAND_FONT), "body font is {:?}", body_font);
    ensure_eq!(body.computed_style("color").await?, "rgb(248, 249, 250)");

    owners.open_find_owners().await?;

    let heading_font = ctx
        .page
        .locator("h2")
        .first()
        .computed_style("fontFamily")
        .await?;
    ensure!(heading_font.contains(BRAND_FONT), "heading font is {:?}", heading_font);

    let primary = ctx
        .page
        .get_by_role(Role::Button, RoleOptions::named(TextMatch::pattern("Find Owner")));
    ensure_eq!(primary.computed_style("backgroundColor").await?, "rgb(36, 174, 29)");
    ensure_eq!(primary.computed_style("color").await?, "rgb(17, 17, 17)");
    Ok(())
}
