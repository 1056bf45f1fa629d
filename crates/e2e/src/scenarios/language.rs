use futures::FutureExt;

use crate::driver::protocol::LoadState;
use crate::ensure_eq;
use crate::error::E2eResult;
use crate::expect::expect;
use crate::pages::{BasePage, HomePage};
use crate::runner::{Scenario, TestContext};
use crate::selector::{Role, RoleOptions, TextMatch};

pub fn scenarios() -> Vec<Scenario> {
    vec![
        Scenario {
            suite: "Language Selector",
            name: "language dropdown is visible and shows active language",
            tags: &["i18n"],
            run: |ctx| shows_active_language(ctx).boxed(),
        },
        Scenario {
            suite: "Language Selector",
            name: "can switch UI language to Spanish",
            tags: &["i18n"],
            run: |ctx| switch_to_spanish(ctx).boxed(),
        },
        Scenario {
            suite: "Language Selector",
            name: "language persists across page navigation",
            tags: &["i18n"],
            run: |ctx| language_persists(ctx).boxed(),
        },
        Scenario {
            suite: "Language Selector",
            name: "can switch back to English from Spanish",
            tags: &["i18n"],
            run: |ctx| switch_back_to_english(ctx).boxed(),
        },
    ]
}

async fn shows_active_language(ctx: TestContext) -> E2eResult<()> {
    let home = HomePage::new(&ctx.page);
    home.open().await?;

    expect(&home.language_selector_toggle()).to_be_visible().await?;
    ensure_eq!(home.active_language().await?, "EN");
    Ok(())
}

async fn switch_to_spanish(ctx: TestContext) -> E2eResult<()> {
    let home = HomePage::new(&ctx.page);
    home.open().await?;

    home.switch_language("ES").await?;

    ensure_eq!(home.active_language().await?, "ES");
    expect(&home.nav_link(TextMatch::pattern("Veterinarios"))).to_be_visible().await?;
    expect(&home.nav_link(TextMatch::pattern("Inicio"))).to_be_visible().await
}

async fn language_persists(ctx: TestContext) -> E2eResult<()> {
    let home = HomePage::new(&ctx.page);
    home.open_with_language("es").await?;

    // No ?lang here: the locale has to come from the session
    home.goto("/vets.html").await?;
    ctx.page.wait_for_load_state(LoadState::NetworkIdle).await?;

    ensure_eq!(home.active_language().await?, "ES");
    expect(&ctx.page.get_by_role(Role::Heading, RoleOptions::named(TextMatch::pattern("Veterinarios"))))
        .to_be_visible()
        .await
}

async fn switch_back_to_english(ctx: TestContext) -> E2eResult<()> {
    let home = HomePage::new(&ctx.page);
    home.open_with_language("es").await?;

    home.switch_language("EN").await?;

    ensure_eq!(home.active_language().await?, "EN");
    expect(&home.nav_link(TextMatch::pattern("Veterinarians"))).to_be_visible().await?;

    home.screenshot(&ctx.output_path("e2e-lang-selector-switch.png")).await
}
