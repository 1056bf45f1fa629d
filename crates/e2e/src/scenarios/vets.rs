use futures::FutureExt;

use crate::error::E2eResult;
use crate::expect::expect;
use crate::pages::VetPage;
use crate::runner::{Scenario, TestContext};
use crate::selector::TextMatch;
use crate::{ensure, ensure_eq};

pub fn scenarios() -> Vec<Scenario> {
    vec![
        Scenario {
            suite: "Vet Directory",
            name: "can browse veterinarian list and view specialties",
            tags: &["vets", "seed-data"],
            run: |ctx| browse_directory(ctx).boxed(),
        },
        Scenario {
            suite: "Vet Specialty Filter",
            name: "can filter vets by a named specialty",
            tags: &["vets", "seed-data"],
            run: |ctx| filter_by_radiology(ctx).boxed(),
        },
        Scenario {
            suite: "Vet Specialty Filter",
            name: "can filter vets to show only those with no specialties",
            tags: &["vets", "seed-data"],
            run: |ctx| filter_by_none(ctx).boxed(),
        },
        Scenario {
            suite: "Vet Specialty Filter",
            name: "can navigate directly to a filtered URL and see correct results",
            tags: &["vets", "seed-data"],
            run: |ctx| deep_link_filter(ctx).boxed(),
        },
        Scenario {
            suite: "Vet Specialty Filter",
            name: "can clear the filter to show all vets",
            tags: &["vets", "seed-data"],
            run: |ctx| clear_filter(ctx).boxed(),
        },
    ]
}

/// Check which seeded vets the table lists
async fn expect_vets(vets: &VetPage, present: &[&str], absent: &[&str]) -> E2eResult<()> {
    let table = vets.vets_table();
    for name in present {
        expect(&table).to_contain_text(*name).await?;
    }
    for name in absent {
        expect(&table).not().to_contain_text(*name).await?;
    }
    Ok(())
}

async fn browse_directory(ctx: TestContext) -> E2eResult<()> {
    let vets = VetPage::new(&ctx.page);
    vets.open().await?;

    expect(&vets.vets_table()).to_be_visible().await?;
    let rows = vets.rows().count().await?;
    ensure!(rows > 0, "expected at least one vet, found {}", rows);

    ctx.page
        .screenshot(&ctx.output_path("vet-directory.png"), true)
        .await?;

    expect(&vets.vets_table())
        .to_contain_text(TextMatch::pattern("none|surgery|dentistry|radiology|medicine"))
        .await
}

async fn filter_by_radiology(ctx: TestContext) -> E2eResult<()> {
    let vets = VetPage::new(&ctx.page);
    vets.open().await?;
    vets.filter_by_specialty("radiology").await?;

    expect_vets(
        &vets,
        &["Helen Leary", "Henry Stevens"],
        &["James Carter", "Linda Douglas", "Rafael Ortega", "Sharon Jenkins"],
    )
    .await?;
    expect(&vets.rows()).to_have_count(2).await?;

    ctx.page
        .screenshot(&ctx.output_path("e2e-vet-filter-radiology.png"), true)
        .await
}

async fn filter_by_none(ctx: TestContext) -> E2eResult<()> {
    let vets = VetPage::new(&ctx.page);
    vets.open().await?;
    vets.filter_by_specialty("none").await?;

    expect_vets(
        &vets,
        &["James Carter", "Sharon Jenkins"],
        &["Helen Leary", "Linda Douglas", "Rafael Ortega", "Henry Stevens"],
    )
    .await?;
    expect(&vets.rows()).to_have_count(2).await
}

async fn deep_link_filter(ctx: TestContext) -> E2eResult<()> {
    let vets = VetPage::new(&ctx.page);
    vets.open_with_filter("radiology").await?;

    expect_vets(&vets, &["Helen Leary", "Henry Stevens"], &["James Carter"]).await?;
    ensure_eq!(vets.selected_filter().await?, "radiology");
    Ok(())
}

async fn clear_filter(ctx: TestContext) -> E2eResult<()> {
    let vets = VetPage::new(&ctx.page);
    vets.open_with_filter("radiology").await?;
    vets.filter_by_specialty("").await?;

    let rows = vets.rows().count().await?;
    ensure!(rows > 2, "Expected more than 2 vets when All is selected, found {}", rows);

    expect_vets(&vets, &["James Carter", "Helen Leary", "Henry Stevens"], &[]).await?;

    ctx.page
        .screenshot(&ctx.output_path("e2e-vet-filter-by-specialty.png"), true)
        .await
}
