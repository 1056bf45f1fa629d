use futures::FutureExt;

use crate::a11y::{scan, WCAG2_TAGS};
use crate::error::E2eResult;
use crate::runner::{Scenario, TestContext};

pub fn scenarios() -> Vec<Scenario> {
    vec![Scenario {
        suite: "Accessibility",
        name: "home page accessibility scan",
        tags: &["a11y"],
        run: |ctx| home_page_scan(ctx).boxed(),
    }]
}

/// Reports serious and critical violations; only fails on critical ones when
/// strict mode is configured
async fn home_page_scan(ctx: TestContext) -> E2eResult<()> {
    ctx.page.goto("/").await?;

    let report = scan(&ctx.page, &WCAG2_TAGS).await?;
    if report.has_blocking() {
        ctx.annotate("a11y", report.counts());
    }
    report.enforce(ctx.config.a11y_fail_on_critical)
}
