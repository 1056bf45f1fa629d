use futures::FutureExt;

use crate::driver::protocol::LoadState;
use crate::error::E2eResult;
use crate::expect::expect;
use crate::mock::{mock_chat_api, mock_chat_api_gated, ChatStream};
use crate::pages::HomePage;
use crate::runner::{Scenario, TestContext};
use crate::selector::TextMatch;
use crate::{ensure, ensure_eq};

const SESSION_KEY: &str = "chatSessionId";

pub fn scenarios() -> Vec<Scenario> {
    vec![
        Scenario {
            suite: "Chat Widget",
            name: "chat toggle shows and hides the panel",
            tags: &["chat"],
            run: |ctx| toggle_panel(ctx).boxed(),
        },
        Scenario {
            suite: "Chat Widget",
            name: "sending a message shows user message in panel",
            tags: &["chat"],
            run: |ctx| user_message_shown(ctx).boxed(),
        },
        Scenario {
            suite: "Chat Widget",
            name: "bot response streams into panel",
            tags: &["chat"],
            run: |ctx| bot_response_streams(ctx).boxed(),
        },
        Scenario {
            suite: "Chat Widget",
            name: "input is disabled during streaming and re-enabled after",
            tags: &["chat"],
            run: |ctx| disabled_while_streaming(ctx).boxed(),
        },
        Scenario {
            suite: "Chat Widget",
            name: "session ID persists across page navigation",
            tags: &["chat"],
            run: |ctx| session_id_persists(ctx).boxed(),
        },
    ]
}

async fn toggle_panel(ctx: TestContext) -> E2eResult<()> {
    let home = HomePage::new(&ctx.page);
    home.open().await?;

    expect(&home.chat_panel()).to_be_hidden().await?;

    home.chat_toggle().click().await?;
    expect(&home.chat_panel()).to_be_visible().await?;

    home.chat_toggle().click().await?;
    expect(&home.chat_panel()).to_be_hidden().await
}

async fn user_message_shown(ctx: TestContext) -> E2eResult<()> {
    let home = HomePage::new(&ctx.page);
    home.open().await?;
    mock_chat_api(&ctx.page, &ChatStream::default(), 0).await?;

    home.open_chat().await?;
    home.send_message("Hello").await?;

    expect(&home.user_message("Hello")).to_be_visible().await
}

async fn bot_response_streams(ctx: TestContext) -> E2eResult<()> {
    let home = HomePage::new(&ctx.page);
    home.open().await?;
    let stream = ChatStream::new(["Hello", "!", " How", " can", " I", " help", "?"]);
    mock_chat_api(&ctx.page, &stream, 0).await?;

    home.open_chat().await?;
    home.send_message("Hi").await?;

    expect(&home.last_bot_message())
        .to_have_text(TextMatch::exact(stream.full_reply()))
        .await?;

    ctx.page
        .screenshot(&ctx.output_path("e2e-chat-full-flow.png"), true)
        .await
}

async fn disabled_while_streaming(ctx: TestContext) -> E2eResult<()> {
    let home = HomePage::new(&ctx.page);
    home.open().await?;

    // Replies are held until the gate opens
    let gate = mock_chat_api_gated(&ctx.page, &ChatStream::new(["ok"])).await?;

    home.open_chat().await?;
    let (sent, held) = tokio::join!(home.send_message("test"), async {
        expect(&home.chat_input()).to_be_disabled().await?;
        expect(&home.chat_send()).to_be_disabled().await
    });
    sent?;
    held?;

    gate.release().await?;

    expect(&home.chat_input()).to_be_enabled().await?;
    expect(&home.chat_send()).to_be_enabled().await
}

async fn session_id_persists(ctx: TestContext) -> E2eResult<()> {
    let home = HomePage::new(&ctx.page);
    home.open().await?;

    let initial = ctx.page.session_storage_item(SESSION_KEY).await?;
    ensure!(initial.is_none(), "expected no chat session yet, found {:?}", initial);

    home.open_chat().await?;
    let session_id = ctx.page.session_storage_item(SESSION_KEY).await?;
    ensure!(session_id.is_some(), "opening the chat did not create a session id");

    // Same tab, so sessionStorage survives
    ctx.page.goto("/vets.html").await?;
    ctx.page.wait_for_load_state(LoadState::NetworkIdle).await?;

    ensure_eq!(ctx.page.session_storage_item(SESSION_KEY).await?, session_id);
    Ok(())
}
