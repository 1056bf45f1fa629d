//! Emerald Grove pet clinic E2E suite
//!
//! This crate drives the running pet clinic through a real browser from Rust:
//! - Reuses or spawns the application and waits until it answers
//! - Controls Playwright through an embedded Node bridge speaking JSON lines
//! - Wraps every screen in a page object with intention-revealing operations
//! - Mocks the streaming chat API so chat scenarios are deterministic
//! - Runs scenarios in parallel isolated browsers with retries and reports
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 petclinic-e2e (Rust binary)                 │
//! ├─────────────────────────────────────────────────────────────┤
//! │  TestRunner                                                 │
//! │    ├── global_setup()  -> WebServer + readiness gate        │
//! │    ├── run(scenarios)  -> SuiteResult                       │
//! │    │     └── per attempt: Page::launch -> scenario(ctx)     │
//! │    └── report::write_reports(results.json, junit.xml)       │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Scenarios -> Page objects (BasePage + Home/Owner/Vet/...)  │
//! │    ├── factory::create_owner, helpers::measure_ms           │
//! │    ├── mock::mock_chat_api (text/event-stream)              │
//! │    └── expect(locator).to_be_visible() (auto-waiting)       │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Page / Locator  ──JSON lines──▶  node bridge.js            │
//! │                                    └── Playwright browser   │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod a11y;
pub mod config;
pub mod driver;
pub mod error;
pub mod expect;
pub mod factory;
pub mod helpers;
pub mod locator;
pub mod mock;
pub mod page;
pub mod pages;
pub mod readiness;
pub mod report;
pub mod runner;
pub mod scenarios;
pub mod selector;
pub mod server;

pub use config::RunnerConfig;
pub use error::{E2eError, E2eResult};
pub use expect::{expect, expect_page};
pub use locator::Locator;
pub use page::Page;
pub use runner::{Scenario, TestContext, TestRunner};
