//! Suite runner entry point
//!
//! Exit codes: 0 all tests passed (flaky counts as passed), 1 at least one
//! test failed, 2 the harness itself failed (config, app never ready, ...).

use std::path::PathBuf;

use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use petclinic_e2e::driver::protocol::Browser;
use petclinic_e2e::report::write_reports;
use petclinic_e2e::runner::Filter;
use petclinic_e2e::{scenarios, E2eError, E2eResult, RunnerConfig, TestRunner};

#[derive(Parser, Debug)]
#[command(name = "petclinic-e2e")]
#[command(about = "Browser E2E suite for the Emerald Grove pet clinic")]
struct Args {
    /// YAML config file (missing file means defaults)
    #[arg(short, long, default_value = "e2e.yaml")]
    config: PathBuf,

    /// Application base URL
    #[arg(long)]
    base_url: Option<String>,

    /// Run only tests whose "Suite > name" title matches this pattern
    #[arg(short, long)]
    grep: Option<String>,

    /// Run only tests carrying this tag
    #[arg(short, long)]
    tag: Option<String>,

    /// Concurrent browser sessions
    #[arg(short, long)]
    workers: Option<usize>,

    /// Retries for failing tests
    #[arg(long)]
    retries: Option<u32>,

    /// Output directory for results
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Browser to use (chromium, firefox, webkit)
    #[arg(long)]
    browser: Option<Browser>,

    /// Show the browser window
    #[arg(long)]
    headed: bool,

    /// List matching tests without running them
    #[arg(long)]
    list: bool,

    /// Debug logging
    #[arg(long)]
    debug: bool,
}

impl Args {
    fn apply(&self, config: &mut RunnerConfig) {
        if let Some(url) = &self.base_url {
            config.base_url = url.clone();
        }
        if let Some(workers) = self.workers {
            config.workers = workers;
        }
        if let Some(retries) = self.retries {
            config.retries = retries;
        }
        if let Some(output) = &self.output {
            config.output_dir = output.clone();
        }
        if let Some(browser) = self.browser {
            config.browser = browser;
        }
        if self.headed {
            config.headless = false;
        }
    }
}

fn main() {
    let args = Args::parse();

    let filter = if args.debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Error: failed to create tokio runtime: {}", e);
            std::process::exit(2);
        }
    };

    match rt.block_on(async_main(args)) {
        Ok(true) => std::process::exit(0),
        Ok(false) => std::process::exit(1),
        Err(e) => {
            error!("{}", e);
            eprintln!("Error: {}", e);
            std::process::exit(2);
        }
    }
}

async fn async_main(args: Args) -> E2eResult<bool> {
    let mut config = RunnerConfig::from_env(&args.config)?;
    args.apply(&mut config);
    config.validate()?;

    let selected = Filter::new(args.grep.as_deref(), args.tag.as_deref())?.select(scenarios::all());

    if args.list {
        for scenario in &selected {
            println!("{}  [{}]", scenario.title(), scenario.tags.join(", "));
        }
        println!("Total: {} test(s)", selected.len());
        return Ok(true);
    }

    if selected.is_empty() {
        return Err(E2eError::Config("no tests match the given --grep/--tag".into()));
    }

    let output_dir = config.output_dir.clone();
    info!("Testing {} ({} test(s))", config.base_url, selected.len());

    let mut runner = TestRunner::new(config);
    if let Err(e) = runner.global_setup().await {
        if let Err(stop) = runner.stop_server().await {
            warn!("Stopping web server failed: {}", stop);
        }
        return Err(e);
    }

    let suite = runner.run(selected).await;
    write_reports(&suite, &output_dir)?;
    runner.stop_server().await?;

    if !suite.success() {
        for result in suite.results.iter().filter(|r| r.error.is_some()) {
            if let Some(err) = &result.error {
                warn!("{}: {}", result.title(), err);
            }
        }
    }

    Ok(suite.success())
}
