//! Blog App E2E runner
//!
//! Runs the blog scenarios against one or more running backends.

use std::path::PathBuf;

use clap::Parser;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use blog_e2e::config::Browser;
use blog_e2e::suite::{self, Fixtures};
use blog_e2e::{SuiteConfig, TestRunner};

#[derive(Parser, Debug)]
#[command(name = "blog-e2e")]
#[command(about = "Browser E2E suite for the blog application")]
#[command(version)]
struct Cli {
    /// YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Application base URL; repeat to run on several isolated backends
    #[arg(short, long)]
    base_url: Vec<String>,

    /// Run only scenarios whose name contains this text
    #[arg(short, long)]
    name: Option<String>,

    /// Run only scenarios in this group
    #[arg(short, long)]
    group: Option<String>,

    /// Maximum scenarios in flight
    #[arg(short, long)]
    jobs: Option<usize>,

    /// Browser to use (chromium, firefox, webkit)
    #[arg(long)]
    browser: Option<String>,

    /// Show the browser window
    #[arg(long)]
    headed: bool,

    /// Shell command that starts the app; `{port}` is replaced with a free port
    #[arg(long)]
    app_command: Option<String>,

    /// Output directory for results
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// List scenarios and exit
    #[arg(long)]
    list: bool,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

impl Cli {
    fn apply(&self, config: &mut SuiteConfig) -> anyhow::Result<()> {
        if !self.base_url.is_empty() {
            config.app.base_urls = self.base_url.clone();
        }
        if let Some(jobs) = self.jobs {
            config.jobs = jobs;
        }
        if let Some(browser) = &self.browser {
            config.browser.kind = Browser::parse(browser)?;
        }
        if self.headed {
            config.browser.headless = false;
        }
        if let Some(command) = &self.app_command {
            config.app.command = Some(command.clone());
        }
        if let Some(output) = &self.output {
            config.output_dir = output.clone();
        }
        Ok(())
    }
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Error: failed to create tokio runtime: {}", e);
            std::process::exit(2);
        }
    };

    match rt.block_on(run(cli)) {
        Ok(true) => std::process::exit(0),
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(2);
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<bool> {
    let mut config = SuiteConfig::load(cli.config.as_deref())?;
    cli.apply(&mut config)?;

    let scenarios = suite::select(
        suite::blog_app(&config.ui, &Fixtures::default()),
        cli.name.as_deref(),
        cli.group.as_deref(),
    );

    if cli.list {
        for scenario in &scenarios {
            println!("{}", scenario.full_name());
        }
        return Ok(true);
    }

    let mut runner = TestRunner::new(config)?;
    runner.preflight()?;

    if runner.config().app.command.is_some() {
        runner.start_app().await?;
    } else {
        runner.wait_for_backends().await?;
    }

    info!("Blog E2E v{}", env!("CARGO_PKG_VERSION"));
    let results = runner.run_all(&scenarios).await;
    runner.shutdown_app().await;
    runner.write_results(&results)?;

    Ok(results.success())
}
