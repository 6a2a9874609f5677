//! Blog app browser suite
//!
//! Runs every blog scenario against a live application. Needs a running
//! app (or `BLOG_E2E_APP_COMMAND`) and Playwright in the node project.
//! Run with: BLOG_E2E_BASE_URL=http://localhost:5173 cargo test -p blog-e2e --test blog
//!
//! Without `BLOG_E2E_BASE_URL` the suite is skipped.

use tracing_subscriber::EnvFilter;

use blog_e2e::suite::{self, Fixtures};
use blog_e2e::{E2eResult, SuiteConfig, TestRunner};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    if std::env::var("BLOG_E2E_BASE_URL").is_err() {
        eprintln!("blog e2e suite skipped: BLOG_E2E_BASE_URL is not set");
        return;
    }

    let rt = tokio::runtime::Runtime::new().expect("Failed to create tokio runtime");
    match rt.block_on(run()) {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(2);
        }
    }
}

async fn run() -> E2eResult<bool> {
    let config_path = std::env::var("BLOG_E2E_CONFIG").ok().map(std::path::PathBuf::from);
    let mut config = SuiteConfig::load(config_path.as_deref())?;
    if let Ok(command) = std::env::var("BLOG_E2E_APP_COMMAND") {
        config.app.command = Some(command);
    }

    let scenarios = suite::blog_app(&config.ui, &Fixtures::default());

    let mut runner = TestRunner::new(config)?;
    runner.preflight()?;
    if runner.config().app.command.is_some() {
        runner.start_app().await?;
    } else {
        runner.wait_for_backends().await?;
    }

    let results = runner.run_all(&scenarios).await;
    runner.shutdown_app().await;
    runner.write_results(&results)?;
    Ok(results.success())
}
