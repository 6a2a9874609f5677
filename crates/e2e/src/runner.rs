//! Test runner: isolation, backend pool, concurrency and reporting

use std::path::PathBuf;
use std::time::Instant;

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::{Semaphore, SemaphorePermit};
use tracing::{debug, error, info};

use crate::api::BackendClient;
use crate::config::SuiteConfig;
use crate::error::{E2eError, E2eResult, FailureKind};
use crate::playwright::{PlaywrightHandle, StepTiming};
use crate::scenario::Scenario;
use crate::server::AppServer;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Passed,
    /// The application did not behave as expected
    Failed,
    /// Setup trouble; says nothing about the application's behavior
    Errored,
}

/// Result of running a single scenario
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub name: String,
    pub group: Option<String>,
    pub outcome: Outcome,
    pub failure_kind: Option<FailureKind>,
    pub failed_step: Option<String>,
    pub error: Option<String>,
    pub steps_completed: usize,
    pub steps: Vec<StepTiming>,
    pub backend: String,
    pub duration_ms: u64,
}

impl ScenarioResult {
    pub fn success(&self) -> bool {
        self.outcome == Outcome::Passed
    }
}

/// Result of running a set of scenarios
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteResult {
    pub started_at: DateTime<Utc>,
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub errored: usize,
    pub duration_ms: u64,
    pub results: Vec<ScenarioResult>,
}

impl SuiteResult {
    pub fn success(&self) -> bool {
        self.failed == 0 && self.errored == 0
    }
}

/// Backends not currently serving a scenario
struct BackendPool {
    idle: Mutex<Vec<BackendClient>>,
    permits: Semaphore,
}

/// Exclusive use of one backend; returned to the pool on drop
struct Lease<'a> {
    pool: &'a BackendPool,
    client: Option<BackendClient>,
    _permit: SemaphorePermit<'a>,
}

impl BackendPool {
    fn new(clients: Vec<BackendClient>, concurrency: usize) -> Self {
        Self {
            idle: Mutex::new(clients),
            permits: Semaphore::new(concurrency),
        }
    }

    async fn acquire(&self) -> E2eResult<Lease<'_>> {
        let permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| E2eError::Config("backend pool closed".into()))?;
        let client = self
            .idle
            .lock()
            .pop()
            .ok_or_else(|| E2eError::Config("no idle backend".into()))?;
        Ok(Lease {
            pool: self,
            client: Some(client),
            _permit: permit,
        })
    }
}

impl Lease<'_> {
    fn client(&self) -> E2eResult<&BackendClient> {
        self.client
            .as_ref()
            .ok_or_else(|| E2eError::Config("lease already released".into()))
    }
}

impl Drop for Lease<'_> {
    fn drop(&mut self) {
        if let Some(client) = self.client.take() {
            self.pool.idle.lock().push(client);
        }
    }
}

/// Main E2E test runner
pub struct TestRunner {
    config: SuiteConfig,
    playwright: PlaywrightHandle,
    pool: BackendPool,
    app: Option<AppServer>,
}

impl TestRunner {
    pub fn new(config: SuiteConfig) -> E2eResult<Self> {
        config.validate()?;
        let playwright = PlaywrightHandle::new(
            config.browser.clone(),
            config.timing.clone(),
            config.node.clone(),
        )
        .with_reset_path(&config.app.reset_path);
        let pool = Self::build_pool(&config)?;

        Ok(Self {
            config,
            playwright,
            pool,
            app: None,
        })
    }

    fn build_pool(config: &SuiteConfig) -> E2eResult<BackendPool> {
        let clients = config
            .app
            .base_urls
            .iter()
            .map(|url| BackendClient::new(url, &config.app))
            .collect::<E2eResult<Vec<_>>>()?;
        let concurrency = config.jobs.min(clients.len());
        Ok(BackendPool::new(clients, concurrency))
    }

    pub fn config(&self) -> &SuiteConfig {
        &self.config
    }

    /// Check the browser tooling is installed
    pub fn preflight(&self) -> E2eResult<()> {
        self.playwright.check_installed()
    }

    /// Start the application if a command is configured
    pub async fn start_app(&mut self) -> E2eResult<()> {
        if self.app.is_some() || self.config.app.command.is_none() {
            return Ok(());
        }
        let first = self.config.app.base_urls[0].clone();
        let server = AppServer::spawn(&self.config.app, &first).await?;

        // The spawned app is the only backend
        self.config.app.base_urls = vec![server.base_url().to_string()];
        self.pool = Self::build_pool(&self.config)?;
        self.app = Some(server);
        Ok(())
    }

    pub fn stop_app(&mut self) -> E2eResult<()> {
        if let Some(mut server) = self.app.take() {
            server.stop()?;
        }
        Ok(())
    }

    /// Stop the application from async code without blocking the runtime
    pub async fn shutdown_app(&mut self) {
        if let Some(mut server) = self.app.take() {
            server.shutdown().await;
        }
    }

    /// Wait for every configured backend to answer
    pub async fn wait_for_backends(&self) -> E2eResult<()> {
        let timeout = std::time::Duration::from_millis(self.config.app.startup_timeout_ms);
        for url in &self.config.app.base_urls {
            BackendClient::new(url, &self.config.app)?
                .wait_until_ready(timeout)
                .await?;
        }
        Ok(())
    }

    /// Run scenarios, at most one per backend at a time. Results keep the
    /// input order. Nothing is retried.
    pub async fn run_all(&self, scenarios: &[Scenario]) -> SuiteResult {
        let started_at = Utc::now();
        let start = Instant::now();
        let concurrency = self.config.jobs.min(self.config.app.base_urls.len()).max(1);

        info!(
            "Running {} scenario(s) on {} backend(s), {} at a time...",
            scenarios.len(),
            self.config.app.base_urls.len(),
            concurrency
        );

        let mut indexed: Vec<(usize, ScenarioResult)> = stream::iter(scenarios.iter().enumerate())
            .map(|(i, scenario)| async move { (i, self.run_scenario(scenario).await) })
            .buffer_unordered(concurrency)
            .collect()
            .await;
        indexed.sort_by_key(|(i, _)| *i);
        let results: Vec<ScenarioResult> = indexed.into_iter().map(|(_, r)| r).collect();

        let count = |outcome: Outcome| results.iter().filter(|r| r.outcome == outcome).count();
        let (passed, failed, errored) = (
            count(Outcome::Passed),
            count(Outcome::Failed),
            count(Outcome::Errored),
        );
        let duration_ms = start.elapsed().as_millis() as u64;

        info!("");
        info!(
            "Scenario results: {} passed, {} failed, {} errored ({} ms)",
            passed, failed, errored, duration_ms
        );

        SuiteResult {
            started_at,
            total: results.len(),
            passed,
            failed,
            errored,
            duration_ms,
            results,
        }
    }

    /// Run one scenario on an exclusively leased backend
    pub async fn run_scenario(&self, scenario: &Scenario) -> ScenarioResult {
        let start = Instant::now();
        let name = scenario.full_name();
        debug!("Running scenario: {}", name);

        let (backend, steps, outcome) = match self.pool.acquire().await {
            Ok(lease) => match lease.client() {
                Ok(client) => {
                    let (steps, outcome) = self.execute(scenario, client).await;
                    (client.base_url().to_string(), steps, outcome)
                }
                Err(e) => (String::new(), Vec::new(), Err(e)),
            },
            Err(e) => (String::new(), Vec::new(), Err(e)),
        };

        let duration_ms = start.elapsed().as_millis() as u64;
        match outcome {
            Ok(()) => {
                info!("✓ {} ({} ms)", name, duration_ms);
                ScenarioResult {
                    name: scenario.name.clone(),
                    group: scenario.group.clone(),
                    outcome: Outcome::Passed,
                    failure_kind: None,
                    failed_step: None,
                    error: None,
                    steps_completed: steps.len(),
                    steps,
                    backend,
                    duration_ms,
                }
            }
            Err(e) => {
                let kind = e.kind();
                let outcome = match kind {
                    FailureKind::Setup => Outcome::Errored,
                    FailureKind::Assertion | FailureKind::Interaction => Outcome::Failed,
                };
                let failed_step = match &e {
                    E2eError::StepFailed { step, .. } => Some(step.clone()),
                    _ => None,
                };
                error!("✗ {} [{:?}] - {}", name, kind, e);
                ScenarioResult {
                    name: scenario.name.clone(),
                    group: scenario.group.clone(),
                    outcome,
                    failure_kind: Some(kind),
                    failed_step,
                    error: Some(e.to_string()),
                    steps_completed: steps.len(),
                    steps,
                    backend,
                    duration_ms,
                }
            }
        }
    }

    /// reset -> seed -> browser steps, each awaited before the next
    async fn execute(
        &self,
        scenario: &Scenario,
        backend: &BackendClient,
    ) -> (Vec<StepTiming>, E2eResult<()>) {
        if let Err(e) = self.arrange(scenario, backend).await {
            return (Vec::new(), Err(e));
        }

        let steps = scenario.full_steps();
        match self.playwright.run_steps(backend.base_url(), &steps).await {
            Ok(report) => {
                let outcome = report.check(&steps);
                (report.completed, outcome)
            }
            Err(e) => (Vec::new(), Err(e)),
        }
    }

    async fn arrange(&self, scenario: &Scenario, backend: &BackendClient) -> E2eResult<()> {
        scenario.validate()?;
        backend.reset().await?;
        for account in &scenario.accounts {
            backend.create_user(account).await?;
        }
        Ok(())
    }

    /// Write suite results to JSON file
    pub fn write_results(&self, results: &SuiteResult) -> E2eResult<PathBuf> {
        std::fs::create_dir_all(&self.config.output_dir)?;

        let path = self.config.output_dir.join("test-results.json");
        let json = serde_json::to_string_pretty(results)?;
        std::fs::write(&path, json)?;

        info!("Results written to: {}", path.display());
        Ok(path)
    }
}

impl Drop for TestRunner {
    fn drop(&mut self) {
        let _ = self.stop_app();
    }
}
