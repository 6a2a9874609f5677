//! HTTP calls against the application backend: reset, seed, readiness

use std::time::{Duration, Instant};

use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::config::AppConfig;
use crate::error::{E2eError, E2eResult};
use crate::scenario::Account;

/// Client for one backend's testing endpoints
#[derive(Debug, Clone)]
pub struct BackendClient {
    client: reqwest::Client,
    base_url: String,
    reset_url: String,
    users_url: String,
    health_url: String,
}

impl BackendClient {
    pub fn new(base_url: &str, app: &AppConfig) -> E2eResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        let base = base_url.trim_end_matches('/');

        Ok(Self {
            client,
            base_url: base.to_string(),
            reset_url: join(base, &app.reset_path),
            users_url: join(base, &app.users_path),
            health_url: join(base, &app.health_path),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Wipe every account and post. Only returns Ok once the backend has
    /// confirmed the wipe.
    pub async fn reset(&self) -> E2eResult<()> {
        debug!("Resetting {}", self.reset_url);
        let resp = self.client.post(&self.reset_url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(E2eError::Reset {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }

    /// Create exactly one account
    pub async fn create_user(&self, account: &Account) -> E2eResult<()> {
        debug!("Seeding user {}", account.username);
        let resp = self
            .client
            .post(&self.users_url)
            .json(account)
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(E2eError::SeedUser {
                username: account.username.clone(),
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }

    /// Poll the health path until it answers with success
    pub async fn wait_until_ready(&self, timeout_duration: Duration) -> E2eResult<()> {
        let start = Instant::now();
        let mut attempts = 0;

        while start.elapsed() < timeout_duration {
            attempts += 1;

            match self.client.get(&self.health_url).send().await {
                Ok(resp) if resp.status().is_success() => {
                    info!("Application is up at {}", self.base_url);
                    return Ok(());
                }
                Ok(resp) => {
                    warn!("Health check returned {}", resp.status());
                }
                Err(e) => {
                    if attempts == 1 {
                        info!("Waiting for application at {}...", self.base_url);
                    }
                    // Connection refused is expected while the app is starting
                    if !e.is_connect() {
                        warn!("Health check error: {}", e);
                    }
                }
            }

            sleep(Duration::from_millis(100)).await;
        }

        Err(E2eError::ServerHealthCheck(attempts))
    }
}

fn join(base: &str, path: &str) -> String {
    format!("{}/{}", base, path.trim_start_matches('/'))
}
