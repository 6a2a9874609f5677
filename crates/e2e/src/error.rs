//! Error types for the blog E2E suite

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::step::StepKind;

/// How a scenario went wrong.
///
/// `Setup` is infrastructure trouble (reset/seed rejected, browser did not
/// launch, bad config). `Assertion` and `Interaction` are application
/// behavior trouble: an expected UI state never showed up, or a control a
/// helper needed could not be found in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Setup,
    Assertion,
    Interaction,
}

impl From<StepKind> for FailureKind {
    fn from(kind: StepKind) -> Self {
        match kind {
            StepKind::Action => FailureKind::Interaction,
            StepKind::Assertion => FailureKind::Assertion,
            StepKind::Setup => FailureKind::Setup,
        }
    }
}

#[derive(Error, Debug)]
pub enum E2eError {
    #[error("State reset rejected with {status}: {body}")]
    Reset { status: u16, body: String },

    #[error("Seeding user '{username}' rejected with {status}: {body}")]
    SeedUser {
        username: String,
        status: u16,
        body: String,
    },

    #[error("Application server failed to start: {0}")]
    ServerStartup(String),

    #[error("Application health check failed after {0} attempts")]
    ServerHealthCheck(usize),

    #[error(
        "Playwright not found. Install with: \
         npm install -D @playwright/test && npx playwright install"
    )]
    PlaywrightNotFound,

    #[error("Playwright error: {0}")]
    Playwright(String),

    #[error("Browser failed to launch: {0}")]
    BrowserLaunch(String),

    #[error("Step {index} failed: {step} - {reason}")]
    StepFailed {
        index: usize,
        step: String,
        kind: FailureKind,
        reason: String,
    },

    #[error("Timeout waiting for: {0}")]
    Timeout(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Invalid scenario '{scenario}': {reason}")]
    InvalidScenario { scenario: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl E2eError {
    /// Classify this error for reporting.
    pub fn kind(&self) -> FailureKind {
        match self {
            E2eError::StepFailed { kind, .. } => *kind,
            E2eError::Timeout(_) => FailureKind::Interaction,
            _ => FailureKind::Setup,
        }
    }
}

pub type E2eResult<T> = Result<T, E2eError>;
