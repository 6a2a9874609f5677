//! Blog App E2E Test Framework
//!
//! This crate drives a real browser against a running blog application:
//! - Resets and seeds the backend over HTTP before every scenario
//! - Expands interaction helpers (login, create post, ...) into UI steps
//! - Compiles each scenario into a Playwright script with its own context
//! - Classifies outcomes as passed, failed (app behavior) or errored (setup)
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    E2E Test Runner (Rust)                   │
//! ├─────────────────────────────────────────────────────────────┤
//! │  TestRunner                                                 │
//! │    ├── start_app() -> AppServer              (optional)     │
//! │    ├── run_all(&[Scenario]) -> SuiteResult                  │
//! │    └── run_scenario(&Scenario) -> ScenarioResult            │
//! │          ├── BackendClient::reset()                         │
//! │          ├── BackendClient::create_user(account) ...        │
//! │          └── PlaywrightHandle::run_steps(full_steps)        │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Scenario                                                   │
//! │    ├── accounts: [Account]                                  │
//! │    ├── preconditions: [Precondition]  (logged in as ...)    │
//! │    └── steps: [Step]                                        │
//! │          ├── navigate / fill / click / wait_for             │
//! │          ├── click_accepting_dialog                         │
//! │          ├── expect_visible / expect_hidden                 │
//! │          └── capture_count / expect_count_delta             │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod api;
pub mod config;
pub mod error;
pub mod helpers;
pub mod locator;
pub mod playwright;
pub mod runner;
pub mod scenario;
pub mod server;
pub mod step;
pub mod suite;

pub use config::SuiteConfig;
pub use error::{E2eError, E2eResult, FailureKind};
pub use runner::{Outcome, ScenarioResult, SuiteResult, TestRunner};
pub use scenario::{Account, Post, Precondition, Scenario};
pub use step::{Step, StepKind};
