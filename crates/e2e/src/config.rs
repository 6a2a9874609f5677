//! Suite configuration
//!
//! Built from defaults, then an optional YAML file, then `BLOG_E2E_*`
//! environment variables. The CLI applies its flags last.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{E2eError, E2eResult};
use crate::locator::Locator;

/// Top-level suite configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SuiteConfig {
    /// Application under test
    pub app: AppConfig,

    /// Browser launch settings
    pub browser: BrowserConfig,

    /// Bounded waits
    pub timing: TimingConfig,

    /// Where each control lives on the page
    pub ui: UiMap,

    /// Node project that has @playwright/test installed
    pub node: NodeConfig,

    /// Maximum scenarios in flight (capped by the number of backends)
    pub jobs: usize,

    /// Output directory for results
    pub output_dir: PathBuf,
}

impl Default for SuiteConfig {
    fn default() -> Self {
        Self {
            app: AppConfig::default(),
            browser: BrowserConfig::default(),
            timing: TimingConfig::default(),
            ui: UiMap::default(),
            node: NodeConfig::default(),
            jobs: 1,
            output_dir: PathBuf::from("test-results"),
        }
    }
}

/// Application under test
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// One base URL per independent backend. Reset wipes a whole backend,
    /// so each URL serves at most one scenario at a time.
    pub base_urls: Vec<String>,

    /// Endpoint that wipes all accounts and posts
    pub reset_path: String,

    /// Endpoint that creates one account
    pub users_path: String,

    /// Path polled while waiting for the app to come up
    pub health_path: String,

    /// Shell command that starts the app (None = already running)
    pub command: Option<String>,

    /// Timeout for app startup
    pub startup_timeout_ms: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            base_urls: vec!["http://localhost:5173".to_string()],
            reset_path: "/api/testing/reset".to_string(),
            users_path: "/api/users".to_string(),
            health_path: "/".to_string(),
            command: None,
            startup_timeout_ms: 30_000,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Browser {
    #[default]
    Chromium,
    Firefox,
    Webkit,
}

impl Browser {
    pub fn as_str(&self) -> &'static str {
        match self {
            Browser::Chromium => "chromium",
            Browser::Firefox => "firefox",
            Browser::Webkit => "webkit",
        }
    }

    pub fn parse(name: &str) -> E2eResult<Self> {
        match name.to_ascii_lowercase().as_str() {
            "chromium" | "chrome" => Ok(Browser::Chromium),
            "firefox" => Ok(Browser::Firefox),
            "webkit" | "safari" => Ok(Browser::Webkit),
            other => Err(E2eError::Config(format!("unknown browser '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    pub kind: Browser,
    pub headless: bool,
    pub viewport: Viewport,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            kind: Browser::Chromium,
            headless: true,
            viewport: Viewport::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
        }
    }
}

/// Bounded waits. Every one of these failing fails the scenario.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Max wait for a control a helper needs
    pub action_timeout_ms: u64,

    /// Max polling time for an assertion
    pub expect_timeout_ms: u64,

    /// Quiet period after a counter reaches its target, before re-reading
    pub settle_ms: u64,

    /// Hard limit for a whole scenario script
    pub scenario_timeout_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            action_timeout_ms: 5_000,
            expect_timeout_ms: 5_000,
            settle_ms: 500,
            scenario_timeout_ms: 60_000,
        }
    }
}

/// Locators for every control the suite touches
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UiMap {
    pub login_heading: Locator,
    pub username_input: Locator,
    pub password_input: Locator,
    pub login_button: Locator,
    pub logout: Locator,
    pub new_post_toggle: Locator,
    pub title_input: Locator,
    pub author_input: Locator,
    pub url_input: Locator,
    pub create_button: Locator,
    pub view_button: Locator,
    pub like_button: Locator,
    pub like_count: Locator,
    pub remove_button: Locator,

    /// Text of the logged-in indicator; `{name}` is the display name
    pub logged_in_template: String,
}

impl Default for UiMap {
    fn default() -> Self {
        Self {
            login_heading: Locator::text("Log in to application"),
            username_input: Locator::test_id("username"),
            password_input: Locator::test_id("password"),
            login_button: Locator::button("login"),
            logout: Locator::text("logout"),
            new_post_toggle: Locator::button("new blog"),
            title_input: Locator::test_id("title"),
            author_input: Locator::test_id("author"),
            url_input: Locator::test_id("url"),
            create_button: Locator::button("create"),
            view_button: Locator::button("view"),
            like_button: Locator::button("Like"),
            like_count: Locator::css(".blogDetails div:nth-of-type(2)"),
            remove_button: Locator::button("remove"),
            logged_in_template: "{name} Logged in".to_string(),
        }
    }
}

impl UiMap {
    /// Locator for the logged-in indicator of a given display name
    pub fn logged_in_as(&self, display_name: &str) -> Locator {
        Locator::text(self.logged_in_template.replace("{name}", display_name))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// Directory whose node_modules contains @playwright/test
    pub project_dir: PathBuf,

    /// Node executable
    pub node_binary: PathBuf,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            project_dir: PathBuf::from("."),
            node_binary: PathBuf::from("node"),
        }
    }
}

impl SuiteConfig {
    /// Parse a config from YAML string
    pub fn from_yaml(yaml: &str) -> E2eResult<Self> {
        serde_yaml::from_str(yaml).map_err(E2eError::from)
    }

    /// Parse a config from a YAML file
    pub fn from_file(path: &Path) -> E2eResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Defaults, then the optional file, then the process environment
    pub fn load(path: Option<&Path>) -> E2eResult<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Apply `BLOG_E2E_*` overrides from a variable lookup
    pub fn apply_env<F>(&mut self, lookup: F) -> E2eResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(urls) = lookup("BLOG_E2E_BASE_URL") {
            self.app.base_urls = urls
                .split(',')
                .map(str::trim)
                .filter(|u| !u.is_empty())
                .map(String::from)
                .collect();
        }
        if let Some(jobs) = lookup("BLOG_E2E_JOBS") {
            self.jobs = jobs.parse().map_err(|_| {
                E2eError::Config(format!("BLOG_E2E_JOBS is not a number: {}", jobs))
            })?;
        }
        if let Some(headless) = lookup("BLOG_E2E_HEADLESS") {
            self.browser.headless = !matches!(headless.as_str(), "0" | "false" | "no");
        }
        if let Some(browser) = lookup("BLOG_E2E_BROWSER") {
            self.browser.kind = Browser::parse(&browser)?;
        }
        if let Some(dir) = lookup("BLOG_E2E_NODE_PROJECT") {
            self.node.project_dir = PathBuf::from(dir);
        }
        Ok(())
    }

    pub fn validate(&self) -> E2eResult<()> {
        if self.app.base_urls.is_empty() {
            return Err(E2eError::Config("no base URL configured".into()));
        }
        if self.jobs == 0 {
            return Err(E2eError::Config("jobs must be at least 1".into()));
        }
        let t = &self.timing;
        if t.action_timeout_ms == 0 || t.expect_timeout_ms == 0 || t.scenario_timeout_ms == 0 {
            return Err(E2eError::Config("timeouts must be non-zero".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let yaml = r#"
app:
  base_urls:
    - http://localhost:3003
timing:
  expect_timeout_ms: 8000
ui:
  like_button:
    by: role
    role: button
    name: like
"#;
        let config = SuiteConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.app.base_urls, vec!["http://localhost:3003"]);
        assert_eq!(config.app.reset_path, "/api/testing/reset");
        assert_eq!(config.timing.expect_timeout_ms, 8000);
        assert_eq!(config.timing.settle_ms, 500);
        assert_eq!(config.ui.like_button, Locator::button("like"));
        assert_eq!(config.ui.view_button, Locator::button("view"));
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("BLOG_E2E_BASE_URL", "http://a:1, http://b:2"),
            ("BLOG_E2E_JOBS", "2"),
            ("BLOG_E2E_HEADLESS", "false"),
        ]
        .into_iter()
        .collect();

        let mut config = SuiteConfig::default();
        config
            .apply_env(|k| vars.get(k).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.app.base_urls, vec!["http://a:1", "http://b:2"]);
        assert_eq!(config.jobs, 2);
        assert!(!config.browser.headless);
    }

    #[test]
    fn test_bad_jobs_env_is_config_error() {
        let mut config = SuiteConfig::default();
        let err = config
            .apply_env(|k| (k == "BLOG_E2E_JOBS").then(|| "many".to_string()))
            .unwrap_err();
        assert!(matches!(err, E2eError::Config(_)));
    }

    #[test]
    fn test_validate() {
        assert!(SuiteConfig::default().validate().is_ok());

        let mut config = SuiteConfig::default();
        config.app.base_urls.clear();
        assert!(config.validate().is_err());

        let mut config = SuiteConfig::default();
        config.timing.expect_timeout_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_example_config_parses() {
        let yaml = include_str!("../../../blog-e2e.example.yaml");
        let config = SuiteConfig::from_yaml(yaml).unwrap();
        config.validate().unwrap();
        assert_eq!(config.app.base_urls, vec!["http://localhost:5173"]);
        assert!(config.app.command.is_none());
    }

    #[test]
    fn test_logged_in_indicator() {
        let ui = UiMap::default();
        assert_eq!(ui.logged_in_as("mluukkai"), Locator::text("mluukkai Logged in"));
    }
}
