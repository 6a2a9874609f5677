//! Playwright browser automation
//!
//! A scenario's steps are compiled into one Node script. The script opens a
//! fresh browser context, runs the steps strictly in order, and reports
//! progress on stdout as `@@step {...}` / `@@fail {...}` marker lines that
//! are parsed back here.

use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tokio::process::Command as TokioCommand;
use tracing::{debug, info};

use crate::config::{AppConfig, BrowserConfig, NodeConfig, TimingConfig};
use crate::error::{E2eError, E2eResult};
use crate::locator::js_str;
use crate::step::Step;

/// Playwright browser handle
#[derive(Debug, Clone)]
pub struct PlaywrightHandle {
    browser: BrowserConfig,
    timing: TimingConfig,
    node: NodeConfig,
    reset_path: String,
}

/// Timing of one completed step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepTiming {
    pub index: usize,
    pub ms: u64,
}

/// Failure marker emitted by a script. Index -1 means the browser or
/// context never came up.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptFailure {
    pub index: i64,
    pub message: String,
}

/// What a script run reported
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScriptReport {
    pub completed: Vec<StepTiming>,
    pub failure: Option<ScriptFailure>,
}

impl ScriptReport {
    /// Map a reported failure back onto the step that caused it
    pub fn check(&self, steps: &[Step]) -> E2eResult<()> {
        let Some(failure) = &self.failure else {
            return Ok(());
        };
        let failed = usize::try_from(failure.index)
            .ok()
            .and_then(|i| steps.get(i).map(|s| (i, s)));
        match failed {
            Some((index, step)) => Err(E2eError::StepFailed {
                index,
                step: step.name(),
                kind: step.kind().into(),
                reason: failure.message.clone(),
            }),
            None => Err(E2eError::BrowserLaunch(failure.message.clone())),
        }
    }
}

impl PlaywrightHandle {
    pub fn new(browser: BrowserConfig, timing: TimingConfig, node: NodeConfig) -> Self {
        Self {
            browser,
            timing,
            node,
            reset_path: AppConfig::default().reset_path,
        }
    }

    /// Endpoint hit by [`Step::ResetBackend`], relative to the base URL
    pub fn with_reset_path(mut self, path: impl Into<String>) -> Self {
        self.reset_path = path.into();
        self
    }

    /// Check if Playwright is installed in the node project
    pub fn check_installed(&self) -> E2eResult<()> {
        let output = Command::new("npx")
            .args(["playwright", "--version"])
            .current_dir(&self.node.project_dir)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();

        match output {
            Ok(status) if status.success() => Ok(()),
            _ => Err(E2eError::PlaywrightNotFound),
        }
    }

    /// Build the Playwright script for a scenario's steps
    pub fn build_script(&self, base_url: &str, steps: &[Step]) -> String {
        let mut script = String::new();

        // Header
        script.push_str(&format!(
            r#"const {{ chromium, firefox, webkit, expect }} = require('@playwright/test');

const counts = {{}};

function mark(kind, data) {{
  console.log('@@' + kind + ' ' + JSON.stringify(data));
}}

async function readCount(locator) {{
  const text = await locator.textContent();
  const match = text && text.match(/(\d+)/);
  if (!match) {{
    throw new Error('no number in ' + JSON.stringify(text));
  }}
  return parseInt(match[1], 10);
}}

(async () => {{
  let browser;
  let current = -1;
  let started = Date.now();
  try {{
    browser = await {browser}.launch({{ headless: {headless} }});
    const context = await browser.newContext({{
      baseURL: {base_url},
      viewport: {{ width: {width}, height: {height} }}
    }});
    context.setDefaultTimeout({action_timeout});
    const page = await context.newPage();
"#,
            browser = self.browser.kind.as_str(),
            headless = self.browser.headless,
            base_url = js_str(base_url),
            width = self.browser.viewport.width,
            height = self.browser.viewport.height,
            action_timeout = self.timing.action_timeout_ms,
        ));

        for (i, step) in steps.iter().enumerate() {
            script.push_str(&format!(
                "\n    // Step {}: {}\n    current = {}; started = Date.now();\n",
                i + 1,
                step.name().replace('\n', " "),
                i
            ));
            script.push_str(&self.step_to_js(step));
            script.push_str(&format!(
                "\n    mark('step', {{ index: {}, ms: Date.now() - started }});\n",
                i
            ));
        }

        // Footer
        script.push_str(
            r#"
  } catch (error) {
    mark('fail', { index: current, message: String(error && error.message || error) });
    process.exitCode = 1;
  } finally {
    if (browser) {
      await browser.close();
    }
  }
})();
"#,
        );

        script
    }

    /// Convert a step to JavaScript code
    fn step_to_js(&self, step: &Step) -> String {
        let expect_timeout = self.timing.expect_timeout_ms;
        match step {
            Step::Navigate { path } => format!("    await page.goto({});", js_str(path)),
            Step::Fill { target, value } => {
                format!("    await {}.fill({});", target.to_js("page"), js_str(value))
            }
            Step::Click { target } => format!("    await {}.click();", target.to_js("page")),
            Step::ClickAcceptingDialog { target } => format!(
                r#"    {{
      const acceptDialog = dialog => dialog.accept();
      page.once('dialog', acceptDialog);
      try {{
        await {}.click();
      }} finally {{
        page.off('dialog', acceptDialog);
      }}
    }}"#,
                target.to_js("page")
            ),
            Step::WaitFor { target } => format!(
                "    await {}.first().waitFor({{ state: 'visible' }});",
                target.to_js("page")
            ),
            Step::ExpectVisible { target } => format!(
                "    await expect({}.first()).toBeVisible({{ timeout: {} }});",
                target.to_js("page"),
                expect_timeout
            ),
            Step::ExpectHidden { target } => format!(
                "    await expect({}).not.toBeVisible({{ timeout: {} }});",
                target.to_js("page"),
                expect_timeout
            ),
            Step::CaptureCount { target, slot } => format!(
                "    counts[{}] = await readCount({});",
                js_str(slot),
                target.to_js("page")
            ),
            Step::ExpectCountDelta {
                target,
                slot,
                delta,
            } => format!(
                r#"    {{
      const slot = {slot};
      if (!(slot in counts)) {{
        throw new Error('count ' + slot + ' was never captured');
      }}
      const want = counts[slot] + ({delta});
      const counter = {locator};
      await expect.poll(() => readCount(counter), {{ timeout: {timeout} }}).toBe(want);
      await page.waitForTimeout({settle});
      expect(await readCount(counter)).toBe(want);
    }}"#,
                slot = js_str(slot),
                delta = delta,
                locator = target.to_js("page"),
                timeout = expect_timeout,
                settle = self.timing.settle_ms,
            ),
            Step::Settle => format!("    await page.waitForTimeout({});", self.timing.settle_ms),
            Step::ResetBackend => format!(
                r#"    {{
      const response = await context.request.post({path});
      if (!response.ok()) {{
        throw new Error('reset rejected: ' + response.status());
      }}
    }}"#,
                path = js_str(&self.reset_path),
            ),
            Step::Log { message } => {
                format!("    console.log({});", js_str(&format!("[scenario] {}", message)))
            }
        }
    }

    /// Execute a script via Node, bounded by the scenario timeout
    pub async fn run_script(&self, script: &str) -> E2eResult<ScriptReport> {
        // Write script to temp file
        let temp_dir = tempfile::tempdir()?;
        let script_path = temp_dir.path().join("scenario.js");
        std::fs::write(&script_path, script)?;

        let project_dir = std::fs::canonicalize(&self.node.project_dir)?;
        let node_path: PathBuf = project_dir.join("node_modules");

        debug!("Running Playwright script: {}", script_path.display());

        let mut cmd = TokioCommand::new(&self.node.node_binary);
        cmd.arg(&script_path)
            .current_dir(&project_dir)
            .env("NODE_PATH", &node_path)
            .kill_on_drop(true);

        let limit = Duration::from_millis(self.timing.scenario_timeout_ms);
        let output = match tokio::time::timeout(limit, cmd.output()).await {
            Ok(output) => output?,
            Err(_) => {
                return Err(E2eError::Timeout(format!(
                    "scenario script to finish within {} ms",
                    self.timing.scenario_timeout_ms
                )))
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        for line in stdout.lines().filter(|l| l.starts_with("[scenario]")) {
            info!("{}", line);
        }

        let report = parse_output(&stdout)?;

        if !output.status.success() && report.failure.is_none() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(E2eError::Playwright(format!(
                "Script failed:\nstdout: {}\nstderr: {}",
                stdout,
                strip_ansi(&stderr)
            )));
        }

        Ok(report)
    }

    /// Build, run and check a scenario's steps against `base_url`
    pub async fn run_steps(&self, base_url: &str, steps: &[Step]) -> E2eResult<ScriptReport> {
        let script = self.build_script(base_url, steps);
        self.run_script(&script).await
    }
}

fn marker_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?m)^@@(step|fail) (\{.*\})\s*$").expect("valid marker regex")
    })
}

fn ansi_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\x1b\[[0-9;]*m").expect("valid ansi regex"))
}

/// Remove terminal colour codes; Playwright's expect messages carry them
pub fn strip_ansi(text: &str) -> String {
    ansi_regex().replace_all(text, "").into_owned()
}

/// Parse the marker lines of a script's stdout
pub fn parse_output(stdout: &str) -> E2eResult<ScriptReport> {
    let mut report = ScriptReport::default();

    for caps in marker_regex().captures_iter(stdout) {
        match &caps[1] {
            "step" => report.completed.push(serde_json::from_str(&caps[2])?),
            _ => {
                let mut failure: ScriptFailure = serde_json::from_str(&caps[2])?;
                failure.message = strip_ansi(&failure.message);
                report.failure = Some(failure);
            }
        }
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FailureKind;
    use crate::locator::Locator;

    fn handle() -> PlaywrightHandle {
        PlaywrightHandle::new(
            BrowserConfig::default(),
            TimingConfig::default(),
            NodeConfig::default(),
        )
    }

    #[test]
    fn test_script_uses_fresh_context_with_base_url() {
        let script = handle().build_script(
            "http://localhost:5173",
            &[Step::Navigate {
                path: String::new(),
            }],
        );
        assert!(script.contains("chromium.launch({ headless: true })"));
        assert!(script.contains(r#"baseURL: "http://localhost:5173""#));
        assert!(script.contains("browser.newContext"));
        assert!(script.contains("context.setDefaultTimeout(5000)"));
        assert!(script.contains(r#"await page.goto("");"#));
        assert!(script.contains("mark('step', { index: 0,"));
    }

    #[test]
    fn test_dialog_handler_is_scoped_to_click() {
        let step = Step::ClickAcceptingDialog {
            target: Locator::button("remove"),
        };
        let js = handle().step_to_js(&step);

        let once = js.find("page.once('dialog'").unwrap();
        let click = js
            .find(r#"getByRole("button", { name: "remove" }).click()"#)
            .unwrap();
        let off = js.find("page.off('dialog'").unwrap();
        assert!(once < click && click < off);
        assert!(js.contains("finally"));
    }

    #[test]
    fn test_count_delta_polls_then_rechecks() {
        let step = Step::ExpectCountDelta {
            target: Locator::css(".blogDetails div:nth-of-type(2)"),
            slot: "likes".into(),
            delta: 1,
        };
        let js = handle().step_to_js(&step);
        assert!(js.contains(
            "expect.poll(() => readCount(counter), { timeout: 5000 }).toBe(want)"
        ));
        assert!(js.contains("page.waitForTimeout(500)"));
        assert!(js.contains("expect(await readCount(counter)).toBe(want)"));
        assert!(js.find("expect.poll").unwrap() < js.find("waitForTimeout").unwrap());
    }

    #[test]
    fn test_assertions_carry_expect_timeout() {
        let target = Locator::text("mluukkai Logged in");
        let visible = handle().step_to_js(&Step::ExpectVisible {
            target: target.clone(),
        });
        let hidden = handle().step_to_js(&Step::ExpectHidden { target });
        assert!(visible.contains(".toBeVisible({ timeout: 5000 })"));
        assert!(hidden.contains(".not.toBeVisible({ timeout: 5000 })"));
    }

    #[test]
    fn test_settle_waits_configured_quiet_period() {
        let timing = TimingConfig {
            settle_ms: 750,
            ..Default::default()
        };
        let handle = PlaywrightHandle::new(BrowserConfig::default(), timing, NodeConfig::default());
        assert_eq!(
            handle.step_to_js(&Step::Settle),
            "    await page.waitForTimeout(750);"
        );
    }

    #[test]
    fn test_reset_step_posts_through_browser_context() {
        let js = handle()
            .with_reset_path("/api/reset")
            .step_to_js(&Step::ResetBackend);
        assert!(js.contains(r#"await context.request.post("/api/reset")"#));
        assert!(js.contains("if (!response.ok())"));
        assert!(js.contains("throw new Error('reset rejected: '"));
    }

    #[test]
    fn test_fill_values_are_escaped() {
        let step = Step::Fill {
            target: Locator::test_id("title"),
            value: "');process.exit(0);('".into(),
        };
        let js = handle().step_to_js(&step);
        assert_eq!(
            js,
            r#"    await page.getByTestId("title").fill("');process.exit(0);('");"#
        );
    }

    #[test]
    fn test_parse_output_success() {
        let stdout = concat!(
            "@@step {\"index\":0,\"ms\":120}\n",
            "[scenario] given logged in\n",
            "@@step {\"index\":1,\"ms\":8}\n",
        );
        let report = parse_output(stdout).unwrap();
        assert_eq!(report.completed.len(), 2);
        assert_eq!(report.completed[1], StepTiming { index: 1, ms: 8 });
        assert!(report.failure.is_none());
        assert!(report.check(&[]).is_ok());
    }

    #[test]
    fn test_parse_output_failure_maps_to_step() {
        let steps = vec![
            Step::Navigate {
                path: String::new(),
            },
            Step::ExpectVisible {
                target: Locator::text("Things I know"),
            },
        ];
        let stdout = concat!(
            "@@step {\"index\":0,\"ms\":50}\n",
            "@@fail {\"index\":1,\"message\":\"\\u001b[31mTimed out 5000ms\\u001b[39m\"}\n",
        );
        let report = parse_output(stdout).unwrap();
        assert_eq!(report.failure.as_ref().unwrap().message, "Timed out 5000ms");

        match report.check(&steps).unwrap_err() {
            E2eError::StepFailed { index, kind, reason, .. } => {
                assert_eq!(index, 1);
                assert_eq!(kind, FailureKind::Assertion);
                assert_eq!(reason, "Timed out 5000ms");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_launch_failure_is_setup() {
        let stdout = "@@fail {\"index\":-1,\"message\":\"Executable doesn't exist\"}\n";
        let report = parse_output(stdout).unwrap();
        let err = report.check(&[]).unwrap_err();
        assert!(matches!(err, E2eError::BrowserLaunch(_)));
        assert_eq!(err.kind(), FailureKind::Setup);
    }
}
