//! Scenario steps: one UI action or one polled assertion each

use serde::{Deserialize, Serialize};

use crate::locator::Locator;

/// A single step in a scenario
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Step {
    /// Navigate to a path relative to the application root
    Navigate { path: String },

    /// Fill an input field
    Fill { target: Locator, value: String },

    /// Click a control
    Click { target: Locator },

    /// Click a control that opens a native confirm dialog, accepting it.
    ///
    /// The dialog handler only lives for the duration of this click.
    ClickAcceptingDialog { target: Locator },

    /// Wait until a control is visible, as part of a helper's sequencing
    WaitFor { target: Locator },

    /// Assert a control becomes visible within the expect timeout
    ExpectVisible { target: Locator },

    /// Assert a control is (or becomes) absent within the expect timeout
    ExpectHidden { target: Locator },

    /// Read the first integer in a control's text into a named slot
    CaptureCount { target: Locator, slot: String },

    /// Assert the integer in a control's text settles at `slot + delta`
    ExpectCountDelta {
        target: Locator,
        slot: String,
        delta: i64,
    },

    /// Wait out `timing.settle_ms` so a just-triggered request can land
    /// before an absence check
    Settle,

    /// Wipe the backend mid-scenario through the browser context's
    /// request API, the same endpoint the runner resets with
    ResetBackend,

    /// Log a message (for debugging)
    Log { message: String },
}

/// Whether a step acts on the page, checks it, or touches the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    Action,
    Assertion,
    Setup,
}

impl Step {
    pub fn kind(&self) -> StepKind {
        match self {
            Step::ExpectVisible { .. }
            | Step::ExpectHidden { .. }
            | Step::ExpectCountDelta { .. } => StepKind::Assertion,
            Step::ResetBackend => StepKind::Setup,
            _ => StepKind::Action,
        }
    }

    /// Short label used in logs and reports
    pub fn name(&self) -> String {
        match self {
            Step::Navigate { path } => format!("navigate:/{}", path.trim_start_matches('/')),
            Step::Fill { target, .. } => format!("fill:{}", target),
            Step::Click { target } => format!("click:{}", target),
            Step::ClickAcceptingDialog { target } => format!("click+accept:{}", target),
            Step::WaitFor { target } => format!("wait:{}", target),
            Step::ExpectVisible { target } => format!("expect_visible:{}", target),
            Step::ExpectHidden { target } => format!("expect_hidden:{}", target),
            Step::CaptureCount { slot, .. } => format!("capture:{}", slot),
            Step::ExpectCountDelta { slot, delta, .. } => {
                format!("expect_delta:{}{:+}", slot, delta)
            }
            Step::Settle => "settle".to_string(),
            Step::ResetBackend => "reset_backend".to_string(),
            Step::Log { message } => {
                let end = message
                    .char_indices()
                    .nth(30)
                    .map(|(i, _)| i)
                    .unwrap_or(message.len());
                format!("log:{}", &message[..end])
            }
        }
    }
}
