//! Scenarios and the named preconditions they are composed from
//!
//! A scenario never inherits setup from an enclosing group. Its full
//! arrange phase is the list of preconditions it names, applied in order
//! after the implicit reset, seed and navigation to the app root.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::config::UiMap;
use crate::error::{E2eError, E2eResult};
use crate::helpers;
use crate::step::Step;

/// An account provisioned through the seeding endpoint.
///
/// Serializes to the body the endpoint expects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Display name
    pub name: String,
    pub username: String,
    pub password: String,
}

impl Account {
    pub fn new(name: &str, username: &str, password: &str) -> Self {
        Self {
            name: name.to_string(),
            username: username.to_string(),
            password: password.to_string(),
        }
    }
}

/// A blog post as entered in the creation form
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub title: String,
    pub author: String,
    pub url: String,
}

impl Post {
    pub fn new(title: &str, author: &str, url: &str) -> Self {
        Self {
            title: title.to_string(),
            author: author.to_string(),
            url: url.to_string(),
        }
    }
}

/// A named arrange-phase step shared between scenarios
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Precondition {
    pub name: String,
    pub steps: Vec<Step>,
}

impl Precondition {
    pub fn new(name: impl Into<String>, steps: Vec<Step>) -> Self {
        Self {
            name: name.into(),
            steps,
        }
    }

    /// Authenticated as `account`
    pub fn logged_in_as(ui: &UiMap, account: &Account) -> Self {
        Self::new(
            format!("logged in as {}", account.username),
            helpers::login_with(ui, &account.username, &account.password),
        )
    }

    /// `post` exists and is listed
    pub fn post_created(ui: &UiMap, post: &Post) -> Self {
        Self::new(
            format!("post '{}' created", post.title),
            helpers::create_blog(ui, post),
        )
    }
}

/// One isolated test case
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,

    /// Reporting group, e.g. "when logged in". Carries no setup.
    #[serde(default)]
    pub group: Option<String>,

    /// Accounts seeded after reset, in order
    pub accounts: Vec<Account>,

    /// Shared arrange steps, applied in order after navigation
    pub preconditions: Vec<Precondition>,

    /// Act and assert steps
    pub steps: Vec<Step>,
}

impl Scenario {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            group: None,
            accounts: Vec::new(),
            preconditions: Vec::new(),
            steps: Vec::new(),
        }
    }

    pub fn in_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    pub fn seed(mut self, accounts: &[Account]) -> Self {
        self.accounts.extend_from_slice(accounts);
        self
    }

    pub fn given(mut self, precondition: Precondition) -> Self {
        self.preconditions.push(precondition);
        self
    }

    /// Append action steps (usually a helper's output)
    pub fn act(mut self, steps: Vec<Step>) -> Self {
        self.steps.extend(steps);
        self
    }

    /// Append one assertion or action step
    pub fn then(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }

    /// Fully qualified name, "group > name"
    pub fn full_name(&self) -> String {
        match &self.group {
            Some(group) => format!("{} > {}", group, self.name),
            None => self.name.clone(),
        }
    }

    /// Everything the browser runs: app root, preconditions, own steps
    pub fn full_steps(&self) -> Vec<Step> {
        let mut steps = vec![Step::Navigate {
            path: String::new(),
        }];
        for precondition in &self.preconditions {
            steps.push(Step::Log {
                message: format!("given {}", precondition.name),
            });
            steps.extend(precondition.steps.iter().cloned());
        }
        steps.extend(self.steps.iter().cloned());
        steps
    }

    pub fn validate(&self) -> E2eResult<()> {
        let invalid = |reason: &str| E2eError::InvalidScenario {
            scenario: self.full_name(),
            reason: reason.to_string(),
        };

        if self.steps.is_empty() {
            return Err(invalid("no steps"));
        }
        let mut seen = HashSet::new();
        for account in &self.accounts {
            if !seen.insert(account.username.as_str()) {
                return Err(invalid(&format!(
                    "username '{}' seeded twice",
                    account.username
                )));
            }
        }

        let mut captured = HashSet::new();
        for step in self.full_steps() {
            match step {
                Step::CaptureCount { slot, .. } => {
                    captured.insert(slot);
                }
                Step::ExpectCountDelta { slot, .. } if !captured.contains(&slot) => {
                    return Err(invalid(&format!("count '{}' compared before capture", slot)));
                }
                _ => {}
            }
        }
        Ok(())
    }
}
