//! Element lookup by visible text, accessible role, test id or CSS

use std::fmt;

use serde::{Deserialize, Serialize};

/// How a control on the page is found.
///
/// Text and role lookups are preferred; they follow what the user sees
/// rather than the markup. CSS is kept for the few places the app exposes
/// nothing better (the like counter).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "by", rename_all = "snake_case")]
pub enum Locator {
    Text {
        text: String,
        #[serde(default)]
        exact: bool,
    },
    Role {
        role: String,
        name: String,
    },
    TestId {
        id: String,
    },
    Css {
        selector: String,
    },
}

impl Locator {
    pub fn text(text: impl Into<String>) -> Self {
        Locator::Text {
            text: text.into(),
            exact: false,
        }
    }

    pub fn button(name: impl Into<String>) -> Self {
        Locator::Role {
            role: "button".to_string(),
            name: name.into(),
        }
    }

    pub fn test_id(id: impl Into<String>) -> Self {
        Locator::TestId { id: id.into() }
    }

    pub fn css(selector: impl Into<String>) -> Self {
        Locator::Css {
            selector: selector.into(),
        }
    }

    /// Render as a Playwright locator expression rooted at `page`.
    pub fn to_js(&self, page: &str) -> String {
        match self {
            Locator::Text { text, exact } => {
                format!("{}.getByText({}, {{ exact: {} }})", page, js_str(text), exact)
            }
            Locator::Role { role, name } => {
                format!(
                    "{}.getByRole({}, {{ name: {} }})",
                    page,
                    js_str(role),
                    js_str(name)
                )
            }
            Locator::TestId { id } => format!("{}.getByTestId({})", page, js_str(id)),
            Locator::Css { selector } => format!("{}.locator({})", page, js_str(selector)),
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Text { text, .. } => write!(f, "text={}", text),
            Locator::Role { role, name } => write!(f, "role={}[{}]", role, name),
            Locator::TestId { id } => write!(f, "testid={}", id),
            Locator::Css { selector } => write!(f, "css={}", selector),
        }
    }
}

/// Quote a value as a JavaScript string literal.
pub(crate) fn js_str(value: &str) -> String {
    // JSON string syntax is valid JS; serializing a &str cannot fail.
    serde_json::Value::String(value.to_string()).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_locator_js() {
        let js = Locator::button("view").to_js("page");
        assert_eq!(js, r#"page.getByRole("button", { name: "view" })"#);
    }

    #[test]
    fn test_text_locator_escapes_quotes() {
        let js = Locator::text("it's \"quoted\"").to_js("page");
        assert_eq!(
            js,
            r#"page.getByText("it's \"quoted\"", { exact: false })"#
        );
    }

    #[test]
    fn test_parse_from_yaml() {
        let yaml = r#"
by: role
role: button
name: new blog
"#;
        let locator: Locator = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(locator, Locator::button("new blog"));

        let locator: Locator = serde_yaml::from_str("by: test_id\nid: username\n").unwrap();
        assert_eq!(locator.to_js("page"), r#"page.getByTestId("username")"#);
    }

    #[test]
    fn test_display_is_short() {
        assert_eq!(Locator::css(".blogDetails").to_string(), "css=.blogDetails");
        assert_eq!(Locator::button("Like").to_string(), "role=button[Like]");
    }
}
