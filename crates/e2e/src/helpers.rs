//! Interaction helpers
//!
//! Each helper is one user-level operation expanded into UI steps. Helpers
//! only act; checking the outcome is left to the scenario.

use crate::config::UiMap;
use crate::locator::Locator;
use crate::scenario::Post;
use crate::step::Step;

/// Fill the login form and submit it
pub fn login_with(ui: &UiMap, username: &str, password: &str) -> Vec<Step> {
    vec![
        Step::Fill {
            target: ui.username_input.clone(),
            value: username.to_string(),
        },
        Step::Fill {
            target: ui.password_input.clone(),
            value: password.to_string(),
        },
        Step::Click {
            target: ui.login_button.clone(),
        },
    ]
}

pub fn logout(ui: &UiMap) -> Vec<Step> {
    vec![Step::Click {
        target: ui.logout.clone(),
    }]
}

/// Open the creation form, submit `post`, and wait for it to be listed
pub fn create_blog(ui: &UiMap, post: &Post) -> Vec<Step> {
    vec![
        Step::Click {
            target: ui.new_post_toggle.clone(),
        },
        Step::Fill {
            target: ui.title_input.clone(),
            value: post.title.clone(),
        },
        Step::Fill {
            target: ui.author_input.clone(),
            value: post.author.clone(),
        },
        Step::Fill {
            target: ui.url_input.clone(),
            value: post.url.clone(),
        },
        Step::Click {
            target: ui.create_button.clone(),
        },
        Step::WaitFor {
            target: Locator::text(post.title.clone()),
        },
    ]
}

/// Expand the post's details
pub fn view_post(ui: &UiMap) -> Vec<Step> {
    vec![Step::Click {
        target: ui.view_button.clone(),
    }]
}

pub fn like_post(ui: &UiMap) -> Vec<Step> {
    vec![Step::Click {
        target: ui.like_button.clone(),
    }]
}

/// Click remove and accept the confirmation prompt
pub fn remove_post(ui: &UiMap) -> Vec<Step> {
    vec![Step::ClickAcceptingDialog {
        target: ui.remove_button.clone(),
    }]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::step::StepKind;

    fn post() -> Post {
        Post::new("Things I know", "Dan", "https://things-iknow.com/")
    }

    #[test]
    fn test_helpers_never_assert() {
        let ui = UiMap::default();
        let all = [
            login_with(&ui, "mluukkai", "superuser"),
            logout(&ui),
            create_blog(&ui, &post()),
            view_post(&ui),
            like_post(&ui),
            remove_post(&ui),
        ];
        for steps in all.iter() {
            assert!(steps.iter().all(|s| s.kind() == StepKind::Action));
        }
    }

    #[test]
    fn test_login_submits_last() {
        let ui = UiMap::default();
        let steps = login_with(&ui, "mluukkai", "superuser");
        assert_eq!(steps.len(), 3);
        assert_eq!(
            steps[1],
            Step::Fill {
                target: ui.password_input.clone(),
                value: "superuser".into()
            }
        );
        assert_eq!(
            steps[2],
            Step::Click {
                target: ui.login_button.clone()
            }
        );
    }

    #[test]
    fn test_create_blog_opens_form_and_waits_for_title() {
        let ui = UiMap::default();
        let steps = create_blog(&ui, &post());
        assert_eq!(
            steps.first(),
            Some(&Step::Click {
                target: ui.new_post_toggle.clone()
            })
        );
        assert_eq!(
            steps.last(),
            Some(&Step::WaitFor {
                target: Locator::text("Things I know")
            })
        );
    }

    #[test]
    fn test_remove_accepts_dialog() {
        let ui = UiMap::default();
        assert_eq!(
            remove_post(&ui),
            vec![Step::ClickAcceptingDialog {
                target: ui.remove_button.clone()
            }]
        );
    }
}
