//! Blog application scenarios

use crate::config::UiMap;
use crate::helpers::{create_blog, like_post, login_with, logout, remove_post, view_post};
use crate::locator::Locator;
use crate::scenario::{Account, Post, Precondition, Scenario};
use crate::step::Step;

pub const LOGIN: &str = "Login";
pub const WHEN_LOGGED_IN: &str = "when logged in";

/// Accounts and content shared by the blog scenarios
#[derive(Debug, Clone)]
pub struct Fixtures {
    /// Creates posts
    pub owner: Account,

    /// Never owns anything
    pub other: Account,

    pub post: Post,
}

impl Default for Fixtures {
    fn default() -> Self {
        Self {
            owner: Account::new("mluukkai", "mluukkai", "superuser"),
            other: Account::new("otheruser", "otheruser", "password"),
            post: Post::new("Things I know", "Dan", "https://things-iknow.com/"),
        }
    }
}

impl Fixtures {
    fn accounts(&self) -> [Account; 2] {
        [self.owner.clone(), self.other.clone()]
    }
}

/// Every blog scenario, in reporting order
pub fn blog_app(ui: &UiMap, fx: &Fixtures) -> Vec<Scenario> {
    let accounts = fx.accounts();
    let logged_in = Precondition::logged_in_as(ui, &fx.owner);
    let post_title = Locator::text(fx.post.title.clone());

    vec![
        Scenario::new("Login form is shown")
            .seed(&accounts)
            .then(Step::ExpectVisible {
                target: ui.login_heading.clone(),
            }),
        Scenario::new("succeeds with correct credentials")
            .in_group(LOGIN)
            .seed(&accounts)
            .act(login_with(ui, &fx.owner.username, &fx.owner.password))
            .then(Step::ExpectVisible {
                target: ui.logged_in_as(&fx.owner.name),
            }),
        Scenario::new("fails with wrong credentials")
            .in_group(LOGIN)
            .seed(&accounts)
            .act(login_with(ui, "mlukkai", "wrong"))
            .then(Step::Settle)
            .then(Step::ExpectHidden {
                target: ui.logged_in_as(&fx.owner.name),
            })
            .then(Step::ExpectVisible {
                target: ui.login_heading.clone(),
            }),
        Scenario::new("a new blog can be created")
            .in_group(WHEN_LOGGED_IN)
            .seed(&accounts)
            .given(logged_in.clone())
            .act(create_blog(ui, &fx.post))
            .then(Step::ExpectVisible {
                target: post_title.clone(),
            }),
        Scenario::new("blog can be liked")
            .in_group(WHEN_LOGGED_IN)
            .seed(&accounts)
            .given(logged_in.clone())
            .act(create_blog(ui, &fx.post))
            .act(view_post(ui))
            .then(Step::CaptureCount {
                target: ui.like_count.clone(),
                slot: "likes".into(),
            })
            .act(like_post(ui))
            .then(Step::ExpectCountDelta {
                target: ui.like_count.clone(),
                slot: "likes".into(),
                delta: 1,
            }),
        Scenario::new("blog can be deleted")
            .in_group(WHEN_LOGGED_IN)
            .seed(&accounts)
            .given(logged_in.clone())
            .act(create_blog(ui, &fx.post))
            .act(view_post(ui))
            .act(remove_post(ui))
            .then(Step::ExpectHidden {
                target: post_title.clone(),
            })
            .then(Step::Navigate {
                path: String::new(),
            })
            .then(Step::ExpectVisible {
                target: ui.logged_in_as(&fx.owner.name),
            })
            .then(Step::ExpectHidden {
                target: post_title.clone(),
            }),
        Scenario::new("created blog is gone after a reset")
            .in_group(WHEN_LOGGED_IN)
            .seed(&accounts)
            .given(logged_in.clone())
            .act(create_blog(ui, &fx.post))
            .then(Step::ExpectVisible {
                target: post_title.clone(),
            })
            .then(Step::ResetBackend)
            .then(Step::Navigate {
                path: String::new(),
            })
            .then(Step::ExpectHidden {
                target: post_title.clone(),
            }),
        Scenario::new("only the user who added the blog sees the delete button")
            .in_group(WHEN_LOGGED_IN)
            .seed(&accounts)
            .given(logged_in)
            .act(create_blog(ui, &fx.post))
            .then(Step::ExpectVisible {
                target: post_title,
            })
            .act(view_post(ui))
            .then(Step::ExpectVisible {
                target: ui.remove_button.clone(),
            })
            .act(logout(ui))
            .act(login_with(ui, &fx.other.username, &fx.other.password))
            .act(view_post(ui))
            .then(Step::ExpectHidden {
                target: ui.remove_button.clone(),
            }),
    ]
}

/// Keep scenarios matching an optional name substring and group
pub fn select(scenarios: Vec<Scenario>, name: Option<&str>, group: Option<&str>) -> Vec<Scenario> {
    scenarios
        .into_iter()
        .filter(|s| name.map_or(true, |n| s.full_name().contains(n)))
        .filter(|s| group.map_or(true, |g| s.group.as_deref() == Some(g)))
        .collect()
}
