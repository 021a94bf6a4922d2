//! HTML pages, rendered with minijinja from templates compiled into the binary.

use axum::response::Html;
use minijinja::Environment;
use serde::Serialize;

use crate::error::AppResult;

const TEMPLATES: &[(&str, &str)] = &[
    ("base.html", include_str!("../../templates/base.html")),
    ("login.html", include_str!("../../templates/login.html")),
    ("home.html", include_str!("../../templates/home.html")),
    ("navigate.html", include_str!("../../templates/navigate.html")),
    ("report.html", include_str!("../../templates/report.html")),
    ("not_found.html", include_str!("../../templates/not_found.html")),
    ("error.html", include_str!("../../templates/error.html")),
];

pub struct Views {
    env: Environment<'static>,
}

impl Views {
    pub fn new() -> Result<Self, minijinja::Error> {
        let mut env = Environment::new();
        for &(name, src) in TEMPLATES {
            env.add_template(name, src)?;
        }
        Ok(Self { env })
    }

    pub fn render<S: Serialize>(&self, name: &str, ctx: S) -> AppResult<Html<String>> {
        let tmpl = self.env.get_template(name)?;
        Ok(Html(tmpl.render(ctx)?))
    }
}

/// Position info shown above a report while browsing a topic.
#[derive(Debug, Clone, Serialize)]
pub struct NavContext {
    pub topic: String,
    /// 1-based for display
    pub number: usize,
    pub len: usize,
    pub is_first: bool,
    pub is_last: bool,
}

impl From<crate::navigation::CursorView> for NavContext {
    fn from(c: crate::navigation::CursorView) -> Self {
        Self {
            number: c.position + 1,
            is_first: c.position == 0,
            is_last: c.position + 1 >= c.len,
            len: c.len,
            topic: c.topic,
        }
    }
}
