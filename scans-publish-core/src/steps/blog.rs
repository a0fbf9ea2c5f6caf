use std::fmt;
use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::cancel::CancellationFlag;
use crate::contract::{BlogService, BlogTarget, NewPost};
use crate::outcome::{Checks, Failure, FailureContext, Outcome};
use crate::retry::RetryPolicy;
use crate::slug::post_slug;
use crate::state::{LinkKind, PublishState, ReleaseInfo};
use crate::step::Step;
use crate::template::TemplateRenderer;

/// Blogger settings as read from configuration. Any value may be missing.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BloggerSettings {
    pub url: Option<String>,
    pub id: Option<String>,
    /// OAuth bearer token used to insert posts.
    #[serde(default, skip_serializing)]
    pub access_token: Option<String>,
}

impl fmt::Debug for BloggerSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BloggerSettings")
            .field("url", &self.url)
            .field("id", &self.id)
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Blogger settings that passed [`BloggerSettings::validate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidBloggerSettings {
    pub url: String,
    pub host: String,
    pub target: BlogTarget,
}

fn absolute_url() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[a-zA-Z][a-zA-Z0-9+.-]*://([^/?#\s@]+@)?([^/?#\s:@]+)(:\d+)?([/?#]\S*)?$")
            .expect("static url pattern is valid")
    })
}

impl BloggerSettings {
    pub fn new(url: Option<String>, id: Option<String>) -> Self {
        Self {
            url,
            id,
            access_token: None,
        }
    }

    pub fn with_access_token(mut self, access_token: Option<String>) -> Self {
        self.access_token = access_token;
        self
    }

    /// Checks that url, id and access token are all set (reporting every missing
    /// one at once), then that the url is an absolute link.
    pub fn validate(&self) -> Outcome<ValidBloggerSettings> {
        let mut checks = Checks::new();
        checks
            .require_setting(self.url.as_deref(), "Blogger url is undefined.")
            .require_setting(self.id.as_deref(), "Blogger id is undefined.")
            .require_setting(self.access_token.as_deref(), "Blogger access token is undefined.");
        checks.finish()?;

        let url = self.url.as_deref().unwrap_or_default().trim().to_string();
        let target = BlogTarget {
            blog_id: self.id.as_deref().unwrap_or_default().trim().to_string(),
            access_token: self
                .access_token
                .as_deref()
                .unwrap_or_default()
                .trim()
                .to_string(),
        };
        let host = absolute_url()
            .captures(&url)
            .and_then(|c| c.get(2))
            .map(|m| m.as_str().to_string())
            .ok_or_else(|| Failure::configuration("Unable to identify Blogger url as valid link."))?;

        Ok(ValidBloggerSettings { url, host, target })
    }
}

fn post_title(info: &ReleaseInfo) -> String {
    match info.chapter_name.as_deref().filter(|n| !n.trim().is_empty()) {
        Some(name) => format!("{} - {}", info.display_title, name),
        None => format!("{} - Chapter {}", info.display_title, info.chapter_number),
    }
}

/// Renders the release announcement and publishes it as a blog post.
///
/// Runs last: the announcement links to everything earlier steps uploaded.
/// The rendered HTML stays in the state for the chat announcement.
pub struct BlogPostStep {
    settings: BloggerSettings,
    blog: Arc<dyn BlogService>,
    renderer: TemplateRenderer,
    label: Option<String>,
    retry: RetryPolicy,
}

impl BlogPostStep {
    pub fn new(settings: BloggerSettings, blog: Arc<dyn BlogService>, renderer: TemplateRenderer) -> Self {
        Self {
            settings,
            blog,
            renderer,
            label: None,
            retry: RetryPolicy::none(),
        }
    }

    /// Post label; defaults to the release title.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

#[async_trait]
impl Step for BlogPostStep {
    fn name(&self) -> &str {
        "blogger"
    }

    fn validate(&self) -> Outcome<()> {
        self.settings.validate().map(|_| ())
    }

    async fn execute(&self, state: &mut PublishState, cancel: &CancellationFlag) -> Outcome<()> {
        let settings = self.settings.validate().inspect_err(|failure| {
            error!(error = %failure, "[PUBLISH][BLOG] Blogger settings are invalid");
        })?;
        cancel.check(self.name())?;

        let html = self.renderer.render(state).await?;
        let post = NewPost {
            title: post_title(&state.info),
            html_body: html.clone(),
            label: self
                .label
                .clone()
                .unwrap_or_else(|| state.info.display_title.clone()),
            url_slug: post_slug(&state.info.display_title, &state.info.chapter_number),
        };

        info!(
            host = %settings.host,
            title = %post.title,
            slug = %post.url_slug,
            "[PUBLISH][BLOG] Creating blog post"
        );
        let blog: &dyn BlogService = self.blog.as_ref();
        let target = &settings.target;
        let created = self
            .retry
            .run("create_post", cancel, move |_| {
                let post = post.clone();
                async move {
                    blog.create_post(target, post)
                        .await
                        .or_external("Blogger: unable to create post")
                }
            })
            .await?;

        info!(post_id = %created.id, url = ?created.url, "[PUBLISH][BLOG] Blog post created");
        if let Some(url) = created.url {
            state.links.set(LinkKind::BlogPost, url)?;
        }
        state.internal.announcement_html = Some(html);
        Ok(())
    }
}
