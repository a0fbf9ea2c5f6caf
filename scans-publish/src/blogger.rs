#![doc = "Blogger integration for the CLI: implements the core blog contract against the Blogger v3 REST API."]
//
//! # Blogger client
//!
//! [`BloggerClient`] wires the [`BlogService`] trait from
//! [`scans_publish_core::contract`] to Google's Blogger API. The core blog step
//! validates the blog url and id, renders the announcement and hands over a
//! ready [`NewPost`]; this module only does transport.
//!
//! - Authentication is a pre-issued OAuth bearer token (`BLOGGER_ACCESS_TOKEN`),
//!   validated with the rest of the Blogger settings and handed over in the
//!   [`BlogTarget`] of each call.
//! - Transport and decode errors are returned as boxed errors; the step turns
//!   them into pipeline failures.

use async_trait::async_trait;
use reqwest::Client;
use scans_publish_core::contract::{BlogService, BlogTarget, NewPost, PostHandle, ProviderError};
use serde::{Deserialize, Serialize};

pub const DEFAULT_API_BASE: &str = "https://www.googleapis.com/blogger/v3";

pub struct BloggerClient {
    http: Client,
    api_base: String,
}

#[derive(Debug, Serialize)]
struct PostBody<'a> {
    kind: &'static str,
    title: &'a str,
    content: &'a str,
    labels: Vec<&'a str>,
    url: &'a str,
}

#[derive(Debug, Deserialize)]
struct PostResponse {
    id: String,
    #[serde(default)]
    url: Option<String>,
}

impl Default for BloggerClient {
    fn default() -> Self {
        Self::new()
    }
}

impl BloggerClient {
    pub fn new() -> Self {
        Self::with_api_base(DEFAULT_API_BASE)
    }

    /// Client against a different API root (a proxy, or a local server in tests).
    pub fn with_api_base(api_base: impl Into<String>) -> Self {
        let api_base = api_base.into().trim_end_matches('/').to_string();
        tracing::info!(api_base = %api_base, "Initialized BloggerClient");
        Self {
            http: Client::new(),
            api_base,
        }
    }

    pub fn posts_url(&self, blog_id: &str) -> String {
        format!("{}/blogs/{}/posts", self.api_base, blog_id)
    }
}

#[async_trait]
impl BlogService for BloggerClient {
    async fn create_post(&self, target: &BlogTarget, post: NewPost) -> Result<PostHandle, ProviderError> {
        let blog_id = target.blog_id.as_str();
        let body = PostBody {
            kind: "blogger#post",
            title: &post.title,
            content: &post.html_body,
            labels: vec![post.label.as_str()],
            url: &post.url_slug,
        };
        tracing::info!(blog_id, title = %post.title, "Inserting Blogger post");

        let response = self
            .http
            .post(self.posts_url(blog_id))
            .bearer_auth(&target.access_token)
            .query(&[("isDraft", "false")])
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            tracing::error!(%status, detail = %detail, "Blogger API rejected the post");
            return Err(format!("Blogger API error {status}: {detail}").into());
        }

        let created: PostResponse = response.json().await?;
        tracing::info!(post_id = %created.id, url = ?created.url, "Blogger post created");
        Ok(PostHandle {
            id: created.id,
            url: created.url,
        })
    }
}
