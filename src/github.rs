use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::debug;

use crate::config::GithubConfig;

/// A GitHub user as returned by `GET /users/{username}`.
///
/// String fields GitHub reports as `null` decode to `None` and render as the
/// empty string.
#[derive(Debug, Clone, Default, Deserialize)]
#[allow(dead_code)]
pub struct ProfileRecord {
    pub login: String,
    #[serde(default)]
    pub id: u64,
    #[serde(default)]
    pub html_url: Option<String>,
    #[serde(default, rename = "type")]
    pub account_type: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub blog: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub hireable: Option<bool>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub twitter_username: Option<String>,
    #[serde(default)]
    pub public_repos: u64,
    #[serde(default)]
    pub public_gists: u64,
    #[serde(default)]
    pub followers: u64,
    #[serde(default)]
    pub following: u64,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
}

/// Display format for profile timestamps, always in UTC.
const TIMESTAMP_FORMAT: &str = "%b %d, %Y %H:%M:%S UTC";

/// Parse an RFC 3339 timestamp and render it for the profile reply.
pub fn format_timestamp(raw: &str) -> Result<String> {
    let parsed = DateTime::parse_from_rfc3339(raw)
        .with_context(|| format!("Invalid timestamp: {:?}", raw))?;
    Ok(parsed
        .with_timezone(&Utc)
        .format(TIMESTAMP_FORMAT)
        .to_string())
}

/// Source of GitHub profiles
#[async_trait]
pub trait ProfileLookup: Send + Sync {
    async fn fetch_user(&self, username: &str) -> Result<ProfileRecord>;
}

pub struct GithubClient {
    client: reqwest::Client,
    base_url: String,
}

impl GithubClient {
    pub fn new(config: &GithubConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder().user_agent(config.user_agent.clone());
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder.build().context("Failed to build GitHub HTTP client")?;
        Ok(Self {
            client,
            base_url: config.api_base_url.clone(),
        })
    }

    /// `{base}/users/{username}` with the username kept as one encoded path segment.
    fn user_url(&self, username: &str) -> Result<reqwest::Url> {
        if matches!(username, "" | "." | "..") {
            anyhow::bail!("Invalid GitHub username: {:?}", username);
        }
        let mut url = reqwest::Url::parse(&self.base_url)
            .with_context(|| format!("Invalid GitHub API base URL: {}", self.base_url))?;
        url.path_segments_mut()
            .map_err(|_| {
                anyhow::anyhow!("GitHub API base URL cannot have a path: {}", self.base_url)
            })?
            .pop_if_empty()
            .extend(["users", username]);
        Ok(url)
    }
}

#[async_trait]
impl ProfileLookup for GithubClient {
    async fn fetch_user(&self, username: &str) -> Result<ProfileRecord> {
        let url = self.user_url(username)?;

        debug!("Fetching GitHub user: {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to send request to GitHub")?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            anyhow::bail!("GitHub API error ({}): {}", status, error_body);
        }

        response
            .json::<ProfileRecord>()
            .await
            .context("Failed to parse GitHub user response")
    }
}
