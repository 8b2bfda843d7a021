use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum DispatchMode {
    /// Every module sees every message
    #[default]
    FanOut,
    /// Stop at the first module that acts on the message
    FirstMatch,
}

impl std::fmt::Display for DispatchMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DispatchMode::FanOut => write!(f, "fan_out"),
            DispatchMode::FirstMatch => write!(f, "first_match"),
        }
    }
}

/// What the user sees when a GitHub lookup fails
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LookupFailurePolicy {
    #[default]
    Silent,
    Reply,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub dispatch: DispatchConfig,
    #[serde(default)]
    pub github: GithubConfig,
    #[serde(default)]
    pub greeting: GreetingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TelegramConfig {
    pub bot_token: String,
    /// Empty means everyone may talk to the bot
    #[serde(default)]
    pub allowed_user_ids: Vec<u64>,
    /// Chat that receives usage reports
    #[serde(default)]
    pub log_chat_id: Option<i64>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct DispatchConfig {
    #[serde(default)]
    pub mode: DispatchMode,
    #[serde(default)]
    pub allow_duplicate_commands: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GithubConfig {
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default)]
    pub on_lookup_failure: LookupFailurePolicy,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            user_agent: default_user_agent(),
            on_lookup_failure: LookupFailurePolicy::default(),
            timeout_secs: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct GreetingConfig {
    /// Replaces the built-in greeting pool
    #[serde(default)]
    pub messages: Option<Vec<String>>,
    /// Fixed seed for greeting selection
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_api_base_url() -> String {
    "https://api.github.com".to_string()
}

fn default_user_agent() -> String {
    // GitHub rejects requests without a User-Agent
    "yozybot".to_string()
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content).context("Failed to parse config file")?;

        if config.telegram.bot_token.trim().is_empty() {
            anyhow::bail!("telegram.bot_token must not be empty");
        }
        if let Some(messages) = &config.greeting.messages {
            if messages.is_empty() {
                anyhow::bail!("greeting.messages must contain at least one greeting");
            }
        }

        Ok(config)
    }
}
