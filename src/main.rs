mod audit;
mod config;
mod github;
mod modules;
mod platform;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use teloxide::Bot;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::audit::{ConsoleAudit, NoopReporter, Reporter, TelegramReporter};
use crate::config::Config;
use crate::github::GithubClient;
use crate::modules::{Dispatcher, Registry};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,yozybot=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config.toml"));

    info!("Loading configuration from: {}", config_path.display());
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    info!("Configuration loaded successfully");
    info!("  Dispatch mode: {}", config.dispatch.mode);
    info!("  GitHub API: {}", config.github.api_base_url);
    info!("  Allowed users: {:?}", config.telegram.allowed_user_ids);

    let bot = Bot::new(&config.telegram.bot_token);

    let reporter: Arc<dyn Reporter> = match config.telegram.log_chat_id {
        Some(chat_id) => {
            info!("  Log chat: {}", chat_id);
            Arc::new(TelegramReporter::new(bot.clone(), chat_id))
        }
        None => Arc::new(NoopReporter),
    };
    let lookup = Arc::new(GithubClient::new(&config.github)?);

    let registry = Registry::builtin(&config, lookup, Arc::new(ConsoleAudit), reporter);
    if let Err(e) = registry.check_unique_commands() {
        if !config.dispatch.allow_duplicate_commands {
            return Err(e);
        }
        warn!("{:#}; every matching module will run", e);
    }
    if registry.is_empty() {
        anyhow::bail!("No modules registered");
    }
    info!("Registered {} module(s)", registry.len());

    let dispatcher = Arc::new(Dispatcher::new(registry, config.dispatch.mode));

    // Run the Telegram bot
    info!("Bot is starting...");
    platform::telegram::run(dispatcher, config.telegram.allowed_user_ids.clone(), bot).await?;

    Ok(())
}
