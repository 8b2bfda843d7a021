use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use teloxide::payloads::SendMessageSetters;
use teloxide::prelude::*;
use teloxide::types::ParseMode;
use tracing::{debug, info, warn};

use crate::modules::{Dispatcher as ModuleDispatcher, Outcome};
use crate::platform::{IncomingMessage, ReplyFormat, Transport};

/// Sends replies through the Bot API
pub struct TelegramTransport {
    bot: Bot,
}

impl TelegramTransport {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl Transport for TelegramTransport {
    async fn send(&self, chat_id: i64, text: &str, format: ReplyFormat) -> Result<()> {
        let request = self.bot.send_message(ChatId(chat_id), text);
        let sent = match format {
            ReplyFormat::Plain => request.await,
            ReplyFormat::Html => request.parse_mode(ParseMode::Html).await,
        };
        sent.with_context(|| format!("Failed to send message to chat {}", chat_id))?;
        Ok(())
    }
}

fn is_allowed(allowed_user_ids: &[u64], user_id: u64) -> bool {
    allowed_user_ids.is_empty() || allowed_user_ids.contains(&user_id)
}

/// Run the Telegram bot platform
pub async fn run(
    dispatcher: Arc<ModuleDispatcher>,
    allowed_user_ids: Vec<u64>,
    bot: Bot,
) -> Result<()> {
    info!("Starting Telegram platform...");

    let handler = Update::filter_message()
        .filter_map(move |msg: Message| {
            let user = msg.from.as_ref()?;
            if is_allowed(&allowed_user_ids, user.id.0) {
                Some(msg)
            } else {
                None
            }
        })
        .endpoint(handle_message);

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![dispatcher])
        .default_handler(|upd| async move {
            warn!("Unhandled update: {:?}", upd.id);
        })
        .error_handler(LoggingErrorHandler::with_custom_text("telegram"))
        .build()
        .dispatch()
        .await;

    Ok(())
}

async fn handle_message(
    bot: Bot,
    msg: Message,
    dispatcher: Arc<ModuleDispatcher>,
) -> ResponseResult<()> {
    let user = match msg.from.as_ref() {
        Some(user) => user,
        None => return Ok(()),
    };

    let text = match msg.text() {
        Some(t) => t.to_string(),
        None => return Ok(()),
    };

    debug!("Telegram message from {}: {}", user.id.0, text);

    let incoming = IncomingMessage {
        sender_id: user.id.0.to_string(),
        chat_id: msg.chat.id.0,
        text,
    };

    let transport = TelegramTransport::new(bot);
    for outcome in dispatcher.dispatch(&transport, &incoming).await {
        if let Outcome::Failed { reason } = outcome {
            debug!("Dispatch for {} ended in failure: {}", incoming.sender_id, reason);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_allow_list_admits_everyone() {
        assert!(is_allowed(&[], 12345));
    }

    #[test]
    fn test_allow_list_filters_users() {
        assert!(is_allowed(&[1, 2], 2));
        assert!(!is_allowed(&[1, 2], 3));
    }
}
