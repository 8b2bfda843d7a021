use async_trait::async_trait;
use teloxide::prelude::*;
use tracing::{info, warn};

use crate::platform::IncomingMessage;

/// Records which module handled a message and for whom.
pub trait AuditLog: Send + Sync {
    fn show_log(&self, module: &str, sender_id: &str);
}

/// Writes audit lines through `tracing`.
pub struct ConsoleAudit;

impl AuditLog for ConsoleAudit {
    fn show_log(&self, module: &str, sender_id: &str) {
        info!(module = module, sender = sender_id, "Module used");
    }
}

/// Secondary reporting sink. Fire-and-forget: implementations swallow their
/// own errors.
#[async_trait]
pub trait Reporter: Send + Sync {
    async fn send_log(&self, message: &IncomingMessage, sender_id: &str, module: &str);
}

/// Used when no log chat is configured
pub struct NoopReporter;

#[async_trait]
impl Reporter for NoopReporter {
    async fn send_log(&self, _message: &IncomingMessage, _sender_id: &str, _module: &str) {}
}

/// Forwards usage reports to a dedicated Telegram chat.
pub struct TelegramReporter {
    bot: Bot,
    log_chat_id: ChatId,
}

impl TelegramReporter {
    pub fn new(bot: Bot, log_chat_id: i64) -> Self {
        Self {
            bot,
            log_chat_id: ChatId(log_chat_id),
        }
    }
}

pub(crate) fn format_report(message: &IncomingMessage, sender_id: &str, module: &str) -> String {
    format!("#{} used by {}: {}", module, sender_id, message.text)
}

#[async_trait]
impl Reporter for TelegramReporter {
    async fn send_log(&self, message: &IncomingMessage, sender_id: &str, module: &str) {
        let report = format_report(message, sender_id, module);
        if let Err(e) = self.bot.send_message(self.log_chat_id, report).await {
            warn!("Failed to forward log for module {}: {}", module, e);
        }
    }
}
