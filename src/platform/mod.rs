pub mod telegram;

use anyhow::Result;
use async_trait::async_trait;

/// A message received from the chat platform
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingMessage {
    /// Platform-specific user ID as string
    pub sender_id: String,
    /// Chat the reply goes to
    pub chat_id: i64,
    /// The message text
    pub text: String,
}

/// How the platform should render an outgoing reply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyFormat {
    Plain,
    Html,
}

/// Outbound side of the chat platform.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, chat_id: i64, text: &str, format: ReplyFormat) -> Result<()>;
}
