use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::Rng;

use crate::audit::{AuditLog, Reporter};
use crate::modules::{Module, Outcome};
use crate::platform::{IncomingMessage, ReplyFormat, Transport};

pub fn default_greetings() -> Vec<String> {
    [
        "Hello there! I am Yozy",
        "G'day mate! What's up?",
        "Aye, howdy?",
        "Greetings!",
        "Yoyoyoyoyoyooo whaddup!",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// Answers `/start` with a random greeting.
pub struct StartModule {
    greetings: Vec<String>,
    rng: Mutex<StdRng>,
    audit: Arc<dyn AuditLog>,
    reporter: Arc<dyn Reporter>,
}

impl StartModule {
    /// `greetings` must not be empty.
    pub fn new(
        greetings: Vec<String>,
        rng: StdRng,
        audit: Arc<dyn AuditLog>,
        reporter: Arc<dyn Reporter>,
    ) -> Self {
        Self {
            greetings,
            rng: Mutex::new(rng),
            audit,
            reporter,
        }
    }

    fn pick_greeting(&self) -> &str {
        let index = {
            let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
            rng.random_range(0..self.greetings.len())
        };
        &self.greetings[index]
    }
}

#[async_trait]
impl Module for StartModule {
    fn name(&self) -> &str {
        "Start"
    }

    fn command(&self) -> &str {
        "/start"
    }

    async fn handle(
        &self,
        transport: &dyn Transport,
        message: &IncomingMessage,
    ) -> Result<Outcome> {
        if !message.text.starts_with(self.command()) {
            return Ok(Outcome::Skipped);
        }

        let greeting = self.pick_greeting();
        transport
            .send(message.chat_id, greeting, ReplyFormat::Plain)
            .await?;

        self.audit.show_log(self.name(), &message.sender_id);
        self.reporter
            .send_log(message, &message.sender_id, self.name())
            .await;

        Ok(Outcome::Replied)
    }
}
