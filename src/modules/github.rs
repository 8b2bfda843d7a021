use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use teloxide::utils::html;
use tracing::error;

use crate::audit::AuditLog;
use crate::config::LookupFailurePolicy;
use crate::github::{format_timestamp, ProfileLookup, ProfileRecord};
use crate::modules::{Module, Outcome};
use crate::platform::{IncomingMessage, ReplyFormat, Transport};

const MISSING_USERNAME: &str = "You need to specify a GitHub username!";
const INVALID_USERNAME: &str = "Please enter a valid GitHub username without spaces.";
const LOOKUP_FAILED: &str = "Could not fetch GitHub user data.";

/// Answers `/github <username>` with the user's public profile.
pub struct GithubModule {
    lookup: Arc<dyn ProfileLookup>,
    audit: Arc<dyn AuditLog>,
    on_failure: LookupFailurePolicy,
}

enum Username<'a> {
    Missing,
    Invalid,
    Valid(&'a str),
}

fn parse_username(text: &str) -> Username<'_> {
    let args: Vec<&str> = text.split_whitespace().skip(1).collect();
    match args.as_slice() {
        [] => Username::Missing,
        [name] if !name.chars().any(char::is_whitespace) => Username::Valid(*name),
        _ => Username::Invalid,
    }
}

/// HTML reply body for a profile. Text fields are HTML-escaped so Telegram
/// shows them exactly as GitHub returned them.
pub fn render_profile(user: &ProfileRecord) -> Result<String> {
    let created_at = format_timestamp(&user.created_at)?;
    let updated_at = format_timestamp(&user.updated_at)?;
    let field = |value: &Option<String>| html::escape(value.as_deref().unwrap_or_default());

    Ok(format!(
        "<b>GitHub Info for</b> {}\n\n\
         <b>Name:</b> {}\n\
         <b>Bio:</b> {}\n\
         <b>Location:</b> {}\n\
         <b>Email:</b> {}\n\
         <b>Public Repos:</b> {}\n\
         <b>Followers:</b> {}\n\
         <b>Following:</b> {}\n\
         <b>Created At:</b> {}\n\
         <b>Last Updated At:</b> {}",
        html::escape(&user.login),
        field(&user.name),
        field(&user.bio),
        field(&user.location),
        field(&user.email),
        user.public_repos,
        user.followers,
        user.following,
        created_at,
        updated_at,
    ))
}

impl GithubModule {
    pub fn new(
        lookup: Arc<dyn ProfileLookup>,
        audit: Arc<dyn AuditLog>,
        on_failure: LookupFailurePolicy,
    ) -> Self {
        Self {
            lookup,
            audit,
            on_failure,
        }
    }

    async fn reply(
        &self,
        transport: &dyn Transport,
        chat_id: i64,
        text: &str,
        format: ReplyFormat,
        outcome: Outcome,
    ) -> Outcome {
        match transport.send(chat_id, text, format).await {
            Ok(()) => outcome,
            Err(e) => {
                error!("Error sending message: {:#}", e);
                Outcome::Failed {
                    reason: format!("{:#}", e),
                }
            }
        }
    }

    async fn respond(&self, transport: &dyn Transport, message: &IncomingMessage) -> Outcome {
        let chat_id = message.chat_id;
        let username = match parse_username(&message.text) {
            Username::Missing => {
                return self
                    .reply(
                        transport,
                        chat_id,
                        MISSING_USERNAME,
                        ReplyFormat::Plain,
                        Outcome::Rejected,
                    )
                    .await;
            }
            Username::Invalid => {
                return self
                    .reply(
                        transport,
                        chat_id,
                        INVALID_USERNAME,
                        ReplyFormat::Plain,
                        Outcome::Rejected,
                    )
                    .await;
            }
            Username::Valid(name) => name,
        };

        let rendered = match self.lookup.fetch_user(username).await {
            Ok(user) => render_profile(&user),
            Err(e) => Err(e.context("Error getting user data")),
        };

        match rendered {
            Ok(text) => {
                self.reply(transport, chat_id, &text, ReplyFormat::Html, Outcome::Replied)
                    .await
            }
            Err(e) => {
                error!("GitHub lookup for {} failed: {:#}", username, e);
                let failed = Outcome::Failed {
                    reason: format!("{:#}", e),
                };
                match self.on_failure {
                    LookupFailurePolicy::Silent => failed,
                    LookupFailurePolicy::Reply => {
                        self.reply(transport, chat_id, LOOKUP_FAILED, ReplyFormat::Plain, failed)
                            .await
                    }
                }
            }
        }
    }
}

#[async_trait]
impl Module for GithubModule {
    fn name(&self) -> &str {
        "GitHub"
    }

    fn command(&self) -> &str {
        "/github"
    }

    async fn handle(
        &self,
        transport: &dyn Transport,
        message: &IncomingMessage,
    ) -> Result<Outcome> {
        if !message.text.starts_with(self.command()) {
            return Ok(Outcome::Skipped);
        }

        let outcome = self.respond(transport, message).await;
        self.audit.show_log(self.name(), &message.sender_id);
        Ok(outcome)
    }
}
