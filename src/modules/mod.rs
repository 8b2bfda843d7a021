//! Command modules and the dispatcher that feeds them.

pub mod github;
pub mod start;

use std::collections::HashSet;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{error, info};

use crate::audit::{AuditLog, Reporter};
use crate::config::{Config, DispatchMode};
use crate::github::ProfileLookup;
use crate::platform::{IncomingMessage, Transport};

pub use github::GithubModule;
pub use start::StartModule;

/// What a module did with one message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Command prefix did not match
    Skipped,
    /// Normal reply sent
    Replied,
    /// Input was invalid; the user was told why
    Rejected,
    /// System fault, logged locally
    Failed { reason: String },
}

/// A command handler. Modules keep no per-message state.
#[async_trait]
pub trait Module: Send + Sync {
    fn name(&self) -> &str;

    /// Prefix the message text must start with, e.g. `"/start"`
    fn command(&self) -> &str;

    async fn handle(&self, transport: &dyn Transport, message: &IncomingMessage)
        -> Result<Outcome>;
}

/// Ordered list of modules, filled once at startup
#[derive(Default)]
pub struct Registry {
    modules: Vec<Arc<dyn Module>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a module. Duplicate commands are not rejected here; see
    /// [`Registry::check_unique_commands`].
    pub fn register(&mut self, module: Arc<dyn Module>) {
        info!("Registered module: {} ({})", module.name(), module.command());
        self.modules.push(module);
    }

    /// All modules in registration order
    pub fn all(&self) -> &[Arc<dyn Module>] {
        &self.modules
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    pub fn check_unique_commands(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for module in &self.modules {
            if !seen.insert(module.command()) {
                anyhow::bail!(
                    "Command {} is registered more than once (module {})",
                    module.command(),
                    module.name()
                );
            }
        }
        Ok(())
    }

    /// The bot's built-in modules, each registered exactly once.
    pub fn builtin(
        config: &Config,
        lookup: Arc<dyn ProfileLookup>,
        audit: Arc<dyn AuditLog>,
        reporter: Arc<dyn Reporter>,
    ) -> Self {
        let rng = match config.greeting.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let greetings = config
            .greeting
            .messages
            .clone()
            .unwrap_or_else(start::default_greetings);

        let mut registry = Self::new();
        registry.register(Arc::new(StartModule::new(
            greetings,
            rng,
            audit.clone(),
            reporter,
        )));
        registry.register(Arc::new(GithubModule::new(
            lookup,
            audit,
            config.github.on_lookup_failure,
        )));
        registry
    }
}

/// Offers each inbound message to the registered modules.
pub struct Dispatcher {
    registry: Registry,
    mode: DispatchMode,
}

impl Dispatcher {
    pub fn new(registry: Registry, mode: DispatchMode) -> Self {
        Self { registry, mode }
    }

    /// Run every module against `message` in registration order and return
    /// their outcomes. Module errors are logged and do not stop dispatch.
    pub async fn dispatch(
        &self,
        transport: &dyn Transport,
        message: &IncomingMessage,
    ) -> Vec<Outcome> {
        let mut outcomes = Vec::with_capacity(self.registry.len());

        for module in self.registry.all() {
            let outcome = match module.handle(transport, message).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    error!("Module {} failed: {:#}", module.name(), e);
                    Outcome::Failed {
                        reason: format!("{:#}", e),
                    }
                }
            };

            let matched = outcome != Outcome::Skipped;
            outcomes.push(outcome);

            if matched && self.mode == DispatchMode::FirstMatch {
                break;
            }
        }

        outcomes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::testing::{RecordingAudit, RecordingReporter};
    use crate::github::testing::{octocat, StubLookup};
    use crate::platform::testing::{message, RecordingTransport};
    use crate::platform::ReplyFormat;

    /// Replies with a fixed text whenever its prefix matches.
    struct EchoModule {
        name: &'static str,
        command: &'static str,
    }

    #[async_trait]
    impl Module for EchoModule {
        fn name(&self) -> &str {
            self.name
        }

        fn command(&self) -> &str {
            self.command
        }

        async fn handle(
            &self,
            transport: &dyn Transport,
            message: &IncomingMessage,
        ) -> Result<Outcome> {
            if !message.text.starts_with(self.command) {
                return Ok(Outcome::Skipped);
            }
            transport
                .send(message.chat_id, self.name, ReplyFormat::Plain)
                .await?;
            Ok(Outcome::Replied)
        }
    }

    fn echo(name: &'static str, command: &'static str) -> Arc<dyn Module> {
        Arc::new(EchoModule { name, command })
    }

    fn test_config() -> Config {
        Config::parse(
            r#"
            [telegram]
            bot_token = "123:abc"

            [greeting]
            seed = 1
            "#,
        )
        .unwrap()
    }

    #[test]
    fn test_register_keeps_call_order() {
        let mut registry = Registry::new();
        assert!(registry.is_empty());
        registry.register(echo("a", "/a"));
        registry.register(echo("b", "/b"));
        registry.register(echo("c", "/c"));

        let names: Vec<&str> = registry.all().iter().map(|m| m.name()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
        assert_eq!(registry.len(), 3);
        assert!(!registry.is_empty());
    }

    #[test]
    fn test_duplicate_commands_detected() {
        let mut registry = Registry::new();
        registry.register(echo("a", "/same"));
        assert!(registry.check_unique_commands().is_ok());

        registry.register(echo("b", "/same"));
        let err = registry.check_unique_commands().unwrap_err();
        assert!(err.to_string().contains("/same"));
    }

    #[test]
    fn test_builtin_registry() {
        let registry = Registry::builtin(
            &test_config(),
            Arc::new(StubLookup::failing()),
            Arc::new(RecordingAudit::default()),
            Arc::new(RecordingReporter::default()),
        );

        let commands: Vec<&str> = registry.all().iter().map(|m| m.command()).collect();
        assert_eq!(commands, vec!["/start", "/github"]);
        assert!(registry.check_unique_commands().is_ok());
    }

    #[tokio::test]
    async fn test_fan_out_runs_every_matching_module() {
        let mut registry = Registry::new();
        registry.register(echo("first", "/dup"));
        registry.register(echo("other", "/other"));
        registry.register(echo("second", "/dup"));
        let dispatcher = Dispatcher::new(registry, DispatchMode::FanOut);
        let transport = RecordingTransport::new();

        let outcomes = dispatcher.dispatch(&transport, &message("/dup")).await;

        assert_eq!(
            outcomes,
            vec![Outcome::Replied, Outcome::Skipped, Outcome::Replied]
        );
        let texts: Vec<String> = transport.sent().into_iter().map(|s| s.text).collect();
        assert_eq!(texts, vec!["first", "second"]);
    }

    #[tokio::test]
    async fn test_first_match_stops_after_first_handler() {
        let mut registry = Registry::new();
        registry.register(echo("other", "/other"));
        registry.register(echo("first", "/dup"));
        registry.register(echo("second", "/dup"));
        let dispatcher = Dispatcher::new(registry, DispatchMode::FirstMatch);
        let transport = RecordingTransport::new();

        let outcomes = dispatcher.dispatch(&transport, &message("/dup")).await;

        assert_eq!(outcomes, vec![Outcome::Skipped, Outcome::Replied]);
        assert_eq!(transport.sent().len(), 1);
        assert_eq!(transport.sent()[0].text, "first");
    }

    #[tokio::test]
    async fn test_module_error_does_not_stop_dispatch() {
        let mut registry = Registry::new();
        registry.register(echo("a", "/x"));
        registry.register(echo("b", "/x"));
        let dispatcher = Dispatcher::new(registry, DispatchMode::FanOut);
        let transport = RecordingTransport::failing();

        let outcomes = dispatcher.dispatch(&transport, &message("/x")).await;

        assert_eq!(outcomes.len(), 2);
        assert!(outcomes
            .iter()
            .all(|o| matches!(o, Outcome::Failed { .. })));
    }

    #[tokio::test]
    async fn test_unmatched_message_produces_nothing() {
        let audit = Arc::new(RecordingAudit::default());
        let registry = Registry::builtin(
            &test_config(),
            Arc::new(StubLookup::returning(octocat())),
            audit.clone(),
            Arc::new(RecordingReporter::default()),
        );
        let dispatcher = Dispatcher::new(registry, DispatchMode::FanOut);
        let transport = RecordingTransport::new();

        let outcomes = dispatcher.dispatch(&transport, &message("hello bot")).await;

        assert_eq!(outcomes, vec![Outcome::Skipped, Outcome::Skipped]);
        assert!(transport.sent().is_empty());
        assert!(audit.entries().is_empty());
    }

    #[tokio::test]
    async fn test_same_message_twice_gives_identical_replies() {
        let registry = Registry::builtin(
            &test_config(),
            Arc::new(StubLookup::returning(octocat())),
            Arc::new(RecordingAudit::default()),
            Arc::new(RecordingReporter::default()),
        );
        let dispatcher = Dispatcher::new(registry, DispatchMode::FanOut);
        let msg = message("/github octocat");

        let first = RecordingTransport::new();
        let second = RecordingTransport::new();
        let first_outcomes = dispatcher.dispatch(&first, &msg).await;
        let second_outcomes = dispatcher.dispatch(&second, &msg).await;

        assert_eq!(first_outcomes, second_outcomes);
        assert_eq!(first.sent().len(), 1);
        assert_eq!(first.sent(), second.sent());
    }
}
