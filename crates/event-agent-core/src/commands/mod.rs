//! Command registry and built-in commands
//!
//! Inbound bus messages name a command; the [`CommandDispatcher`] looks the
//! name up in a [`CommandRegistry`] and runs the matching [`CommandHandler`].
//!
//! ## Built-in commands
//!
//! | name                  | module       |
//! |-----------------------|--------------|
//! | `agent.status`        | [`status`]   |
//! | `originate`, `hangup` | [`call`]     |
//! | `dialplan.*`          | [`dialplan`] |
//! | anything else         | [`api`] (default handler, runs an engine API command) |

pub mod api;
pub mod call;
pub mod dialplan;
pub mod dispatcher;
pub mod envelope;
pub mod status;

pub use dispatcher::{CommandDispatcher, DispatchOutcome};
pub use envelope::{ReplyEnvelope, ReplyStatus};

use arc_swap::ArcSwapOption;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{AgentError, Result};
use crate::validation::ValidationError;

pub const DEFAULT_SUCCESS_MESSAGE: &str = "Command executed";
pub const DEFAULT_FAILURE_MESSAGE: &str = "Command failed";

/// One inbound command
#[derive(Debug, Clone)]
pub struct CommandRequest {
    /// Parsed request body
    pub payload: Value,
    /// Handler name, never empty
    pub command: String,
    /// Subject the request arrived on
    pub subject: String,
    pub reply_to: Option<String>,
    /// Fire-and-forget: no reply even when `reply_to` is set
    pub is_async: bool,
}

/// Outcome of a handler. `error` alone decides success.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommandResult {
    pub data: Option<Value>,
    pub error: Option<String>,
    pub message: Option<String>,
}

impl CommandResult {
    pub fn ok() -> Self {
        Self::default()
    }

    pub fn error(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::default()
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// Message for the reply envelope: explicit message, else the error, else a generic one
    pub fn reply_message(&self) -> &str {
        let message = self.message.as_deref().filter(|m| !m.is_empty());
        let error = self.error.as_deref().filter(|e| !e.is_empty());
        match (message, error) {
            (Some(message), _) => message,
            (None, Some(error)) => error,
            (None, None) if self.is_success() => DEFAULT_SUCCESS_MESSAGE,
            (None, None) => DEFAULT_FAILURE_MESSAGE,
        }
    }
}

impl From<ValidationError> for CommandResult {
    fn from(err: ValidationError) -> Self {
        CommandResult::error(err.into_message())
    }
}

/// A named command implementation
#[async_trait]
pub trait CommandHandler: Send + Sync {
    async fn handle(&self, request: &CommandRequest) -> CommandResult;
}

/// Adapter turning a plain closure into a [`CommandHandler`]
pub struct FnHandler<F>(F);

pub fn handler_fn<F>(f: F) -> FnHandler<F>
where
    F: Fn(&CommandRequest) -> CommandResult + Send + Sync + 'static,
{
    FnHandler(f)
}

#[async_trait]
impl<F> CommandHandler for FnHandler<F>
where
    F: Fn(&CommandRequest) -> CommandResult + Send + Sync + 'static,
{
    async fn handle(&self, request: &CommandRequest) -> CommandResult {
        (self.0)(request)
    }
}

/// Name → handler table plus one fallback slot.
///
/// Named handlers are registered during startup through `&mut self` and are
/// read-only afterwards. The fallback can be swapped at any time.
pub struct CommandRegistry {
    handlers: HashMap<String, Arc<dyn CommandHandler>>,
    default_handler: ArcSwapOption<Arc<dyn CommandHandler>>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
            default_handler: ArcSwapOption::empty(),
        }
    }

    /// Register `handler` under `name`. Names are case-sensitive and cannot be reused.
    pub fn register(&mut self, name: impl Into<String>, handler: Arc<dyn CommandHandler>) -> Result<()> {
        let name = name.into();
        if name.is_empty() {
            return Err(AgentError::DuplicateOrInvalid("empty command name".to_string()));
        }
        if self.handlers.contains_key(&name) {
            return Err(AgentError::DuplicateOrInvalid(format!(
                "command '{}' is already registered",
                name
            )));
        }

        tracing::info!("Registered command handler: {}", name);
        self.handlers.insert(name, handler);
        Ok(())
    }

    /// Install the fallback for unknown names, replacing any previous one
    pub fn register_default(&self, handler: Arc<dyn CommandHandler>) {
        self.default_handler.store(Some(Arc::new(handler)));
    }

    pub fn has_default(&self) -> bool {
        self.default_handler.load().is_some()
    }

    /// Named handler, else the fallback
    pub fn resolve(&self, name: &str) -> Option<Arc<dyn CommandHandler>> {
        self.handlers
            .get(name)
            .cloned()
            .or_else(|| self.default_handler.load_full().map(|slot| (*slot).clone()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    pub fn command_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.handlers.keys().cloned().collect();
        names.sort();
        names
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(command: &str) -> CommandRequest {
        CommandRequest {
            payload: json!({"command": command}),
            command: command.to_string(),
            subject: "freeswitch.api".to_string(),
            reply_to: None,
            is_async: false,
        }
    }

    fn fixed(message: &'static str) -> Arc<dyn CommandHandler> {
        Arc::new(handler_fn(move |_| CommandResult::ok().with_message(message)))
    }

    #[test]
    fn test_register_rejects_empty_and_duplicate_names() {
        let mut registry = CommandRegistry::new();
        assert!(registry.register("originate", fixed("first")).is_ok());
        assert!(matches!(
            registry.register("originate", fixed("second")),
            Err(AgentError::DuplicateOrInvalid(_))
        ));
        assert!(matches!(
            registry.register("", fixed("empty")),
            Err(AgentError::DuplicateOrInvalid(_))
        ));
        // different case is a different name
        assert!(registry.register("Originate", fixed("upper")).is_ok());
        assert_eq!(registry.command_names(), vec!["Originate", "originate"]);
    }

    #[tokio::test]
    async fn test_resolve_prefers_named_then_default() {
        let mut registry = CommandRegistry::new();
        registry.register("hangup", fixed("named")).unwrap();
        assert!(registry.resolve("status").is_none());

        registry.register_default(fixed("default-1"));
        registry.register_default(fixed("default-2"));

        let named = registry.resolve("hangup").unwrap();
        assert_eq!(named.handle(&request("hangup")).await.reply_message(), "named");

        let fallback = registry.resolve("status").unwrap();
        assert_eq!(fallback.handle(&request("status")).await.reply_message(), "default-2");
    }

    #[test]
    fn test_result_messages() {
        assert_eq!(CommandResult::ok().reply_message(), DEFAULT_SUCCESS_MESSAGE);
        assert_eq!(CommandResult::error("boom").reply_message(), "boom");
        assert_eq!(
            CommandResult::error("boom").with_message("Failed to park").reply_message(),
            "Failed to park"
        );
        assert_eq!(CommandResult::error("").reply_message(), DEFAULT_FAILURE_MESSAGE);
        assert_eq!(CommandResult::ok().with_message("").reply_message(), DEFAULT_SUCCESS_MESSAGE);
        assert!(!CommandResult::error("x").with_data(json!(1)).is_success());
    }
}
