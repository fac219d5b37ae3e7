//! Command dispatcher
//!
//! Subscribes to the broadcast subject (`<prefix>.api`) and this node's direct
//! subject (`<prefix>.node.<node_id>`), decodes each request, runs the
//! matching handler and publishes a [`ReplyEnvelope`] on `reply_to`.
//!
//! Processing order for one message:
//!
//! 1. JSON decode. Failure counts as received and failed, replies `Invalid JSON payload`.
//! 2. `node_id` targeting. A request for another node is dropped without any bookkeeping.
//! 3. `command` lookup: named handler, then the default handler, else `Unknown command`.
//! 4. Handler run. A panic is contained and reported as a failure.
//! 5. Reply, unless the request set `async` or carried no reply subject.

use async_trait::async_trait;
use futures::FutureExt;
use serde_json::Value;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use super::envelope::ReplyEnvelope;
use super::{CommandHandler, CommandRegistry, CommandRequest, CommandResult};
use crate::bus::{BusMessage, MessageBus, MessageHandler};
use crate::context::GatewayContext;
use crate::error::Result;

pub const ERR_INVALID_JSON: &str = "Invalid JSON payload";
pub const ERR_MISSING_COMMAND: &str = "Missing 'command' string";
pub const ERR_UNKNOWN_COMMAND: &str = "Unknown command";
pub const ERR_HANDLER_PANICKED: &str = "Command handler panicked";

/// What happened to one inbound message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Addressed to another node
    Ignored,
    /// Processed; `replied` tells whether a reply was published
    Completed { success: bool, replied: bool },
}

pub struct CommandDispatcher {
    ctx: Arc<GatewayContext>,
    bus: Arc<dyn MessageBus>,
    registry: CommandRegistry,
}

impl CommandDispatcher {
    pub fn new(ctx: Arc<GatewayContext>, bus: Arc<dyn MessageBus>) -> Self {
        Self {
            ctx,
            bus,
            registry: CommandRegistry::new(),
        }
    }

    /// Register a named handler. Only possible before the dispatcher is shared.
    pub fn register(&mut self, name: impl Into<String>, handler: Arc<dyn CommandHandler>) -> Result<()> {
        self.registry.register(name, handler)
    }

    pub fn register_default(&self, handler: Arc<dyn CommandHandler>) {
        self.registry.register_default(handler);
    }

    pub fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    pub fn context(&self) -> &Arc<GatewayContext> {
        &self.ctx
    }

    /// Subjects this dispatcher listens on
    pub fn subjects(&self) -> [String; 2] {
        [self.ctx.api_subject(), self.ctx.node_subject()]
    }

    /// Subscribe to the broadcast and direct subjects
    ///
    /// On failure every subject subscribed so far is released again.
    pub async fn start(self: &Arc<Self>) -> Result<()> {
        let handler: Arc<dyn MessageHandler> = self.clone();
        let mut subscribed: Vec<String> = Vec::new();
        for subject in self.subjects() {
            if let Err(e) = self.bus.subscribe(&subject, handler.clone()).await {
                error!("Failed to subscribe to {}: {}", subject, e);
                for done in &subscribed {
                    if let Err(e) = self.bus.unsubscribe(done).await {
                        warn!("Failed to unsubscribe from {}: {}", done, e);
                    }
                }
                return Err(e);
            }
            info!("Subscribed to {}", subject);
            subscribed.push(subject);
        }
        Ok(())
    }

    /// Drop both subscriptions. Errors are logged, not returned.
    pub async fn stop(&self) {
        for subject in self.subjects() {
            if let Err(e) = self.bus.unsubscribe(&subject).await {
                warn!("Failed to unsubscribe from {}: {}", subject, e);
            }
        }
    }

    /// Process one raw request
    pub async fn dispatch(&self, raw: &[u8], subject: &str, reply_to: Option<&str>) -> DispatchOutcome {
        let stats = self.ctx.stats();

        let payload: Value = match serde_json::from_slice(raw) {
            Ok(payload) => payload,
            Err(e) => {
                debug!("Rejecting request on {}: {}", subject, e);
                stats.record_request_received();
                stats.record_request_failed();
                let replied = self
                    .reply(reply_to, ReplyEnvelope::failure(ERR_INVALID_JSON, self.ctx.node()))
                    .await;
                return DispatchOutcome::Completed { success: false, replied };
            }
        };

        if let Some(target) = payload.get("node_id").and_then(Value::as_str) {
            if !self.ctx.node().accepts(target) {
                debug!("Ignoring request for node {} on {}", target, subject);
                return DispatchOutcome::Ignored;
            }
        }

        stats.record_request_received();

        let command = match payload.get("command").and_then(Value::as_str) {
            Some(command) if !command.is_empty() => command.to_string(),
            _ => {
                stats.record_request_failed();
                let replied = self
                    .reply(reply_to, ReplyEnvelope::failure(ERR_MISSING_COMMAND, self.ctx.node()))
                    .await;
                return DispatchOutcome::Completed { success: false, replied };
            }
        };

        let is_async = payload.get("async").and_then(Value::as_bool).unwrap_or(false);
        let request = CommandRequest {
            payload,
            command,
            subject: subject.to_string(),
            reply_to: reply_to.map(str::to_string),
            is_async,
        };

        debug!("Dispatching '{}' from {}", request.command, subject);
        let result = self.run(&request).await;

        let success = result.is_success();
        if success {
            stats.record_request_success();
        } else {
            stats.record_request_failed();
            debug!("Command '{}' failed: {}", request.command, result.reply_message());
        }

        let replied = if request.is_async {
            false
        } else {
            self.reply(reply_to, ReplyEnvelope::from_result(&result, self.ctx.node()))
                .await
        };

        DispatchOutcome::Completed { success, replied }
    }

    async fn run(&self, request: &CommandRequest) -> CommandResult {
        let Some(handler) = self.registry.resolve(&request.command) else {
            return CommandResult::error(ERR_UNKNOWN_COMMAND);
        };

        match AssertUnwindSafe(handler.handle(request)).catch_unwind().await {
            Ok(result) => result,
            Err(_) => {
                error!("Handler for '{}' panicked", request.command);
                CommandResult::error(ERR_HANDLER_PANICKED)
            }
        }
    }

    async fn reply(&self, reply_to: Option<&str>, envelope: ReplyEnvelope) -> bool {
        let Some(reply_to) = reply_to.filter(|subject| !subject.is_empty()) else {
            return false;
        };

        let payload = match envelope.to_bytes() {
            Ok(payload) => payload,
            Err(e) => {
                error!("Failed to encode reply: {}", e);
                return false;
            }
        };

        match self.bus.publish(reply_to, payload).await {
            Ok(()) => true,
            Err(e) => {
                warn!("Failed to publish reply to {}: {}", reply_to, e);
                false
            }
        }
    }
}

#[async_trait]
impl MessageHandler for CommandDispatcher {
    async fn on_message(&self, message: BusMessage) {
        self.dispatch(&message.payload, &message.subject, message.reply_to.as_deref())
            .await;
    }
}
