//! `agent.status`: version, identity, counters, and runtime log level

use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;

use super::{CommandDispatcher, CommandHandler, CommandRequest, CommandResult};
use crate::context::{GatewayContext, AGENT_VERSION};
use crate::error::Result;
use crate::logging::LogLevelControl;
use crate::validation::{PayloadValidator, ValidationResult};

pub const COMMAND: &str = "agent.status";
pub const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

pub struct AgentStatusCommand {
    ctx: Arc<GatewayContext>,
    log_level: Arc<dyn LogLevelControl>,
}

impl AgentStatusCommand {
    pub fn new(ctx: Arc<GatewayContext>, log_level: Arc<dyn LogLevelControl>) -> Self {
        Self { ctx, log_level }
    }

    fn requested_level(payload: &serde_json::Value) -> ValidationResult<String> {
        PayloadValidator::new(payload)
            .field("log_level")
            .message("log_level must be one of trace, debug, info, warn, error")
            .optional_one_of(&LOG_LEVELS)
    }
}

#[async_trait]
impl CommandHandler for AgentStatusCommand {
    async fn handle(&self, request: &CommandRequest) -> CommandResult {
        let level = match Self::requested_level(&request.payload) {
            Ok(level) => level,
            Err(e) => return e.into(),
        };

        if !level.is_empty() {
            if let Err(e) = self.log_level.set_level(&level) {
                return CommandResult::error(e.to_string());
            }
        }

        let stats = self.ctx.stats();
        let data = json!({
            "version": AGENT_VERSION,
            "node_id": self.ctx.node().as_str(),
            "uptime_seconds": self.ctx.uptime().as_secs(),
            "log_level": self.log_level.current(),
            "stats": stats.requests(),
            "events": stats.events(),
        });

        CommandResult::ok().with_data(data).with_message("Agent status")
    }
}

pub fn register(
    dispatcher: &mut CommandDispatcher,
    log_level: Arc<dyn LogLevelControl>,
) -> Result<()> {
    let ctx = dispatcher.context().clone();
    dispatcher.register(COMMAND, Arc::new(AgentStatusCommand::new(ctx, log_level)))
}
