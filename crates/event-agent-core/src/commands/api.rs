//! Default handler: any unregistered command name is run as an engine API command

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tracing::info;

use super::{CommandDispatcher, CommandHandler, CommandRequest, CommandResult};
use crate::control::CallControl;

/// Runs `<command> <args>` through [`CallControl`]. A non-string `args` is ignored.
pub struct ApiCommand {
    control: Arc<dyn CallControl>,
}

impl ApiCommand {
    pub fn new(control: Arc<dyn CallControl>) -> Self {
        Self { control }
    }
}

#[async_trait]
impl CommandHandler for ApiCommand {
    async fn handle(&self, request: &CommandRequest) -> CommandResult {
        let args = request.payload.get("args").and_then(Value::as_str).unwrap_or("");
        info!("Executing API command: {} {}", request.command, args);

        let output = self.control.execute(&request.command, args).await;
        if output.is_success() {
            CommandResult::ok()
                .with_data(Value::String(output.text))
                .with_message("API command executed")
        } else {
            CommandResult::error(output.error_text())
        }
    }
}

pub fn register(dispatcher: &CommandDispatcher, control: Arc<dyn CallControl>) {
    dispatcher.register_default(Arc::new(ApiCommand::new(control)));
}
