//! Call control commands: `originate` and `hangup`

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::info;

use super::{CommandDispatcher, CommandHandler, CommandRequest, CommandResult};
use crate::control::CallControl;
use crate::error::Result;
use crate::validation::{Len, PayloadValidator, ValidationResult};

pub const DEFAULT_CONTEXT: &str = "default";
pub const DEFAULT_HANGUP_CAUSE: &str = "NORMAL_CLEARING";

struct OriginateArgs {
    endpoint: String,
    extension: String,
    context: String,
}

impl OriginateArgs {
    fn parse(payload: &Value) -> ValidationResult<Self> {
        let v = PayloadValidator::new(payload);
        let endpoint = v
            .field("endpoint")
            .message("endpoint must be between 1 and 255 characters")
            .string(Len::between(1, 255))?;
        let extension = v
            .field("extension")
            .message("extension must be between 1 and 255 characters")
            .string(Len::between(1, 255))?;
        let context = v
            .field("context")
            .message("context must be at most 127 characters")
            .optional_string(Len::at_most(127))?;

        Ok(Self {
            endpoint,
            extension,
            context: if context.is_empty() { DEFAULT_CONTEXT.to_string() } else { context },
        })
    }
}

/// `originate {endpoint, extension, context?}`
pub struct OriginateCommand {
    control: Arc<dyn CallControl>,
}

impl OriginateCommand {
    pub fn new(control: Arc<dyn CallControl>) -> Self {
        Self { control }
    }
}

#[async_trait]
impl CommandHandler for OriginateCommand {
    async fn handle(&self, request: &CommandRequest) -> CommandResult {
        let args = match OriginateArgs::parse(&request.payload) {
            Ok(args) => args,
            Err(e) => return e.into(),
        };

        let line = format!("{} {} {}", args.endpoint, args.extension, args.context);
        info!("Originating call: {}", line);

        let output = self.control.execute("originate", &line).await;
        if output.is_success() {
            CommandResult::ok()
                .with_data(Value::String(output.text))
                .with_message("Call originated successfully")
        } else {
            CommandResult::error(output.error_text())
        }
    }
}

struct HangupArgs {
    uuid: String,
    cause: String,
}

impl HangupArgs {
    fn parse(payload: &Value) -> ValidationResult<Self> {
        let v = PayloadValidator::new(payload);
        let uuid = v
            .field("uuid")
            .message("uuid must be between 2 and 63 characters")
            .string(Len::between(2, 63))?;
        let cause = v
            .field("cause")
            .message("cause must be at most 63 characters")
            .optional_string(Len::at_most(63))?;

        Ok(Self {
            uuid,
            cause: if cause.is_empty() { DEFAULT_HANGUP_CAUSE.to_string() } else { cause },
        })
    }
}

/// `hangup {uuid, cause?}`
pub struct HangupCommand {
    control: Arc<dyn CallControl>,
}

impl HangupCommand {
    pub fn new(control: Arc<dyn CallControl>) -> Self {
        Self { control }
    }
}

#[async_trait]
impl CommandHandler for HangupCommand {
    async fn handle(&self, request: &CommandRequest) -> CommandResult {
        let args = match HangupArgs::parse(&request.payload) {
            Ok(args) => args,
            Err(e) => return e.into(),
        };

        info!("Hanging up {} ({})", args.uuid, args.cause);
        let output = self
            .control
            .execute("uuid_kill", &format!("{} {}", args.uuid, args.cause))
            .await;

        if output.is_success() {
            CommandResult::ok()
                .with_data(json!(args.uuid))
                .with_message("Channel hangup successful")
        } else {
            CommandResult::error(output.error_text())
        }
    }
}

pub fn register(dispatcher: &mut CommandDispatcher, control: Arc<dyn CallControl>) -> Result<()> {
    dispatcher.register("originate", Arc::new(OriginateCommand::new(control.clone())))?;
    dispatcher.register("hangup", Arc::new(HangupCommand::new(control)))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::ExecOutput;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<(String, String)>>,
        reply: Mutex<Option<ExecOutput>>,
    }

    #[async_trait]
    impl CallControl for Recorder {
        async fn execute(&self, command: &str, args: &str) -> ExecOutput {
            self.calls.lock().push((command.to_string(), args.to_string()));
            self.reply.lock().clone().unwrap_or_else(|| ExecOutput::ok("+OK 7f3a"))
        }
    }

    fn request(payload: Value) -> CommandRequest {
        CommandRequest {
            payload,
            command: "test".to_string(),
            subject: "fs.api".to_string(),
            reply_to: None,
            is_async: false,
        }
    }

    #[tokio::test]
    async fn test_originate_defaults_context() {
        let control = Arc::new(Recorder::default());
        let command = OriginateCommand::new(control.clone());

        let result = command
            .handle(&request(json!({"endpoint": "user/1000", "extension": "9999"})))
            .await;

        assert!(result.is_success());
        assert_eq!(result.data, Some(json!("+OK 7f3a")));
        assert_eq!(result.reply_message(), "Call originated successfully");
        assert_eq!(
            control.calls.lock()[0],
            ("originate".to_string(), "user/1000 9999 default".to_string())
        );
    }

    #[tokio::test]
    async fn test_originate_validation_runs_before_execute() {
        let control = Arc::new(Recorder::default());
        let command = OriginateCommand::new(control.clone());

        let result = command.handle(&request(json!({"endpoint": "", "extension": "1"}))).await;
        assert_eq!(result.error.as_deref(), Some("endpoint must be between 1 and 255 characters"));

        let long_context = "c".repeat(128);
        let result = command
            .handle(&request(json!({"endpoint": "e", "extension": "1", "context": long_context})))
            .await;
        assert_eq!(result.error.as_deref(), Some("context must be at most 127 characters"));
        assert!(control.calls.lock().is_empty());
    }

    #[tokio::test]
    async fn test_hangup() {
        let control = Arc::new(Recorder::default());
        let command = HangupCommand::new(control.clone());

        let result = command.handle(&request(json!({"uuid": "abc-123"}))).await;
        assert_eq!(result.data, Some(json!("abc-123")));
        assert_eq!(result.reply_message(), "Channel hangup successful");
        assert_eq!(control.calls.lock()[0].1, "abc-123 NORMAL_CLEARING");

        let result = command
            .handle(&request(json!({"uuid": "abc-123", "cause": "USER_BUSY"})))
            .await;
        assert!(result.is_success());
        assert_eq!(control.calls.lock()[1].1, "abc-123 USER_BUSY");

        let result = command.handle(&request(json!({"uuid": "a"}))).await;
        assert_eq!(result.error.as_deref(), Some("uuid must be between 2 and 63 characters"));
    }

    #[tokio::test]
    async fn test_engine_error_text_is_kept() {
        let control = Arc::new(Recorder::default());
        *control.reply.lock() = Some(ExecOutput::ok("-ERR No such channel!"));
        let command = HangupCommand::new(control);

        let result = command.handle(&request(json!({"uuid": "abc"}))).await;
        assert_eq!(result.error.as_deref(), Some("-ERR No such channel!"));
        assert!(result.message.is_none());
    }
}
