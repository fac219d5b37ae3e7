//! `dialplan.*` commands driving the [`DialplanManager`]

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;

use super::{CommandDispatcher, CommandHandler, CommandRequest, CommandResult};
use crate::dialplan::{AudioMode, DialplanManager, DialplanMode};
use crate::error::Result;
use crate::validation::{Len, PayloadValidator, ValidationError, ValidationResult};

const INVALID_MODE: &str = "Invalid mode. Use silence, ringback, or music";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialplanOp {
    Enable,
    Disable,
    Audio,
    AutoAnswer,
    Status,
}

impl DialplanOp {
    pub const ALL: [DialplanOp; 5] = [
        DialplanOp::Enable,
        DialplanOp::Disable,
        DialplanOp::Audio,
        DialplanOp::AutoAnswer,
        DialplanOp::Status,
    ];

    pub fn command_name(&self) -> &'static str {
        match self {
            DialplanOp::Enable => "dialplan.enable",
            DialplanOp::Disable => "dialplan.disable",
            DialplanOp::Audio => "dialplan.audio",
            DialplanOp::AutoAnswer => "dialplan.autoanswer",
            DialplanOp::Status => "dialplan.status",
        }
    }
}

struct AudioArgs {
    mode: AudioMode,
    music_class: String,
}

impl AudioArgs {
    fn parse(payload: &Value) -> ValidationResult<Self> {
        let v = PayloadValidator::new(payload);
        let mode = v
            .field("mode")
            .message(INVALID_MODE)
            .one_of(&AudioMode::NAMES)?
            .parse::<AudioMode>()
            .map_err(|_| ValidationError::new(INVALID_MODE))?;
        let music_class = v
            .field("music_class")
            .message("music_class must be 63 characters or fewer")
            .optional_string(Len::at_most(63))?;

        Ok(Self { mode, music_class })
    }
}

fn parse_enabled(payload: &Value) -> ValidationResult<bool> {
    PayloadValidator::new(payload)
        .field("enabled")
        .message("enabled must be a boolean flag")
        .boolean()
}

pub struct DialplanCommand {
    manager: Arc<DialplanManager>,
    op: DialplanOp,
}

impl DialplanCommand {
    pub fn new(manager: Arc<DialplanManager>, op: DialplanOp) -> Self {
        Self { manager, op }
    }

    fn set_mode(&self, mode: DialplanMode, message: &str) -> CommandResult {
        self.manager.set_mode(mode);
        CommandResult::ok()
            .with_data(json!({ "mode": mode.as_str() }))
            .with_message(message)
    }

    fn audio(&self, payload: &Value) -> CommandResult {
        let args = match AudioArgs::parse(payload) {
            Ok(args) => args,
            Err(e) => return e.into(),
        };

        if args.mode == AudioMode::Music && !args.music_class.is_empty() {
            if let Err(e) = self.manager.set_music_class(&args.music_class) {
                return CommandResult::error(e.to_string());
            }
        }
        self.manager.set_audio_mode(args.mode);

        CommandResult::ok()
            .with_data(json!({ "mode": args.mode.as_str() }))
            .with_message("Audio mode updated")
    }

    fn auto_answer(&self, payload: &Value) -> CommandResult {
        let enabled = match parse_enabled(payload) {
            Ok(enabled) => enabled,
            Err(e) => return e.into(),
        };

        self.manager.set_auto_answer(enabled);
        CommandResult::ok()
            .with_data(json!({ "enabled": enabled }))
            .with_message("Auto-answer updated")
    }

    fn status(&self) -> CommandResult {
        match serde_json::to_value(self.manager.status()) {
            Ok(data) => CommandResult::ok()
                .with_data(data)
                .with_message("Dialplan status retrieved"),
            Err(e) => CommandResult::error(format!("Failed to encode dialplan status: {}", e)),
        }
    }
}

#[async_trait]
impl CommandHandler for DialplanCommand {
    async fn handle(&self, request: &CommandRequest) -> CommandResult {
        match self.op {
            DialplanOp::Enable => self.set_mode(DialplanMode::Park, "Park mode enabled"),
            DialplanOp::Disable => self.set_mode(DialplanMode::Disabled, "Park mode disabled"),
            DialplanOp::Audio => self.audio(&request.payload),
            DialplanOp::AutoAnswer => self.auto_answer(&request.payload),
            DialplanOp::Status => self.status(),
        }
    }
}

/// Register every `dialplan.*` command against one manager
pub fn register(dispatcher: &mut CommandDispatcher, manager: Arc<DialplanManager>) -> Result<()> {
    for op in DialplanOp::ALL {
        dispatcher.register(
            op.command_name(),
            Arc::new(DialplanCommand::new(manager.clone(), op)),
        )?;
    }
    Ok(())
}
