//! # event-agent-core
//!
//! Bidirectional gateway between a telephony engine and a publish/subscribe
//! message bus.
//!
//! - Inbound: JSON commands arriving on `<prefix>.api` or
//!   `<prefix>.node.<node_id>` are validated, executed through the
//!   [`CallControl`] port and answered with a [`ReplyEnvelope`].
//! - Outbound: engine events are filtered, serialized and published on
//!   `<prefix>.events.<name>`.
//! - Dialplan: in park mode every inbound call is parked with a configurable
//!   audio treatment until a remote controller acts on it.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use event_agent_core::prelude::*;
//!
//! struct Engine;
//!
//! #[async_trait::async_trait]
//! impl CallControl for Engine {
//!     async fn execute(&self, command: &str, args: &str) -> ExecOutput {
//!         ExecOutput::ok(format!("+OK {} {}", command, args))
//!     }
//! }
//!
//! # async fn run() -> Result<()> {
//! let mut agent = EventAgent::builder(AgentConfig::from_env()?)
//!     .with_bus(Arc::new(MemoryBus::new()))
//!     .with_call_control(Arc::new(Engine))
//!     .build()?;
//! agent.start().await?;
//!
//! agent
//!     .publish_event(&TelephonyEvent::new("CHANNEL_CREATE").with_header("Unique-ID", "7f3a"))
//!     .await;
//!
//! agent.stop().await;
//! # Ok(())
//! # }
//! ```

pub mod agent;
pub mod bus;
pub mod commands;
pub mod config;
pub mod context;
pub mod control;
pub mod dialplan;
pub mod error;
pub mod events;
pub mod logging;
pub mod node;
pub mod stats;
pub mod validation;

pub use agent::{EventAgent, EventAgentBuilder};
pub use bus::{BusMessage, MemoryBus, MessageBus, MessageHandler};
pub use commands::{
    handler_fn, CommandDispatcher, CommandHandler, CommandRegistry, CommandRequest, CommandResult,
    DispatchOutcome, ReplyEnvelope,
};
pub use config::AgentConfig;
pub use context::GatewayContext;
pub use control::{CallControl, ExecOutput};
pub use dialplan::{AudioMode, DialplanManager, DialplanMode, ParkPlan};
pub use error::{AgentError, Result};
pub use events::{EventEnvelope, EventPublisher, PublishOutcome, TelephonyEvent};
pub use node::NodeIdentity;

pub mod prelude {
    pub use crate::agent::{EventAgent, EventAgentBuilder};
    pub use crate::bus::{BusMessage, MemoryBus, MessageBus, MessageHandler};
    pub use crate::commands::{CommandHandler, CommandRequest, CommandResult};
    pub use crate::config::AgentConfig;
    pub use crate::control::{CallControl, ExecOutput};
    pub use crate::error::{AgentError, Result};
    pub use crate::events::TelephonyEvent;
}
