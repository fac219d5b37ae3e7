//! NATS driver for the event agent
//!
//! [`NatsBus`] implements [`event_agent_core::MessageBus`] over an
//! `async-nats` client:
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use event_agent_core::AgentConfig;
//! use event_agent_nats::{NatsBus, NatsConfig};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AgentConfig::from_env()?;
//! let bus = Arc::new(NatsBus::connect(NatsConfig::from_agent_config(&config)).await?);
//! println!("connected: {}", bus.stats().connected);
//! # Ok(())
//! # }
//! ```
//!
//! Subscriber counts are not available from a NATS client, so
//! `subscriber_count` always reports the operation as unsupported and the
//! event pipeline publishes regardless.

mod bus;
mod config;
mod error;
mod stats;

pub use bus::NatsBus;
pub use config::NatsConfig;
pub use error::{NatsError, Result};
pub use stats::DriverStats;
