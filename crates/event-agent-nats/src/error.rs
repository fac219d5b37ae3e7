use event_agent_core::AgentError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NatsError {
    #[error("Failed to connect to {url}: {reason}")]
    Connect { url: String, reason: String },

    #[error("Invalid NATS configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, NatsError>;

impl From<NatsError> for AgentError {
    fn from(err: NatsError) -> Self {
        match err {
            NatsError::Connect { .. } => AgentError::Transport(err.to_string()),
            NatsError::InvalidConfig(reason) => AgentError::Config(reason),
        }
    }
}
