//! Error types for the event agent

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AgentError {
    /// Command registration with an empty or already-registered name
    #[error("Duplicate or invalid command registration: {0}")]
    DuplicateOrInvalid(String),

    /// Rejected before any state was touched
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Transport error: {0}")]
    Transport(String),

    /// The bus cannot answer this kind of query
    #[error("Operation not supported by transport: {0}")]
    Unsupported(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Logging error: {0}")]
    Logging(String),

    #[error("XML rendering error: {0}")]
    Xml(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, AgentError>;
