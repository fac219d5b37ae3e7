use std::time::Duration;

use event_agent_core::AgentConfig;

use crate::error::{NatsError, Result};

pub const DEFAULT_MAX_RECONNECTS: usize = 60;
pub const DEFAULT_RECONNECT_WAIT: Duration = Duration::from_secs(1);

/// Connection settings for [`crate::NatsBus`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NatsConfig {
    pub url: String,
    pub token: Option<String>,
    /// NKey seed (`SU...`); takes precedence over `token`
    pub nkey_seed: Option<String>,
    /// Client name shown by the server
    pub name: String,
    pub max_reconnects: usize,
    pub reconnect_wait: Duration,
}

impl Default for NatsConfig {
    fn default() -> Self {
        Self {
            url: event_agent_core::config::DEFAULT_URL.to_string(),
            token: None,
            nkey_seed: None,
            name: "event-agent".to_string(),
            max_reconnects: DEFAULT_MAX_RECONNECTS,
            reconnect_wait: DEFAULT_RECONNECT_WAIT,
        }
    }
}

impl NatsConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    pub fn from_agent_config(config: &AgentConfig) -> Self {
        Self {
            url: config.url.clone(),
            token: config.token.clone(),
            nkey_seed: config.nkey_seed.clone(),
            name: format!("event-agent-{}", config.node()),
            ..Self::default()
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.url.trim().is_empty() {
            return Err(NatsError::InvalidConfig("url cannot be empty".to_string()));
        }
        if self.nkey_seed.as_deref().is_some_and(|seed| !seed.starts_with('S')) {
            return Err(NatsError::InvalidConfig("nkey seed must start with 'S'".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_agent_config() {
        let agent = AgentConfig {
            url: "nats://bus:4222".to_string(),
            token: Some("t0k".to_string()),
            node_id: "edge_1".to_string(),
            ..AgentConfig::default()
        };
        let config = NatsConfig::from_agent_config(&agent);
        assert_eq!(config.url, "nats://bus:4222");
        assert_eq!(config.token.as_deref(), Some("t0k"));
        assert_eq!(config.name, "event-agent-edge_1");
        assert_eq!(config.max_reconnects, 60);
        assert_eq!(config.reconnect_wait, Duration::from_secs(1));
    }

    #[test]
    fn test_validate() {
        assert!(NatsConfig::default().validate().is_ok());
        assert!(NatsConfig::new(" ").validate().is_err());

        let mut config = NatsConfig::default();
        config.nkey_seed = Some("UABC".to_string());
        assert!(matches!(config.validate(), Err(NatsError::InvalidConfig(_))));
    }
}
