//! Agent configuration
//!
//! Loaded from a `.toml` or `.json` file, from `EVENT_AGENT_*` environment
//! variables, or both (file first, then [`AgentConfig::apply_env`]).
//!
//! ```toml
//! driver = "nats"
//! url = "nats://10.0.0.5:4222"
//! subject_prefix = "freeswitch"
//! node_id = "fs-edge-1"
//!
//! [events]
//! publish_all = false
//! include = "CHANNEL_CREATE, CHANNEL_ANSWER, CHANNEL_HANGUP_COMPLETE"
//!
//! [dialplan]
//! audio_mode = "music"
//! music_class = "moh"
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::context::{GatewayContext, DEFAULT_SUBJECT_PREFIX};
use crate::dialplan::DialplanConfig;
use crate::error::{AgentError, Result};
use crate::events::{split_list, EventFilterConfig};
use crate::logging::{parse_log_level, LoggingConfig};
use crate::node::{slugify, NodeIdentity};

pub const DEFAULT_DRIVER: &str = "nats";
pub const DEFAULT_URL: &str = "nats://127.0.0.1:4222";
pub const ENV_PREFIX: &str = "EVENT_AGENT_";

/// Bus drivers this build knows about
pub const KNOWN_DRIVERS: [&str; 2] = ["nats", "memory"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    /// `trace`, `debug`, `info`, `warn` or `error`
    pub level: String,
    pub json: bool,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub driver: String,
    /// Bus server URL; `host` is accepted as an alias
    #[serde(alias = "host")]
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(alias = "nkey", skip_serializing_if = "Option::is_none")]
    pub nkey_seed: Option<String>,
    pub subject_prefix: String,
    /// Slugified on load
    pub node_id: String,
    pub events: EventFilterConfig,
    pub dialplan: DialplanConfig,
    pub logging: LogSettings,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            driver: DEFAULT_DRIVER.to_string(),
            url: DEFAULT_URL.to_string(),
            token: None,
            nkey_seed: None,
            subject_prefix: DEFAULT_SUBJECT_PREFIX.to_string(),
            node_id: NodeIdentity::from_hostname().to_string(),
            events: EventFilterConfig::default(),
            dialplan: DialplanConfig::default(),
            logging: LogSettings::default(),
        }
    }
}

impl AgentConfig {
    /// Load from a `.toml` or `.json` file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|e| AgentError::Config(format!("cannot read {}: {}", path.display(), e)))?;

        let config: Self = match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => toml::from_str(&contents)
                .map_err(|e| AgentError::Config(format!("{}: {}", path.display(), e)))?,
            Some("json") => serde_json::from_str(&contents)
                .map_err(|e| AgentError::Config(format!("{}: {}", path.display(), e)))?,
            _ => {
                return Err(AgentError::Config(format!(
                    "unsupported configuration format: {}",
                    path.display()
                )))
            }
        };

        config.normalized()
    }

    /// Defaults overlaid with `EVENT_AGENT_*` variables
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env()?;
        Ok(config)
    }

    /// Overlay `EVENT_AGENT_*` variables onto this configuration
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_vars(|name| std::env::var(format!("{}{}", ENV_PREFIX, name)).ok())?;
        Ok(())
    }

    /// Overlay values from `lookup`, keyed by the variable name without prefix
    pub fn apply_vars<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(driver) = lookup("DRIVER") {
            self.driver = driver;
        }
        if let Some(url) = lookup("URL") {
            self.url = url;
        }
        if let Some(token) = lookup("TOKEN").filter(|v| !v.is_empty()) {
            self.token = Some(token);
        }
        if let Some(seed) = lookup("NKEY_SEED").filter(|v| !v.is_empty()) {
            self.nkey_seed = Some(seed);
        }
        if let Some(prefix) = lookup("SUBJECT_PREFIX") {
            self.subject_prefix = prefix;
        }
        if let Some(node_id) = lookup("NODE_ID") {
            self.node_id = node_id;
        }
        if let Some(flag) = lookup("PUBLISH_ALL_EVENTS") {
            self.events.publish_all = parse_flag(&flag);
        }
        if let Some(include) = lookup("INCLUDE") {
            self.events.include = split_list(&include);
        }
        if let Some(exclude) = lookup("EXCLUDE") {
            self.events.exclude = split_list(&exclude);
        }
        if let Some(level) = lookup("LOG_LEVEL") {
            self.logging.level = level;
        }

        *self = self.clone().normalized()?;
        Ok(())
    }

    /// Check values that serde cannot
    pub fn validate(&self) -> Result<()> {
        if !KNOWN_DRIVERS.contains(&self.driver.as_str()) {
            return Err(AgentError::Config(format!("unknown driver '{}'", self.driver)));
        }
        if self.url.trim().is_empty() {
            return Err(AgentError::Config("url cannot be empty".to_string()));
        }
        parse_log_level(&self.logging.level)?;
        Ok(())
    }

    pub fn node(&self) -> NodeIdentity {
        NodeIdentity::new(&self.node_id)
    }

    /// Fresh, stopped gateway context for this configuration
    pub fn context(&self) -> GatewayContext {
        GatewayContext::new(self.node(), self.subject_prefix.clone())
    }

    pub fn logging_config(&self) -> Result<LoggingConfig> {
        let config = LoggingConfig::new(parse_log_level(&self.logging.level)?, "event-agent");
        Ok(if self.logging.json { config.with_json() } else { config })
    }

    fn normalized(mut self) -> Result<Self> {
        if self.node_id.trim().is_empty() {
            self.node_id = NodeIdentity::from_hostname().to_string();
        } else {
            let slug = slugify(&self.node_id);
            if slug != self.node_id {
                tracing::info!("Node ID slugified to: {}", slug);
            }
            self.node_id = slug;
        }
        if self.subject_prefix.trim().is_empty() {
            self.subject_prefix = DEFAULT_SUBJECT_PREFIX.to_string();
        }
        self.validate()?;
        Ok(self)
    }
}

/// `true`, `yes`, `on`, `1`, `enabled` and friends, any case
pub fn parse_flag(raw: &str) -> bool {
    matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "true" | "yes" | "on" | "1" | "enable" | "enabled" | "active" | "allow"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialplan::AudioMode;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn temp_file(name: &str, contents: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("event-agent-config-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_defaults() {
        let config = AgentConfig::default();
        assert_eq!(config.driver, "nats");
        assert_eq!(config.url, DEFAULT_URL);
        assert_eq!(config.subject_prefix, "freeswitch");
        assert!(config.node_id.starts_with("fs_node_"));
        assert!(config.events.publish_all);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_toml_file() {
        let path = temp_file(
            "agent.toml",
            r#"
url = "nats://10.0.0.5:4222"
node_id = "FS Edge-1"
token = "s3cret"

[events]
publish_all = false
include = "CHANNEL_CREATE, CHANNEL_ANSWER"
exclude = ["HEARTBEAT"]

[dialplan]
audio_mode = "music"
auto_answer = true
"#,
        );
        let config = AgentConfig::from_file(&path).unwrap();
        assert_eq!(config.url, "nats://10.0.0.5:4222");
        assert_eq!(config.node_id, "fs_edge_1");
        assert_eq!(config.token.as_deref(), Some("s3cret"));
        assert!(!config.events.publish_all);
        assert_eq!(config.events.include, vec!["CHANNEL_CREATE", "CHANNEL_ANSWER"]);
        assert_eq!(config.events.exclude, vec!["HEARTBEAT"]);
        assert_eq!(config.dialplan.audio_mode, AudioMode::Music);
        assert!(config.dialplan.auto_answer);
        assert_eq!(config.dialplan.music_class, "moh");
    }

    #[test]
    fn test_json_file_with_aliases() {
        let path = temp_file("agent.json", r#"{"host": "nats://bus:4222", "nkey": "SUAB", "subject_prefix": ""}"#);
        let config = AgentConfig::from_file(&path).unwrap();
        assert_eq!(config.url, "nats://bus:4222");
        assert_eq!(config.nkey_seed.as_deref(), Some("SUAB"));
        assert_eq!(config.subject_prefix, "freeswitch");
    }

    #[test]
    fn test_rejects_unknown_format_and_driver() {
        let path = temp_file("agent.yaml", "driver: nats");
        assert!(matches!(AgentConfig::from_file(&path), Err(AgentError::Config(_))));

        let path = temp_file("bad-driver.toml", r#"driver = "kafka""#);
        assert!(matches!(AgentConfig::from_file(&path), Err(AgentError::Config(_))));
    }

    #[test]
    fn test_env_overlay() {
        let vars: HashMap<&str, &str> = [
            ("URL", "nats://env:4222"),
            ("NODE_ID", "Node.7"),
            ("PUBLISH_ALL_EVENTS", "no"),
            ("EXCLUDE", "HEARTBEAT,RE_SCHEDULE"),
            ("TOKEN", ""),
            ("LOG_LEVEL", "debug"),
        ]
        .into_iter()
        .collect();

        let mut config = AgentConfig::default();
        config
            .apply_vars(|name| vars.get(name).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.url, "nats://env:4222");
        assert_eq!(config.node_id, "node_7");
        assert!(!config.events.publish_all);
        assert_eq!(config.events.exclude, vec!["HEARTBEAT", "RE_SCHEDULE"]);
        assert_eq!(config.token, None);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.context().node_subject(), "freeswitch.node.node_7");
    }

    #[test]
    fn test_bad_log_level_rejected() {
        let mut config = AgentConfig::default();
        let result = config.apply_vars(|name| (name == "LOG_LEVEL").then(|| "verbose".to_string()));
        assert!(result.is_err());
    }

    #[test]
    fn test_logging_config() {
        let mut config = AgentConfig::default();
        config.logging.level = "warn".to_string();
        config.logging.json = true;

        let logging = config.logging_config().unwrap();
        assert_eq!(logging.level, tracing::Level::WARN);
        assert!(logging.json);
        assert_eq!(logging.app_name, "event-agent");
    }

    #[test]
    fn test_parse_flag() {
        assert!(parse_flag("TRUE"));
        assert!(parse_flag(" on "));
        assert!(!parse_flag("off"));
        assert!(!parse_flag(""));
    }
}
