use std::str::FromStr;

use parking_lot::RwLock;
use tracing::Level;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, reload, EnvFilter, Registry};

use super::{level_name, LogLevelControl};
use crate::context::AGENT_VERSION;
use crate::error::{AgentError, Result};

/// Configuration for the logging system
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Initial log level
    pub level: Level,
    /// Whether to enable JSON formatting
    pub json: bool,
    /// Whether to include file and line information
    pub file_info: bool,
    /// Application name for the welcome line
    pub app_name: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: Level::INFO,
            json: false,
            file_info: false,
            app_name: "event-agent".to_string(),
        }
    }
}

impl LoggingConfig {
    pub fn new(level: Level, app_name: impl Into<String>) -> Self {
        LoggingConfig {
            level,
            app_name: app_name.into(),
            ..Default::default()
        }
    }

    pub fn with_json(mut self) -> Self {
        self.json = true;
        self
    }

    pub fn with_file_info(mut self) -> Self {
        self.file_info = true;
        self
    }

}

/// Level control backed by the installed subscriber's reload handle
pub struct ReloadableLogLevel {
    handle: reload::Handle<EnvFilter, Registry>,
    current: RwLock<Level>,
}

impl LogLevelControl for ReloadableLogLevel {
    fn current(&self) -> String {
        level_name(*self.current.read())
    }

    fn set_level(&self, level: &str) -> Result<()> {
        let parsed = parse_log_level(level)?;
        self.handle
            .reload(EnvFilter::new(level_name(parsed)))
            .map_err(|e| AgentError::Logging(e.to_string()))?;
        *self.current.write() = parsed;
        tracing::info!("Log level changed to {}", level_name(parsed));
        Ok(())
    }
}

/// Install the global fmt subscriber.
///
/// `RUST_LOG` directives are honored at startup; the configured level is added
/// on top. Fails if a global subscriber is already set.
pub fn setup_logging(config: LoggingConfig) -> Result<ReloadableLogLevel> {
    let filter = EnvFilter::from_default_env().add_directive(config.level.into());
    let (filter, handle) = reload::Layer::new(filter);

    let layer = fmt::layer()
        .with_file(config.file_info)
        .with_line_number(config.file_info);

    let installed = if config.json {
        tracing_subscriber::registry()
            .with(filter)
            .with(layer.json())
            .try_init()
    } else {
        tracing_subscriber::registry().with(filter).with(layer).try_init()
    };
    installed.map_err(|e| AgentError::Logging(e.to_string()))?;
    log_welcome(&config.app_name, AGENT_VERSION);

    Ok(ReloadableLogLevel {
        handle,
        current: RwLock::new(config.level),
    })
}

/// Parse a log level from a string
pub fn parse_log_level(level: &str) -> Result<Level> {
    Level::from_str(level.trim())
        .map_err(|_| AgentError::Config(format!("Invalid log level: {}", level)))
}

/// Log a welcome message with version info
pub fn log_welcome(app_name: &str, version: &str) {
    tracing::info!("Starting {} v{}", app_name, version);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_log_level() {
        assert_eq!(parse_log_level("warn").unwrap(), Level::WARN);
        assert_eq!(parse_log_level(" ERROR ").unwrap(), Level::ERROR);
        assert!(matches!(parse_log_level("chatty"), Err(AgentError::Config(_))));
    }

    #[test]
    fn test_config_builders() {
        let config = LoggingConfig::new(Level::DEBUG, "agent").with_json().with_file_info();
        assert!(config.json && config.file_info);
        assert_eq!(config.app_name, "agent");
    }

    #[test]
    fn test_setup_installs_once() {
        let control = setup_logging(LoggingConfig::new(Level::DEBUG, "event-agent-test")).unwrap();
        assert_eq!(control.current(), "debug");
        control.set_level("warn").unwrap();
        assert_eq!(control.current(), "warn");

        let again = setup_logging(LoggingConfig::default());
        assert!(matches!(again, Err(AgentError::Logging(_))));
    }
}
