//! Logging setup and runtime log-level control

mod setup;

pub use setup::{log_welcome, parse_log_level, setup_logging, LoggingConfig, ReloadableLogLevel};

use parking_lot::RwLock;
use tracing::Level;

use crate::error::Result;

/// Runtime access to the effective log level, used by `agent.status`
pub trait LogLevelControl: Send + Sync {
    /// Effective level, lower-case (`"info"`, `"debug"`, ...)
    fn current(&self) -> String;

    fn set_level(&self, level: &str) -> Result<()>;
}

/// Lower-case name of a level
pub fn level_name(level: Level) -> String {
    level.as_str().to_ascii_lowercase()
}

/// Level holder with no subscriber behind it.
///
/// Used when the host owns the tracing subscriber, and in tests.
#[derive(Debug)]
pub struct FixedLogLevel {
    level: RwLock<Level>,
}

impl FixedLogLevel {
    pub fn new(level: Level) -> Self {
        Self {
            level: RwLock::new(level),
        }
    }
}

impl Default for FixedLogLevel {
    fn default() -> Self {
        Self::new(Level::INFO)
    }
}

impl LogLevelControl for FixedLogLevel {
    fn current(&self) -> String {
        level_name(*self.level.read())
    }

    fn set_level(&self, level: &str) -> Result<()> {
        *self.level.write() = parse_log_level(level)?;
        Ok(())
    }
}
