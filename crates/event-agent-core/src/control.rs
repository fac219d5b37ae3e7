//! Call-control port
//!
//! The telephony engine runs API commands (`originate`, `uuid_kill`, `status`,
//! ...) on behalf of the command handlers. Result text is opaque apart from the
//! engine's `-ERR` marker.

use async_trait::async_trait;

/// Marker the engine puts in result text when a command failed logically
pub const ERROR_MARKER: &str = "-ERR";

/// Raw outcome of one engine API call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecOutput {
    pub text: String,
    pub success: bool,
}

impl ExecOutput {
    pub fn ok(text: impl Into<String>) -> Self {
        Self { text: text.into(), success: true }
    }

    pub fn failed(text: impl Into<String>) -> Self {
        Self { text: text.into(), success: false }
    }

    /// Succeeded at the call level and carries no `-ERR` marker
    pub fn is_success(&self) -> bool {
        self.success && !self.text.contains(ERROR_MARKER)
    }

    /// Failure text for replies, `"Unknown error"` when the engine said nothing
    pub fn error_text(&self) -> String {
        if self.text.trim().is_empty() {
            "Unknown error".to_string()
        } else {
            self.text.clone()
        }
    }
}

/// Executes engine API commands
#[async_trait]
pub trait CallControl: Send + Sync {
    async fn execute(&self, command: &str, args: &str) -> ExecOutput;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_marker_anywhere_fails() {
        assert!(ExecOutput::ok("+OK 1234").is_success());
        assert!(!ExecOutput::ok("-ERR NO_ROUTE_DESTINATION").is_success());
        assert!(!ExecOutput::ok("result: -ERR busy").is_success());
        assert!(!ExecOutput::failed("+OK").is_success());
    }

    #[test]
    fn test_error_text_fallback() {
        assert_eq!(ExecOutput::failed("").error_text(), "Unknown error");
        assert_eq!(ExecOutput::failed("-ERR x").error_text(), "-ERR x");
    }
}
