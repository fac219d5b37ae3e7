//! Gateway context
//!
//! Everything process-wide lives here and is handed to each component when it
//! is built: node identity, subject prefix, counters and the running flag.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crate::node::NodeIdentity;
use crate::stats::AgentStats;

/// Module version reported by `agent.status`
pub const AGENT_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Subject prefix used when none is configured
pub const DEFAULT_SUBJECT_PREFIX: &str = "freeswitch";

#[derive(Debug)]
pub struct GatewayContext {
    node: NodeIdentity,
    subject_prefix: String,
    stats: AgentStats,
    running: AtomicBool,
    started_at: Instant,
}

impl GatewayContext {
    /// Create a stopped context. An empty prefix falls back to [`DEFAULT_SUBJECT_PREFIX`].
    pub fn new(node: NodeIdentity, subject_prefix: impl Into<String>) -> Self {
        let subject_prefix = subject_prefix.into();
        let subject_prefix = if subject_prefix.trim().is_empty() {
            DEFAULT_SUBJECT_PREFIX.to_string()
        } else {
            subject_prefix
        };

        Self {
            node,
            subject_prefix,
            stats: AgentStats::new(),
            running: AtomicBool::new(false),
            started_at: Instant::now(),
        }
    }

    pub fn node(&self) -> &NodeIdentity {
        &self.node
    }

    pub fn subject_prefix(&self) -> &str {
        &self.subject_prefix
    }

    pub fn stats(&self) -> &AgentStats {
        &self.stats
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub fn set_running(&self, running: bool) {
        self.running.store(running, Ordering::Release);
    }

    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Broadcast command subject, `<prefix>.api`
    pub fn api_subject(&self) -> String {
        format!("{}.api", self.subject_prefix)
    }

    /// Direct command subject for this node, `<prefix>.node.<node_id>`
    pub fn node_subject(&self) -> String {
        format!("{}.node.{}", self.subject_prefix, self.node)
    }

    /// Event subject, `<prefix>.events.<name>` with the name lowercased and `_` → `.`
    pub fn event_subject(&self, event_name: &str) -> String {
        let suffix: String = event_name
            .chars()
            .map(|c| match c {
                '_' => '.',
                c => c.to_ascii_lowercase(),
            })
            .collect();
        format!("{}.events.{}", self.subject_prefix, suffix)
    }
}

/// Wall-clock time in microseconds since the Unix epoch
pub fn now_micros() -> i64 {
    chrono::Utc::now().timestamp_micros()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> GatewayContext {
        GatewayContext::new(NodeIdentity::new("node-1"), "freeswitch")
    }

    #[test]
    fn test_subjects() {
        let ctx = context();
        assert_eq!(ctx.api_subject(), "freeswitch.api");
        assert_eq!(ctx.node_subject(), "freeswitch.node.node_1");
        assert_eq!(ctx.event_subject("CHANNEL_CREATE"), "freeswitch.events.channel.create");
        assert_eq!(ctx.event_subject("CUSTOM_MY_EVENT"), "freeswitch.events.custom.my.event");
    }

    #[test]
    fn test_empty_prefix_falls_back() {
        let ctx = GatewayContext::new(NodeIdentity::new("n"), "  ");
        assert_eq!(ctx.subject_prefix(), DEFAULT_SUBJECT_PREFIX);
    }

    #[test]
    fn test_running_flag() {
        let ctx = context();
        assert!(!ctx.is_running());
        ctx.set_running(true);
        assert!(ctx.is_running());
    }
}
