//! Message bus port
//!
//! The gateway never manages connections, retries or credentials itself. It
//! talks to the bus only through [`MessageBus`]. Two implementations exist:
//! [`MemoryBus`] for single-process deployments and tests, and the NATS driver
//! in the `event-agent-nats` crate.

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{AgentError, Result};

/// One message delivered by the bus
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusMessage {
    pub subject: String,
    pub payload: Bytes,
    pub reply_to: Option<String>,
}

impl BusMessage {
    pub fn new(subject: impl Into<String>, payload: impl Into<Bytes>) -> Self {
        Self {
            subject: subject.into(),
            payload: payload.into(),
            reply_to: None,
        }
    }

    pub fn with_reply(mut self, reply_to: impl Into<String>) -> Self {
        self.reply_to = Some(reply_to.into());
        self
    }

    /// Payload decoded as JSON
    pub fn json(&self) -> Result<serde_json::Value> {
        Ok(serde_json::from_slice(&self.payload)?)
    }
}

/// Receiver side of a subscription
#[async_trait]
pub trait MessageHandler: Send + Sync {
    async fn on_message(&self, message: BusMessage);
}

/// Operations the gateway needs from a message bus
#[async_trait]
pub trait MessageBus: Send + Sync {
    async fn publish(&self, subject: &str, payload: Bytes) -> Result<()>;

    async fn subscribe(&self, subject: &str, handler: Arc<dyn MessageHandler>) -> Result<()>;

    async fn unsubscribe(&self, subject: &str) -> Result<()>;

    /// Number of subscribers interested in `subject`.
    ///
    /// Transports that cannot tell return an error; callers then assume
    /// someone is listening.
    async fn subscriber_count(&self, subject: &str) -> Result<usize>;

    fn is_connected(&self) -> bool;
}

/// NATS-style subject matching: `*` matches one token, a trailing `>` matches the rest
pub fn subject_matches(pattern: &str, subject: &str) -> bool {
    let mut pattern_tokens = pattern.split('.');
    let mut subject_tokens = subject.split('.');

    loop {
        match (pattern_tokens.next(), subject_tokens.next()) {
            (Some(">"), Some(_)) => return pattern_tokens.next().is_none(),
            (Some("*"), Some(_)) => continue,
            (Some(p), Some(s)) if p == s => continue,
            (None, None) => return true,
            _ => return false,
        }
    }
}

/// In-process bus
///
/// Delivers published messages to matching local subscriptions and keeps a
/// log of everything published so callers can inspect replies.
///
/// ```rust
/// use bytes::Bytes;
/// use event_agent_core::bus::{MemoryBus, MessageBus};
///
/// # tokio_test::block_on(async {
/// let bus = MemoryBus::new();
/// bus.publish("freeswitch.events.HEARTBEAT", Bytes::from_static(b"{}")).await.unwrap();
/// assert_eq!(bus.published_to("freeswitch.events.HEARTBEAT").len(), 1);
/// # });
/// ```
pub struct MemoryBus {
    subscriptions: DashMap<String, Arc<dyn MessageHandler>>,
    published: Mutex<Vec<BusMessage>>,
    connected: AtomicBool,
    fail_publishes: AtomicBool,
    reject_subscribe: Mutex<Option<String>>,
    counts_supported: AtomicBool,
}

impl MemoryBus {
    pub fn new() -> Self {
        Self {
            subscriptions: DashMap::new(),
            published: Mutex::new(Vec::new()),
            connected: AtomicBool::new(true),
            fail_publishes: AtomicBool::new(false),
            reject_subscribe: Mutex::new(None),
            counts_supported: AtomicBool::new(true),
        }
    }

    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    /// Make every publish fail with a transport error
    pub fn set_fail_publishes(&self, fail: bool) {
        self.fail_publishes.store(fail, Ordering::SeqCst);
    }

    /// Reject subscriptions whose subject contains `fragment`; `None` clears it
    pub fn set_reject_subscribe(&self, fragment: Option<&str>) {
        *self.reject_subscribe.lock() = fragment.map(str::to_string);
    }

    /// Toggle whether [`MessageBus::subscriber_count`] can answer
    pub fn set_subscriber_counts_supported(&self, supported: bool) {
        self.counts_supported.store(supported, Ordering::SeqCst);
    }

    /// Hand a message to the subscription matching `message.subject`, as if it
    /// came off the wire. Returns false when nobody is subscribed.
    pub async fn deliver(&self, message: BusMessage) -> bool {
        let handlers = self.matching_handlers(&message.subject);
        let delivered = !handlers.is_empty();
        for handler in handlers {
            handler.on_message(message.clone()).await;
        }
        delivered
    }

    pub fn published(&self) -> Vec<BusMessage> {
        self.published.lock().clone()
    }

    pub fn published_to(&self, subject: &str) -> Vec<BusMessage> {
        self.published
            .lock()
            .iter()
            .filter(|m| m.subject == subject)
            .cloned()
            .collect()
    }

    pub fn clear_published(&self) {
        self.published.lock().clear();
    }

    pub fn subscribed_subjects(&self) -> Vec<String> {
        let mut subjects: Vec<String> = self.subscriptions.iter().map(|e| e.key().clone()).collect();
        subjects.sort();
        subjects
    }

    fn matching_handlers(&self, subject: &str) -> Vec<Arc<dyn MessageHandler>> {
        self.subscriptions
            .iter()
            .filter(|entry| subject_matches(entry.key(), subject))
            .map(|entry| entry.value().clone())
            .collect()
    }
}

impl Default for MemoryBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MessageBus for MemoryBus {
    async fn publish(&self, subject: &str, payload: Bytes) -> Result<()> {
        if !self.is_connected() {
            return Err(AgentError::Transport("memory bus disconnected".to_string()));
        }
        if self.fail_publishes.load(Ordering::SeqCst) {
            return Err(AgentError::Transport(format!("publish to {} rejected", subject)));
        }

        let message = BusMessage::new(subject, payload);
        self.published.lock().push(message.clone());
        self.deliver(message).await;
        Ok(())
    }

    async fn subscribe(&self, subject: &str, handler: Arc<dyn MessageHandler>) -> Result<()> {
        if subject.is_empty() {
            return Err(AgentError::InvalidArgument("empty subject".to_string()));
        }
        if let Some(fragment) = self.reject_subscribe.lock().as_deref() {
            if subject.contains(fragment) {
                return Err(AgentError::Transport(format!("subscribe to {} rejected", subject)));
            }
        }
        if self.subscriptions.insert(subject.to_string(), handler).is_some() {
            tracing::warn!("Replaced existing subscription on {}", subject);
        }
        Ok(())
    }

    async fn unsubscribe(&self, subject: &str) -> Result<()> {
        self.subscriptions.remove(subject);
        Ok(())
    }

    async fn subscriber_count(&self, subject: &str) -> Result<usize> {
        if !self.counts_supported.load(Ordering::SeqCst) {
            return Err(AgentError::Unsupported("subscriber count".to_string()));
        }
        Ok(self.matching_handlers(subject).len())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    struct Counter(AtomicUsize);

    #[async_trait]
    impl MessageHandler for Counter {
        async fn on_message(&self, _message: BusMessage) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_subject_matching() {
        assert!(subject_matches("freeswitch.api", "freeswitch.api"));
        assert!(!subject_matches("freeswitch.api", "freeswitch.api.x"));
        assert!(subject_matches("freeswitch.events.*", "freeswitch.events.heartbeat"));
        assert!(!subject_matches("freeswitch.events.*", "freeswitch.events.channel.create"));
        assert!(subject_matches("freeswitch.events.>", "freeswitch.events.channel.create"));
        assert!(!subject_matches("freeswitch.events.>", "freeswitch.events"));
        assert!(!subject_matches("freeswitch.>.x", "freeswitch.a.x"));
    }

    #[tokio::test]
    async fn test_publish_delivers_and_logs() {
        let bus = MemoryBus::new();
        let counter = Arc::new(Counter(AtomicUsize::new(0)));
        bus.subscribe("a.>", counter.clone()).await.unwrap();

        bus.publish("a.b", Bytes::from_static(b"{}")).await.unwrap();
        bus.publish("c.d", Bytes::from_static(b"{}")).await.unwrap();

        assert_eq!(counter.0.load(Ordering::SeqCst), 1);
        assert_eq!(bus.published().len(), 2);
        assert_eq!(bus.published_to("c.d").len(), 1);
        assert_eq!(bus.subscriber_count("a.b").await.unwrap(), 1);
        assert_eq!(bus.subscriber_count("c.d").await.unwrap(), 0);

        bus.unsubscribe("a.>").await.unwrap();
        assert_eq!(bus.subscriber_count("a.b").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_transport_failures() {
        let bus = MemoryBus::new();
        bus.set_fail_publishes(true);
        assert!(bus.publish("x", Bytes::new()).await.is_err());

        bus.set_fail_publishes(false);
        bus.set_connected(false);
        assert!(bus.publish("x", Bytes::new()).await.is_err());
        assert!(bus.published().is_empty());

        bus.set_subscriber_counts_supported(false);
        assert!(matches!(
            bus.subscriber_count("x").await,
            Err(AgentError::Unsupported(_))
        ));
    }
}
