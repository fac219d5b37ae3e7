//! Shared harness: an agent on a [`MemoryBus`] with a scripted engine behind it

#![allow(dead_code)]

use async_trait::async_trait;
use event_agent_core::bus::{BusMessage, MemoryBus, MessageBus, MessageHandler};
use event_agent_core::config::AgentConfig;
use event_agent_core::control::{CallControl, ExecOutput};
use event_agent_core::EventAgent;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

pub const NODE: &str = "node_a";

/// Engine double: records every call, answers `+OK <command>` unless told otherwise
#[derive(Default)]
pub struct FakeEngine {
    calls: Mutex<Vec<(String, String)>>,
    responses: Mutex<HashMap<String, ExecOutput>>,
}

impl FakeEngine {
    pub fn respond(&self, command: &str, output: ExecOutput) {
        self.responses.lock().insert(command.to_string(), output);
    }

    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl CallControl for FakeEngine {
    async fn execute(&self, command: &str, args: &str) -> ExecOutput {
        self.calls.lock().push((command.to_string(), args.to_string()));
        self.responses
            .lock()
            .get(command)
            .cloned()
            .unwrap_or_else(|| ExecOutput::ok(format!("+OK {}", command)))
    }
}

/// Collects everything delivered to a subscription
#[derive(Default)]
pub struct Capture {
    messages: Mutex<Vec<BusMessage>>,
}

impl Capture {
    pub fn messages(&self) -> Vec<BusMessage> {
        self.messages.lock().clone()
    }

    pub fn json(&self) -> Vec<Value> {
        self.messages().iter().map(|m| m.json().unwrap()).collect()
    }
}

#[async_trait]
impl MessageHandler for Capture {
    async fn on_message(&self, message: BusMessage) {
        self.messages.lock().push(message);
    }
}

pub fn test_config() -> AgentConfig {
    AgentConfig {
        node_id: "Node-A".to_string(),
        subject_prefix: "fs".to_string(),
        ..AgentConfig::default()
    }
}

pub struct Harness {
    pub bus: Arc<MemoryBus>,
    pub engine: Arc<FakeEngine>,
    pub agent: EventAgent,
}

static INBOX: AtomicUsize = AtomicUsize::new(0);

impl Harness {
    pub async fn start() -> Self {
        Self::start_with(test_config()).await
    }

    pub async fn start_with(config: AgentConfig) -> Self {
        let bus = Arc::new(MemoryBus::new());
        let engine = Arc::new(FakeEngine::default());
        let mut agent = EventAgent::builder(config)
            .with_bus(bus.clone())
            .with_call_control(engine.clone())
            .build()
            .expect("agent");
        agent.start().await.expect("start");
        Self { bus, engine, agent }
    }

    /// Deliver `raw` on `subject` with a fresh reply subject; returns the reply, if any
    pub async fn send_raw(&self, subject: &str, raw: &[u8]) -> Option<Value> {
        let inbox = format!("_INBOX.{}", INBOX.fetch_add(1, Ordering::SeqCst));
        let message = BusMessage::new(subject, raw.to_vec()).with_reply(inbox.clone());
        assert!(self.bus.deliver(message).await, "nobody subscribed to {}", subject);
        self.bus
            .published_to(&inbox)
            .last()
            .map(|reply| reply.json().expect("reply is JSON"))
    }

    pub async fn send(&self, subject: &str, payload: Value) -> Option<Value> {
        self.send_raw(subject, payload.to_string().as_bytes()).await
    }

    /// Broadcast request on `fs.api`
    pub async fn call(&self, payload: Value) -> Value {
        self.send("fs.api", payload).await.expect("reply")
    }

    pub async fn capture(&self, pattern: &str) -> Arc<Capture> {
        let capture = Arc::new(Capture::default());
        self.bus.subscribe(pattern, capture.clone()).await.unwrap();
        capture
    }
}
