//! Gateway lifecycle
//!
//! [`EventAgent`] wires the pieces together: it builds the context from an
//! [`AgentConfig`], registers the built-in commands, subscribes the
//! dispatcher and exposes the event publisher and dialplan manager to the
//! engine host.

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::bus::MessageBus;
use crate::commands::{api, call, dialplan as dialplan_commands, status, CommandDispatcher};
use crate::config::AgentConfig;
use crate::context::{GatewayContext, AGENT_VERSION};
use crate::control::CallControl;
use crate::dialplan::{DialplanManager, ParkPlan};
use crate::error::{AgentError, Result};
use crate::events::{EventFilter, EventPublisher, PublishOutcome, TelephonyEvent};
use crate::logging::{FixedLogLevel, LogLevelControl};

pub struct EventAgent {
    ctx: Arc<GatewayContext>,
    dispatcher: Arc<CommandDispatcher>,
    publisher: Arc<EventPublisher>,
    dialplan: Arc<DialplanManager>,
    stats_interval: Option<Duration>,
    stats_handle: Option<JoinHandle<()>>,
}

impl EventAgent {
    pub fn builder(config: AgentConfig) -> EventAgentBuilder {
        EventAgentBuilder::new(config)
    }

    fn new(
        config: AgentConfig,
        bus: Arc<dyn MessageBus>,
        control: Arc<dyn CallControl>,
        log_level: Arc<dyn LogLevelControl>,
        stats_interval: Option<Duration>,
    ) -> Result<Self> {
        config.validate()?;

        let ctx = Arc::new(config.context());
        let dialplan = Arc::new(DialplanManager::new(&config.dialplan));

        let mut dispatcher = CommandDispatcher::new(ctx.clone(), bus.clone());
        status::register(&mut dispatcher, log_level)?;
        call::register(&mut dispatcher, control.clone())?;
        dialplan_commands::register(&mut dispatcher, dialplan.clone())?;
        api::register(&dispatcher, control);

        let publisher = EventPublisher::new(ctx.clone(), bus, EventFilter::new(&config.events));

        info!(
            "Event agent created: node={}, prefix={}, driver={}",
            ctx.node(),
            ctx.subject_prefix(),
            config.driver
        );

        Ok(Self {
            ctx,
            dispatcher: Arc::new(dispatcher),
            publisher: Arc::new(publisher),
            dialplan,
            stats_interval,
            stats_handle: None,
        })
    }

    /// Subscribe to command subjects and start publishing events
    pub async fn start(&mut self) -> Result<()> {
        if self.ctx.is_running() {
            return Ok(());
        }

        self.dispatcher.start().await?;
        self.ctx.set_running(true);

        if let Some(interval) = self.stats_interval {
            let ctx = self.ctx.clone();
            self.stats_handle = Some(tokio::spawn(async move {
                Self::stats_loop(ctx, interval).await;
            }));
        }

        info!("Event agent v{} started on node {}", AGENT_VERSION, self.ctx.node());
        Ok(())
    }

    /// Stop publishing, drop subscriptions and log final counters
    pub async fn stop(&mut self) {
        if !self.ctx.is_running() {
            return;
        }

        self.ctx.set_running(false);
        self.dispatcher.stop().await;

        if let Some(handle) = self.stats_handle.take() {
            handle.abort();
            let _ = handle.await;
        }

        self.log_stats("Event agent stopped");
    }

    pub fn is_running(&self) -> bool {
        self.ctx.is_running()
    }

    pub fn context(&self) -> &Arc<GatewayContext> {
        &self.ctx
    }

    pub fn dispatcher(&self) -> &Arc<CommandDispatcher> {
        &self.dispatcher
    }

    pub fn publisher(&self) -> &Arc<EventPublisher> {
        &self.publisher
    }

    pub fn dialplan(&self) -> &Arc<DialplanManager> {
        &self.dialplan
    }

    /// Event source entry point for the engine host
    pub async fn publish_event(&self, event: &TelephonyEvent) -> PublishOutcome {
        self.publisher.publish(event).await
    }

    /// Routing callback for the engine host
    pub fn route_call(&self) -> Option<ParkPlan> {
        self.dialplan.route_call()
    }

    fn log_stats(&self, label: &str) {
        Self::log_counters(&self.ctx, label);
    }

    fn log_counters(ctx: &GatewayContext, label: &str) {
        let requests = ctx.stats().requests();
        let events = ctx.stats().events();
        info!(
            "{}: requests received={} success={} failed={}, events published={} failed={} skipped={} bytes={}",
            label,
            requests.requests_received,
            requests.requests_success,
            requests.requests_failed,
            events.published,
            events.failed,
            events.skipped_no_subscribers,
            events.bytes_published
        );
    }

    async fn stats_loop(ctx: Arc<GatewayContext>, interval: Duration) {
        let mut ticker = tokio::time::interval(interval);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            Self::log_counters(&ctx, "Event agent stats");
        }
    }
}

impl Drop for EventAgent {
    fn drop(&mut self) {
        if let Some(handle) = self.stats_handle.take() {
            handle.abort();
        }
        if self.ctx.is_running() {
            warn!("Event agent dropped while running; subscriptions were not removed");
        }
    }
}

/// Builder for [`EventAgent`]
pub struct EventAgentBuilder {
    config: AgentConfig,
    bus: Option<Arc<dyn MessageBus>>,
    control: Option<Arc<dyn CallControl>>,
    log_level: Option<Arc<dyn LogLevelControl>>,
    stats_interval: Option<Duration>,
}

impl EventAgentBuilder {
    pub fn new(config: AgentConfig) -> Self {
        Self {
            config,
            bus: None,
            control: None,
            log_level: None,
            stats_interval: None,
        }
    }

    pub fn with_bus(mut self, bus: Arc<dyn MessageBus>) -> Self {
        self.bus = Some(bus);
        self
    }

    pub fn with_call_control(mut self, control: Arc<dyn CallControl>) -> Self {
        self.control = Some(control);
        self
    }

    /// Defaults to a [`FixedLogLevel`] seeded from the configuration
    pub fn with_log_level_control(mut self, control: Arc<dyn LogLevelControl>) -> Self {
        self.log_level = Some(control);
        self
    }

    /// Log counters every `interval` while running
    pub fn with_stats_interval(mut self, interval: Duration) -> Self {
        self.stats_interval = Some(interval);
        self
    }

    pub fn build(self) -> Result<EventAgent> {
        let bus = self
            .bus
            .ok_or_else(|| AgentError::Config("message bus not provided".to_string()))?;
        let control = self
            .control
            .ok_or_else(|| AgentError::Config("call control not provided".to_string()))?;
        let log_level: Arc<dyn LogLevelControl> = match self.log_level {
            Some(level) => level,
            None => Arc::new(FixedLogLevel::new(self.config.logging_config()?.level)),
        };

        EventAgent::new(self.config, bus, control, log_level, self.stats_interval)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::MemoryBus;
    use crate::control::ExecOutput;
    use async_trait::async_trait;

    struct NoopControl;

    #[async_trait]
    impl CallControl for NoopControl {
        async fn execute(&self, _command: &str, _args: &str) -> ExecOutput {
            ExecOutput::ok("+OK")
        }
    }

    fn config() -> AgentConfig {
        AgentConfig {
            node_id: "node-a".to_string(),
            ..AgentConfig::default()
        }
    }

    #[test]
    fn test_build_requires_ports() {
        assert!(matches!(
            EventAgent::builder(config()).build(),
            Err(AgentError::Config(_))
        ));
        assert!(matches!(
            EventAgent::builder(config()).with_bus(Arc::new(MemoryBus::new())).build(),
            Err(AgentError::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_start_stop_subscriptions() {
        let bus = Arc::new(MemoryBus::new());
        let mut agent = EventAgent::builder(config())
            .with_bus(bus.clone())
            .with_call_control(Arc::new(NoopControl))
            .with_stats_interval(Duration::from_secs(3600))
            .build()
            .unwrap();

        let names = agent.dispatcher().registry().command_names();
        assert!(names.contains(&"agent.status".to_string()));
        assert!(names.contains(&"dialplan.autoanswer".to_string()));
        assert!(agent.dispatcher().registry().has_default());

        agent.start().await.unwrap();
        assert!(agent.is_running());
        assert_eq!(
            bus.subscribed_subjects(),
            vec!["freeswitch.api", "freeswitch.node.node_a"]
        );

        agent.stop().await;
        assert!(!agent.is_running());
        assert!(bus.subscribed_subjects().is_empty());
    }

    #[tokio::test]
    async fn test_failed_start_leaves_no_subscription() {
        let bus = Arc::new(MemoryBus::new());
        bus.set_reject_subscribe(Some(".node."));
        let mut agent = EventAgent::builder(config())
            .with_bus(bus.clone())
            .with_call_control(Arc::new(NoopControl))
            .build()
            .unwrap();

        assert!(agent.start().await.is_err());
        assert!(!agent.is_running());
        agent.stop().await;
        assert!(bus.subscribed_subjects().is_empty());
    }
}
