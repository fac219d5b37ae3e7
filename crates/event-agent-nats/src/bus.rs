//! [`MessageBus`] over an `async-nats` client

use async_nats::{Client, ConnectOptions, Event};
use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use event_agent_core::bus::{BusMessage, MessageBus, MessageHandler};
use event_agent_core::{AgentError, Result as AgentResult};

use crate::config::NatsConfig;
use crate::error::{NatsError, Result};
use crate::stats::{DriverCounters, DriverStats};

const CONNECTION_TIMEOUT: Duration = Duration::from_secs(5);

pub struct NatsBus {
    client: Client,
    url: String,
    counters: Arc<DriverCounters>,
    /// One reader task per subscribed subject
    subscriptions: DashMap<String, JoinHandle<()>>,
}

impl NatsBus {
    /// Connect and keep reconnecting in the background on connection loss
    pub async fn connect(config: NatsConfig) -> Result<Self> {
        config.validate()?;

        let counters = Arc::new(DriverCounters::default());
        let options = Self::options(&config, counters.clone());

        info!("Connecting to NATS at {}", config.url);
        let client = options
            .connect(config.url.as_str())
            .await
            .map_err(|e| NatsError::Connect {
                url: config.url.clone(),
                reason: e.to_string(),
            })?;
        counters.set_connected();
        info!("Connected to NATS at {} as {}", config.url, config.name);

        Ok(Self {
            client,
            url: config.url,
            counters,
            subscriptions: DashMap::new(),
        })
    }

    fn options(config: &NatsConfig, counters: Arc<DriverCounters>) -> ConnectOptions {
        let options = match (&config.nkey_seed, &config.token) {
            (Some(seed), _) => ConnectOptions::with_nkey(seed.clone()),
            (None, Some(token)) => ConnectOptions::with_token(token.clone()),
            (None, None) => ConnectOptions::new(),
        };
        let wait = config.reconnect_wait;

        options
            .name(config.name.clone())
            .connection_timeout(CONNECTION_TIMEOUT)
            .max_reconnects(config.max_reconnects)
            .reconnect_delay_callback(move |_attempts| wait)
            .event_callback(move |event| {
                let counters = counters.clone();
                async move {
                    match event {
                        Event::Connected => {
                            counters.on_connected();
                            info!("NATS connection established");
                        }
                        Event::Disconnected => {
                            counters.on_disconnected();
                            warn!("NATS connection lost, reconnecting");
                        }
                        other => debug!("NATS event: {:?}", other),
                    }
                }
            })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn stats(&self) -> DriverStats {
        self.counters.snapshot()
    }

    /// Drop every subscription and flush pending publishes
    pub async fn close(&self) -> AgentResult<()> {
        let subjects: Vec<String> = self.subscriptions.iter().map(|entry| entry.key().clone()).collect();
        for subject in subjects {
            if let Some((_, task)) = self.subscriptions.remove(&subject) {
                task.abort();
            }
        }

        self.client
            .flush()
            .await
            .map_err(|e| AgentError::Transport(format!("flush failed: {}", e)))?;
        info!("NATS driver closed");
        Ok(())
    }

    fn spawn_reader(
        &self,
        subject: String,
        mut subscriber: async_nats::Subscriber,
        handler: Arc<dyn MessageHandler>,
    ) -> JoinHandle<()> {
        let counters = self.counters.clone();
        tokio::spawn(async move {
            while let Some(message) = subscriber.next().await {
                counters.record_received();
                let bus_message = BusMessage {
                    subject: message.subject.to_string(),
                    payload: message.payload,
                    reply_to: message.reply.map(|reply| reply.to_string()),
                };
                let handler = handler.clone();
                tokio::spawn(async move {
                    handler.on_message(bus_message).await;
                });
            }
            debug!("Subscription to {} ended", subject);
        })
    }
}

#[async_trait]
impl MessageBus for NatsBus {
    async fn publish(&self, subject: &str, payload: Bytes) -> AgentResult<()> {
        let size = payload.len();
        match self.client.publish(subject.to_string(), payload).await {
            Ok(()) => {
                self.counters.record_sent(size);
                Ok(())
            }
            Err(e) => {
                self.counters.record_failed();
                error!("Failed to publish to {}: {}", subject, e);
                Err(AgentError::Transport(format!("publish to {} failed: {}", subject, e)))
            }
        }
    }

    async fn subscribe(&self, subject: &str, handler: Arc<dyn MessageHandler>) -> AgentResult<()> {
        let subscriber = self
            .client
            .subscribe(subject.to_string())
            .await
            .map_err(|e| AgentError::Transport(format!("subscribe to {} failed: {}", subject, e)))?;

        let task = self.spawn_reader(subject.to_string(), subscriber, handler);
        if let Some(previous) = self.subscriptions.insert(subject.to_string(), task) {
            previous.abort();
        }

        info!("Subscribed to {}", subject);
        Ok(())
    }

    async fn unsubscribe(&self, subject: &str) -> AgentResult<()> {
        match self.subscriptions.remove(subject) {
            Some((_, task)) => {
                task.abort();
                info!("Unsubscribed from {}", subject);
            }
            None => debug!("No subscription for {}", subject),
        }
        Ok(())
    }

    async fn subscriber_count(&self, _subject: &str) -> AgentResult<usize> {
        Err(AgentError::Unsupported("NATS does not report subscriber counts".to_string()))
    }

    fn is_connected(&self) -> bool {
        self.counters.is_connected()
    }
}

impl Drop for NatsBus {
    fn drop(&mut self) {
        for entry in self.subscriptions.iter() {
            entry.value().abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_connect_refused() {
        let config = NatsConfig::new("nats://127.0.0.1:1");
        match NatsBus::connect(config).await {
            Err(NatsError::Connect { url, .. }) => assert_eq!(url, "nats://127.0.0.1:1"),
            Err(other) => panic!("unexpected error: {}", other),
            Ok(_) => panic!("connected to a closed port"),
        }
    }

    #[tokio::test]
    async fn test_invalid_config_never_dials() {
        let err = NatsBus::connect(NatsConfig::new("")).await.err().unwrap();
        assert!(matches!(AgentError::from(err), AgentError::Config(_)));
    }
}
