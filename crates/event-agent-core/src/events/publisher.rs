use std::sync::Arc;
use tracing::{debug, error, warn};

use super::filter::{EventFilter, FilterDecision};
use super::serializer::EventEnvelope;
use super::TelephonyEvent;
use crate::bus::MessageBus;
use crate::context::GatewayContext;

/// What happened to one event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishOutcome {
    /// Gateway stopped or bus disconnected
    Inactive,
    Filtered(FilterDecision),
    NoSubscribers,
    EncodeFailed,
    Failed,
    Published { subject: String, bytes: usize },
}

/// Filters, serializes and publishes engine events. Safe to call from any task.
pub struct EventPublisher {
    ctx: Arc<GatewayContext>,
    bus: Arc<dyn MessageBus>,
    filter: EventFilter,
}

impl EventPublisher {
    pub fn new(ctx: Arc<GatewayContext>, bus: Arc<dyn MessageBus>, filter: EventFilter) -> Self {
        Self { ctx, bus, filter }
    }

    pub fn filter(&self) -> &EventFilter {
        &self.filter
    }

    pub async fn publish(&self, event: &TelephonyEvent) -> PublishOutcome {
        if !self.ctx.is_running() || !self.bus.is_connected() {
            return PublishOutcome::Inactive;
        }

        let decision = self.filter.decide(&event.name);
        if !decision.allows() {
            return PublishOutcome::Filtered(decision);
        }

        let subject = self.ctx.event_subject(&event.name);
        let stats = self.ctx.stats();

        let listeners = match self.bus.subscriber_count(&subject).await {
            Ok(count) => count,
            Err(e) => {
                debug!("Subscriber count for {} unknown ({}), publishing anyway", subject, e);
                1
            }
        };
        if listeners == 0 {
            stats.record_event_skipped();
            return PublishOutcome::NoSubscribers;
        }

        let payload = match EventEnvelope::from_event(event, self.ctx.node()).to_bytes() {
            Ok(payload) => payload,
            Err(e) => {
                error!("Failed to serialize {}: {}", event.name, e);
                return PublishOutcome::EncodeFailed;
            }
        };
        let bytes = payload.len();

        match self.bus.publish(&subject, payload).await {
            Ok(()) => {
                stats.record_event_published(bytes);
                debug!("Published {} to {} ({} bytes)", event.name, subject, bytes);
                PublishOutcome::Published { subject, bytes }
            }
            Err(e) => {
                stats.record_event_failed();
                warn!("Failed to publish {} to {}: {}", event.name, subject, e);
                PublishOutcome::Failed
            }
        }
    }
}
