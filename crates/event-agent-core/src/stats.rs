//! Gateway counters
//!
//! Updated from many threads at once; every field is an atomic so no
//! increment is ever lost.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Live counters owned by the gateway context
#[derive(Debug, Default)]
pub struct AgentStats {
    requests_received: AtomicU64,
    requests_success: AtomicU64,
    requests_failed: AtomicU64,
    events_published: AtomicU64,
    events_failed: AtomicU64,
    events_skipped_no_subscribers: AtomicU64,
    bytes_published: AtomicU64,
}

/// Command counters reported by `agent.status`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestStats {
    pub requests_received: u64,
    pub requests_success: u64,
    pub requests_failed: u64,
}

/// Event pipeline counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventStats {
    pub published: u64,
    pub failed: u64,
    pub skipped_no_subscribers: u64,
    pub bytes_published: u64,
}

impl AgentStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_request_received(&self) {
        self.requests_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_request_success(&self) {
        self.requests_success.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_request_failed(&self) {
        self.requests_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_event_published(&self, bytes: usize) {
        self.events_published.fetch_add(1, Ordering::Relaxed);
        self.bytes_published.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    pub fn record_event_failed(&self) {
        self.events_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_event_skipped(&self) {
        self.events_skipped_no_subscribers.fetch_add(1, Ordering::Relaxed);
    }

    pub fn requests(&self) -> RequestStats {
        RequestStats {
            requests_received: self.requests_received.load(Ordering::Relaxed),
            requests_success: self.requests_success.load(Ordering::Relaxed),
            requests_failed: self.requests_failed.load(Ordering::Relaxed),
        }
    }

    pub fn events(&self) -> EventStats {
        EventStats {
            published: self.events_published.load(Ordering::Relaxed),
            failed: self.events_failed.load(Ordering::Relaxed),
            skipped_no_subscribers: self.events_skipped_no_subscribers.load(Ordering::Relaxed),
            bytes_published: self.bytes_published.load(Ordering::Relaxed),
        }
    }
}
