use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Driver-level counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DriverStats {
    pub connected: bool,
    pub messages_sent: u64,
    pub messages_failed: u64,
    pub messages_received: u64,
    pub bytes_sent: u64,
    pub disconnects: u64,
    pub reconnects: u64,
}

#[derive(Debug, Default)]
pub(crate) struct DriverCounters {
    connected: AtomicBool,
    messages_sent: AtomicU64,
    messages_failed: AtomicU64,
    messages_received: AtomicU64,
    bytes_sent: AtomicU64,
    disconnects: AtomicU64,
    reconnects: AtomicU64,
}

impl DriverCounters {
    pub(crate) fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    pub(crate) fn set_connected(&self) {
        self.connected.store(true, Ordering::Release);
    }

    /// Connection restored; counted as a reconnect only after a disconnect
    pub(crate) fn on_connected(&self) {
        let was_connected = self.connected.swap(true, Ordering::AcqRel);
        if !was_connected && self.disconnects.load(Ordering::Relaxed) > 0 {
            self.reconnects.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub(crate) fn on_disconnected(&self) {
        if self.connected.swap(false, Ordering::AcqRel) {
            self.disconnects.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub(crate) fn record_sent(&self, bytes: usize) {
        self.messages_sent.fetch_add(1, Ordering::Relaxed);
        self.bytes_sent.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_failed(&self) {
        self.messages_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_received(&self) {
        self.messages_received.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> DriverStats {
        DriverStats {
            connected: self.is_connected(),
            messages_sent: self.messages_sent.load(Ordering::Relaxed),
            messages_failed: self.messages_failed.load(Ordering::Relaxed),
            messages_received: self.messages_received.load(Ordering::Relaxed),
            bytes_sent: self.bytes_sent.load(Ordering::Relaxed),
            disconnects: self.disconnects.load(Ordering::Relaxed),
            reconnects: self.reconnects.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reconnect_accounting() {
        let counters = DriverCounters::default();
        counters.on_connected();
        assert_eq!(counters.snapshot().reconnects, 0);

        counters.on_disconnected();
        counters.on_disconnected();
        assert!(!counters.is_connected());
        counters.on_connected();

        let stats = counters.snapshot();
        assert!(stats.connected);
        assert_eq!(stats.disconnects, 1);
        assert_eq!(stats.reconnects, 1);
    }

    #[test]
    fn test_message_counters() {
        let counters = DriverCounters::default();
        counters.record_sent(10);
        counters.record_sent(5);
        counters.record_failed();
        counters.record_received();

        let json = serde_json::to_value(counters.snapshot()).unwrap();
        assert_eq!(json["messages_sent"], 2);
        assert_eq!(json["bytes_sent"], 15);
        assert_eq!(json["messages_failed"], 1);
        assert_eq!(json["messages_received"], 1);
    }
}
