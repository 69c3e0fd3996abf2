//! Chat routing counters.
//! Owned by the chat server; read with [`ChatMetrics::snapshot`].
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

#[derive(Debug, Default)]
pub struct ChatMetrics {
    channel_messages: AtomicU64,
    local_messages: AtomicU64,
    spy_copies: AtomicU64,
    cancelled: AtomicU64,
    delivery_failures: AtomicU64,
    per_channel: Mutex<HashMap<String, u64>>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub channel_messages: u64,
    pub local_messages: u64,
    pub spy_copies: u64,
    pub cancelled: u64,
    pub delivery_failures: u64,
    pub per_channel: HashMap<String, u64>,
}

impl ChatMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc_channel_message(&self, channel: &str) {
        self.channel_messages.fetch_add(1, Ordering::Relaxed);
        let mut guard = self.per_channel.lock().unwrap_or_else(|e| e.into_inner());
        let count = guard.entry(channel.to_string()).or_default();
        *count = count.saturating_add(1);
    }

    pub fn inc_local_message(&self) {
        self.local_messages.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_spy_copies(&self, n: u64) {
        self.spy_copies.fetch_add(n, Ordering::Relaxed);
    }

    pub fn inc_cancelled(&self) {
        self.cancelled.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_delivery_failures(&self) {
        self.delivery_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            channel_messages: self.channel_messages.load(Ordering::Relaxed),
            local_messages: self.local_messages.load(Ordering::Relaxed),
            spy_copies: self.spy_copies.load(Ordering::Relaxed),
            cancelled: self.cancelled.load(Ordering::Relaxed),
            delivery_failures: self.delivery_failures.load(Ordering::Relaxed),
            per_channel: self
                .per_channel
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn per_channel_counts_accumulate() {
        let metrics = ChatMetrics::new();
        metrics.inc_channel_message("Shout");
        metrics.inc_channel_message("Shout");
        metrics.inc_channel_message("Trade");
        metrics.inc_local_message();
        let snap = metrics.snapshot();
        assert_eq!(snap.channel_messages, 3);
        assert_eq!(snap.local_messages, 1);
        assert_eq!(snap.per_channel.get("Shout"), Some(&2));
    }
}
