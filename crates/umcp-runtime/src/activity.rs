//! Bounded activity log driving the host UI.
//!
//! Purely observational: excluding it from a deployment does not affect
//! protocol behavior.

use serde::Serialize;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::watch;

/// Ring capacity; the oldest entry is evicted past this.
pub const ACTIVITY_CAPACITY: usize = 100;

/// One recorded tool invocation.
#[derive(Debug, Clone, Serialize)]
pub struct ActivityEntry {
    pub timestamp_ms: u64,
    pub tool: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    pub duration_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub args_summary: Option<String>,
    pub response_bytes: usize,
}

impl ActivityEntry {
    pub fn new(tool: impl Into<String>, success: bool, duration: Duration) -> Self {
        Self {
            timestamp_ms: now_ms(),
            tool: tool.into(),
            success,
            detail: None,
            duration_ms: duration.as_millis() as u64,
            args_summary: None,
            response_bytes: 0,
        }
    }

    pub fn detail(mut self, detail: Option<String>) -> Self {
        self.detail = detail;
        self
    }

    pub fn args_summary(mut self, args_summary: Option<String>) -> Self {
        self.args_summary = args_summary;
        self
    }

    pub fn response_bytes(mut self, response_bytes: usize) -> Self {
        self.response_bytes = response_bytes;
        self
    }
}

/// Ring buffer of the last [`ACTIVITY_CAPACITY`] entries with a changed
/// signal for UI consumers.
pub struct ActivityLog {
    entries: Mutex<VecDeque<ActivityEntry>>,
    changed: watch::Sender<u64>,
}

impl ActivityLog {
    pub fn new() -> Self {
        let (changed, _) = watch::channel(0);
        Self {
            entries: Mutex::new(VecDeque::with_capacity(ACTIVITY_CAPACITY)),
            changed,
        }
    }

    pub fn record(&self, entry: ActivityEntry) {
        {
            let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
            if entries.len() == ACTIVITY_CAPACITY {
                entries.pop_front();
            }
            entries.push_back(entry);
        }
        self.changed.send_modify(|n| *n += 1);
    }

    /// Snapshot, oldest first.
    pub fn entries(&self) -> Vec<ActivityEntry> {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .cloned()
            .collect()
    }

    /// The most recent `limit` entries, newest first.
    pub fn recent(&self, limit: usize) -> Vec<ActivityEntry> {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .rev()
            .take(limit)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Receiver bumped on every recorded entry.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.changed.subscribe()
    }
}

impl Default for ActivityLog {
    fn default() -> Self {
        Self::new()
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_and_snapshot() {
        let log = ActivityLog::new();
        assert!(log.is_empty());

        log.record(ActivityEntry::new("ping", true, Duration::from_millis(3)).response_bytes(42));
        assert_eq!(log.len(), 1);

        let entries = log.entries();
        assert_eq!(entries[0].tool, "ping");
        assert!(entries[0].success);
        assert_eq!(entries[0].response_bytes, 42);
    }

    #[test]
    fn test_ring_evicts_oldest() {
        let log = ActivityLog::new();
        for i in 0..ACTIVITY_CAPACITY + 5 {
            log.record(ActivityEntry::new(format!("tool-{}", i), true, Duration::ZERO));
        }

        assert_eq!(log.len(), ACTIVITY_CAPACITY);
        let entries = log.entries();
        assert_eq!(entries.first().unwrap().tool, "tool-5");
        assert_eq!(
            entries.last().unwrap().tool,
            format!("tool-{}", ACTIVITY_CAPACITY + 4)
        );
    }

    #[test]
    fn test_recent_is_newest_first() {
        let log = ActivityLog::new();
        for i in 0..5 {
            log.record(ActivityEntry::new(format!("tool-{}", i), true, Duration::ZERO));
        }

        let recent = log.recent(2);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].tool, "tool-4");
        assert_eq!(recent[1].tool, "tool-3");
    }

    #[test]
    fn test_changed_signal() {
        let log = ActivityLog::new();
        let rx = log.subscribe();
        assert_eq!(*rx.borrow(), 0);

        log.record(ActivityEntry::new("ping", true, Duration::ZERO));
        assert_eq!(*rx.borrow(), 1);
    }

    #[test]
    fn test_entry_serialization_skips_empty_options() {
        let entry = ActivityEntry::new("ping", true, Duration::from_millis(1));
        let json = serde_json::to_value(&entry).unwrap();
        assert!(json.get("detail").is_none());
        assert!(json.get("args_summary").is_none());
        assert_eq!(json["tool"], "ping");
    }
}
