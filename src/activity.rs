use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::VecDeque;
use tokio::sync::{broadcast, RwLock};

use crate::config::ACTIVITY_BUFFER_SIZE;

#[derive(Debug, Clone, Serialize)]
pub struct ActivityEntry {
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_id: Option<String>,
    pub level: ActivityLevel,
    pub message: String,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum ActivityLevel {
    Info,
    Warn,
    Error,
}

/// Ring buffer of orchestrator events with live fan-out to subscribers.
pub struct ActivityLog {
    buffer: RwLock<VecDeque<ActivityEntry>>,
    capacity: usize,
    sender: broadcast::Sender<ActivityEntry>,
}

impl ActivityLog {
    pub fn new() -> Self {
        Self::with_capacity(ACTIVITY_BUFFER_SIZE)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(256);
        Self {
            buffer: RwLock::new(VecDeque::with_capacity(capacity)),
            capacity,
            sender,
        }
    }

    pub async fn push(&self, entry: ActivityEntry) {
        let mut buf = self.buffer.write().await;
        if buf.len() >= self.capacity {
            buf.pop_front();
        }
        buf.push_back(entry.clone());
        drop(buf);

        let _ = self.sender.send(entry);
    }

    /// Oldest-first copy of the buffered entries.
    pub async fn history(&self) -> Vec<ActivityEntry> {
        self.buffer.read().await.iter().cloned().collect()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ActivityEntry> {
        self.sender.subscribe()
    }

    pub async fn emit(
        &self,
        run_id: Option<&str>,
        level: ActivityLevel,
        message: impl Into<String>,
    ) {
        let entry = ActivityEntry {
            timestamp: Utc::now(),
            run_id: run_id.map(str::to_string),
            level,
            message: message.into(),
        };
        self.push(entry).await;
    }
}

impl Default for ActivityLog {
    fn default() -> Self {
        Self::new()
    }
}
