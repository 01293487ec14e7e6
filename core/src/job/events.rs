use std::sync::Mutex;

use chrono::{DateTime, Local};
use log::{info, warn};
use serde::Serialize;
use tokio::sync::mpsc::UnboundedSender;

use super::RunState;
use crate::time::format_clock;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkErrorEntry {
    pub chunk_index: usize,
    pub message: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

/// Progress notification emitted by the orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressEvent {
    pub run_id: String,
    pub status: RunState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress_pct: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub translated_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chunk_index: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cancel_requested: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ChunkErrorEntry>,
}

impl ProgressEvent {
    pub fn new(run_id: &str, status: RunState) -> Self {
        Self {
            run_id: run_id.to_string(),
            status,
            progress_pct: None,
            translated_count: None,
            total_count: None,
            chunk_index: None,
            cancel_requested: None,
            log: None,
            error: None,
        }
    }

    pub fn with_progress(mut self, done: usize, total: usize) -> Self {
        self.progress_pct = Some(percentage(done, total));
        self.translated_count = Some(done as u32);
        self.total_count = Some(total as u32);
        self
    }

    pub fn with_chunk(mut self, index: usize) -> Self {
        self.chunk_index = Some(index);
        self
    }

    pub fn with_log(mut self, message: impl Into<String>) -> Self {
        self.log = Some(message.into());
        self
    }

    pub fn with_error(mut self, error: ChunkErrorEntry) -> Self {
        self.error = Some(error);
        self
    }

    pub fn cancel_requested(mut self) -> Self {
        self.cancel_requested = Some(true);
        self
    }
}

pub fn percentage(done: usize, total: usize) -> f32 {
    if total == 0 {
        return 0.0;
    }
    ((done as f32) / (total as f32) * 100.0).clamp(0.0, 100.0)
}

/// Receives orchestrator events. Implementations must not block.
pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: &ProgressEvent);
}

/// Forwards event log lines to the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl ProgressSink for LogSink {
    fn emit(&self, event: &ProgressEvent) {
        if let Some(error) = &event.error {
            warn!(
                "[{}] chunk {} failed ({}): {}",
                event.run_id,
                error.chunk_index + 1,
                error.code,
                error.message
            );
        } else if let Some(message) = &event.log {
            info!("[{}] {}", event.run_id, message);
        }
    }
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl ProgressSink for NullSink {
    fn emit(&self, _event: &ProgressEvent) {}
}

/// Pushes events into a tokio channel for a UI task to consume.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: UnboundedSender<ProgressEvent>,
}

impl ChannelSink {
    pub fn new(tx: UnboundedSender<ProgressEvent>) -> Self {
        Self { tx }
    }
}

impl ProgressSink for ChannelSink {
    fn emit(&self, event: &ProgressEvent) {
        if let Err(error) = self.tx.send(event.clone()) {
            warn!("failed to emit translation progress: {}", error);
        }
    }
}

/// Sends every event to two sinks.
pub struct Tee<'a> {
    first: &'a dyn ProgressSink,
    second: &'a dyn ProgressSink,
}

impl<'a> Tee<'a> {
    pub fn new(first: &'a dyn ProgressSink, second: &'a dyn ProgressSink) -> Self {
        Self { first, second }
    }
}

impl ProgressSink for Tee<'_> {
    fn emit(&self, event: &ProgressEvent) {
        self.first.emit(event);
        self.second.emit(event);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub timestamp: DateTime<Local>,
    pub message: String,
}

impl LogEntry {
    pub fn render(&self) -> String {
        format!("[{}] {}", format_clock(&self.timestamp), self.message)
    }
}

/// Append-only activity log shown next to the preview.
#[derive(Debug, Default)]
pub struct ActivityLog {
    entries: Mutex<Vec<LogEntry>>,
}

impl ActivityLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, message: impl Into<String>) {
        let entry = LogEntry {
            timestamp: Local::now(),
            message: message.into(),
        };
        if let Ok(mut guard) = self.entries.lock() {
            guard.push(entry);
        }
    }

    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    pub fn messages(&self) -> Vec<String> {
        self.entries()
            .into_iter()
            .map(|entry| entry.message)
            .collect()
    }

    pub fn render(&self) -> String {
        self.entries()
            .iter()
            .map(|entry| format!("{}\n", entry.render()))
            .collect()
    }

    pub fn clear(&self) {
        if let Ok(mut guard) = self.entries.lock() {
            guard.clear();
        }
    }
}

impl ProgressSink for ActivityLog {
    fn emit(&self, event: &ProgressEvent) {
        if let Some(message) = &event.log {
            self.push(message.clone());
        }
    }
}
