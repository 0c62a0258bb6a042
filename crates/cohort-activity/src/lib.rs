//! Activity logging abstraction for cohort.
//!
//! This crate defines the `ActivityLog` trait that group workflows and repository
//! provisioning write their diagnostics to, plus two implementations:
//! - [`TracingActivityLog`] forwards entries to `tracing`
//! - [`MemoryActivityLog`] keeps entries in memory for inspection

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use thiserror::Error;
use uuid::Uuid;

/// Unique identifier for a log entry
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LogEntryId(pub Uuid);

impl LogEntryId {
    /// Generate a new entry ID using UUID v7 (time-ordered)
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for LogEntryId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for LogEntryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Severity of a log entry
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Error,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Severity::Info => "info",
            Severity::Error => "error",
        };
        write!(f, "{}", s)
    }
}

/// A single activity log entry.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: LogEntryId,
    pub timestamp: DateTime<Utc>,
    pub severity: Severity,
    pub message: String,
    /// Entity snapshots, error messages and other structured context
    pub details: Option<serde_json::Value>,
}

impl LogEntry {
    pub fn info(message: impl Into<String>) -> LogEntryBuilder {
        LogEntryBuilder::new(Severity::Info, message)
    }

    pub fn error(message: impl Into<String>) -> LogEntryBuilder {
        LogEntryBuilder::new(Severity::Error, message)
    }
}

/// Builder for constructing log entries
pub struct LogEntryBuilder {
    severity: Severity,
    message: String,
    details: serde_json::Map<String, serde_json::Value>,
}

impl LogEntryBuilder {
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
            details: serde_json::Map::new(),
        }
    }

    /// Attach a structured value under `key`. Values that fail to serialize are recorded
    /// as their error message instead.
    pub fn detail<T: Serialize>(mut self, key: &str, value: &T) -> Self {
        let value = serde_json::to_value(value)
            .unwrap_or_else(|e| serde_json::Value::String(format!("<unserializable: {}>", e)));
        self.details.insert(key.to_string(), value);
        self
    }

    pub fn build(self) -> LogEntry {
        LogEntry {
            id: LogEntryId::new(),
            timestamp: Utc::now(),
            severity: self.severity,
            message: self.message,
            details: if self.details.is_empty() {
                None
            } else {
                Some(serde_json::Value::Object(self.details))
            },
        }
    }
}

/// Error type for activity log operations
#[derive(Debug, Error)]
pub enum ActivityLogError {
    #[error("log backend error: {0}")]
    Backend(String),
}

/// Sink for activity log entries.
///
/// Failures to record entries should be logged but should not
/// fail the main operation.
#[async_trait]
pub trait ActivityLog: Send + Sync {
    async fn record(&self, entry: LogEntry) -> Result<(), ActivityLogError>;
}

/// Record an entry, downgrading a sink failure to a `tracing` warning.
pub async fn record_or_warn(log: &dyn ActivityLog, entry: LogEntry) {
    let id = entry.id;
    if let Err(e) = log.record(entry).await {
        tracing::warn!(%id, error = %e, "Failed to record activity log entry");
    }
}

/// Forwards every entry to `tracing` at the matching level.
#[derive(Clone, Debug, Default)]
pub struct TracingActivityLog;

impl TracingActivityLog {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ActivityLog for TracingActivityLog {
    async fn record(&self, entry: LogEntry) -> Result<(), ActivityLogError> {
        let details = entry
            .details
            .as_ref()
            .map(|d| d.to_string())
            .unwrap_or_default();
        match entry.severity {
            Severity::Info => tracing::info!(id = %entry.id, %details, "{}", entry.message),
            Severity::Error => tracing::error!(id = %entry.id, %details, "{}", entry.message),
        }
        Ok(())
    }
}

/// Keeps entries in memory, oldest first.
#[derive(Debug, Default)]
pub struct MemoryActivityLog {
    entries: Mutex<Vec<LogEntry>>,
}

impl MemoryActivityLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything recorded so far.
    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries
            .lock()
            .map(|entries| entries.clone())
            .unwrap_or_default()
    }

    /// Entries with the given severity.
    pub fn with_severity(&self, severity: Severity) -> Vec<LogEntry> {
        self.entries()
            .into_iter()
            .filter(|e| e.severity == severity)
            .collect()
    }
}

#[async_trait]
impl ActivityLog for MemoryActivityLog {
    async fn record(&self, entry: LogEntry) -> Result<(), ActivityLogError> {
        self.entries
            .lock()
            .map_err(|e| ActivityLogError::Backend(e.to_string()))?
            .push(entry);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn builder_collects_details() {
        let entry = LogEntry::error("collision")
            .detail("group", &"group_0001")
            .detail("attempt", &2)
            .build();

        assert_eq!(entry.severity, Severity::Error);
        assert_eq!(entry.message, "collision");
        assert_eq!(
            entry.details,
            Some(json!({ "group": "group_0001", "attempt": 2 }))
        );
    }

    #[test]
    fn builder_without_details_has_none() {
        let entry = LogEntry::info("created").build();
        assert!(entry.details.is_none());
    }

    #[test]
    fn entry_ids_are_unique() {
        assert_ne!(LogEntryId::new(), LogEntryId::new());
    }

    #[test]
    fn severity_display() {
        assert_eq!(Severity::Info.to_string(), "info");
        assert_eq!(Severity::Error.to_string(), "error");
    }

    #[tokio::test]
    async fn memory_log_records_in_order() {
        let log = MemoryActivityLog::new();
        log.record(LogEntry::info("first").build()).await.unwrap();
        log.record(LogEntry::error("second").build()).await.unwrap();

        let entries = log.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].message, "first");
        assert_eq!(entries[1].message, "second");
        assert_eq!(log.with_severity(Severity::Error).len(), 1);
    }

    #[tokio::test]
    async fn tracing_log_never_fails() {
        let log = TracingActivityLog::new();
        assert!(log
            .record(LogEntry::error("boom").detail("k", &"v").build())
            .await
            .is_ok());
    }

    struct BrokenLog;

    #[async_trait]
    impl ActivityLog for BrokenLog {
        async fn record(&self, _entry: LogEntry) -> Result<(), ActivityLogError> {
            Err(ActivityLogError::Backend("sink offline".to_string()))
        }
    }

    #[tokio::test]
    async fn record_or_warn_swallows_sink_failures() {
        record_or_warn(&BrokenLog, LogEntry::info("ignored").build()).await;
    }
}
