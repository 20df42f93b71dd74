//! # Audit Sinks
//!
//! Destinations for [`AuditEvent`]s. Sinks are shared across request
//! handlers, so every implementation is `Send + Sync` and serialises its
//! own writes.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use thiserror::Error;

use crate::event::{AuditEvent, AuditStatus};

/// Failure to record an audit event.
#[derive(Error, Debug)]
pub enum AuditError {
    /// The event could not be serialized.
    #[error("audit serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The underlying file could not be written.
    #[error("audit io error: {0}")]
    Io(#[from] std::io::Error),
}

/// An append-only destination for audit events.
pub trait AuditSink: Send + Sync {
    /// Append one event.
    fn record(&self, event: &AuditEvent) -> Result<(), AuditError>;
}

// ---------------------------------------------------------------------------
// JsonlAuditSink
// ---------------------------------------------------------------------------

/// Appends events to a JSON-lines file.
///
/// The file and its parent directories are created on first write. Each
/// event is written as a single line under a mutex, so concurrent callers
/// never interleave partial lines.
#[derive(Debug)]
pub struct JsonlAuditSink {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonlAuditSink {
    /// Create a sink writing to `path`. Nothing is touched until the first
    /// event is recorded.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// The log file path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AuditSink for JsonlAuditSink {
    fn record(&self, event: &AuditEvent) -> Result<(), AuditError> {
        let mut line = serde_json::to_string(event)?;
        line.push('\n');

        let _guard = self.write_lock.lock();
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(line.as_bytes())?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// MemoryAuditSink
// ---------------------------------------------------------------------------

/// A bounded in-memory audit trail.
///
/// When the trail exceeds its capacity, the oldest 10% of entries are
/// dropped.
#[derive(Debug)]
pub struct MemoryAuditSink {
    entries: Mutex<Vec<AuditEvent>>,
    max_entries: usize,
}

impl MemoryAuditSink {
    /// Default capacity.
    pub const DEFAULT_CAPACITY: usize = 10_000;

    /// Create a trail with the default capacity.
    pub fn new() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }

    /// Create a trail holding at most `max_entries` events.
    pub fn with_capacity(max_entries: usize) -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            max_entries: max_entries.max(1),
        }
    }

    /// Snapshot of all retained events, oldest first.
    pub fn entries(&self) -> Vec<AuditEvent> {
        self.entries.lock().clone()
    }

    /// Number of retained events.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether no events are retained.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Retained events with the given status.
    pub fn entries_by_status(&self, status: AuditStatus) -> Vec<AuditEvent> {
        self.entries
            .lock()
            .iter()
            .filter(|e| e.status == status)
            .cloned()
            .collect()
    }

    /// Retained events for the given entity.
    pub fn entries_for_entity(&self, entity: &str) -> Vec<AuditEvent> {
        self.entries
            .lock()
            .iter()
            .filter(|e| e.entity == entity)
            .cloned()
            .collect()
    }
}

impl Default for MemoryAuditSink {
    fn default() -> Self {
        Self::new()
    }
}

impl AuditSink for MemoryAuditSink {
    fn record(&self, event: &AuditEvent) -> Result<(), AuditError> {
        let mut entries = self.entries.lock();
        entries.push(event.clone());
        if entries.len() > self.max_entries {
            let trim_count = (self.max_entries / 10).max(1);
            entries.drain(..trim_count);
            tracing::debug!(dropped = trim_count, "in-memory audit trail trimmed");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::VALIDATE_ENTITY_ACTION;

    fn event(entity: &str, status: AuditStatus) -> AuditEvent {
        AuditEvent::new(
            "validator",
            "tester",
            VALIDATE_ENTITY_ACTION,
            entity,
            status,
            "00".repeat(32),
        )
    }

    #[test]
    fn test_jsonl_sink_creates_directories_and_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("output/logs/ontology_audit.jsonl");
        let sink = JsonlAuditSink::new(&path);

        sink.record(&event("Patient", AuditStatus::Success)).unwrap();
        sink.record(&event("Claim", AuditStatus::FailedValidation))
            .unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);

        let first: AuditEvent = serde_json::from_str(lines[0]).unwrap();
        let second: AuditEvent = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(first.entity, "Patient");
        assert_eq!(second.status, AuditStatus::FailedValidation);
    }

    #[test]
    fn test_jsonl_sink_concurrent_writes_keep_lines_whole() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.jsonl");
        let sink = std::sync::Arc::new(JsonlAuditSink::new(&path));

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let sink = std::sync::Arc::clone(&sink);
                std::thread::spawn(move || {
                    for _ in 0..10 {
                        sink.record(&event(&format!("E{i}"), AuditStatus::Success))
                            .unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let content = std::fs::read_to_string(&path).unwrap();
        let parsed: Vec<AuditEvent> = content
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(parsed.len(), 80);
    }

    #[test]
    fn test_memory_sink_filters() {
        let sink = MemoryAuditSink::new();
        sink.record(&event("Patient", AuditStatus::Success)).unwrap();
        sink.record(&event("Patient", AuditStatus::Error)).unwrap();
        sink.record(&event("Claim", AuditStatus::Error)).unwrap();

        assert_eq!(sink.len(), 3);
        assert_eq!(sink.entries_by_status(AuditStatus::Error).len(), 2);
        assert_eq!(sink.entries_for_entity("Patient").len(), 2);
    }

    #[test]
    fn test_memory_sink_trims_oldest() {
        let sink = MemoryAuditSink::with_capacity(10);
        for i in 0..11 {
            sink.record(&event(&format!("E{i}"), AuditStatus::Success))
                .unwrap();
        }
        // 11 > 10 → drop the oldest 1 (10% of 10).
        let entries = sink.entries();
        assert_eq!(entries.len(), 10);
        assert_eq!(entries[0].entity, "E1");
    }
}
