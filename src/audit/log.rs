//! Append-only audit log: in-memory entries plus a best-effort local
//! JSONL sink, flushed to durable storage exactly once per drill.
//!
//! Each line is a self-contained JSON object assembled in memory and
//! written via `write_all`, so a tailing process never sees a partial
//! line. Local-sink failures degrade silently to memory-only; the
//! in-memory sequence is the source of truth for the archive flush.

#![allow(missing_docs)]

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::audit::archive::LogArchive;
use crate::core::errors::{FdhError, Result};
use crate::model::resource::{ResourceRef, ResourceState};
use crate::model::step::StepOutcome;

/// Severity level for audit events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

/// Audit event types matching the drill activity model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    DrillStart,
    StepStart,
    ActionRetry,
    VerifyPoll,
    VerifyTransientError,
    StepComplete,
    StepSkipped,
    DeadlineExceeded,
    RunAborted,
    DrillComplete,
    ArchiveUploaded,
    ArchiveError,
}

/// A single audit entry — all fields optional except `ts`, `event`,
/// `severity`, `message`. Never mutated after append.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    /// ISO 8601 UTC timestamp.
    pub ts: String,
    /// Event type identifier.
    pub event: EventKind,
    /// Severity level.
    pub severity: Severity,
    /// Human-readable message.
    pub message: String,
    /// Step the event belongs to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step_id: Option<String>,
    /// Resource involved.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource: Option<String>,
    /// Observed state at event time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<ResourceState>,
    /// Action attempt number (1-based) for retry events.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attempt: Option<u32>,
    /// FDH error code if the event records a failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    /// Full structured outcome, attached to `step_complete` events.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<StepOutcome>,
}

impl LogEntry {
    /// Create an entry stamped with the current UTC time.
    #[must_use]
    pub fn new(event: EventKind, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            ts: chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
            event,
            severity,
            message: message.into(),
            step_id: None,
            resource: None,
            state: None,
            attempt: None,
            error_code: None,
            outcome: None,
        }
    }

    /// Attach the step label.
    #[must_use]
    pub fn step(mut self, step_id: &str) -> Self {
        self.step_id = Some(step_id.to_string());
        self
    }

    /// Attach the resource involved.
    #[must_use]
    pub fn resource(mut self, resource: &ResourceRef) -> Self {
        self.resource = Some(resource.to_string());
        self
    }

    /// Attach the observed state.
    #[must_use]
    pub const fn state(mut self, state: ResourceState) -> Self {
        self.state = Some(state);
        self
    }

    /// Attach the attempt number.
    #[must_use]
    pub const fn attempt(mut self, attempt: u32) -> Self {
        self.attempt = Some(attempt);
        self
    }

    /// Attach an error code.
    #[must_use]
    pub fn error_code(mut self, code: &str) -> Self {
        self.error_code = Some(code.to_string());
        self
    }

    /// Attach the structured step outcome.
    #[must_use]
    pub fn outcome(mut self, outcome: &StepOutcome) -> Self {
        self.outcome = Some(outcome.clone());
        self
    }
}

/// Append-only audit log for one drill.
///
/// Single-writer by design: the orchestration core is strictly
/// sequential, so no internal synchronization is needed.
pub struct AuditLog {
    run: String,
    entries: Vec<LogEntry>,
    local: Option<BufWriter<File>>,
    flushed: bool,
}

impl AuditLog {
    /// In-memory-only log for the given run label.
    #[must_use]
    pub fn in_memory(run: impl Into<String>) -> Self {
        Self {
            run: run.into(),
            entries: Vec::new(),
            local: None,
            flushed: false,
        }
    }

    /// Log with a best-effort local JSONL sink. An unwritable path
    /// degrades to memory-only; a drill never fails because its local
    /// log file could not be opened.
    #[must_use]
    pub fn with_local_sink(run: impl Into<String>, path: &Path) -> Self {
        let mut log = Self::in_memory(run);
        log.local = open_append(path)
            .map(|file| BufWriter::with_capacity(16 * 1024, file))
            .ok();
        if log.local.is_none() {
            eprintln!(
                "[FDH-AUDIT] local log sink unavailable, continuing memory-only: {}",
                path.display()
            );
        }
        log
    }

    /// Append an entry. O(1); never touches durable storage.
    pub fn append(&mut self, entry: LogEntry) {
        if let Some(w) = self.local.as_mut() {
            // A line that cannot be encoded or written drops the sink
            // outright; a partial local mirror must never masquerade as
            // a complete one. The memory copy stays authoritative.
            let written = match serde_json::to_string(&entry) {
                Ok(json) => w.write_all(format!("{json}\n").as_bytes()).is_ok(),
                Err(_) => false,
            };
            if !written {
                self.local = None;
            }
        }
        self.entries.push(entry);
    }

    /// Entries in append order.
    #[must_use]
    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    /// Number of appended entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing has been appended yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether [`AuditLog::flush`] has run.
    #[must_use]
    pub const fn is_flushed(&self) -> bool {
        self.flushed
    }

    /// Serialize every entry, in append order, as JSONL and hand the
    /// bytes to the archive under `name`.
    ///
    /// Callable at most once per drill; a second call reports
    /// `[FDH-3101]`. The flushed flag is set before the store attempt
    /// so a failed upload is never silently retried by a later caller.
    pub fn flush(&mut self, archive: &dyn LogArchive, name: &str) -> Result<()> {
        if self.flushed {
            return Err(FdhError::LogAlreadyFlushed {
                run: self.run.clone(),
            });
        }
        self.flushed = true;

        if let Some(w) = self.local.as_mut() {
            let _ = w.flush();
        }

        let mut bytes = Vec::with_capacity(self.entries.len() * 128);
        for entry in &self.entries {
            let json = serde_json::to_string(entry)?;
            bytes.extend_from_slice(json.as_bytes());
            bytes.push(b'\n');
        }
        archive.store(name, &bytes)
    }
}

/// Open or create a file for appending, creating parent directories.
fn open_append(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| FdhError::io(parent, source))?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|source| FdhError::io(path, source))
}
