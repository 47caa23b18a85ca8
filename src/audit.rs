//! Audit Emitter for mediated operations.
//!
//! Every mediated call that gets past identity validation produces exactly
//! one [`AuditRecord`]. Sinks are pure side effects: a failing sink is
//! logged and never changes the answer already decided.

use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use crate::types::{Answer, EscalationStatus, Pid};
use crate::vs::VsDenial;

/// What the mediated operation targeted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuditTarget {
    /// A path reached through a mount (chroot).
    Path {
        /// Mount-aware name of the path.
        path: String,
    },
    /// A bare dentry (readlink).
    Dentry {
        /// Dentry name.
        name: String,
    },
}

/// A single audit record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditRecord {
    /// When the record was produced.
    pub timestamp: DateTime<Utc>,
    /// Access type name ("chroot", "readlink").
    pub function: &'static str,
    /// Pid of the calling task.
    pub pid: Pid,
    /// Object of the operation.
    pub target: AuditTarget,
    /// Final answer; absent when the authority failed.
    pub answer: Option<Answer>,
    /// How the answer was reached.
    pub status: EscalationStatus,
    /// Label sets that failed intersection, on a fast-path deny only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vs: Option<VsDenial>,
    /// Authority failure, when the decision could not be obtained.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Destination of audit records.
pub trait AuditSink: Send + Sync {
    /// Record one mediated operation.
    ///
    /// # Errors
    ///
    /// Returns an error if the record could not be written.
    fn emit(&self, record: &AuditRecord) -> anyhow::Result<()>;
}

/// Audit logger writing one JSON object per line to an append-only sink.
pub struct AuditLogger {
    writer: Mutex<Box<dyn Write + Send>>,
}

impl AuditLogger {
    /// Create an audit logger that appends to the given file path.
    pub fn new(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path.as_ref())?;
        Ok(Self {
            writer: Mutex::new(Box::new(file)),
        })
    }

    /// Create an audit logger from an arbitrary writer (for testing).
    pub fn from_writer(writer: Box<dyn Write + Send>) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }
}

impl AuditSink for AuditLogger {
    fn emit(&self, record: &AuditRecord) -> anyhow::Result<()> {
        let line = serde_json::to_string(record)?;
        let mut writer = self
            .writer
            .lock()
            .map_err(|e| anyhow::anyhow!("audit lock poisoned: {e}"))?;
        writeln!(writer, "{line}")?;
        writer.flush()?;
        Ok(())
    }
}

/// Sink emitting records as `tracing` events on the `medusa::audit` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn emit(&self, record: &AuditRecord) -> anyhow::Result<()> {
        let vs = record.vs.map(|d| format!("vst={:?} vss={:?} vsw={:?}", d.vst, d.vss, d.vsw));
        info!(
            target: "medusa::audit",
            function = record.function,
            pid = record.pid,
            target_object = ?record.target,
            answer = ?record.answer,
            status = ?record.status,
            vs = vs.as_deref(),
            error = record.error.as_deref(),
            "mediated"
        );
        Ok(())
    }
}

/// Sink keeping records in memory.
#[derive(Debug, Default)]
pub struct MemoryAuditSink {
    records: Mutex<Vec<AuditRecord>>,
}

impl MemoryAuditSink {
    /// Empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of every record emitted so far.
    pub fn records(&self) -> Vec<AuditRecord> {
        self.records
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    /// Number of records emitted so far.
    pub fn len(&self) -> usize {
        self.records
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .len()
    }

    /// Whether nothing was emitted.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl AuditSink for MemoryAuditSink {
    fn emit(&self, record: &AuditRecord) -> anyhow::Result<()> {
        self.records
            .lock()
            .map_err(|e| anyhow::anyhow!("audit lock poisoned: {e}"))?
            .push(record.clone());
        Ok(())
    }
}
