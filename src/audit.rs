//! Submission audit log.
//!
//! Append-only JSONL record of every invocation: one entry when the call
//! enters the pipeline, one when it reaches a terminal outcome. Write
//! failures are logged and swallowed; auditing never blocks a submission.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

/// Entry in the audit log.
#[derive(Debug, Serialize)]
struct AuditEntry<'a> {
    timestamp: DateTime<Utc>,
    invocation_id: Uuid,
    entry_type: &'static str,
    method: &'a str,
    args: &'a Value,
    hash: Option<&'a str>,
    status: &'a str,
    error: Option<&'a str>,
    duration_ms: u64,
}

struct AuditWriter {
    path: PathBuf,
}

impl AuditWriter {
    fn write(&self, entry: &AuditEntry<'_>) -> std::io::Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let json = serde_json::to_string(entry)?;
        writeln!(file, "{}", json)?;
        Ok(())
    }
}

/// Logs submissions to a JSONL file.
pub struct AuditLog {
    writer: Arc<Mutex<AuditWriter>>,
}

impl AuditLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            writer: Arc::new(Mutex::new(AuditWriter { path: path.into() })),
        }
    }

    /// Record that an invocation entered the pipeline. Returns the id to
    /// correlate the completion entry with.
    pub async fn submission_started(&self, method: &str, args: &Value) -> Uuid {
        let invocation_id = Uuid::new_v4();
        let entry = AuditEntry {
            timestamp: Utc::now(),
            invocation_id,
            entry_type: "submission_start",
            method,
            args,
            hash: None,
            status: "pending",
            error: None,
            duration_ms: 0,
        };
        self.append(&entry).await;
        invocation_id
    }

    /// Record the terminal outcome of an invocation.
    #[allow(clippy::too_many_arguments)]
    pub async fn submission_completed(
        &self,
        invocation_id: Uuid,
        method: &str,
        args: &Value,
        hash: Option<&str>,
        status: &str,
        error: Option<&str>,
        duration_ms: u64,
    ) {
        let entry = AuditEntry {
            timestamp: Utc::now(),
            invocation_id,
            entry_type: "submission_complete",
            method,
            args,
            hash,
            status,
            error,
            duration_ms,
        };
        self.append(&entry).await;
    }

    async fn append(&self, entry: &AuditEntry<'_>) {
        let writer = self.writer.lock().await;
        if let Err(e) = writer.write(entry) {
            tracing::warn!(error = %e, "Failed to write audit log entry");
        }
    }
}
