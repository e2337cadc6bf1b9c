/*!
 * Violation Audit Trail
 * Append-only, best-effort sink for sandbox violation records
 *
 * Every record becomes one line of the form
 * `YYYY-MM-DD HH:MM:SS,mmm - LEVEL - message` (UTC). Writing never fails
 * from the caller's point of view: sink errors are counted and dropped.
 */

use serde::{Deserialize, Serialize};
use serde_with::{serde_as, TimestampSeconds};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};
use time::macros::format_description;
use time::OffsetDateTime;
use tracing::{debug, error, info, warn};

/// Audit record severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditSeverity {
    Info,
    Warning,
    Critical,
}

impl AuditSeverity {
    /// Level name as written to the sink
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "INFO",
            Self::Warning => "WARNING",
            Self::Critical => "CRITICAL",
        }
    }
}

/// A single audit line
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    #[serde_as(as = "TimestampSeconds<i64>")]
    pub timestamp: SystemTime,
    pub level: AuditSeverity,
    pub message: String,
}

impl AuditRecord {
    pub fn new(level: AuditSeverity, message: impl Into<String>) -> Self {
        Self {
            timestamp: SystemTime::now(),
            level,
            message: message.into(),
        }
    }

    /// Render as `timestamp - LEVEL - message`, without a trailing newline
    pub fn render(&self) -> String {
        format!(
            "{} - {} - {}",
            format_timestamp(self.timestamp),
            self.level.as_str(),
            self.message
        )
    }
}

fn format_timestamp(timestamp: SystemTime) -> String {
    let format =
        format_description!("[year]-[month]-[day] [hour]:[minute]:[second],[subsecond digits:3]");
    OffsetDateTime::from(timestamp)
        .format(format)
        .unwrap_or_else(|_| {
            // Out-of-range instants still get a sortable stamp
            let secs = timestamp
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or(0);
            secs.to_string()
        })
}

/// Append-only violation logger
///
/// Each record opens the sink in append mode and writes the whole line with
/// a single call, so no lock is held between records and the deadline
/// watchdog can write while guest code is running.
pub struct ViolationLogger {
    sink: Option<PathBuf>,
    written: AtomicU64,
    failed: AtomicU64,
}

impl ViolationLogger {
    /// Logger appending to `path`, created on first write
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            sink: Some(path.into()),
            written: AtomicU64::new(0),
            failed: AtomicU64::new(0),
        }
    }

    /// Logger without a file sink; records only reach `tracing`
    pub fn disabled() -> Self {
        Self {
            sink: None,
            written: AtomicU64::new(0),
            failed: AtomicU64::new(0),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.sink.as_deref()
    }

    /// Record a violation
    ///
    /// Never fails and never panics, whatever happens to the sink.
    pub fn record(&self, level: AuditSeverity, message: impl Into<String>) {
        let record = AuditRecord::new(level, message);

        match record.level {
            AuditSeverity::Info => info!(target: "sandbox::audit", "{}", record.message),
            AuditSeverity::Warning => warn!(target: "sandbox::audit", "{}", record.message),
            AuditSeverity::Critical => error!(target: "sandbox::audit", "{}", record.message),
        }

        self.append(&record);
    }

    /// Write a record to the sink only; a failed write is reported at debug
    pub(crate) fn append(&self, record: &AuditRecord) {
        if let Err(e) = self.write(record) {
            debug!(path = ?self.sink, error = %e, "audit sink write failed");
        }
    }

    /// Write a record without touching the tracing subscriber at all
    ///
    /// Used on the termination path, where the subscriber's locks may be
    /// held by the thread being abandoned. Failures are only counted.
    pub(crate) fn append_quiet(&self, record: &AuditRecord) {
        let _ = self.write(record);
    }

    fn write(&self, record: &AuditRecord) -> std::io::Result<()> {
        let Some(path) = self.sink.as_deref() else {
            return Ok(());
        };

        let mut line = record.render();
        line.push('\n');

        let result = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .and_then(|mut file| file.write_all(line.as_bytes()));

        match result {
            Ok(()) => self.written.fetch_add(1, Ordering::Relaxed),
            Err(_) => self.failed.fetch_add(1, Ordering::Relaxed),
        };
        result
    }

    /// Records that reached the sink
    pub fn records_written(&self) -> u64 {
        self.written.load(Ordering::Relaxed)
    }

    /// Records dropped because the sink could not be written
    pub fn failed_writes(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    pub fn stats(&self) -> AuditStats {
        AuditStats {
            records_written: self.records_written(),
            failed_writes: self.failed_writes(),
        }
    }
}

/// Audit statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditStats {
    pub records_written: u64,
    pub failed_writes: u64,
}
