//! Logger trait and implementations.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

/// The logging collaborator injected into branches and operations.
///
/// Every operation logs its stack and call shape through this trait, and
/// every user failure is logged before it propagates.
#[cfg_attr(test, mockall::automock)]
pub trait FlowLogger: Send + Sync {
    /// Logs an informational message.
    fn info(&self, message: &str);

    /// Logs an error message.
    fn error(&self, message: &str);
}

/// Renders a user error with its context and cause chain.
pub fn format_error(context: &str, error: &anyhow::Error) -> String {
    let mut message = format!("{context}\n{error}");
    for cause in error.chain().skip(1) {
        message.push_str("\nCaused by: ");
        message.push_str(&cause.to_string());
    }
    message
}

/// A logger that emits through the tracing framework.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl FlowLogger for TracingLogger {
    fn info(&self, message: &str) {
        info!(target: "branchflow", "{message}");
    }

    fn error(&self, message: &str) {
        error!(target: "branchflow", "{message}");
    }
}

/// A logger that discards all messages.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpLogger;

impl FlowLogger for NoOpLogger {
    fn info(&self, _message: &str) {}

    fn error(&self, _message: &str) {}
}

/// Severity of a collected record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogLevel {
    /// Informational.
    Info,
    /// Error.
    Error,
}

/// A collected log line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogRecord {
    /// Severity.
    pub level: LogLevel,
    /// Message text.
    pub message: String,
    /// When the record was written.
    pub at: DateTime<Utc>,
}

/// A logger that keeps every record in memory, for tests.
#[derive(Debug, Default)]
pub struct CollectingLogger {
    records: Mutex<Vec<LogRecord>>,
}

impl CollectingLogger {
    /// Creates an empty collector.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, level: LogLevel, message: &str) {
        self.records.lock().push(LogRecord {
            level,
            message: message.to_string(),
            at: Utc::now(),
        });
    }

    /// Returns a copy of all records.
    #[must_use]
    pub fn records(&self) -> Vec<LogRecord> {
        self.records.lock().clone()
    }

    /// Returns the messages of one level.
    #[must_use]
    pub fn messages(&self, level: LogLevel) -> Vec<String> {
        self.records
            .lock()
            .iter()
            .filter(|r| r.level == level)
            .map(|r| r.message.clone())
            .collect()
    }

    /// Whether any message contains `needle`.
    #[must_use]
    pub fn contains(&self, needle: &str) -> bool {
        self.records.lock().iter().any(|r| r.message.contains(needle))
    }

    /// Returns the number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    /// Returns true if nothing was logged.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    /// Removes all records.
    pub fn clear(&self) {
        self.records.lock().clear();
    }
}

impl FlowLogger for CollectingLogger {
    fn info(&self, message: &str) {
        self.push(LogLevel::Info, message);
    }

    fn error(&self, message: &str) {
        self.push(LogLevel::Error, message);
    }
}
