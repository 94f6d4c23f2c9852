use std::{
    backtrace::Backtrace,
    error::Error,
    fmt,
    sync::{Arc, Mutex},
};

use tracing::{debug, error, info, warn};

/// Severity attached to a store log record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warning => "warning",
            LogLevel::Error => "error",
        };
        f.write_str(label)
    }
}

/// Sink for the warnings and errors the store swallows (corrupt entries,
/// ambiguous keys). Never required for correctness.
pub trait StoreLogger: Send + Sync {
    fn log(
        &self,
        level: LogLevel,
        message: &str,
        error: Option<&(dyn Error + 'static)>,
        trace: Option<&Backtrace>,
    );
}

/// Shared handle type used by the adapter and keyed store.
pub type SharedLogger = Arc<dyn StoreLogger>;

/// Forwards records to `tracing` so they reach the process subscriber.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogger;

impl StoreLogger for TracingLogger {
    fn log(
        &self,
        level: LogLevel,
        message: &str,
        error: Option<&(dyn Error + 'static)>,
        _trace: Option<&Backtrace>,
    ) {
        let rendered = error.map(|e| e.to_string());
        let error = rendered.as_deref();
        match level {
            LogLevel::Debug => debug!(error, "{message}"),
            LogLevel::Info => info!(error, "{message}"),
            LogLevel::Warning => warn!(error, "{message}"),
            LogLevel::Error => error!(error, "{message}"),
        }
    }
}

/// A captured log record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    pub level: LogLevel,
    pub message: String,
    /// Rendered error, if one was attached.
    pub error: Option<String>,
}

/// Logger that keeps records in memory; handy for tests and diagnostics.
#[derive(Debug, Default, Clone)]
pub struct MemoryLogger {
    records: Arc<Mutex<Vec<LogRecord>>>,
}

impl MemoryLogger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything logged so far.
    pub fn records(&self) -> Vec<LogRecord> {
        self.records
            .lock()
            .map(|records| records.clone())
            .unwrap_or_default()
    }

    /// Records at exactly the given level.
    pub fn at_level(&self, level: LogLevel) -> Vec<LogRecord> {
        self.records()
            .into_iter()
            .filter(|record| record.level == level)
            .collect()
    }
}

impl StoreLogger for MemoryLogger {
    fn log(
        &self,
        level: LogLevel,
        message: &str,
        error: Option<&(dyn Error + 'static)>,
        _trace: Option<&Backtrace>,
    ) {
        if let Ok(mut records) = self.records.lock() {
            records.push(LogRecord {
                level,
                message: message.to_string(),
                error: error.map(|e| e.to_string()),
            });
        }
    }
}
