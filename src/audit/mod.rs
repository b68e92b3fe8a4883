//! Diagnostic sinks for git command output.
//!
//! A single sink is handed to [`crate::git::Git`] at construction and shared
//! by every invocation it runs, so implementations must tolerate concurrent
//! fire-and-forget writes.

pub mod logger;

use std::sync::Mutex;

pub use logger::AuditLogger;

/// Receives invoked command lines and non-empty stderr
pub trait OutputSink: Send + Sync {
    fn log(&self, output: &str);
}

/// Discards everything
#[derive(Debug, Default)]
pub struct NullSink;

impl OutputSink for NullSink {
    fn log(&self, _output: &str) {}
}

/// Forwards output to `tracing` at debug level
#[derive(Debug, Default)]
pub struct TracingSink;

impl OutputSink for TracingSink {
    fn log(&self, output: &str) {
        tracing::debug!(target: "gitbridge::output", "{}", output.trim_end());
    }
}

/// Keeps every line in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    lines: Mutex<Vec<String>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        match self.lines.lock() {
            Ok(lines) => lines.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Command lines logged so far, without the `> git ` prefix
    pub fn commands(&self) -> Vec<String> {
        self.lines()
            .iter()
            .filter_map(|line| line.strip_prefix("> git "))
            .map(|line| line.trim_end().to_string())
            .collect()
    }

    pub fn clear(&self) {
        match self.lines.lock() {
            Ok(mut lines) => lines.clear(),
            Err(poisoned) => poisoned.into_inner().clear(),
        }
    }
}

impl OutputSink for MemorySink {
    fn log(&self, output: &str) {
        match self.lines.lock() {
            Ok(mut lines) => lines.push(output.to_string()),
            Err(poisoned) => poisoned.into_inner().push(output.to_string()),
        }
    }
}
