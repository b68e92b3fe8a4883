use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::Utc;

use super::OutputSink;

pub const DEFAULT_MAX_LOG_SIZE: u64 = 10 * 1024 * 1024; // 10MB

/// Appends git output to a log file, rotating it once it grows too large
pub struct AuditLogger {
    log_path: PathBuf,
    max_size: u64,
    write_lock: Mutex<()>,
}

impl AuditLogger {
    /// Create a new AuditLogger with the default log path
    pub fn new() -> std::io::Result<Self> {
        Self::with_path(Self::default_log_path()?)
    }

    /// Create an AuditLogger with a custom log path
    pub fn with_path<P: AsRef<Path>>(path: P) -> std::io::Result<Self> {
        let log_path = path.as_ref().to_path_buf();

        // Ensure directory exists
        if let Some(parent) = log_path.parent() {
            fs::create_dir_all(parent)?;
        }

        Ok(Self {
            log_path,
            max_size: DEFAULT_MAX_LOG_SIZE,
            write_lock: Mutex::new(()),
        })
    }

    pub fn with_max_size(mut self, max_size: u64) -> Self {
        self.max_size = max_size;
        self
    }

    /// Get the default log path: ~/.config/gitbridge/output.log
    pub fn default_log_path() -> std::io::Result<PathBuf> {
        let home = std::env::var("HOME").map_err(|_| {
            std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "HOME environment variable not set",
            )
        })?;

        Ok(PathBuf::from(home)
            .join(".config")
            .join("gitbridge")
            .join("output.log"))
    }

    /// Append one timestamped entry per line of `output`
    pub fn append(&self, output: &str) -> std::io::Result<()> {
        let _guard = match self.write_lock.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        self.rotate_if_needed()?;

        let timestamp = Utc::now().to_rfc3339();
        let mut entry = String::new();
        for line in output.lines().filter(|line| !line.is_empty()) {
            entry.push_str(&format!("[{}] {}\n", timestamp, line));
        }
        if entry.is_empty() {
            return Ok(());
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_path)?;

        file.write_all(entry.as_bytes())?;
        file.flush()?;

        Ok(())
    }

    /// Rotate log file if it exceeds the size limit
    fn rotate_if_needed(&self) -> std::io::Result<()> {
        if !self.log_path.exists() {
            return Ok(());
        }

        let metadata = fs::metadata(&self.log_path)?;
        if metadata.len() > self.max_size {
            // Rotate: output.log -> output.log.1
            let backup_path = self.log_path.with_extension("log.1");
            fs::rename(&self.log_path, backup_path)?;
        }

        Ok(())
    }

    /// Get the path to the log file
    pub fn log_path(&self) -> &Path {
        &self.log_path
    }
}

impl OutputSink for AuditLogger {
    fn log(&self, output: &str) {
        if let Err(err) = self.append(output) {
            tracing::warn!(path = %self.log_path.display(), "failed to write git output log: {}", err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tempfile::TempDir;

    #[test]
    fn test_create_logger() {
        let temp_dir = TempDir::new().unwrap();
        let log_path = temp_dir.path().join("nested").join("test.log");

        let logger = AuditLogger::with_path(&log_path).unwrap();
        assert_eq!(logger.log_path(), log_path);
        assert!(log_path.parent().unwrap().exists());
    }

    #[test]
    fn test_log_command_line() {
        let temp_dir = TempDir::new().unwrap();
        let log_path = temp_dir.path().join("test.log");

        let logger = AuditLogger::with_path(&log_path).unwrap();
        logger.log("> git status -z -u\n");

        let content = fs::read_to_string(&log_path).unwrap();
        assert!(content.contains("> git status -z -u"));
        assert!(content.starts_with('['));
    }

    #[test]
    fn test_multiline_output_is_split() {
        let temp_dir = TempDir::new().unwrap();
        let log_path = temp_dir.path().join("test.log");

        let logger = AuditLogger::with_path(&log_path).unwrap();
        logger.log("hint: one\nhint: two\n\n");

        let content = fs::read_to_string(&log_path).unwrap();
        assert_eq!(content.lines().count(), 2);
    }

    #[test]
    fn test_log_rotation() {
        let temp_dir = TempDir::new().unwrap();
        let log_path = temp_dir.path().join("test.log");

        let logger = AuditLogger::with_path(&log_path).unwrap().with_max_size(64);
        logger.log(&format!("> git {}\n", "x".repeat(128)));
        logger.log("> git status\n");

        let backup_path = log_path.with_extension("log.1");
        assert!(backup_path.exists());

        let content = fs::read_to_string(&log_path).unwrap();
        assert!(content.contains("> git status"));
        assert!(!content.contains("xxxx"));
    }

    #[test]
    fn test_concurrent_writes_keep_every_line() {
        let temp_dir = TempDir::new().unwrap();
        let log_path = temp_dir.path().join("test.log");
        let logger = Arc::new(AuditLogger::with_path(&log_path).unwrap());

        let handles: Vec<_> = (0..4)
            .map(|i| {
                let logger = Arc::clone(&logger);
                std::thread::spawn(move || {
                    for j in 0..25 {
                        logger.log(&format!("> git show {}-{}\n", i, j));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let content = fs::read_to_string(&log_path).unwrap();
        assert_eq!(content.lines().count(), 100);
    }
}
