//! Plugin activity log
//!
//! A plain-text, append-only file recording mutations, triggers and host
//! failures, one line each: `<timestamp> [<level>] <message>`.

use std::fmt;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{SecondsFormat, Utc};
use tracing::warn;

/// Default file name, relative to the host configuration directory
pub const DEFAULT_LOG_FILE: &str = "automation_api.log";

/// Severity of a log line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Warning,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LogLevel::Info => "info",
            LogLevel::Warning => "warning",
            LogLevel::Error => "error",
        })
    }
}

/// Append-only activity log file
#[derive(Debug, Clone)]
pub struct ActivityLog {
    path: PathBuf,
}

impl ActivityLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append a line; failures are reported through tracing only
    pub async fn append(&self, level: LogLevel, message: impl Into<String>) {
        let line = format_line(level, &message.into());
        let path = self.path.clone();

        let result = tokio::task::spawn_blocking(move || append_line(&path, &line)).await;
        match result {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!("Failed to write activity log {}: {}", self.path.display(), e),
            Err(e) => warn!("Activity log task failed: {}", e),
        }
    }

    pub async fn info(&self, message: impl Into<String>) {
        self.append(LogLevel::Info, message).await
    }

    pub async fn warning(&self, message: impl Into<String>) {
        self.append(LogLevel::Warning, message).await
    }

    pub async fn error(&self, message: impl Into<String>) {
        self.append(LogLevel::Error, message).await
    }

    /// Whole file contents, `None` when nothing has been logged yet
    pub async fn read(&self) -> io::Result<Option<String>> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }
}

fn format_line(level: LogLevel, message: &str) -> String {
    format!(
        "{} [{}] {}\n",
        Utc::now().to_rfc3339_opts(SecondsFormat::Micros, false),
        level,
        message
    )
}

fn append_line(path: &Path, line: &str) -> io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    file.write_all(line.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_append_and_read() {
        let temp_dir = TempDir::new().unwrap();
        let log = ActivityLog::new(temp_dir.path().join("logs").join(DEFAULT_LOG_FILE));

        assert_eq!(log.read().await.unwrap(), None);

        log.info("Created automation a1").await;
        log.warning("Reload failed").await;

        let content = log.read().await.unwrap().unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with(" [info] Created automation a1"));
        assert!(lines[1].ends_with(" [warning] Reload failed"));

        let timestamp = lines[0].split(' ').next().unwrap();
        assert!(chrono::DateTime::parse_from_rfc3339(timestamp).is_ok());
    }

    #[test]
    fn test_level_names() {
        assert_eq!(LogLevel::Error.to_string(), "error");
    }
}
