//! Append-only run log.
//!
//! Each event becomes one line `<timestamp> [<Level>] <message>` in the log
//! file and is mirrored to `tracing`.

use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use tracing::{error, info, warn};

use crate::error::SetupError;

/// Severity written into the run log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Warning,
    Error,
    Success,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Info => "Info",
            Self::Warning => "Warning",
            Self::Error => "Error",
            Self::Success => "Success",
        };
        f.write_str(label)
    }
}

/// Format one log line.
pub fn format_line(timestamp: DateTime<Local>, level: LogLevel, message: &str) -> String {
    format!(
        "{} [{}] {}",
        timestamp.format("%Y-%m-%d %H:%M:%S"),
        level,
        message
    )
}

#[derive(Debug)]
pub struct RunLog {
    path: Option<PathBuf>,
    file: Option<File>,
}

impl RunLog {
    /// Open (or create) `<dir>/<prefix>_<yyyyMMdd>.log` for appending.
    pub fn open(dir: &Path, prefix: &str) -> Result<Self, SetupError> {
        std::fs::create_dir_all(dir).map_err(|source| SetupError::Directory {
            path: dir.to_path_buf(),
            source,
        })?;

        let path = dir.join(format!("{}_{}.log", prefix, Local::now().format("%Y%m%d")));
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|source| SetupError::Directory {
                path: path.clone(),
                source,
            })?;

        Ok(Self {
            path: Some(path),
            file: Some(file),
        })
    }

    /// A log that only forwards to `tracing`.
    pub fn tracing_only() -> Self {
        Self {
            path: None,
            file: None,
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn info(&mut self, message: impl AsRef<str>) {
        self.write(LogLevel::Info, message.as_ref());
    }

    pub fn warning(&mut self, message: impl AsRef<str>) {
        self.write(LogLevel::Warning, message.as_ref());
    }

    pub fn error(&mut self, message: impl AsRef<str>) {
        self.write(LogLevel::Error, message.as_ref());
    }

    pub fn success(&mut self, message: impl AsRef<str>) {
        self.write(LogLevel::Success, message.as_ref());
    }

    fn write(&mut self, level: LogLevel, message: &str) {
        match level {
            LogLevel::Info | LogLevel::Success => info!("{}", message),
            LogLevel::Warning => warn!("{}", message),
            LogLevel::Error => error!("{}", message),
        }

        if let Some(file) = self.file.as_mut() {
            let line = format_line(Local::now(), level, message);
            // Stop writing after the first failure
            if let Err(e) = writeln!(file, "{}", line) {
                warn!("Failed to append to run log: {}", e);
                self.file = None;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_format_line() {
        let ts = Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
        assert_eq!(
            format_line(ts, LogLevel::Success, "Disabled alice@example.com"),
            "2024-03-09 14:05:07 [Success] Disabled alice@example.com"
        );
        assert_eq!(
            format_line(ts, LogLevel::Warning, "x"),
            "2024-03-09 14:05:07 [Warning] x"
        );
    }

    #[test]
    fn test_open_appends_lines() {
        let dir = tempfile::tempdir().unwrap();

        let mut log = RunLog::open(dir.path(), "accounts").unwrap();
        log.info("first");
        log.error("second");
        let path = log.path().unwrap().to_path_buf();
        drop(log);

        let mut log = RunLog::open(dir.path(), "accounts").unwrap();
        log.success("third");
        drop(log);

        let content = std::fs::read_to_string(path).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].ends_with("[Info] first"));
        assert!(lines[1].ends_with("[Error] second"));
        assert!(lines[2].ends_with("[Success] third"));
    }

    #[test]
    fn test_tracing_only_has_no_path() {
        let mut log = RunLog::tracing_only();
        log.warning("nothing written");
        assert!(log.path().is_none());
    }
}
