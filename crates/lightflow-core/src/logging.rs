//! Log configuration shared by hosts of the engine.
//!
//! The core only emits `tracing` events; installing a subscriber is the host's job.
//! This module carries the settings a host needs to do that consistently.

use chrono::Local;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::level_filters::LevelFilter;

/// Prefix of every log file name
pub const LOG_FILE_PREFIX: &str = "lightflow_";

const STAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

/// Logging settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Level name: trace, debug, info, warn, error or off
    pub level: String,
    /// Write to stderr
    pub console_output: bool,
    /// Write to a timestamped file in `log_directory`
    pub file_output: bool,
    /// Directory for log files
    pub log_directory: PathBuf,
    /// Log files kept by `cleanup_old_logs`
    pub max_log_files: usize,
    /// Stamp fixed for this session, so repeated path queries agree
    #[serde(skip)]
    pub session_stamp: Option<String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            console_output: true,
            file_output: false,
            log_directory: PathBuf::from("logs"),
            max_log_files: 10,
            session_stamp: None,
        }
    }
}

impl LogConfig {
    /// Copy with the session stamp fixed to now
    pub fn with_session_stamp(mut self) -> Self {
        self.session_stamp = Some(Local::now().format(STAMP_FORMAT).to_string());
        self
    }

    /// Parsed level; unknown names fall back to INFO
    pub fn parse_level(&self) -> LevelFilter {
        match self.level.trim().to_ascii_lowercase().as_str() {
            "trace" => LevelFilter::TRACE,
            "debug" => LevelFilter::DEBUG,
            "info" => LevelFilter::INFO,
            "warn" | "warning" => LevelFilter::WARN,
            "error" => LevelFilter::ERROR,
            "off" => LevelFilter::OFF,
            _ => LevelFilter::INFO,
        }
    }

    /// Create the log directory if file output is enabled
    pub fn ensure_log_directory(&self) -> std::io::Result<()> {
        if self.file_output {
            std::fs::create_dir_all(&self.log_directory)?;
        }
        Ok(())
    }

    /// Path of this session's log file
    pub fn current_log_path(&self) -> PathBuf {
        let stamp = self
            .session_stamp
            .clone()
            .unwrap_or_else(|| Local::now().format(STAMP_FORMAT).to_string());
        self.log_directory
            .join(format!("{}{}.log", LOG_FILE_PREFIX, stamp))
    }

    /// Delete the oldest log files beyond `max_log_files`; returns how many were removed
    pub fn cleanup_old_logs(&self) -> std::io::Result<usize> {
        if !self.log_directory.is_dir() {
            return Ok(0);
        }
        let mut logs: Vec<PathBuf> = std::fs::read_dir(&self.log_directory)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.file_name()
                    .and_then(|n| n.to_str())
                    .map(|n| n.starts_with(LOG_FILE_PREFIX) && n.ends_with(".log"))
                    .unwrap_or(false)
            })
            .collect();
        if logs.len() <= self.max_log_files {
            return Ok(0);
        }
        // Timestamped names sort chronologically
        logs.sort();
        let excess = logs.len() - self.max_log_files;
        for path in &logs[..excess] {
            std::fs::remove_file(path)?;
        }
        Ok(excess)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_level() {
        let mut config = LogConfig::default();
        assert_eq!(config.parse_level(), LevelFilter::INFO);
        config.level = "DEBUG".to_string();
        assert_eq!(config.parse_level(), LevelFilter::DEBUG);
        config.level = "loud".to_string();
        assert_eq!(config.parse_level(), LevelFilter::INFO);
    }

    #[test]
    fn test_session_stamp_is_stable() {
        let config = LogConfig::default().with_session_stamp();
        assert_eq!(config.current_log_path(), config.current_log_path());
        let name = config.current_log_path();
        let name = name.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with(LOG_FILE_PREFIX) && name.ends_with(".log"));
    }

    #[test]
    fn test_cleanup_old_logs() {
        let dir = tempfile::tempdir().unwrap();
        for i in 0..5 {
            let name = format!("{}2026-01-0{}_00-00-00.log", LOG_FILE_PREFIX, i + 1);
            std::fs::write(dir.path().join(name), "x").unwrap();
        }
        std::fs::write(dir.path().join("notes.txt"), "keep").unwrap();

        let config = LogConfig {
            log_directory: dir.path().to_path_buf(),
            max_log_files: 2,
            ..LogConfig::default()
        };
        assert_eq!(config.cleanup_old_logs().unwrap(), 3);
        assert!(dir.path().join("notes.txt").exists());
        assert!(dir
            .path()
            .join(format!("{}2026-01-05_00-00-00.log", LOG_FILE_PREFIX))
            .exists());
        assert!(!dir
            .path()
            .join(format!("{}2026-01-01_00-00-00.log", LOG_FILE_PREFIX))
            .exists());
    }

    #[test]
    fn test_deserialize_partial() {
        let config: LogConfig = serde_json::from_str(r#"{"level": "warn"}"#).unwrap();
        assert_eq!(config.level, "warn");
        assert!(config.console_output);
        assert!(config.session_stamp.is_none());
    }
}
