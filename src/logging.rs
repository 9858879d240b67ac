use std::fs::File;
use std::io;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::writer::BoxMakeWriter;

/// Log levels, from silent to everything
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Nothing = 0,
    User = 1,
    Error = 2,
    Warning = 3,
    Info = 4,
    Debug = 5,
    All = 6,
}

impl LogLevel {
    /// Create a LogLevel from an integer
    pub fn from_i32(level: i32) -> Self {
        match level {
            0 => LogLevel::Nothing,
            1 => LogLevel::User,
            2 => LogLevel::Error,
            3 => LogLevel::Warning,
            4 => LogLevel::Info,
            5 => LogLevel::Debug,
            6 => LogLevel::All,
            _ => LogLevel::Info,
        }
    }

    pub fn as_i32(&self) -> i32 {
        *self as i32
    }

    /// Raise the level by `steps` (`-v` flags), saturating at `All`.
    pub fn raised(self, steps: u8) -> Self {
        Self::from_i32((self.as_i32() + steps as i32).min(LogLevel::All.as_i32()))
    }

    pub fn to_level_filter(self) -> LevelFilter {
        match self {
            LogLevel::Nothing => LevelFilter::OFF,
            LogLevel::User | LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Warning => LevelFilter::WARN,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::All => LevelFilter::TRACE,
        }
    }
}

/// Install the global subscriber at `level`, writing to `log_file` or stderr.
///
/// `log` records from the rest of the crate are forwarded to it. Only the
/// first call installs; later calls keep the existing subscriber.
pub fn log_init(level: LogLevel, log_file: Option<&str>) -> Result<()> {
    let writer = match log_file {
        Some(path) => {
            let file = File::create(path).with_context(|| format!("Failed to open log file {}", path))?;
            BoxMakeWriter::new(Arc::new(file))
        }
        None => BoxMakeWriter::new(io::stderr),
    };

    let installed = tracing_subscriber::fmt()
        .with_max_level(level.to_level_filter())
        .with_writer(writer)
        .with_ansi(log_file.is_none())
        .with_target(false)
        .without_time()
        .try_init();
    if let Err(e) = installed {
        tracing::debug!("Logger already installed: {}", e);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_from_i32() {
        assert_eq!(LogLevel::from_i32(0), LogLevel::Nothing);
        assert_eq!(LogLevel::from_i32(1), LogLevel::User);
        assert_eq!(LogLevel::from_i32(2), LogLevel::Error);
        assert_eq!(LogLevel::from_i32(3), LogLevel::Warning);
        assert_eq!(LogLevel::from_i32(4), LogLevel::Info);
        assert_eq!(LogLevel::from_i32(5), LogLevel::Debug);
        assert_eq!(LogLevel::from_i32(6), LogLevel::All);
    }

    #[test]
    fn test_log_level_as_i32() {
        assert_eq!(LogLevel::Nothing.as_i32(), 0);
        assert_eq!(LogLevel::Warning.as_i32(), 3);
        assert_eq!(LogLevel::All.as_i32(), 6);
    }

    #[test]
    fn test_log_level_invalid() {
        // Invalid values should default to Info
        assert_eq!(LogLevel::from_i32(100), LogLevel::Info);
        assert_eq!(LogLevel::from_i32(-1), LogLevel::Info);
    }

    #[test]
    fn test_raised_saturates() {
        assert_eq!(LogLevel::Warning.raised(1), LogLevel::Info);
        assert_eq!(LogLevel::Warning.raised(2), LogLevel::Debug);
        assert_eq!(LogLevel::Debug.raised(9), LogLevel::All);
    }

    #[test]
    fn test_level_filters() {
        assert_eq!(LogLevel::Nothing.to_level_filter(), LevelFilter::OFF);
        assert_eq!(LogLevel::Warning.to_level_filter(), LevelFilter::WARN);
        assert_eq!(LogLevel::All.to_level_filter(), LevelFilter::TRACE);
    }

    #[test]
    fn test_log_init_twice() {
        assert!(log_init(LogLevel::Warning, None).is_ok());
        assert!(log_init(LogLevel::Debug, None).is_ok());
        log::debug!("log records reach the subscriber");
    }

    #[test]
    fn test_log_init_creates_log_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("decode.log");
        assert!(log_init(LogLevel::Info, path.to_str()).is_ok());
        assert!(path.is_file());
    }

    #[test]
    fn test_log_init_bad_log_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("decode.log");
        assert!(log_init(LogLevel::Info, path.to_str()).is_err());
    }
}
