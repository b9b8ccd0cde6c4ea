//! File logger for the terminal binary.
//!
//! The terminal owns stdout/stderr while the game runs, so records go to the
//! file named by `CUBE_BLAST_LOG_PATH`, one line each. Without that variable
//! no logger is installed and every `log` macro is a no-op.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::Result;
use log::{LevelFilter, Log, Metadata, Record};

pub struct FileLogger {
    level: LevelFilter,
    file: Mutex<File>,
}

impl FileLogger {
    pub fn open(path: &str, level: LevelFilter) -> Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            level,
            file: Mutex::new(file),
        })
    }
}

impl Log for FileLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let ts = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis();
        if let Ok(mut file) = self.file.lock() {
            let _ = writeln!(
                file,
                "{} {:<5} {}: {}",
                ts,
                record.level(),
                record.target(),
                record.args()
            );
        }
    }

    fn flush(&self) {
        if let Ok(mut file) = self.file.lock() {
            let _ = file.flush();
        }
    }
}

/// `CUBE_BLAST_LOG_LEVEL`, defaulting to `info`.
pub fn level_from_env() -> LevelFilter {
    std::env::var("CUBE_BLAST_LOG_LEVEL")
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(LevelFilter::Info)
}

/// Install the file logger if `CUBE_BLAST_LOG_PATH` is set. Returns whether
/// one was installed.
pub fn init_from_env() -> Result<bool> {
    let Some(path) = std::env::var("CUBE_BLAST_LOG_PATH")
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
    else {
        return Ok(false);
    };
    let level = level_from_env();
    let logger = FileLogger::open(&path, level)?;
    log::set_boxed_logger(Box::new(logger))
        .map_err(|e| anyhow::anyhow!("logger already installed: {}", e))?;
    log::set_max_level(level);
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use log::Level;

    #[test]
    fn writes_enabled_records_only() {
        let path = std::env::temp_dir().join(format!("cube-blast-log-{}.log", std::process::id()));
        let _ = std::fs::remove_file(&path);
        let logger = FileLogger::open(path.to_str().unwrap(), LevelFilter::Info).unwrap();

        logger.log(
            &Record::builder()
                .level(Level::Info)
                .target("cube_blast_core::session")
                .args(format_args!("level {} started", 1))
                .build(),
        );
        logger.log(
            &Record::builder()
                .level(Level::Debug)
                .target("cube_blast_core::gravity")
                .args(format_args!("pass"))
                .build(),
        );
        logger.flush();

        let text = std::fs::read_to_string(&path).unwrap();
        let _ = std::fs::remove_file(&path);
        assert_eq!(text.lines().count(), 1);
        assert!(text.contains("INFO  cube_blast_core::session: level 1 started"));
    }
}
