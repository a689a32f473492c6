use anyhow::{Context, Result};
use log::{Level, LevelFilter, Log, Metadata, Record};
use std::{
    collections::VecDeque,
    fs::{self, File, OpenOptions},
    io::Write,
    path::Path,
    sync::{Arc, Mutex},
};
use time::{macros::format_description, OffsetDateTime};

const LOG_CAPACITY: usize = 200;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub level: Level,
    pub message: String,
}

/// Recent log entries kept in memory for the log pane.
#[derive(Debug, Clone, Default)]
pub struct LogBuffer {
    entries: Arc<Mutex<VecDeque<LogEntry>>>,
}

impl LogBuffer {
    pub fn push(&self, level: Level, message: String) {
        let Ok(mut entries) = self.entries.lock() else {
            return;
        };
        entries.push_back(LogEntry { level, message });
        while entries.len() > LOG_CAPACITY {
            entries.pop_front();
        }
    }

    pub fn recent(&self, count: usize) -> Vec<LogEntry> {
        let Ok(entries) = self.entries.lock() else {
            return Vec::new();
        };
        let skip = entries.len().saturating_sub(count);
        entries.iter().skip(skip).cloned().collect()
    }
}

struct FileLogger {
    file: Mutex<File>,
    buffer: LogBuffer,
    level: LevelFilter,
}

impl Log for FileLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level && metadata.target().starts_with("gameshelf")
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let message = record.args().to_string();
        if let Ok(mut file) = self.file.lock() {
            let _ = writeln!(
                file,
                "{}",
                format_line(OffsetDateTime::now_utc(), record.level(), &message)
            );
        }
        if record.level() <= Level::Info {
            self.buffer.push(record.level(), message);
        }
    }

    fn flush(&self) {
        if let Ok(mut file) = self.file.lock() {
            let _ = file.flush();
        }
    }
}

/// Installs the process-wide logger appending to `path`. The returned buffer
/// mirrors info and above.
pub fn init(path: &Path, level: LevelFilter) -> Result<LogBuffer> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("create log dir")?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .context("open log file")?;
    let buffer = LogBuffer::default();
    let logger = FileLogger {
        file: Mutex::new(file),
        buffer: buffer.clone(),
        level,
    };
    log::set_boxed_logger(Box::new(logger)).context("install logger")?;
    log::set_max_level(level);
    Ok(buffer)
}

pub fn level_label(level: Level) -> &'static str {
    match level {
        Level::Error => "ERROR",
        Level::Warn => "WARN",
        Level::Info => "INFO",
        Level::Debug => "DEBUG",
        Level::Trace => "TRACE",
    }
}

fn format_line(now: OffsetDateTime, level: Level, message: &str) -> String {
    let stamp = now
        .format(format_description!(
            "[year]-[month]-[day]T[hour]:[minute]:[second]Z"
        ))
        .unwrap_or_default();
    format!("{stamp} [{}] {message}", level_label(level))
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn formats_timestamped_lines() {
        let line = format_line(
            datetime!(2024-03-05 7:08:09 UTC),
            Level::Warn,
            "Profile file missing",
        );
        assert_eq!(line, "2024-03-05T07:08:09Z [WARN] Profile file missing");
    }

    #[test]
    fn buffer_keeps_most_recent_entries() {
        let buffer = LogBuffer::default();
        for index in 0..(LOG_CAPACITY + 5) {
            buffer.push(Level::Info, format!("entry {index}"));
        }
        let recent = buffer.recent(2);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[1].message, format!("entry {}", LOG_CAPACITY + 4));
        assert_eq!(buffer.recent(usize::MAX).len(), LOG_CAPACITY);
    }
}
