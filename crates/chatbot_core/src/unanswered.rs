use crate::error::{ChatError, Result};
use chrono::{DateTime, Local};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Append-only sink for queries the matcher could not answer.
pub trait QueryLog: Send + Sync {
    fn record(&self, query: &str) -> Result<()>;
}

/// `[YYYY-MM-DD HH:MM:SS] query\n`, query kept byte-for-byte.
pub fn format_entry(at: &DateTime<Local>, query: &str) -> String {
    format!("[{}] {}\n", at.format(TIMESTAMP_FORMAT), query)
}

#[derive(Debug)]
pub struct FileQueryLog {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileQueryLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn append(&self, line: &str) -> std::io::Result<()> {
        // A poisoned lock only means another append panicked; the file is still usable.
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(line.as_bytes())?;
        file.flush()
    }
}

impl QueryLog for FileQueryLog {
    fn record(&self, query: &str) -> Result<()> {
        let line = format_entry(&Local::now(), query);
        self.append(&line).map_err(|source| ChatError::LogWrite {
            path: self.path.display().to_string(),
            source,
        })
    }
}

/// Drops every entry. Used for offline evaluation runs.
#[derive(Debug, Default, Clone, Copy)]
pub struct DiscardQueryLog;

impl QueryLog for DiscardQueryLog {
    fn record(&self, _query: &str) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn entry_format_matches_review_file_layout() {
        let at = Local.with_ymd_and_hms(2024, 3, 9, 7, 5, 1).unwrap();
        assert_eq!(
            format_entry(&at, "  Where's the CANTEEN?? "),
            "[2024-03-09 07:05:01]   Where's the CANTEEN?? \n"
        );
    }

    #[test]
    fn appends_without_truncating() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("unanswered_queries.txt");
        std::fs::write(&path, "[2020-01-01 00:00:00] earlier\n").unwrap();

        let log = FileQueryLog::new(&path);
        log.record("first").unwrap();
        log.record("second").unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "[2020-01-01 00:00:00] earlier");
        assert!(lines[1].ends_with("] first"));
        assert!(lines[2].ends_with("] second"));
    }

    #[test]
    fn concurrent_appends_do_not_interleave() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log.txt");
        let log = Arc::new(FileQueryLog::new(&path));

        let handles: Vec<_> = (0..8)
            .map(|t| {
                let log = Arc::clone(&log);
                thread::spawn(move || {
                    for i in 0..25 {
                        log.record(&format!("thread-{t} query-{i} {}", "x".repeat(200)))
                            .unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 200);
        for line in lines {
            assert!(line.starts_with('['), "{line}");
            assert!(line.ends_with(&"x".repeat(200)), "{line}");
        }
    }

    #[test]
    fn unwritable_path_is_log_write_error() {
        let dir = tempfile::tempdir().unwrap();
        let log = FileQueryLog::new(dir.path().join("missing-dir").join("log.txt"));
        assert!(matches!(
            log.record("q"),
            Err(ChatError::LogWrite { .. })
        ));
    }
}
