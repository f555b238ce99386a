//! JSONL log of delivered activities, for debugging the relay

use crate::activity::Activity;
use crate::error::Result;
use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Mutex;

#[derive(Debug, Serialize)]
struct ActivityLogEntry<'a> {
    number: u64,
    user: &'a str,
    logged_at: String,
    activity: &'a Activity,
}

pub struct ActivityLog {
    inner: Mutex<LogFile>,
}

struct LogFile {
    file: BufWriter<File>,
    count: u64,
}

impl ActivityLog {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new().create(true).append(true).open(path)?;
        log::info!("📝 Logging delivered activities to: {}", path.display());

        Ok(Self {
            inner: Mutex::new(LogFile {
                file: BufWriter::new(file),
                count: 0,
            }),
        })
    }

    /// Append one activity as a JSON line
    pub fn record(&self, activity: &Activity, user: &str) -> Result<()> {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.count += 1;

        let entry = ActivityLogEntry {
            number: inner.count,
            user,
            logged_at: chrono::Utc::now().to_rfc3339(),
            activity,
        };

        let json = serde_json::to_string(&entry)?;
        writeln!(inner.file, "{}", json)?;
        inner.file.flush()?;

        Ok(())
    }

    pub fn count(&self) -> u64 {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_appends_json_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("activities.jsonl");

        let log = ActivityLog::open(&path).unwrap();
        log.record(&Activity::new("add"), "jdoe").unwrap();
        log.record(&Activity::new("remove"), "jdoe").unwrap();
        assert_eq!(log.count(), 2);

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<serde_json::Value> = contents
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["number"], 1);
        assert_eq!(lines[1]["activity"]["verb"], "remove");
        assert_eq!(lines[1]["user"], "jdoe");
    }
}
