//! Human-facing progress log shared by all concurrent site pipelines.
//!
//! Each call to [`RunLog::line`] produces exactly one `[HH:MM:SS] message`
//! record. The sink sits behind a `Mutex`, so records from different workers
//! never interleave.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

use chrono::Local;

use crate::error::{io_err, SiteError};

enum Sink {
    /// Append to a file and echo to stdout.
    File(File),
    /// Capture records in memory.
    Memory(Vec<String>),
}

pub struct RunLog {
    sink: Mutex<Sink>,
}

impl RunLog {
    /// Open (append) the run log at `path`, creating parent directories.
    pub fn create(path: &Path) -> Result<Self, SiteError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| io_err(path, e))?;
        Ok(Self {
            sink: Mutex::new(Sink::File(file)),
        })
    }

    pub fn in_memory() -> Self {
        Self {
            sink: Mutex::new(Sink::Memory(Vec::new())),
        }
    }

    /// Write one timestamped record.
    pub fn line(&self, message: impl AsRef<str>) {
        let record = format!("[{}] {}", Local::now().format("%H:%M:%S"), message.as_ref());
        let mut sink = self.sink.lock().unwrap_or_else(|e| e.into_inner());
        match &mut *sink {
            Sink::File(file) => {
                println!("{record}");
                if let Err(e) = writeln!(file, "{record}") {
                    tracing::warn!("failed to append to run log: {e}");
                }
            }
            Sink::Memory(lines) => lines.push(record),
        }
    }

    /// Records captured so far. Always empty for a file-backed log.
    pub fn lines(&self) -> Vec<String> {
        let sink = self.sink.lock().unwrap_or_else(|e| e.into_inner());
        match &*sink {
            Sink::Memory(lines) => lines.clone(),
            Sink::File(_) => Vec::new(),
        }
    }

    /// Captured records with the `[HH:MM:SS] ` prefix removed.
    pub fn messages(&self) -> Vec<String> {
        self.lines()
            .into_iter()
            .map(|l| match l.split_once("] ") {
                Some((_, rest)) => rest.to_string(),
                None => l,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tempfile::TempDir;

    #[test]
    fn records_are_timestamped() {
        let log = RunLog::in_memory();
        log.line("Cloning repository...");
        let lines = log.lines();
        assert_eq!(lines.len(), 1);
        let line = &lines[0];
        assert!(line.starts_with('['));
        assert_eq!(&line[9..11], "] ");
        assert!(line.ends_with("Cloning repository..."));
        assert_eq!(log.messages(), ["Cloning repository..."]);
    }

    #[test]
    fn file_log_appends_whole_lines() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("logs").join("run.log");
        let log = Arc::new(RunLog::create(&path).unwrap());

        let handles: Vec<_> = (0..4)
            .map(|t| {
                let log = Arc::clone(&log);
                std::thread::spawn(move || {
                    for i in 0..25 {
                        log.line(format!("worker {t} record {i}"));
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = contents.lines().collect();
        assert_eq!(lines.len(), 100);
        assert!(lines.iter().all(|l| l.contains("] worker ")));
    }
}
