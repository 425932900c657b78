use std::path::{Path, PathBuf};

use chrono::{DateTime, TimeZone};

pub const LOG_FILE_PREFIX: &str = "propagation_";

/// `<logs_dir>/propagation_YYYYMMDD_HHMMSS.log`
pub fn log_file_path<Tz: TimeZone>(logs_dir: &Path, now: &DateTime<Tz>) -> PathBuf
where
    Tz::Offset: std::fmt::Display,
{
    logs_dir.join(format!(
        "{LOG_FILE_PREFIX}{}.log",
        now.format("%Y%m%d_%H%M%S")
    ))
}
