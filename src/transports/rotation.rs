//! Date-stamped log file rotation
//!
//! Files are named `{stamp}.log` (or `{stamp}_{index}.log` once a size cap
//! forces a rollover within the same period), where the stamp is derived
//! from the rotation frequency and local time.

use crate::core::error::{LoggerError, Result};
use chrono::{DateTime, Local};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// How often a new date stamp (and therefore a new file) begins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frequency {
    Minutely,
    Hourly,
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl Frequency {
    /// The file-name stamp for a point in time at this frequency.
    pub fn file_stamp(&self, at: DateTime<Local>) -> String {
        let format = match self {
            Frequency::Minutely => "%Y-%m-%d_%H-%M",
            Frequency::Hourly => "%Y-%m-%d_%H",
            Frequency::Daily => "%Y-%m-%d",
            Frequency::Weekly => "%G-W%V",
            Frequency::Monthly => "%Y-%m",
            Frequency::Yearly => "%Y",
        };
        at.format(format).to_string()
    }
}

#[derive(Debug, Clone)]
pub struct RotatorOptions {
    pub frequency: Frequency,
    /// Size cap in bytes; exceeding it rolls to the next index within the
    /// same stamp. Unset means stamp changes are the only trigger.
    pub max_size: Option<u64>,
    pub extension: String,
    pub create_dir: bool,
}

impl Default for RotatorOptions {
    fn default() -> Self {
        Self {
            frequency: Frequency::Daily,
            max_size: None,
            extension: "log".to_string(),
            create_dir: true,
        }
    }
}

/// Appends lines to the current log file, rolling over on stamp change or
/// size cap.
#[derive(Debug)]
pub struct LogRotator {
    dir: PathBuf,
    options: RotatorOptions,
    index: u32,
    current_stamp: String,
    current_path: PathBuf,
    current_size: u64,
    writer: Option<BufWriter<File>>,
}

impl LogRotator {
    pub fn new(dir: impl Into<PathBuf>, options: RotatorOptions) -> Result<Self> {
        let dir = dir.into();
        if !dir.exists() {
            if options.create_dir {
                std::fs::create_dir_all(&dir)
                    .map_err(|e| LoggerError::io_operation("creating log directory", e))?;
            } else {
                return Err(LoggerError::config(
                    "LogRotator",
                    format!("log directory does not exist: {}", dir.display()),
                ));
            }
        } else if !dir.is_dir() {
            return Err(LoggerError::config(
                "LogRotator",
                format!("log path is not a directory: {}", dir.display()),
            ));
        }

        Ok(Self {
            dir,
            options,
            index: 0,
            current_stamp: String::new(),
            current_path: PathBuf::new(),
            current_size: 0,
            writer: None,
        })
    }

    /// The file currently being written, once the first append happened.
    pub fn current_path(&self) -> Option<&Path> {
        self.writer.as_ref().map(|_| self.current_path.as_path())
    }

    /// Append one line (newline added) to the current file, rotating first
    /// when required.
    pub fn append(&mut self, line: &str) -> Result<()> {
        self.ensure_writer(Local::now(), line.len() as u64 + 1)?;
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| LoggerError::other("log writer unavailable"))?;
        writer
            .write_all(line.as_bytes())
            .and_then(|_| writer.write_all(b"\n"))
            .and_then(|_| writer.flush())
            .map_err(|e| LoggerError::io_operation("writing log file", e))?;
        self.current_size += line.len() as u64 + 1;
        Ok(())
    }

    fn ensure_writer(&mut self, now: DateTime<Local>, incoming: u64) -> Result<()> {
        let stamp = self.options.frequency.file_stamp(now);
        let stamp_changed = stamp != self.current_stamp;
        let over_size = self
            .options
            .max_size
            .is_some_and(|max| self.writer.is_some() && self.current_size + incoming > max);

        if self.writer.is_some() && !stamp_changed && !over_size {
            return Ok(());
        }

        if stamp_changed {
            self.index = 0;
            self.current_stamp = stamp;
        } else if over_size {
            self.index += 1;
        }

        // Skip over files from previous runs that are already at the cap.
        if let Some(max) = self.options.max_size {
            loop {
                let candidate = self.path_for(self.index);
                match std::fs::metadata(&candidate) {
                    Ok(meta) if meta.len() + incoming > max => self.index += 1,
                    _ => break,
                }
            }
        }

        let path = self.path_for(self.index);
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| LoggerError::io_operation("opening log file", e))?;
        self.current_size = file
            .metadata()
            .map(|m| m.len())
            .map_err(|e| LoggerError::io_operation("reading log file size", e))?;
        self.current_path = path;
        self.writer = Some(BufWriter::new(file));
        Ok(())
    }

    fn path_for(&self, index: u32) -> PathBuf {
        let name = if index == 0 {
            format!("{}.{}", self.current_stamp, self.options.extension)
        } else {
            format!("{}_{}.{}", self.current_stamp, index, self.options.extension)
        };
        self.dir.join(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_file_stamps() {
        let at = Local.with_ymd_and_hms(2026, 3, 7, 14, 5, 0).unwrap();
        assert_eq!(Frequency::Minutely.file_stamp(at), "2026-03-07_14-05");
        assert_eq!(Frequency::Hourly.file_stamp(at), "2026-03-07_14");
        assert_eq!(Frequency::Daily.file_stamp(at), "2026-03-07");
        assert_eq!(Frequency::Monthly.file_stamp(at), "2026-03");
        assert_eq!(Frequency::Yearly.file_stamp(at), "2026");
    }

    #[test]
    fn test_creates_directory_and_appends() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("logs");
        let mut rotator = LogRotator::new(&target, RotatorOptions::default()).unwrap();

        rotator.append("first").unwrap();
        rotator.append("second").unwrap();

        let path = rotator.current_path().unwrap().to_path_buf();
        assert!(path.starts_with(&target));
        let content = std::fs::read_to_string(path).unwrap();
        assert_eq!(content, "first\nsecond\n");
    }

    #[test]
    fn test_missing_directory_without_create_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let options = RotatorOptions {
            create_dir: false,
            ..Default::default()
        };
        let err = LogRotator::new(dir.path().join("absent"), options).unwrap_err();
        assert!(matches!(err, LoggerError::InvalidConfiguration { .. }));
    }

    #[test]
    fn test_size_cap_rolls_to_indexed_file() {
        let dir = tempfile::tempdir().unwrap();
        let options = RotatorOptions {
            max_size: Some(16),
            ..Default::default()
        };
        let mut rotator = LogRotator::new(dir.path(), options).unwrap();

        rotator.append("0123456789").unwrap();
        let first = rotator.current_path().unwrap().to_path_buf();
        rotator.append("0123456789").unwrap();
        let second = rotator.current_path().unwrap().to_path_buf();

        assert_ne!(first, second);
        assert!(second
            .file_name()
            .unwrap()
            .to_string_lossy()
            .contains("_1."));
    }

    #[test]
    fn test_reopens_existing_file_for_append() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut rotator = LogRotator::new(dir.path(), RotatorOptions::default()).unwrap();
            rotator.append("before").unwrap();
        }
        let mut rotator = LogRotator::new(dir.path(), RotatorOptions::default()).unwrap();
        rotator.append("after").unwrap();

        let content = std::fs::read_to_string(rotator.current_path().unwrap()).unwrap();
        assert_eq!(content, "before\nafter\n");
    }
}
