//! Append-only file writer with daily rotation.

use chrono::{DateTime, Local, NaiveDate};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Writes to `<path>` for the current day and renames it to
/// `<path>.<YYYY-MM-DD>` at the first write of a new day. Rotated files are
/// retained indefinitely.
#[derive(Debug)]
pub(crate) struct RollingFileWriter {
    path: PathBuf,
    file: File,
    day: NaiveDate,
}

impl RollingFileWriter {
    /// Open the file for appending. A leftover file last modified on an
    /// earlier day is rotated out before the first write.
    pub(crate) fn open(path: &Path) -> io::Result<Self> {
        let today = Local::now().date_naive();
        if let Ok(modified) = fs::metadata(path).and_then(|meta| meta.modified()) {
            let last = DateTime::<Local>::from(modified).date_naive();
            if last < today {
                fs::rename(path, rotated_name(path, last))?;
            }
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            file,
            day: today,
        })
    }

    /// Append one formatted line, rolling over first when the day changed.
    pub(crate) fn write_line(&mut self, line: &str) -> io::Result<()> {
        self.roll_if_needed(Local::now().date_naive())?;
        self.file.write_all(line.as_bytes())?;
        self.file.flush()
    }

    pub(crate) fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }

    fn roll_if_needed(&mut self, today: NaiveDate) -> io::Result<()> {
        if today == self.day {
            return Ok(());
        }
        self.file.flush()?;
        fs::rename(&self.path, rotated_name(&self.path, self.day))?;
        self.file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        self.day = today;
        Ok(())
    }
}

/// Name of the rotated file for a past day: `<path>.<YYYY-MM-DD>`.
fn rotated_name(path: &Path, day: NaiveDate) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(format!(".{}", day.format("%Y-%m-%d")));
    PathBuf::from(name)
}
