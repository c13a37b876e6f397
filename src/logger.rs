//! CSV logging of monitor readings
//!
//! The log is a plain CSV file with a fixed header:
//!
//! ```text
//! date,time,distance,spm,power,pace
//! 23-05-06 07:08:09,10,50,20,150,120
//! ```
//!
//! The header is written together with the first reading, so a run that
//! never produced a reading leaves an empty file. Every row is flushed as soon
//! as it is written.

use crate::error::{Result, ResultExt};
use crate::types::{MonitorReading, MONITOR_FIELDS};
use chrono::{Local, NaiveDateTime};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Format of the `date` column
pub const DATE_FORMAT: &str = "%y-%m-%d %H:%M:%S";

/// Format of log file names
pub const FILE_NAME_FORMAT: &str = "erg_%y%m%d_%H%M%S.csv";

/// Name of the first CSV column
pub const DATE_COLUMN: &str = "date";

/// Name of the log file for a run started at `started`
pub fn log_file_name(started: &NaiveDateTime) -> String {
    started.format(FILE_NAME_FORMAT).to_string()
}

/// The header row, `date` followed by the monitor fields
pub fn header() -> Vec<&'static str> {
    std::iter::once(DATE_COLUMN).chain(MONITOR_FIELDS).collect()
}

/// Append-only CSV writer for monitor readings
pub struct CsvLogger<W: Write> {
    writer: W,
    header_written: bool,
    rows_written: u64,
}

impl CsvLogger<BufWriter<File>> {
    /// Create a new log file; fails if `path` already exists
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .with_context(|| format!("Failed to create log file {:?}", path))?;

        tracing::debug!("Created log file {:?}", path);
        Ok(Self::new(BufWriter::new(file)))
    }

    /// Create `dir` if needed and a log file named after `started` in it
    pub fn create_in_dir(dir: impl AsRef<Path>, started: &NaiveDateTime) -> Result<(PathBuf, Self)> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create output directory {:?}", dir))?;

        let path = dir.join(log_file_name(started));
        let logger = Self::create(&path)?;
        Ok((path, logger))
    }
}

impl<W: Write> CsvLogger<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            header_written: false,
            rows_written: 0,
        }
    }

    /// Write one reading stamped with the current local time
    ///
    /// Returns the row as written.
    pub fn write_reading(&mut self, reading: &MonitorReading) -> Result<Vec<String>> {
        self.write_reading_at(reading, &Local::now().naive_local())
    }

    /// Write one reading stamped with `at`
    pub fn write_reading_at(
        &mut self,
        reading: &MonitorReading,
        at: &NaiveDateTime,
    ) -> Result<Vec<String>> {
        if !self.header_written {
            writeln!(self.writer, "{}", header().join(",")).context("Failed to write CSV header")?;
            self.header_written = true;
        }

        let mut row = Vec::with_capacity(MONITOR_FIELDS.len() + 1);
        row.push(at.format(DATE_FORMAT).to_string());
        row.extend(reading.fields());

        writeln!(self.writer, "{}", row.join(",")).context("Failed to write CSV row")?;
        self.writer.flush().context("Failed to flush CSV log")?;
        self.rows_written += 1;

        Ok(row)
    }

    /// Number of data rows written (header excluded)
    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }

    pub fn header_written(&self) -> bool {
        self.header_written
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}
