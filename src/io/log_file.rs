//! Plain-text time series logs.
//!
//! Both the spinup diagnostics and the FESOM mass loss analysis keep their
//! time series in the same layout: a header line naming the series,
//! followed by one value per line, repeated for every series.
//!
//! ```text
//! Time (years):
//! 0.0136
//! 0.0274
//! Ice Shelf Basal Mass Loss (Gt/y):
//! 1325.4
//! 1302.9
//! ```
//!
//! Any line that does not parse as a number starts a new section.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::ops::Range;
use std::path::Path;

use log::{debug, warn};
use thiserror::Error;

/// Error type for log file parsing.
#[derive(Debug, Error)]
pub enum LogFileError {
    /// File I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Values before the first header
    #[error("Parse error at line {line}: {message}")]
    ParseError { line: usize, message: String },

    /// Fewer sections than the caller needs
    #[error("Log file has {found} sections, expected at least {expected}")]
    MissingSections { expected: usize, found: usize },

    /// A section whose length disagrees with the first one
    #[error("Section '{header}' has {found} values, expected {expected}")]
    LengthMismatch {
        header: String,
        expected: usize,
        found: usize,
    },

    /// Averaging window outside the recorded time series
    #[error("Records {start}..{end} requested but only {available} available")]
    RangeOutOfBounds {
        start: usize,
        end: usize,
        available: usize,
    },
}

/// One named time series in a log file.
#[derive(Clone, Debug, PartialEq)]
pub struct LogSection {
    /// Header line without the trailing newline, e.g. `Time (years):`
    pub header: String,
    /// Values in file order
    pub values: Vec<f64>,
}

impl LogSection {
    pub fn new(header: impl Into<String>, values: Vec<f64>) -> Self {
        Self {
            header: header.into(),
            values,
        }
    }
}

/// Ordered collection of log sections.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SectionedLog {
    sections: Vec<LogSection>,
}

impl SectionedLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a section.
    pub fn push(&mut self, header: impl Into<String>, values: Vec<f64>) {
        self.sections.push(LogSection::new(header, values));
    }

    pub fn sections(&self) -> &[LogSection] {
        &self.sections
    }

    pub fn into_sections(self) -> Vec<LogSection> {
        self.sections
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// Section with the given header, if present.
    pub fn find(&self, header: &str) -> Option<&LogSection> {
        self.sections.iter().find(|s| s.header == header)
    }

    /// Parse log file contents.
    ///
    /// Blank lines are ignored. A file that ends straight after a header
    /// yields an empty section for it.
    pub fn parse(content: &str) -> Result<Self, LogFileError> {
        let mut log = Self::new();

        for (line_num, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            match line.parse::<f64>() {
                Ok(value) => match log.sections.last_mut() {
                    Some(section) => section.values.push(value),
                    None => {
                        return Err(LogFileError::ParseError {
                            line: line_num + 1,
                            message: format!("value '{}' before any header", line),
                        })
                    }
                },
                Err(_) => log.push(line, Vec::new()),
            }
        }

        Ok(log)
    }

    /// Read and parse a log file.
    pub fn read(path: &Path) -> Result<Self, LogFileError> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let mut content = String::new();
        for line in reader.lines() {
            content.push_str(&line?);
            content.push('\n');
        }
        let log = Self::parse(&content)?;
        debug!(
            "Read {} sections from {}",
            log.len(),
            path.display()
        );
        Ok(log)
    }

    /// Write every section, overwriting `path`.
    pub fn write(&self, path: &Path) -> Result<(), LogFileError> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        for section in &self.sections {
            writeln!(writer, "{}", section.header)?;
            for value in &section.values {
                writeln!(writer, "{}", value)?;
            }
        }
        writer.flush()?;
        Ok(())
    }
}

/// Per ice shelf basal mass loss time series written by the FESOM
/// post-processing.
///
/// The first section is the total over all shelves, followed by one
/// section per shelf in a fixed order.
#[derive(Clone, Debug)]
pub struct MassLossLog {
    /// Total mass loss over all ice shelves (Gt/y)
    pub total: Vec<f64>,
    /// Mass loss of each shelf (Gt/y), `[shelf][record]`
    pub shelves: Vec<Vec<f64>>,
}

impl MassLossLog {
    /// Interpret a parsed log as total + `n_shelves` shelf sections.
    ///
    /// Extra trailing sections are ignored.
    pub fn from_log(log: SectionedLog, n_shelves: usize) -> Result<Self, LogFileError> {
        let found = log.len();
        if found < n_shelves + 1 {
            return Err(LogFileError::MissingSections {
                expected: n_shelves + 1,
                found,
            });
        }

        let mut sections = log.into_sections().into_iter();
        let total = sections.next().map(|s| s.values).unwrap_or_default();
        let n_time = total.len();

        let shelves = sections
            .take(n_shelves)
            .map(|s| {
                if s.values.len() != n_time {
                    return Err(LogFileError::LengthMismatch {
                        header: s.header,
                        expected: n_time,
                        found: s.values.len(),
                    });
                }
                Ok(s.values)
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { total, shelves })
    }

    /// Read a FESOM mass loss log with `n_shelves` shelf sections.
    pub fn read(path: &Path, n_shelves: usize) -> Result<Self, LogFileError> {
        Self::from_log(SectionedLog::read(path)?, n_shelves)
    }

    /// Number of records per series.
    pub fn n_records(&self) -> usize {
        self.total.len()
    }

    /// Mean mass loss of each shelf over `records`.
    ///
    /// A range running past the end of the log is cut to the records that
    /// exist; only an empty result is an error.
    pub fn mean_over(&self, records: Range<usize>) -> Result<Vec<f64>, LogFileError> {
        let available = self.n_records();
        let end = records.end.min(available);
        if records.start >= end {
            return Err(LogFileError::RangeOutOfBounds {
                start: records.start,
                end: records.end,
                available,
            });
        }
        if end < records.end {
            warn!(
                "Log has {} records, averaging {}..{} instead of {}..{}",
                available, records.start, end, records.start, records.end
            );
        }
        let n = (end - records.start) as f64;
        Ok(self
            .shelves
            .iter()
            .map(|series| series[records.start..end].iter().sum::<f64>() / n)
            .collect())
    }
}
