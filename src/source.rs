//! Record source for the flat line-oriented contingency table format
//!
//! ```text
//! CSI                              <- score name
//! 0                                <- outlier sd limit (0 disables)
//! ; comment lines and lines starting with whitespace are skipped
//! valid_time avtime hits fas misses crs [hits fas misses crs]
//! ```
//!
//! Six numeric fields per record mean a single-system run, ten mean a
//! paired run; the first record decides and every later record must agree.
//! Consecutive records sharing an `avtime` form one [`Group`].

use crate::contingency::{ContingencyTable, ContingencyTablePair, Group, SystemMode};
use crate::error::{Error, Result};
use std::io::BufRead;

const SINGLE_FIELDS: usize = 6;
const PAIRED_FIELDS: usize = 10;

/// Run settings carried in the first two lines of the input
#[derive(Debug, Clone, PartialEq)]
pub struct Header {
    pub stat: String,
    pub sd_limit: f64,
}

/// One parsed data line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Record {
    pub avtime: i64,
    pub mode: SystemMode,
    pub pair: ContingencyTablePair,
}

/// Whether a line carries no record (comment, blank, or indented)
pub fn is_skipped(line: &str) -> bool {
    match line.chars().next() {
        None => true,
        Some(c) => c == ';' || c.is_whitespace(),
    }
}

/// Parse one data line (`line_no` is 1-based, for messages)
pub fn parse_record(line: &str, line_no: usize) -> Result<Record> {
    let malformed = |reason: String| Error::MalformedRecord {
        line: line_no,
        reason,
    };

    let fields: Vec<&str> = line.split_whitespace().collect();
    let mode = match fields.len() {
        SINGLE_FIELDS => SystemMode::Single,
        PAIRED_FIELDS => SystemMode::Paired,
        n => {
            return Err(malformed(format!(
                "expected {} or {} fields, found {}",
                SINGLE_FIELDS, PAIRED_FIELDS, n
            )))
        }
    };

    let mut values = Vec::with_capacity(fields.len());
    for field in &fields {
        let value: i64 = field
            .parse()
            .map_err(|_| malformed(format!("{:?} is not an integer", field)))?;
        values.push(value);
    }

    let count = |idx: usize| -> Result<u64> {
        u64::try_from(values[idx])
            .map_err(|_| malformed(format!("negative count {}", values[idx])))
    };
    // Per-table field order is hits, false alarms, misses, correct rejections
    let table = |start: usize| -> Result<ContingencyTable> {
        Ok(ContingencyTable {
            hits: count(start)?,
            false_alarms: count(start + 1)?,
            misses: count(start + 2)?,
            correct_rejections: count(start + 3)?,
        })
    };

    let valid_time = values[0];
    let avtime = values[1];
    let pair = match mode {
        SystemMode::Single => ContingencyTablePair::single(valid_time, table(2)?),
        SystemMode::Paired => ContingencyTablePair::paired(valid_time, table(2)?, table(6)?),
    };

    Ok(Record { avtime, mode, pair })
}

/// Streams groups of contingency table pairs from a reader
#[derive(Debug)]
pub struct RecordSource<R> {
    reader: R,
    header: Header,
    line_no: usize,
    mode: Option<SystemMode>,
    pending: Option<Record>,
    max_pairs: usize,
    finished: bool,
    buf: String,
}

impl<R: BufRead> RecordSource<R> {
    /// Read the two header lines and prepare to stream groups
    pub fn from_reader(mut reader: R, max_pairs: usize) -> Result<Self> {
        let mut buf = String::new();

        if reader.read_line(&mut buf)? == 0 {
            return Err(Error::MissingHeader("stat type"));
        }
        let stat = buf
            .split_whitespace()
            .next()
            .ok_or_else(|| Error::InvalidHeader {
                line: 1,
                value: buf.trim_end().to_string(),
            })?
            .to_string();

        buf.clear();
        if reader.read_line(&mut buf)? == 0 {
            return Err(Error::MissingHeader("sd limit"));
        }
        let sd_limit = buf
            .split_whitespace()
            .next()
            .and_then(|s| s.parse::<f64>().ok())
            .filter(|v| v.is_finite())
            .ok_or_else(|| Error::InvalidHeader {
                line: 2,
                value: buf.trim_end().to_string(),
            })?;

        tracing::debug!(stat = %stat, sd_limit, "read input header");

        Ok(Self {
            reader,
            header: Header { stat, sd_limit },
            line_no: 2,
            mode: None,
            pending: None,
            max_pairs,
            finished: false,
            buf: String::new(),
        })
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    /// Run mode, known once the first record has been read
    pub fn mode(&self) -> Option<SystemMode> {
        self.mode
    }

    fn next_record(&mut self) -> Result<Option<Record>> {
        loop {
            self.buf.clear();
            if self.reader.read_line(&mut self.buf)? == 0 {
                return Ok(None);
            }
            self.line_no += 1;
            if is_skipped(&self.buf) {
                continue;
            }

            let record = parse_record(&self.buf, self.line_no)?;
            match self.mode {
                None => self.mode = Some(record.mode),
                Some(mode) if mode != record.mode => {
                    return Err(Error::ModeMismatch {
                        line: self.line_no,
                        expected: mode.as_str(),
                        found: self.buf.split_whitespace().count(),
                    });
                }
                Some(_) => {}
            }
            return Ok(Some(record));
        }
    }

    fn fail(&mut self, err: Error) -> Option<Result<Group>> {
        self.finished = true;
        Some(Err(err))
    }
}

impl<R: BufRead> Iterator for RecordSource<R> {
    type Item = Result<Group>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        let first = match self.pending.take() {
            Some(record) => record,
            None => match self.next_record() {
                Ok(Some(record)) => record,
                Ok(None) => {
                    self.finished = true;
                    return None;
                }
                Err(e) => return self.fail(e),
            },
        };
        let mut group = Group::new(first.avtime, first.pair);

        loop {
            match self.next_record() {
                Ok(Some(record)) if record.avtime == group.avtime => {
                    if group.len() >= self.max_pairs {
                        return self.fail(Error::CapacityExceeded {
                            avtime: group.avtime,
                            max: self.max_pairs,
                        });
                    }
                    group.push(record.pair);
                }
                Ok(Some(record)) => {
                    self.pending = Some(record);
                    return Some(Ok(group));
                }
                Ok(None) => {
                    self.finished = true;
                    return Some(Ok(group));
                }
                Err(e) => return self.fail(e),
            }
        }
    }
}
