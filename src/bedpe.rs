//! Streaming BEDPE reader.
//!
//! BEDPE lines as written by `bedtools bamtobed -bedpe`:
//! `chrom1 start1 end1 chrom2 start2 end2 [name score strand1 strand2 ...]`.
//! Header lines (`#`, `track`, `browser`) are returned untouched so callers
//! can pass them through byte-for-byte.

use crate::error::{ChecseqError, Result};
use crate::streaming::{is_header_line, parse_i64_fast, split_leading_fields, trim_line_end};
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

/// Number of fixed BEDPE columns before the descriptive fields.
pub const BEDPE_FIXED_FIELDS: usize = 6;

/// A paired-end record with both mate spans.
///
/// Coordinates are signed because `bedtools` reports an unmapped mate as
/// chromosome `.` with coordinates `-1`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BedpeRecord {
    pub chrom: String,
    pub start1: i64,
    pub end1: i64,
    pub chrom2: String,
    pub start2: i64,
    pub end2: i64,
    /// Everything after the sixth column, including its leading tab.
    pub rest: Vec<u8>,
}

impl BedpeRecord {
    /// Parse one BEDPE line (without its line terminator).
    pub fn parse(line: &[u8], line_number: usize) -> Result<Self> {
        let content = String::from_utf8_lossy(line);
        let (fields, count, rest_start) = split_leading_fields::<BEDPE_FIXED_FIELDS>(line);

        if count < BEDPE_FIXED_FIELDS {
            return Err(ChecseqError::format(
                line_number,
                format!(
                    "Expected at least {} fields, got {}",
                    BEDPE_FIXED_FIELDS, count
                ),
                &content,
            ));
        }

        let coord = |idx: usize, name: &str| -> Result<i64> {
            parse_i64_fast(fields[idx]).ok_or_else(|| {
                ChecseqError::format(
                    line_number,
                    format!(
                        "Invalid {} position: '{}'",
                        name,
                        String::from_utf8_lossy(fields[idx])
                    ),
                    &content,
                )
            })
        };

        let text = |idx: usize| -> Result<String> {
            std::str::from_utf8(fields[idx])
                .map(str::to_string)
                .map_err(|_| {
                    ChecseqError::format(line_number, "Invalid UTF-8 in chromosome", &content)
                })
        };

        Ok(Self {
            chrom: text(0)?,
            start1: coord(1, "start1")?,
            end1: coord(2, "end1")?,
            chrom2: text(3)?,
            start2: coord(4, "start2")?,
            end2: coord(5, "end2")?,
            rest: line[rest_start..].to_vec(),
        })
    }

    /// True if either mate is reported as unmapped.
    pub fn is_unmapped(&self) -> bool {
        self.chrom == "."
            || self.chrom2 == "."
            || self.start1 < 0
            || self.end1 < 0
            || self.start2 < 0
            || self.end2 < 0
    }

    /// The span enclosing both mates: `(min(start1, start2), max(end1, end2))`.
    ///
    /// Unmapped coordinates (`-1`) take part like any other value.
    pub fn span(&self) -> (i64, i64) {
        (self.start1.min(self.start2), self.end1.max(self.end2))
    }
}

/// One line of a BEDPE stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BedpeLine {
    /// Header or comment line, terminator included.
    Header(Vec<u8>),
    Record(BedpeRecord),
}

/// A streaming BEDPE file reader.
pub struct BedpeReader<R: Read> {
    reader: BufReader<R>,
    line_number: usize,
    buffer: Vec<u8>,
}

impl BedpeReader<File> {
    /// Open a BEDPE file from a path.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        Ok(Self::new(file))
    }
}

impl<R: Read> BedpeReader<R> {
    /// Create a new BEDPE reader from any readable source.
    pub fn new(reader: R) -> Self {
        Self {
            reader: BufReader::new(reader),
            line_number: 0,
            buffer: Vec::with_capacity(1024),
        }
    }

    /// Read the next header or record, skipping blank lines.
    pub fn read_line(&mut self) -> Result<Option<BedpeLine>> {
        loop {
            self.buffer.clear();
            let bytes_read = self.reader.read_until(b'\n', &mut self.buffer)?;
            if bytes_read == 0 {
                return Ok(None);
            }
            self.line_number += 1;

            if is_header_line(&self.buffer) {
                return Ok(Some(BedpeLine::Header(self.buffer.clone())));
            }

            let line = trim_line_end(&self.buffer);
            if line.is_empty() {
                continue;
            }

            return BedpeRecord::parse(line, self.line_number)
                .map(BedpeLine::Record)
                .map(Some);
        }
    }

    /// Get an iterator over all lines.
    pub fn lines(self) -> BedpeLineIter<R> {
        BedpeLineIter { reader: self }
    }
}

/// Iterator over BEDPE lines.
pub struct BedpeLineIter<R: Read> {
    reader: BedpeReader<R>,
}

impl<R: Read> Iterator for BedpeLineIter<R> {
    type Item = Result<BedpeLine>;

    fn next(&mut self) -> Option<Self::Item> {
        self.reader.read_line().transpose()
    }
}
