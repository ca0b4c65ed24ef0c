//! Gene table reader.
//!
//! Gene tables are tab-separated with fixed column positions:
//!
//! | index | content                          |
//! |-------|----------------------------------|
//! | 1     | chromosome                       |
//! | 4     | strand (`1` or `-1`)             |
//! | 7     | first nucleosome dyad coordinate |
//! | 11    | next nucleosome (written here)   |
//!
//! Every other column is carried through untouched.

use crate::error::{ChecseqError, Result};
use crate::interval::Strand;
use crate::streaming::trim_line_end;
use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

pub const CHROM_FIELD: usize = 1;
pub const STRAND_FIELD: usize = 4;
pub const NUCLEOSOME_FIELD: usize = 7;
pub const OUTPUT_FIELD: usize = 11;

/// A gene row with its relevant columns validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneRecord {
    pub chrom: String,
    pub strand: Strand,
    pub first_nucleosome: u64,
    /// Line number in the source table, for error messages.
    pub line: usize,
    fields: Vec<String>,
    crlf: bool,
}

impl GeneRecord {
    /// Parse one gene row (without its line terminator).
    pub fn parse(line: &str, line_number: usize) -> Result<Self> {
        let fields: Vec<String> = line.split('\t').map(str::to_string).collect();

        let field = |idx: usize, name: &str| column(&fields, idx, name, line_number, line);

        let chrom = field(CHROM_FIELD, "chromosome")?.to_string();
        let strand_code = field(STRAND_FIELD, "strand")?;
        let strand = Strand::from_code(strand_code).ok_or_else(|| {
            ChecseqError::format(
                line_number,
                format!("Invalid strand '{}' (expected 1 or -1)", strand_code),
                line,
            )
        })?;
        let nucleosome = field(NUCLEOSOME_FIELD, "nucleosome")?;
        let first_nucleosome: u64 = nucleosome.trim().parse().map_err(|_| {
            ChecseqError::format(
                line_number,
                format!("Invalid nucleosome position: '{}'", nucleosome),
                line,
            )
        })?;

        Ok(Self {
            chrom,
            strand,
            first_nucleosome,
            line: line_number,
            fields,
            crlf: false,
        })
    }

    /// Gene identifier for log messages (first column).
    pub fn name(&self) -> &str {
        self.fields.first().map(String::as_str).unwrap_or("")
    }

    /// All columns in their original order.
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Write the next nucleosome column, padding short rows with empty columns.
    pub fn set_next_nucleosome(&mut self, value: impl fmt::Display) {
        if self.fields.len() <= OUTPUT_FIELD {
            self.fields.resize(OUTPUT_FIELD + 1, String::new());
        }
        self.fields[OUTPUT_FIELD] = value.to_string();
    }

    /// Terminator the row had in its source table.
    pub fn line_ending(&self) -> &'static str {
        if self.crlf {
            "\r\n"
        } else {
            "\n"
        }
    }

    /// Current content of the next nucleosome column.
    pub fn next_nucleosome(&self) -> Option<&str> {
        self.fields.get(OUTPUT_FIELD).map(String::as_str)
    }
}

fn column<'a>(
    fields: &'a [String],
    idx: usize,
    name: &str,
    line_number: usize,
    line: &str,
) -> Result<&'a str> {
    fields.get(idx).map(String::as_str).ok_or_else(|| {
        ChecseqError::format(
            line_number,
            format!(
                "Missing {} column (index {}), got {} fields",
                name,
                idx,
                fields.len()
            ),
            line,
        )
    })
}

impl fmt::Display for GeneRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, field) in self.fields.iter().enumerate() {
            if i > 0 {
                f.write_str("\t")?;
            }
            f.write_str(field)?;
        }
        Ok(())
    }
}

/// One line of a gene table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GeneLine {
    /// `#` comment, terminator included.
    Comment(String),
    Record(GeneRecord),
}

/// A streaming gene table reader.
pub struct GeneReader<R: Read> {
    reader: BufReader<R>,
    line_number: usize,
    buffer: Vec<u8>,
}

impl GeneReader<File> {
    /// Open a gene table from a path.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        Ok(Self::new(file))
    }
}

impl<R: Read> GeneReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader: BufReader::new(reader),
            line_number: 0,
            buffer: Vec::with_capacity(512),
        }
    }

    /// Read the next comment or gene row, skipping blank lines.
    pub fn read_line(&mut self) -> Result<Option<GeneLine>> {
        loop {
            self.buffer.clear();
            let bytes_read = self.reader.read_until(b'\n', &mut self.buffer)?;
            if bytes_read == 0 {
                return Ok(None);
            }
            self.line_number += 1;

            let text = std::str::from_utf8(&self.buffer).map_err(|e| {
                ChecseqError::format(
                    self.line_number,
                    format!("Invalid UTF-8 after byte {}", e.valid_up_to()),
                    &String::from_utf8_lossy(trim_line_end(&self.buffer)),
                )
            })?;

            if text.starts_with('#') {
                return Ok(Some(GeneLine::Comment(text.to_string())));
            }

            let line = text.strip_suffix('\n').unwrap_or(text);
            let crlf = line.ends_with('\r');
            let line = line.strip_suffix('\r').unwrap_or(line);
            if line.trim().is_empty() {
                continue;
            }

            let mut gene = GeneRecord::parse(line, self.line_number)?;
            gene.crlf = crlf;
            return Ok(Some(GeneLine::Record(gene)));
        }
    }

    /// Get an iterator over all lines.
    pub fn lines(self) -> GeneLineIter<R> {
        GeneLineIter { reader: self }
    }
}

/// Iterator over gene table lines.
pub struct GeneLineIter<R: Read> {
    reader: GeneReader<R>,
}

impl<R: Read> Iterator for GeneLineIter<R> {
    type Item = Result<GeneLine>;

    fn next(&mut self) -> Option<Self::Item> {
        self.reader.read_line().transpose()
    }
}
