//! In-process BED sort.
//!
//! Sort order (matches `bedtools sort` and `LC_ALL=C sort -k1,1 -k2,2n -k3,3n`):
//! 1. Primary: chromosome (lexicographic, byte order)
//! 2. Secondary: start coordinate (ascending, numeric)
//! 3. Tertiary: end coordinate (ascending, numeric)
//! 4. Ties: input order preserved (stable sort)
//!
//! Header and comment lines are emitted first, in their original order.
//! Sorting an already sorted file returns it unchanged.

use crate::error::{ChecseqError, Result};
use crate::streaming::{is_header_line, parse_i64_fast, split_leading_fields, trim_line_end};
use log::debug;
use rayon::prelude::*;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::Path;

/// A BED line with its parsed sort key.
#[derive(Debug, Clone)]
struct SortLine {
    chrom_end: usize,
    start: i64,
    end: i64,
    line: Vec<u8>,
}

impl SortLine {
    #[inline]
    fn chrom(&self) -> &[u8] {
        &self.line[..self.chrom_end]
    }
}

/// Sort command configuration.
#[derive(Debug, Clone)]
pub struct SortCommand {
    /// Use the rayon pool for sorting.
    pub parallel: bool,
}

impl Default for SortCommand {
    fn default() -> Self {
        Self::new()
    }
}

impl SortCommand {
    pub fn new() -> Self {
        Self { parallel: true }
    }

    /// Enable or disable parallel sorting.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Sort a BED file into a new file.
    pub fn run<P: AsRef<Path>, Q: AsRef<Path>>(&self, input: P, output: Q) -> Result<usize> {
        debug!(
            "Sorting {} into {}",
            input.as_ref().display(),
            output.as_ref().display()
        );
        let reader = File::open(input)?;
        let mut out = File::create(output)?;
        self.sort_reader(reader, &mut out)
    }

    /// Sort BED lines from any reader. Returns the number of records written.
    pub fn sort_reader<R: Read, W: Write>(&self, input: R, output: &mut W) -> Result<usize> {
        let mut reader = BufReader::new(input);
        let mut headers: Vec<Vec<u8>> = Vec::new();
        let mut records: Vec<SortLine> = Vec::new();
        let mut buffer = Vec::with_capacity(1024);
        let mut line_number = 0;

        loop {
            buffer.clear();
            if reader.read_until(b'\n', &mut buffer)? == 0 {
                break;
            }
            line_number += 1;

            let line = trim_line_end(&buffer);
            if line.is_empty() {
                continue;
            }
            if is_header_line(line) {
                headers.push(line.to_vec());
                continue;
            }
            records.push(parse_sort_line(line, line_number)?);
        }

        self.sort_lines(&mut records);

        let mut writer = BufWriter::with_capacity(256 * 1024, output);
        for header in &headers {
            writer.write_all(header)?;
            writer.write_all(b"\n")?;
        }
        for record in &records {
            writer.write_all(&record.line)?;
            writer.write_all(b"\n")?;
        }
        writer.flush()?;

        Ok(records.len())
    }

    fn sort_lines(&self, records: &mut [SortLine]) {
        let compare = |a: &SortLine, b: &SortLine| {
            a.chrom()
                .cmp(b.chrom())
                .then_with(|| a.start.cmp(&b.start))
                .then_with(|| a.end.cmp(&b.end))
        };
        // Both variants are stable, so ties keep input order.
        if self.parallel {
            records.par_sort_by(compare);
        } else {
            records.sort_by(compare);
        }
    }
}

fn parse_sort_line(line: &[u8], line_number: usize) -> Result<SortLine> {
    let content = String::from_utf8_lossy(line);
    let (fields, count, _) = split_leading_fields::<3>(line);
    if count < 3 {
        return Err(ChecseqError::format(
            line_number,
            format!("Expected at least 3 fields, got {}", count),
            &content,
        ));
    }
    let position = |idx: usize, name: &str| {
        parse_i64_fast(fields[idx]).ok_or_else(|| {
            ChecseqError::format(line_number, format!("Invalid {} position", name), &content)
        })
    };
    Ok(SortLine {
        chrom_end: fields[0].len(),
        start: position(1, "start")?,
        end: position(2, "end")?,
        line: line.to_vec(),
    })
}
