//! BEDPE to BED conversion.
//!
//! Each mate pair becomes one interval spanning both mates:
//! `chrom  min(start1, start2)  max(end1, end2)  [fields 6..]`.
//! Header lines are copied through unchanged and in place. Output order
//! equals input order; genomic ordering is left to a later sort step.
//!
//! Pairs with an unmapped mate (`.` chromosome, `-1` coordinates) are merged
//! like any other pair unless [`BedpeToBedCommand::skip_unmapped`] is set.

use crate::bedpe::{BedpeLine, BedpeReader};
use crate::error::Result;
use crate::streaming::BedWriter;
use log::{debug, warn};
use std::fmt;
use std::fs::File;
use std::io::{self, Read, Write};
use std::path::Path;

/// Statistics from a BEDPE merge run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MergeStats {
    /// Mate pairs written as merged intervals.
    pub records: usize,
    /// Header and comment lines copied through.
    pub headers: usize,
    /// Pairs with an unmapped mate, written or not.
    pub unmapped: usize,
    /// Unmapped pairs left out of the output.
    pub skipped: usize,
}

impl fmt::Display for MergeStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "records={} headers={} unmapped={} skipped={}",
            self.records, self.headers, self.unmapped, self.skipped
        )
    }
}

/// BEDPE to BED merge command.
#[derive(Debug, Clone, Default)]
pub struct BedpeToBedCommand {
    /// Leave pairs with an unmapped mate out of the output.
    pub skip_unmapped: bool,
}

impl BedpeToBedCommand {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_skip_unmapped(mut self, skip_unmapped: bool) -> Self {
        self.skip_unmapped = skip_unmapped;
        self
    }

    /// Merge a BEDPE file into `output`.
    pub fn run<P: AsRef<Path>, W: Write>(&self, input: P, output: &mut W) -> Result<MergeStats> {
        let path = input.as_ref();
        debug!("Merging mate pairs from {}", path.display());
        let reader = BedpeReader::from_path(path)?;
        self.merge_streaming(reader, output)
    }

    /// Merge a BEDPE file into a new BED file at `output`.
    pub fn run_to_file<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        input: P,
        output: Q,
    ) -> Result<MergeStats> {
        let mut file = File::create(output)?;
        self.run(input, &mut file)
    }

    /// Merge from any reader.
    pub fn run_reader<R: Read, W: Write>(&self, input: R, output: &mut W) -> Result<MergeStats> {
        self.merge_streaming(BedpeReader::new(input), output)
    }

    /// Merge from stdin.
    pub fn run_stdin<W: Write>(&self, output: &mut W) -> Result<MergeStats> {
        let stdin = io::stdin();
        self.run_reader(stdin.lock(), output)
    }

    /// Streaming merge: one pass, one line in memory.
    pub fn merge_streaming<R: Read, W: Write>(
        &self,
        reader: BedpeReader<R>,
        output: &mut W,
    ) -> Result<MergeStats> {
        let mut writer = BedWriter::new(output);
        let mut stats = MergeStats::default();

        for line in reader.lines() {
            match line? {
                BedpeLine::Header(raw) => {
                    writer.write_verbatim(&raw)?;
                    stats.headers += 1;
                }
                BedpeLine::Record(record) => {
                    if record.is_unmapped() {
                        stats.unmapped += 1;
                        if self.skip_unmapped {
                            stats.skipped += 1;
                            continue;
                        }
                    }
                    let (start, end) = record.span();
                    writer.write_bed3_with_rest(
                        record.chrom.as_bytes(),
                        start,
                        end,
                        &record.rest,
                    )?;
                    stats.records += 1;
                }
            }
        }

        writer.flush()?;
        if stats.skipped > 0 {
            warn!("Skipped {} pairs with an unmapped mate", stats.skipped);
        } else if stats.unmapped > 0 {
            debug!("Kept {} pairs with an unmapped mate", stats.unmapped);
        }
        Ok(stats)
    }
}
