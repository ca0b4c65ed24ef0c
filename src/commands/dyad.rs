//! Dyad command: locate the next nucleosome of each gene.
//!
//! For every gene the search window sits just past the first nucleosome,
//! on the side given by the strand:
//!
//! - minus strand: `[r + 141, r + 182)`
//! - plus strand:  `[r - 182, r - 141)`
//!
//! where `r` is the first nucleosome dyad. The start of the strongest signal
//! interval in that window becomes the next nucleosome position.

use crate::config::{MissingSignal, NO_SIGNAL_SENTINEL, NUCLEOSOME_OFFSET, SEARCH_WIDTH};
use crate::error::{ChecseqError, Result};
use crate::genes::{GeneLine, GeneReader, GeneRecord};
use crate::interval::{Interval, Strand};
use crate::signal::{highest_signal, SignalTrack};
use log::{debug, info, warn};
use std::fmt;
use std::io::{BufWriter, Read, Write};
use std::path::Path;
use tempfile::NamedTempFile;

/// Statistics from a dyad run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DyadStats {
    /// Gene rows read.
    pub genes: usize,
    /// Genes with a signal peak in their window.
    pub found: usize,
    /// Genes without any signal in their window.
    pub missing: usize,
    /// Comment lines copied through.
    pub comments: usize,
}

impl fmt::Display for DyadStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "genes={} found={} missing={} comments={}",
            self.genes, self.found, self.missing, self.comments
        )
    }
}

/// Search window for the next nucleosome, normalized to `start < end`.
///
/// Returns None when the window falls entirely before position 0.
pub fn search_window(strand: Strand, first_nucleosome: u64) -> Option<(u64, u64)> {
    let r = first_nucleosome as i128;
    let offset = NUCLEOSOME_OFFSET as i128;
    let width = SEARCH_WIDTH as i128;

    let (start, end) = match strand {
        Strand::Minus => (r + offset, r + offset + width),
        Strand::Plus => (r - offset, r - offset - width),
    };
    let low = start.min(end).max(0);
    let high = start.max(end).max(0);
    if low >= high {
        return None;
    }
    Some((low as u64, high as u64))
}

/// Dyad command configuration.
#[derive(Debug, Clone, Default)]
pub struct DyadCommand {
    /// What to write when a window holds no signal.
    pub missing: MissingSignal,
}

impl DyadCommand {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_missing(mut self, missing: MissingSignal) -> Self {
        self.missing = missing;
        self
    }

    /// The window to query for one gene.
    pub fn window(&self, gene: &GeneRecord) -> Option<Interval> {
        search_window(gene.strand, gene.first_nucleosome)
            .map(|(start, end)| Interval::new(gene.chrom.as_str(), start, end))
    }

    /// Fill in the next nucleosome of one gene.
    ///
    /// Returns false when the gene has no signal in its window.
    pub fn locate<T: SignalTrack + ?Sized>(
        &self,
        gene: &mut GeneRecord,
        track: &mut T,
    ) -> Result<bool> {
        let peak = match self.window(gene) {
            Some(window) => highest_signal(track, &window.chrom, window.start, window.end)?,
            None => None,
        };

        match peak {
            Some(peak) => {
                debug!(
                    "{}: next nucleosome at {} (signal {})",
                    gene.name(),
                    peak.start(),
                    peak.value
                );
                gene.set_next_nucleosome(peak.start());
                Ok(true)
            }
            None => match self.missing {
                MissingSignal::Fail => Err(ChecseqError::MissingSignal {
                    line: gene.line,
                    gene: gene.name().to_string(),
                }),
                MissingSignal::Sentinel | MissingSignal::Skip => {
                    gene.set_next_nucleosome(NO_SIGNAL_SENTINEL);
                    Ok(false)
                }
            },
        }
    }

    /// Annotate a gene table file into `output`.
    ///
    /// Rows are written to a temporary file next to `output`, which replaces
    /// `output` only once every row was processed.
    pub fn run<P, Q, T>(&self, genes: P, track: &mut T, output: Q) -> Result<DyadStats>
    where
        P: AsRef<Path>,
        Q: AsRef<Path>,
        T: SignalTrack + ?Sized,
    {
        let genes = genes.as_ref();
        let output = output.as_ref();
        info!(
            "Locating next nucleosomes for {} into {}",
            genes.display(),
            output.display()
        );
        let reader = GeneReader::from_path(genes)?;
        let dir = match output.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut out = NamedTempFile::new_in(dir)?;
        let stats = self.annotate(reader, track, out.as_file_mut())?;
        out.persist(output).map_err(|e| ChecseqError::Io(e.error))?;
        info!("Dyad stats: {}", stats);
        Ok(stats)
    }

    /// Annotate genes from any reader.
    pub fn run_reader<R, W, T>(&self, input: R, track: &mut T, output: &mut W) -> Result<DyadStats>
    where
        R: Read,
        W: Write,
        T: SignalTrack + ?Sized,
    {
        self.annotate(GeneReader::new(input), track, output)
    }

    /// Streaming annotation: comments stay in place, rows keep their columns.
    pub fn annotate<R, W, T>(
        &self,
        reader: GeneReader<R>,
        track: &mut T,
        output: &mut W,
    ) -> Result<DyadStats>
    where
        R: Read,
        W: Write,
        T: SignalTrack + ?Sized,
    {
        let mut writer = BufWriter::with_capacity(256 * 1024, output);
        let mut stats = DyadStats::default();

        for line in reader.lines() {
            match line? {
                GeneLine::Comment(raw) => {
                    writer.write_all(raw.as_bytes())?;
                    stats.comments += 1;
                }
                GeneLine::Record(mut gene) => {
                    stats.genes += 1;
                    if self.locate(&mut gene, track)? {
                        stats.found += 1;
                    } else {
                        stats.missing += 1;
                        if self.missing == MissingSignal::Skip {
                            warn!(
                                "No signal for {} (line {}), dropping it",
                                gene.name(),
                                gene.line
                            );
                            continue;
                        }
                        warn!("No signal for {} (line {})", gene.name(), gene.line);
                    }
                    write!(writer, "{}{}", gene, gene.line_ending())?;
                }
            }
        }

        writer.flush()?;
        Ok(stats)
    }
}
