//! Signal tracks and peak lookup.
//!
//! A signal track maps genomic spans to constant values (bigWig, bedGraph).
//! [`highest_signal`] returns the span with the greatest value inside a
//! query range; ties go to the first span in track order.

use crate::error::{ChecseqError, Result};
use crate::interval::{Interval, SignalInterval};
use crate::streaming::{is_header_line, trim_line_end};
use bigtools::utils::reopen::ReopenableFile;
use bigtools::BigWigRead;
use log::debug;
use rustc_hash::FxHashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

/// A range-queryable source of signal intervals.
pub trait SignalTrack {
    /// Signal intervals on `chrom` overlapping `[start, end)`, in track order.
    ///
    /// An unknown chromosome yields an empty list.
    fn intervals(&mut self, chrom: &str, start: u64, end: u64) -> Result<Vec<SignalInterval>>;
}

/// Find the interval with the highest signal in `[start, end)` on `chrom`.
///
/// Returns `Ok(None)` when nothing overlaps the range (or the range is empty).
pub fn highest_signal<T: SignalTrack + ?Sized>(
    track: &mut T,
    chrom: &str,
    start: u64,
    end: u64,
) -> Result<Option<SignalInterval>> {
    if start >= end {
        return Ok(None);
    }
    let intervals = track.intervals(chrom, start, end)?;
    Ok(pick_highest(intervals))
}

/// Strictly-greater scan: the first of several equal maxima wins.
pub fn pick_highest<I>(intervals: I) -> Option<SignalInterval>
where
    I: IntoIterator<Item = SignalInterval>,
{
    let mut iter = intervals.into_iter();
    let mut best = iter.next()?;
    for candidate in iter {
        if candidate.value > best.value {
            best = candidate;
        }
    }
    Some(best)
}

/// Open a signal file, choosing the reader from its extension.
///
/// `.bw`, `.bigwig` and `.bigWig` open as bigWig; anything else is read as
/// a bedGraph.
pub fn open_track<P: AsRef<Path>>(path: P) -> Result<Box<dyn SignalTrack>> {
    let path = path.as_ref();
    let is_bigwig = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("bw") || e.eq_ignore_ascii_case("bigwig"))
        .unwrap_or(false);

    if is_bigwig {
        Ok(Box::new(BigWigTrack::open(path)?))
    } else {
        Ok(Box::new(BedGraphTrack::from_path(path)?))
    }
}

/// bigWig-backed signal track.
pub struct BigWigTrack {
    reader: BigWigRead<ReopenableFile>,
}

impl BigWigTrack {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let name = path.to_str().ok_or_else(|| {
            ChecseqError::Signal(format!("non UTF-8 path: {}", path.display()))
        })?;
        let reader = BigWigRead::open_file(name)
            .map_err(|e| ChecseqError::Signal(format!("cannot open {}: {}", name, e)))?;
        debug!(
            "Opened bigWig {} with {} chromosomes",
            name,
            reader.info().chrom_info.len()
        );
        Ok(Self { reader })
    }

    fn has_chrom(&self, chrom: &str) -> bool {
        self.reader
            .info()
            .chrom_info
            .iter()
            .any(|info| info.name == chrom)
    }
}

impl SignalTrack for BigWigTrack {
    fn intervals(&mut self, chrom: &str, start: u64, end: u64) -> Result<Vec<SignalInterval>> {
        if !self.has_chrom(chrom) {
            return Ok(Vec::new());
        }
        let to_u32 = |pos: u64| {
            u32::try_from(pos).map_err(|_| {
                ChecseqError::Signal(format!("position {} exceeds bigWig range", pos))
            })
        };
        let (start, end) = (to_u32(start)?, to_u32(end)?);

        let values = self
            .reader
            .get_interval(chrom, start, end)
            .map_err(|e| ChecseqError::Signal(format!("{}:{}-{}: {}", chrom, start, end, e)))?;

        let mut intervals = Vec::new();
        for value in values {
            let value = value.map_err(|e| ChecseqError::Signal(e.to_string()))?;
            intervals.push(SignalInterval::new(
                chrom,
                value.start as u64,
                value.end as u64,
                value.value as f64,
            ));
        }
        Ok(intervals)
    }
}

/// In-memory signal track loaded from a bedGraph file.
///
/// Intervals are kept per chromosome sorted by start; spans that share a
/// start keep their file order.
#[derive(Debug, Default)]
pub struct BedGraphTrack {
    by_chrom: FxHashMap<String, ChromSignal>,
}

#[derive(Debug, Default)]
struct ChromSignal {
    intervals: Vec<SignalInterval>,
    max_len: u64,
}

impl BedGraphTrack {
    /// Build a track from intervals in any order.
    pub fn from_intervals(intervals: impl IntoIterator<Item = SignalInterval>) -> Self {
        let mut by_chrom: FxHashMap<String, ChromSignal> = FxHashMap::default();
        for interval in intervals {
            let entry = by_chrom.entry(interval.chrom().to_string()).or_default();
            entry.max_len = entry.max_len.max(interval.interval.len());
            entry.intervals.push(interval);
        }
        for chrom in by_chrom.values_mut() {
            chrom.intervals.sort_by_key(|iv| iv.start());
        }
        Self { by_chrom }
    }

    /// Load a bedGraph file (`chrom start end value`).
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let track = Self::from_reader(File::open(path)?)?;
        debug!(
            "Loaded bedGraph {} with {} chromosomes",
            path.display(),
            track.by_chrom.len()
        );
        Ok(track)
    }

    /// Load bedGraph text from any reader. `#`, `track` and `browser` lines are skipped.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut intervals = Vec::new();
        for (idx, line) in BufReader::new(reader).split(b'\n').enumerate() {
            let line = line?;
            let line = trim_line_end(&line);
            if line.is_empty() || is_header_line(line) {
                continue;
            }
            intervals.push(parse_bedgraph_line(line, idx + 1)?);
        }
        Ok(Self::from_intervals(intervals))
    }

    /// Number of intervals held.
    pub fn len(&self) -> usize {
        self.by_chrom.values().map(|c| c.intervals.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SignalTrack for BedGraphTrack {
    fn intervals(&mut self, chrom: &str, start: u64, end: u64) -> Result<Vec<SignalInterval>> {
        let Some(signal) = self.by_chrom.get(chrom) else {
            return Ok(Vec::new());
        };
        let query = Interval::new(chrom, start, end);

        // No interval starting before this point can reach the query.
        let lower = start.saturating_sub(signal.max_len);
        let first = signal.intervals.partition_point(|iv| iv.start() < lower);

        Ok(signal.intervals[first..]
            .iter()
            .take_while(|iv| iv.start() < end)
            .filter(|iv| iv.interval.overlaps(&query))
            .cloned()
            .collect())
    }
}

fn parse_bedgraph_line(line: &[u8], line_number: usize) -> Result<SignalInterval> {
    let content = String::from_utf8_lossy(line);
    let fields: Vec<&str> = content.split('\t').collect();
    if fields.len() < 4 {
        return Err(ChecseqError::format(
            line_number,
            format!("Expected 4 bedGraph fields, got {}", fields.len()),
            &content,
        ));
    }
    let position = |s: &str, name: &str| -> Result<u64> {
        s.parse().map_err(|_| {
            ChecseqError::format(
                line_number,
                format!("Invalid {} position: '{}'", name, s),
                &content,
            )
        })
    };
    let start = position(fields[1], "start")?;
    let end = position(fields[2], "end")?;
    let value: f64 = fields[3].parse().map_err(|_| {
        ChecseqError::format(
            line_number,
            format!("Invalid signal value: '{}'", fields[3]),
            &content,
        )
    })?;
    Ok(SignalInterval::new(fields[0], start, end, value))
}
