//! Core interval types for genomic region representation.

use std::cmp::Ordering;
use std::fmt;

/// A genomic interval with chromosome, start, and end positions.
/// Uses 0-based, half-open coordinates (BED format).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Interval {
    pub chrom: String,
    pub start: u64,
    pub end: u64,
}

impl Interval {
    /// Create a new interval.
    #[inline]
    pub fn new(chrom: impl Into<String>, start: u64, end: u64) -> Self {
        Self {
            chrom: chrom.into(),
            start,
            end,
        }
    }

    /// Returns the length of the interval.
    #[inline]
    pub fn len(&self) -> u64 {
        self.end.saturating_sub(self.start)
    }

    /// Returns true if the interval has zero length.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    /// Check if this interval overlaps with another.
    #[inline]
    pub fn overlaps(&self, other: &Interval) -> bool {
        self.chrom == other.chrom && self.start < other.end && other.start < self.end
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\t{}\t{}", self.chrom, self.start, self.end)
    }
}

impl Ord for Interval {
    fn cmp(&self, other: &Self) -> Ordering {
        self.chrom
            .cmp(&other.chrom)
            .then(self.start.cmp(&other.start))
            .then(self.end.cmp(&other.end))
    }
}

impl PartialOrd for Interval {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// An interval carrying a constant signal value over its span.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalInterval {
    pub interval: Interval,
    pub value: f64,
}

impl SignalInterval {
    pub fn new(chrom: impl Into<String>, start: u64, end: u64, value: f64) -> Self {
        Self {
            interval: Interval::new(chrom, start, end),
            value,
        }
    }

    #[inline]
    pub fn chrom(&self) -> &str {
        &self.interval.chrom
    }

    #[inline]
    pub fn start(&self) -> u64 {
        self.interval.start
    }

    #[inline]
    pub fn end(&self) -> u64 {
        self.interval.end
    }
}

impl fmt::Display for SignalInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\t{}", self.interval, self.value)
    }
}

/// Strand orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strand {
    Plus,
    Minus,
}

impl Strand {
    /// Parse the numeric strand code used by gene tables (`1` or `-1`).
    ///
    /// BED-style `+`/`-` are accepted as well.
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim() {
            "1" | "+1" | "+" => Some(Strand::Plus),
            "-1" | "-" => Some(Strand::Minus),
            _ => None,
        }
    }
}

impl fmt::Display for Strand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strand::Plus => write!(f, "+"),
            Strand::Minus => write!(f, "-"),
        }
    }
}
