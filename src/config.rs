//! Run configuration shared by the commands.
//!
//! Everything here is validated once at startup, before any input file is
//! opened, so that a bad parameter never leaves partial output behind.

use crate::error::{ChecseqError, Result};
use clap::ValueEnum;

/// The only dyad index currently supported by the `dyad` command.
pub const SUPPORTED_DYAD_INDEX: i64 = 2;

/// Distance from the reference nucleosome to the near edge of the search window.
pub const NUCLEOSOME_OFFSET: u64 = 141;

/// Width of the search window.
pub const SEARCH_WIDTH: u64 = 41;

/// Marker written in the output slot when no signal was found.
pub const NO_SIGNAL_SENTINEL: &str = ".";

/// Reject any dyad index other than [`SUPPORTED_DYAD_INDEX`].
pub fn validate_dyad_index(dyad: i64) -> Result<()> {
    if dyad != SUPPORTED_DYAD_INDEX {
        return Err(ChecseqError::Config(format!(
            "dyad parameter must be {}, got {}",
            SUPPORTED_DYAD_INDEX, dyad
        )));
    }
    Ok(())
}

/// Thread count must leave room for the main thread.
pub fn validate_threads(threads: usize) -> Result<()> {
    if threads == 0 {
        return Err(ChecseqError::Config(
            "threads must be at least 1".to_string(),
        ));
    }
    Ok(())
}

/// What to do with a gene whose search window holds no signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum MissingSignal {
    /// Write `.` into the output slot
    #[default]
    Sentinel,
    /// Drop the gene from the output
    Skip,
    /// Abort the gene file
    Fail,
}
