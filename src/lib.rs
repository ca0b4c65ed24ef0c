//! checseq-tools: helpers for ChEC-seq / MNase-seq analysis.
//!
//! - **dyad**: locate the next nucleosome of each gene from a signal track
//!   (bigWig or bedGraph).
//! - **bam-to-bed**: convert paired-end BAM files to merged, sorted BED files
//!   using samtools and bedtools.
//! - **bedpe-to-bed**: merge each mate pair of a BEDPE file into one interval.
//!
//! # Example
//!
//! ```rust,no_run
//! use checseq_tools::commands::DyadCommand;
//! use checseq_tools::signal::open_track;
//!
//! let mut track = open_track("signal.bw").unwrap();
//! let stats = DyadCommand::new()
//!     .run("genes.txt", track.as_mut(), "genes-out.txt")
//!     .unwrap();
//! println!("{}", stats);
//! ```

pub mod bedpe;
pub mod commands;
pub mod config;
pub mod error;
pub mod external;
pub mod genes;
pub mod interval;
pub mod samples;
pub mod signal;
pub mod streaming;

// Re-export commonly used types
pub use error::{ChecseqError, Result};
pub use interval::{Interval, SignalInterval, Strand};
pub use signal::{highest_signal, SignalTrack};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::bedpe::{BedpeLine, BedpeReader, BedpeRecord};
    pub use crate::commands::{
        BamToBedCommand, BedpeToBedCommand, DyadCommand, SortCommand, Sorter,
    };
    pub use crate::config::MissingSignal;
    pub use crate::error::{ChecseqError, Result};
    pub use crate::external::{SystemRunner, ToolInvocation, ToolRunner};
    pub use crate::genes::{GeneLine, GeneReader, GeneRecord};
    pub use crate::interval::{Interval, SignalInterval, Strand};
    pub use crate::signal::{highest_signal, open_track, BedGraphTrack, BigWigTrack, SignalTrack};
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_bedpe_merge_then_sort() {
        use crate::commands::{BedpeToBedCommand, SortCommand};

        let bedpe = "chr2\t5\t9\tchr2\t7\t12\tr1\nchr1\t100\t200\tchr1\t150\t250\tr2\n";
        let mut merged = Vec::new();
        BedpeToBedCommand::new()
            .run_reader(bedpe.as_bytes(), &mut merged)
            .unwrap();

        let mut sorted = Vec::new();
        let count = SortCommand::new()
            .sort_reader(merged.as_slice(), &mut sorted)
            .unwrap();

        assert_eq!(count, 2);
        assert_eq!(
            String::from_utf8(sorted).unwrap(),
            "chr1\t100\t250\tr2\nchr2\t5\t12\tr1\n"
        );
    }

    #[test]
    fn test_dyad_workflow() {
        use crate::commands::DyadCommand;
        use crate::signal::BedGraphTrack;

        let bedgraph = "track type=bedGraph\nchrI\t1141\t1160\t5\nchrI\t1160\t1182\t9\n";
        let mut track = BedGraphTrack::from_reader(bedgraph.as_bytes()).unwrap();

        let genes = "#name\tchrom\nYFG1\tchrI\t1\t2\t-1\tYFG1\t0\t1000\t0\t0\t0\t\n";
        let mut out = Vec::new();
        let stats = DyadCommand::new()
            .run_reader(genes.as_bytes(), &mut track, &mut out)
            .unwrap();

        assert_eq!(stats.found, 1);
        assert!(String::from_utf8(out).unwrap().ends_with("\t1160\n"));
    }
}
