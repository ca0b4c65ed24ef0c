//! Command implementations for checseq.

pub mod bam_to_bed;
pub mod bedpe_to_bed;
pub mod dyad;
pub mod sort;

pub use bam_to_bed::{BamToBedCommand, BatchStats, SamplePaths, Sorter};
pub use bedpe_to_bed::{BedpeToBedCommand, MergeStats};
pub use dyad::{search_window, DyadCommand, DyadStats};
pub use sort::SortCommand;
