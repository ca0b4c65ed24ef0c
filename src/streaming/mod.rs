//! Shared streaming utilities.
//!
//! - Zero-allocation line splitting and integer parsing
//! - Buffered BED output formatting

pub mod output;
pub mod parsing;

pub use output::BedWriter;
pub use parsing::{is_header_line, parse_i64_fast, split_leading_fields, trim_line_end};
