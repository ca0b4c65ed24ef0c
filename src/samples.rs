//! Samples list reader.
//!
//! The first line of the list is a label row and is always ignored. Every
//! other non-blank line not starting with `#` names one sample in its first
//! tab-separated column; further columns are free-form.

use crate::error::Result;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

/// Read sample names from a samples list file.
pub fn read_samples<P: AsRef<Path>>(path: P) -> Result<Vec<String>> {
    let file = File::open(path)?;
    parse_samples(file)
}

/// Read sample names from any reader.
pub fn parse_samples<R: Read>(input: R) -> Result<Vec<String>> {
    let reader = BufReader::new(input);
    let mut samples = Vec::new();

    for line in reader.lines().skip(1) {
        let line = line?;
        let line = line.trim_end_matches('\r');
        if line.starts_with('#') {
            continue;
        }
        let name = line.split('\t').next().unwrap_or("").trim();
        if name.is_empty() {
            continue;
        }
        samples.push(name.to_string());
    }

    Ok(samples)
}
