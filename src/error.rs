//! Error type shared by all commands.

use std::io;
use thiserror::Error;

/// Errors that can occur while processing genes, samples or interval files.
#[derive(Error, Debug)]
pub enum ChecseqError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Parse error at line {line}: {message}")]
    Format { line: usize, message: String },

    #[error("{tool} failed: {message}")]
    ExternalTool { tool: String, message: String },

    #[error("No signal found for gene at line {line}: {gene}")]
    MissingSignal { line: usize, gene: String },

    #[error("Signal track error: {0}")]
    Signal(String),

    #[error("{failed} of {total} samples failed: {samples}")]
    SamplesFailed {
        failed: usize,
        total: usize,
        samples: String,
    },
}

impl ChecseqError {
    /// Build a format error that quotes the offending line.
    pub fn format(line: usize, message: impl Into<String>, content: &str) -> Self {
        ChecseqError::Format {
            line,
            message: format!("{} in '{}'", message.into(), content),
        }
    }

    /// Build an external tool error.
    pub fn external(tool: impl Into<String>, message: impl Into<String>) -> Self {
        ChecseqError::ExternalTool {
            tool: tool.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ChecseqError>;
