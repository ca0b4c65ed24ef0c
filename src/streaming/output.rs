//! Efficient output formatting for streaming operations.
//!
//! Uses itoa for integer formatting to avoid allocation in the hot path.

use crate::error::{ChecseqError, Result};
use std::io::{BufWriter, Write};

/// Buffer size for BedWriter (1MB default).
const DEFAULT_BUFFER_SIZE: usize = 1024 * 1024;

/// Buffered BED output writer.
pub struct BedWriter<W: Write> {
    writer: BufWriter<W>,
    itoa_buf: itoa::Buffer,
}

impl<W: Write> BedWriter<W> {
    /// Create a new BedWriter with the default buffer.
    pub fn new(output: W) -> Self {
        Self::with_capacity(DEFAULT_BUFFER_SIZE, output)
    }

    /// Create a new BedWriter with specified buffer size.
    pub fn with_capacity(capacity: usize, output: W) -> Self {
        Self {
            writer: BufWriter::with_capacity(capacity, output),
            itoa_buf: itoa::Buffer::new(),
        }
    }

    /// Write a BED3 record (chrom, start, end) without newline.
    #[inline]
    pub fn write_bed3(&mut self, chrom: &[u8], start: i64, end: i64) -> Result<()> {
        self.writer.write_all(chrom)?;
        self.writer.write_all(b"\t")?;
        self.writer
            .write_all(self.itoa_buf.format(start).as_bytes())?;
        self.writer.write_all(b"\t")?;
        self.writer.write_all(self.itoa_buf.format(end).as_bytes())?;
        Ok(())
    }

    /// Write a BED3 record followed by the given tail and a newline.
    ///
    /// `rest` must either be empty or start with its own tab separator.
    #[inline]
    pub fn write_bed3_with_rest(
        &mut self,
        chrom: &[u8],
        start: i64,
        end: i64,
        rest: &[u8],
    ) -> Result<()> {
        self.write_bed3(chrom, start, end)?;
        self.writer.write_all(rest)?;
        self.writer.write_all(b"\n")?;
        Ok(())
    }

    /// Write bytes exactly as given, terminator included.
    #[inline]
    pub fn write_verbatim(&mut self, bytes: &[u8]) -> Result<()> {
        self.writer.write_all(bytes)?;
        Ok(())
    }

    /// Flush the output buffer.
    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush().map_err(ChecseqError::Io)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_bed3_with_rest() {
        let mut output = Vec::new();
        {
            let mut writer = BedWriter::new(&mut output);
            writer
                .write_bed3_with_rest(b"chr1", 100, 250, b"\t60\t+\t-")
                .unwrap();
            writer.write_bed3_with_rest(b"chr2", 5, 10, b"").unwrap();
            writer.write_bed3_with_rest(b".", -1, 250, b"\tr1").unwrap();
            writer.flush().unwrap();
        }
        assert_eq!(
            output,
            b"chr1\t100\t250\t60\t+\t-\nchr2\t5\t10\n.\t-1\t250\tr1\n"
        );
    }

    #[test]
    fn test_write_verbatim_keeps_bytes() {
        let mut output = Vec::new();
        {
            let mut writer = BedWriter::new(&mut output);
            writer.write_verbatim(b"#comment\tfoo\r\n").unwrap();
            writer.write_verbatim(b"track name=x").unwrap();
            writer.flush().unwrap();
        }
        assert_eq!(output, b"#comment\tfoo\r\ntrack name=x");
    }
}
