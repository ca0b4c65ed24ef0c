//! Zero-allocation line parsing utilities.
//!
//! These work on raw bytes so the hot loop of the BEDPE merger never
//! builds a `Vec<&str>` per line.

use memchr::memchr_iter;

/// Fast i64 parsing - no allocation, no error formatting.
///
/// Accepts an optional leading `-`. Returns None if the input is empty,
/// contains non-digit characters, or overflows.
#[inline(always)]
pub fn parse_i64_fast(bytes: &[u8]) -> Option<i64> {
    let (negative, digits) = match bytes.split_first() {
        Some((b'-', rest)) => (true, rest),
        Some(_) => (false, bytes),
        None => return None,
    };
    if digits.is_empty() {
        return None;
    }
    let mut n: i64 = 0;
    for &b in digits {
        let d = b.wrapping_sub(b'0');
        if d > 9 {
            return None;
        }
        n = n.checked_mul(10)?.checked_add(d as i64)?;
    }
    Some(if negative { -n } else { n })
}

/// Check if a line is a BED header or comment that must be passed through.
#[inline(always)]
pub fn is_header_line(line: &[u8]) -> bool {
    line.first() == Some(&b'#') || line.starts_with(b"track") || line.starts_with(b"browser")
}

/// Strip a trailing `\n` or `\r\n`.
#[inline(always)]
pub fn trim_line_end(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

/// Split a line on tabs into at most `N` leading fields plus the byte offset
/// where the remainder starts (pointing at the tab before field `N`, or at
/// the end of the line when there is no field `N`).
///
/// Returns the number of fields found before the cut; slots past that count
/// are left empty.
#[inline]
pub fn split_leading_fields<const N: usize>(line: &[u8]) -> ([&[u8]; N], usize, usize) {
    let mut fields: [&[u8]; N] = [&b""[..]; N];
    let mut count = 0;
    let mut field_start = 0;

    for tab in memchr_iter(b'\t', line) {
        fields[count] = &line[field_start..tab];
        count += 1;
        field_start = tab + 1;
        if count == N {
            return (fields, count, tab);
        }
    }

    if count < N {
        fields[count] = &line[field_start..];
        count += 1;
    }
    (fields, count, line.len())
}
