//! Decoder for the legacy BCP bulk-export format
//!
//! The Charity Commission's bulk export encodes a table as a flat byte
//! stream in which two reserved multi-byte control sequences mark
//! structure: `@**@` terminates a field and `*@@*` terminates a row. The
//! data itself is ISO-8859-1, a fixed-width 8-bit encoding, so the
//! decoder can scan bytes directly without worrying about multi-byte
//! code points straddling a terminator.
//!
//! Segmentation happens on the raw bytes; reinterpreting bytes as text is
//! the final step for each flushed field. Trailing NUL padding is stripped
//! per field after decoding, never from the raw stream — stripping first
//! could merge adjacent records if a terminator ever contained the padding
//! byte.
//!
//! Decoding is a single linear scan holding at most one row in memory, so
//! extracts with hundreds of thousands of rows stream through without
//! buffering the whole table.

use crate::error::{Error, Result};

/// Reserved sequence marking end-of-field in a bulk extract
pub const FIELD_TERMINATOR: &[u8] = b"@**@";

/// Reserved sequence marking end-of-row in a bulk extract
pub const ROW_TERMINATOR: &[u8] = b"*@@*";

/// The pair of control sequences delimiting a bulk extract
///
/// Defaults to the Charity Commission's `@**@` / `*@@*`. Kept as a value
/// so the decoder stays generic over export-tool configurations.
#[derive(Debug, Clone, Copy)]
pub struct Delimiters {
    /// End-of-field control sequence
    pub field: &'static [u8],
    /// End-of-row control sequence
    pub row: &'static [u8],
}

impl Default for Delimiters {
    fn default() -> Self {
        Self {
            field: FIELD_TERMINATOR,
            row: ROW_TERMINATOR,
        }
    }
}

/// Decode a bulk-extract payload into a lazy stream of rows
///
/// Each item is one row of field strings, or the decode error that ended
/// the stream. An empty payload yields an empty stream; a payload with no
/// row terminator yields exactly one row (the end of the stream acts as an
/// implicit row terminator). The first row fixes the field count for the
/// rest of the stream.
///
/// # Examples
///
/// ```
/// use charity_ingest::bcp;
///
/// let payload = b"A@**@B*@@*C@**@D*@@*";
/// let rows: Vec<_> = bcp::decode(payload).collect::<Result<_, _>>().unwrap();
/// assert_eq!(rows, vec![vec!["A", "B"], vec!["C", "D"]]);
/// ```
pub fn decode(payload: &[u8]) -> RecordStream<'_> {
    decode_with(payload, Delimiters::default())
}

/// Decode with explicit field/row terminator sequences
pub fn decode_with(payload: &[u8], delimiters: Delimiters) -> RecordStream<'_> {
    RecordStream {
        payload,
        delimiters,
        pos: 0,
        arity: None,
        done: false,
    }
}

/// Lazy, finite, non-restartable stream of decoded rows
///
/// Borrows the payload and advances one row per `next()` call. The stream
/// fuses after the first error.
pub struct RecordStream<'a> {
    payload: &'a [u8],
    delimiters: Delimiters,
    pos: usize,
    arity: Option<usize>,
    done: bool,
}

impl RecordStream<'_> {
    /// Scan forward to the next row terminator (or end of stream)
    fn scan_row(&mut self) -> Result<Option<Vec<String>>> {
        let mut row = Vec::new();
        let mut field = Vec::new();

        while self.pos < self.payload.len() {
            let rest = &self.payload[self.pos..];
            if rest.starts_with(self.delimiters.field) {
                row.push(field_text(&field));
                field.clear();
                self.pos += self.delimiters.field.len();
            } else if rest.starts_with(self.delimiters.row) {
                self.pos += self.delimiters.row.len();
                row.push(field_text(&field));
                return Ok(Some(row));
            } else if ends_mid_terminator(rest, self.delimiters) {
                return Err(Error::MalformedExtract {
                    offset: self.pos,
                    reason: "stream ends mid-terminator sequence".into(),
                });
            } else {
                field.push(rest[0]);
                self.pos += 1;
            }
        }

        // End of stream with no trailing row terminator: flush what we
        // have as the final row. Nothing pending means the payload ended
        // cleanly on a terminator.
        if row.is_empty() && field.is_empty() {
            return Ok(None);
        }
        row.push(field_text(&field));
        Ok(Some(row))
    }
}

impl Iterator for RecordStream<'_> {
    type Item = Result<Vec<String>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let row = match self.scan_row() {
            Ok(Some(row)) => row,
            Ok(None) => {
                self.done = true;
                return None;
            }
            Err(e) => {
                self.done = true;
                return Some(Err(e));
            }
        };
        match self.arity {
            None => self.arity = Some(row.len()),
            Some(expected) if row.len() != expected => {
                self.done = true;
                return Some(Err(Error::MalformedExtract {
                    offset: self.pos,
                    reason: format!("row has {} fields, expected {}", row.len(), expected),
                }));
            }
            Some(_) => {}
        }
        Some(Ok(row))
    }
}

/// True when the remaining bytes are a proper, non-empty prefix of either
/// terminator — the stream was cut off mid-control-sequence.
fn ends_mid_terminator(rest: &[u8], delimiters: Delimiters) -> bool {
    let partial = |term: &[u8]| rest.len() < term.len() && term.starts_with(rest);
    partial(delimiters.field) || partial(delimiters.row)
}

/// Reinterpret one field's raw bytes as ISO-8859-1 text and strip trailing
/// NUL padding.
///
/// Latin-1 maps each byte to the identically numbered code point, so the
/// widening is lossless.
fn field_text(raw: &[u8]) -> String {
    let text: String = raw.iter().map(|&b| char::from(b)).collect();
    text.trim_end_matches('\0').to_string()
}
