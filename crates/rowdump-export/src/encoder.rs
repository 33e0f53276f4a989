//! Delimited text encoding of exported records
//!
//! The header is taken from the first record and every row is written in that
//! record's key order. Later records are not checked against the header: a
//! key they lack becomes an empty field and keys the first record lacks are
//! dropped.
//!
//! With the default [`Quoting::Never`] values are written raw, so a value
//! holding the delimiter, a quote or a line break corrupts its row. Switch to
//! [`Quoting::Necessary`] when the data may contain them.

use crate::config::Quoting;
use crate::error::{ExportError, Result};
use csv::{QuoteStyle, Terminator, WriterBuilder};
use rowdump_common::Record;

impl From<Quoting> for QuoteStyle {
    fn from(quoting: Quoting) -> Self {
        match quoting {
            Quoting::Never => QuoteStyle::Never,
            Quoting::Necessary => QuoteStyle::Necessary,
        }
    }
}

/// Encoder settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CsvEncoder {
    delimiter: u8,
    quoting: Quoting,
}

impl Default for CsvEncoder {
    fn default() -> Self {
        Self {
            delimiter: b',',
            quoting: Quoting::Never,
        }
    }
}

impl CsvEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn with_quoting(mut self, quoting: Quoting) -> Self {
        self.quoting = quoting;
        self
    }

    /// Encode records as header plus one line per record
    ///
    /// Lines end with `\n` except the last one. No records, no output.
    pub fn encode(&self, records: &[Record]) -> Result<String> {
        let Some(first) = records.first() else {
            return Ok(String::new());
        };
        let header: Vec<&str> = first.keys().collect();

        // csv writes `""` for a record with no bytes, so a line that may be
        // empty is only safe through the writer when quoting is wanted
        if header.is_empty() || (header.len() == 1 && self.quoting == Quoting::Never) {
            return Ok(single_column(records, header.first().copied()));
        }

        let mut writer = WriterBuilder::new()
            .delimiter(self.delimiter)
            .quote_style(self.quoting.into())
            .terminator(Terminator::Any(b'\n'))
            .from_writer(Vec::new());

        writer.write_record(&header)?;
        for record in records {
            writer.write_record(header.iter().map(|key| record.field_text(key)))?;
        }

        let mut bytes = writer
            .into_inner()
            .map_err(|e| ExportError::Io(e.into_error()))?;
        if bytes.last() == Some(&b'\n') {
            bytes.pop();
        }

        Ok(String::from_utf8(bytes)?)
    }
}

/// Header plus one raw value per line; no key means every line is empty
fn single_column(records: &[Record], key: Option<&str>) -> String {
    let mut lines = Vec::with_capacity(records.len() + 1);
    lines.push(key.unwrap_or_default().to_string());
    lines.extend(
        records
            .iter()
            .map(|record| key.map(|key| record.field_text(key)).unwrap_or_default()),
    );
    lines.join("\n")
}

/// Encode with a comma delimiter and no quoting
pub fn encode(records: &[Record]) -> Result<String> {
    CsvEncoder::default().encode(records)
}
