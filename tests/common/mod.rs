//! Common test helpers shared across the integration tests.

#![allow(dead_code)]

use marcxchange::{FieldList, Iso2709Reader, MarcXchangeStream, ReaderConfig, Result};
use std::io::Cursor;

pub const FIELD_TERMINATOR: u8 = 0x1E;
pub const RECORD_TERMINATOR: u8 = 0x1D;
pub const SUBFIELD_DELIMITER: &str = "\x1f";

/// Builds ISO 2709 records with a 4/5/0 directory layout.
#[derive(Debug, Clone)]
pub struct RecordFixture {
    indicator_length: u8,
    subfield_identifier_length: u8,
    fields: Vec<(String, Vec<u8>)>,
}

impl Default for RecordFixture {
    fn default() -> Self {
        RecordFixture {
            indicator_length: 2,
            subfield_identifier_length: 2,
            fields: Vec::new(),
        }
    }
}

impl RecordFixture {
    pub fn new() -> Self {
        RecordFixture::default()
    }

    pub fn indicator_length(mut self, length: u8) -> Self {
        self.indicator_length = length;
        self
    }

    pub fn subfield_identifier_length(mut self, length: u8) -> Self {
        self.subfield_identifier_length = length;
        self
    }

    /// Add a field; the field terminator is appended on build.
    pub fn field(self, tag: &str, content: &str) -> Self {
        self.field_bytes(tag, content.as_bytes())
    }

    pub fn field_bytes(mut self, tag: &str, content: &[u8]) -> Self {
        self.fields.push((tag.to_string(), content.to_vec()));
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut directory = Vec::new();
        let mut data = Vec::new();
        for (tag, content) in &self.fields {
            let start = data.len();
            data.extend_from_slice(content);
            data.push(FIELD_TERMINATOR);
            directory.extend_from_slice(tag.as_bytes());
            directory.extend_from_slice(format!("{:04}{start:05}", data.len() - start).as_bytes());
        }
        directory.push(FIELD_TERMINATOR);

        let base_address = 24 + directory.len();
        let record_length = base_address + data.len() + 1;
        let mut record = format!(
            "{record_length:05}nam a{}{}{base_address:05} a 4500",
            self.indicator_length, self.subfield_identifier_length
        )
        .into_bytes();
        record.extend_from_slice(&directory);
        record.extend_from_slice(&data);
        record.push(RECORD_TERMINATOR);
        record
    }
}

/// Decode `bytes` and collect every published field list.
pub fn collect_lists(bytes: Vec<u8>, config: ReaderConfig) -> Result<Vec<FieldList>> {
    let mut reader = Iso2709Reader::with_config(Cursor::new(bytes), config)?;
    let mut lists: Vec<FieldList> = Vec::new();
    let mut stream = MarcXchangeStream::new();
    stream.add(&mut lists);
    reader.parse(&mut stream)?;
    drop(stream);
    Ok(lists)
}

/// Keys of the lists that carry real fields, skipping format/type/leader.
pub fn field_keys(lists: &[FieldList]) -> Vec<String> {
    lists
        .iter()
        .filter(|list| !matches!(list.tag(), Some("FMT" | "TYP" | "LDR")))
        .map(FieldList::to_key)
        .collect()
}

/// Position of a byte pattern inside a record.
pub fn find(haystack: &[u8], needle: &[u8]) -> usize {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
        .expect("pattern not found in record")
}
