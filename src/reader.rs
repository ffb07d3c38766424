//! Decoding ISO 2709 record streams into MarcXchange events.
//!
//! This module provides [`Iso2709Reader`], which reads records one at a time
//! from any source implementing [`std::io::Read`] and pushes begin/end events
//! to a [`MarcXchangeListener`] in directory order.
//!
//! Each record is decoded in three steps: the 24-character label, the
//! directory of fixed-width entries (tag, field length, starting position),
//! and the data area the entries point into. Data fields are split on the
//! subfield delimiter unless the dialect or the label rules subfields out.
//!
//! # Error policy
//!
//! A malformed label or directory makes the whole record unusable; a bad
//! directory entry, a field length that disagrees with the field
//! terminators, or bytes that are invalid in the configured encoding only
//! affect their own field. With `fatal_errors` set any of these aborts the
//! parse, as does a directory whose lengths do not add up to the record
//! length. Otherwise the record or field is skipped, logged through
//! `tracing` unless `silent_errors` is set, and decoding resumes at the next
//! record or directory entry. Listener and transformer errors always abort.
//!
//! # Examples
//!
//! ```
//! use marcxchange::{Iso2709Reader, MarcXchangeStream};
//! use marcxchange::field_list::FieldList;
//! use std::io::Cursor;
//!
//! let data = b"00045nam a2200037 a 4500001000700000\x1e123456\x1e\x1d";
//! let mut reader = Iso2709Reader::new(Cursor::new(data.to_vec()));
//!
//! let mut lists: Vec<FieldList> = Vec::new();
//! let mut stream = MarcXchangeStream::new();
//! stream.add(&mut lists);
//! reader.parse(&mut stream)?;
//! drop(stream);
//!
//! assert_eq!(lists.last().unwrap()[0].data(), "123456");
//! # Ok::<(), marcxchange::MarcError>(())
//! ```

use crate::config::ReaderConfig;
use crate::error::{MarcError, Result};
use crate::field::{is_control_tag, Dialect, Field, ERROR_TAG};
use crate::label::{RecordLabel, LABEL_LENGTH, TAG_LENGTH};
use crate::listener::{MarcXchangeListener, StringTransformer};
use crate::transform::UnicodeNormalizer;
use encoding_rs::Encoding;
use lazy_static::lazy_static;
use memchr::memmem;
use regex::Regex;
use std::borrow::Cow;
use std::fmt;
use std::io::{BufRead, BufReader, Read};
use tracing::{debug, trace, warn};

/// Terminates every field, and the directory.
pub const FIELD_TERMINATOR: u8 = 0x1E;

/// Terminates every record.
pub const RECORD_TERMINATOR: u8 = 0x1D;

lazy_static! {
    static ref TAG_PATTERN: Regex = Regex::new(r"^[0-9A-Za-z]{3}$").unwrap();
}

/// Location of one field inside a record, resolved from its directory entry.
#[derive(Debug)]
struct FieldSlice<'a> {
    tag: String,
    position: usize,
    length: usize,
    content: &'a [u8],
}

/// A field decoded from its slice, ready to be reported.
#[derive(Debug)]
enum DecodedField {
    Control(Field),
    Data(Field, Vec<Field>),
}

/// Push decoder for ISO 2709 record streams.
///
/// `Iso2709Reader` holds at most one record in memory at a time and calls
/// the listener synchronously, so listeners see fields as soon as their
/// record has been read.
pub struct Iso2709Reader<R: Read> {
    reader: BufReader<R>,
    config: ReaderConfig,
    dialect: Dialect,
    encoding: &'static Encoding,
    delimiter: Vec<u8>,
    transformer: Option<Box<dyn StringTransformer>>,
    buffer: Vec<u8>,
    coding_mismatch: Option<bool>,
    records_read: usize,
    records_skipped: usize,
    fields_skipped: usize,
}

impl<R: Read> fmt::Debug for Iso2709Reader<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Iso2709Reader")
            .field("config", &self.config)
            .field("dialect", &self.dialect)
            .field("encoding", &self.encoding.name())
            .field("transformer", &self.transformer.is_some())
            .field("records_read", &self.records_read)
            .field("records_skipped", &self.records_skipped)
            .field("fields_skipped", &self.fields_skipped)
            .finish_non_exhaustive()
    }
}

impl<R: Read> Iso2709Reader<R> {
    /// Create a reader with the default configuration (MARC21, Bibliographic,
    /// UTF-8, skip-and-continue on errors).
    pub fn new(reader: R) -> Self {
        let config = ReaderConfig::default();
        Iso2709Reader {
            reader: BufReader::with_capacity(config.buffer_size, reader),
            dialect: config.dialect(),
            encoding: encoding_rs::UTF_8,
            delimiter: encode_delimiter(encoding_rs::UTF_8, config.delimiter()),
            config,
            transformer: None,
            buffer: Vec::new(),
            coding_mismatch: None,
            records_read: 0,
            records_skipped: 0,
            fields_skipped: 0,
        }
    }

    /// Create a reader with an explicit configuration.
    ///
    /// A configured `normalization` installs a [`UnicodeNormalizer`].
    ///
    /// # Errors
    ///
    /// Returns [`MarcError::Config`] if the configuration does not validate.
    pub fn with_config(reader: R, config: ReaderConfig) -> Result<Self> {
        config.validate()?;
        let transformer: Option<Box<dyn StringTransformer>> = config
            .normalization
            .map(|form| Box::new(UnicodeNormalizer::new(form)) as Box<dyn StringTransformer>);
        let encoding = config.resolve_encoding()?;
        Ok(Iso2709Reader {
            reader: BufReader::with_capacity(config.buffer_size, reader),
            dialect: config.dialect(),
            encoding,
            delimiter: encode_delimiter(encoding, config.delimiter()),
            config,
            transformer,
            buffer: Vec::new(),
            coding_mismatch: None,
            records_read: 0,
            records_skipped: 0,
            fields_skipped: 0,
        })
    }

    /// Rewrite every field's data with `transformer` before it is delivered.
    #[must_use]
    pub fn with_transformer(mut self, transformer: impl StringTransformer + 'static) -> Self {
        self.transformer = Some(Box::new(transformer));
        self
    }

    /// The active configuration.
    pub fn config(&self) -> &ReaderConfig {
        &self.config
    }

    /// Records decoded so far.
    pub fn records_read(&self) -> usize {
        self.records_read
    }

    /// Records skipped because their label or directory was unusable.
    pub fn records_skipped(&self) -> usize {
        self.records_skipped
    }

    /// Fields skipped because their directory entry was unusable.
    pub fn fields_skipped(&self) -> usize {
        self.fields_skipped
    }

    /// Decode the whole input as one collection.
    ///
    /// Returns the number of records decoded.
    ///
    /// # Errors
    ///
    /// Returns the first structural error when `fatal_errors` is set, and
    /// any listener, transformer or I/O error.
    pub fn parse<L>(&mut self, listener: &mut L) -> Result<usize>
    where
        L: MarcXchangeListener + ?Sized,
    {
        listener.begin_collection()?;
        while self.parse_record(listener)? {}
        listener.end_collection()?;
        debug!(
            records = self.records_read,
            skipped = self.records_skipped,
            "collection complete"
        );
        Ok(self.records_read)
    }

    /// Decode the next record, without collection events.
    ///
    /// Returns `Ok(false)` once the input is exhausted. A record skipped
    /// under the non-fatal policy still counts as consumed.
    ///
    /// # Errors
    ///
    /// See [`parse`](Self::parse).
    pub fn parse_record<L>(&mut self, listener: &mut L) -> Result<bool>
    where
        L: MarcXchangeListener + ?Sized,
    {
        if !self.next_chunk()? {
            return Ok(false);
        }
        let chunk = std::mem::take(&mut self.buffer);
        let result = self.decode_record(&chunk, listener);
        self.buffer = chunk;

        match result {
            Ok(()) => {
                self.records_read += 1;
                Ok(true)
            },
            Err(e) if e.is_structural() && !self.config.fatal_errors => {
                self.records_skipped += 1;
                if !self.config.silent_errors {
                    warn!(
                        record = self.records_read + self.records_skipped,
                        error = %e,
                        "skipping record"
                    );
                }
                Ok(true)
            },
            Err(e) => Err(e),
        }
    }

    /// Load the bytes of the next record into the buffer.
    ///
    /// Line breaks between records are skipped. The last record of the input
    /// may lack its terminator.
    fn next_chunk(&mut self) -> Result<bool> {
        loop {
            let available = self.reader.fill_buf()?;
            if available.is_empty() {
                return Ok(false);
            }
            let skip = available
                .iter()
                .take_while(|b| matches!(b, b'\r' | b'\n'))
                .count();
            let found = skip < available.len();
            self.reader.consume(skip);
            if found {
                break;
            }
        }
        self.buffer.clear();
        self.reader.read_until(RECORD_TERMINATOR, &mut self.buffer)?;
        Ok(true)
    }

    /// Validate label, directory and every field, then emit the record's events.
    ///
    /// All structural checks run before `begin_record`, so a record aborted
    /// under `fatal_errors` never leaves an open record behind.
    fn decode_record<L>(&mut self, chunk: &[u8], listener: &mut L) -> Result<()>
    where
        L: MarcXchangeListener + ?Sized,
    {
        let label = RecordLabel::from_bytes(chunk)?;
        self.check_coding(&label);
        let base = label.base_address_of_data();
        if chunk.len() < base {
            return Err(MarcError::InvalidDirectory(format!(
                "Record ends at {} before base address of data {base}",
                chunk.len()
            )));
        }

        let mut directory = &chunk[LABEL_LENGTH..base];
        if let Some((&FIELD_TERMINATOR, entries)) = directory.split_last() {
            directory = entries;
        }
        let entry_length = label.directory_entry_length();
        if directory.len() % entry_length != 0 {
            return Err(MarcError::InvalidDirectory(format!(
                "Directory length {} is not a multiple of entry length {entry_length}",
                directory.len()
            )));
        }

        let mut fields = Vec::with_capacity(directory.len() / entry_length);
        let mut declared = 0usize;
        let mut located_all = true;
        for entry in directory.chunks_exact(entry_length) {
            let field = match locate_field(&label, entry, chunk) {
                Ok(slice) => {
                    declared += slice.length;
                    self.decode_field(&label, &slice)
                },
                Err(e) => {
                    located_all = false;
                    Err(e)
                },
            };
            match field {
                Err(e) if self.config.fatal_errors => return Err(e),
                field => fields.push(field),
            }
        }

        let expected = label.record_length().saturating_sub(base + 1);
        if located_all && declared != expected {
            let message = format!(
                "Field lengths add up to {declared}, record length implies {expected}"
            );
            if self.config.fatal_errors {
                return Err(MarcError::InvalidDirectory(message));
            }
            if !self.config.silent_errors {
                warn!(
                    record = self.records_read + self.records_skipped + 1,
                    "{message}"
                );
            }
        }

        debug!(
            record = self.records_read + self.records_skipped + 1,
            length = label.record_length(),
            fields = fields.len(),
            "decoding record"
        );

        listener.begin_record(&self.config.format, &self.config.record_type)?;
        listener.leader(&label)?;
        for field in fields {
            match field {
                Ok(Some(decoded)) => self.emit_field(decoded, listener)?,
                Ok(None) => {},
                Err(e) => self.skip_field(&e, listener)?,
            }
        }
        listener.end_record()
    }

    /// Compare the label's character coding with the configured encoding,
    /// once per reader.
    fn check_coding(&mut self, label: &RecordLabel) {
        if self.coding_mismatch.is_some() {
            return;
        }
        let mismatch = label.is_utf8() != (self.encoding == encoding_rs::UTF_8);
        self.coding_mismatch = Some(mismatch);
        if mismatch && !self.config.silent_errors {
            let [_, _, _, coding] = label.implementation_codes();
            warn!(
                label_coding = %coding,
                encoding = self.encoding.name(),
                "label character coding disagrees with configured encoding"
            );
        }
    }

    /// Decode a field slice into a control field, or a data field designator
    /// and its subfields. Returns `None` for fields dropped by the field map.
    ///
    /// Subfields are split on the encoded delimiter before decoding, so
    /// positions and lengths are byte offsets into the source record.
    fn decode_field(&self, label: &RecordLabel, slice: &FieldSlice<'_>) -> Result<Option<DecodedField>> {
        let tag = match self.config.field_map.get(&slice.tag) {
            Some(mapped) if mapped.is_empty() => return Ok(None),
            Some(mapped) => mapped.as_str(),
            None => slice.tag.as_str(),
        };

        if is_control_tag(tag) {
            let text = self.decode(tag, slice.content)?;
            let mut field = Field::from_raw(label, self.dialect, tag, &text);
            field.set_span(slice.position, slice.length);
            return Ok(Some(DecodedField::Control(field)));
        }

        if !self.dialect.splits_subfields() || !label.has_subfields() {
            let text = self.decode(tag, slice.content)?;
            let mut field = Field::from_raw(label, self.dialect, tag, &text);
            field.set_span(slice.position, slice.length);
            return Ok(Some(DecodedField::Data(field, Vec::new())));
        }

        let content = slice.content;
        let starts: Vec<usize> = memmem::find_iter(content, &self.delimiter).collect();
        let head_end = starts.first().copied().unwrap_or(content.len());
        let head = self.decode(tag, &content[..head_end])?;
        let mut designator = Field::from_designator(label, &Field::new(tag), &head, false);
        designator.set_span(slice.position, slice.length);

        let mut subfields = Vec::with_capacity(starts.len());
        for (i, &start) in starts.iter().enumerate() {
            let end = starts.get(i + 1).copied().unwrap_or(content.len());
            let text = self.decode(tag, &content[start + self.delimiter.len()..end])?;
            let mut subfield = Field::from_designator(label, &designator, &text, true);
            subfield.set_span(slice.position + start, end - start);
            subfields.push(subfield);
        }
        Ok(Some(DecodedField::Data(designator, subfields)))
    }

    /// Decode bytes in the configured encoding; malformed sequences fail the field.
    fn decode<'b>(&self, tag: &str, bytes: &'b [u8]) -> Result<Cow<'b, str>> {
        let (text, had_errors) = self.encoding.decode_without_bom_handling(bytes);
        if had_errors {
            return Err(MarcError::InvalidField(format!(
                "{tag} contains bytes that are not valid {}",
                self.encoding.name()
            )));
        }
        Ok(text)
    }

    /// Emit control field, or data field with its subfields.
    fn emit_field<L>(&self, decoded: DecodedField, listener: &mut L) -> Result<()>
    where
        L: MarcXchangeListener + ?Sized,
    {
        match decoded {
            DecodedField::Control(mut field) => {
                self.transform(&mut field)?;
                listener.begin_control_field(&field)?;
                listener.end_control_field(&field)
            },
            DecodedField::Data(mut designator, subfields) => {
                self.transform(&mut designator)?;
                listener.begin_data_field(&designator)?;
                for mut subfield in subfields {
                    self.transform(&mut subfield)?;
                    listener.begin_subfield(&subfield)?;
                    listener.end_subfield(&subfield)?;
                }
                listener.end_data_field(&designator)
            },
        }
    }

    fn transform(&self, field: &mut Field) -> Result<()> {
        if let Some(transformer) = &self.transformer {
            if !field.data().is_empty() {
                let data = transformer.transform(field.data())?;
                field.set_data(data);
            }
        }
        Ok(())
    }

    /// Report a field skipped under the lenient policy.
    fn skip_field<L>(&mut self, error: &MarcError, listener: &mut L) -> Result<()>
    where
        L: MarcXchangeListener + ?Sized,
    {
        self.fields_skipped += 1;
        if !self.config.silent_errors {
            warn!(
                record = self.records_read + self.records_skipped + 1,
                error = %error,
                "skipping field"
            );
        }
        if self.config.emit_error_fields {
            let mut field = Field::new(ERROR_TAG);
            field.set_data(error.to_string());
            listener.begin_data_field(&field)?;
            listener.end_data_field(&field)?;
        }
        Ok(())
    }
}

/// Encode the subfield delimiter the way it appears in the source bytes.
fn encode_delimiter(encoding: &'static Encoding, delimiter: char) -> Vec<u8> {
    let mut buf = [0u8; 4];
    let (bytes, _, _) = encoding.encode(delimiter.encode_utf8(&mut buf));
    bytes.into_owned()
}

/// Resolve one directory entry against the record bytes.
///
/// The slice must end in exactly one field terminator: a missing terminator
/// or one inside the slice means the declared length is wrong.
fn locate_field<'a>(label: &RecordLabel, entry: &[u8], record: &'a [u8]) -> Result<FieldSlice<'a>> {
    let tag = std::str::from_utf8(&entry[..TAG_LENGTH])
        .ok()
        .filter(|tag| TAG_PATTERN.is_match(tag))
        .ok_or_else(|| MarcError::InvalidTag(String::from_utf8_lossy(&entry[..TAG_LENGTH]).to_string()))?
        .to_string();

    let length_end = TAG_LENGTH + label.length_of_field_length();
    let position_end = length_end + label.length_of_starting_character_position();
    let length = parse_entry_number(&entry[TAG_LENGTH..length_end], &tag, "field length")?;
    let start = parse_entry_number(&entry[length_end..position_end], &tag, "starting position")?;
    trace!(tag = %tag, length, start, "directory entry");

    let position = label.base_address_of_data() + start;
    let end = position + length;
    let limit = label.record_length().min(record.len());
    if end > limit {
        return Err(MarcError::FieldOutOfBounds {
            tag,
            message: format!(
                "ends at {end}, record length {} ({} bytes available)",
                label.record_length(),
                record.len()
            ),
        });
    }

    let mut content = &record[position..end];
    if length > 0 {
        match content.split_last() {
            Some((&FIELD_TERMINATOR, data)) => content = data,
            _ => {
                return Err(MarcError::FieldOutOfBounds {
                    tag,
                    message: format!("no field terminator at offset {}", end - 1),
                })
            },
        }
    }
    if let Some(inner) = memchr::memchr(FIELD_TERMINATOR, content) {
        return Err(MarcError::FieldOutOfBounds {
            tag,
            message: format!("field terminator inside field at offset {}", position + inner),
        });
    }

    Ok(FieldSlice {
        tag,
        position,
        length,
        content,
    })
}

/// Parse a numeric directory entry component of label-defined width.
fn parse_entry_number(bytes: &[u8], tag: &str, what: &str) -> Result<usize> {
    let mut result = 0usize;
    for &byte in bytes {
        if !byte.is_ascii_digit() {
            return Err(MarcError::InvalidDirectory(format!(
                "Invalid {what} for tag {tag}: '{}'",
                String::from_utf8_lossy(bytes)
            )));
        }
        result = result * 10 + usize::from(byte - b'0');
    }
    Ok(result)
}
