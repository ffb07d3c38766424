//! ISO 2709 record label parsing.
//!
//! The record label is the 24-character fixed header at the start of every
//! ISO 2709 record. Besides the record length and the base address of data
//! it describes how the rest of the record is laid out: how many indicator
//! characters each data field carries, how wide a subfield identifier is,
//! and how the directory entries are chunked.
//!
//! # Structure
//!
//! - Positions 0-4: Record length (5 digits)
//! - Position 5: Record status
//! - Positions 6-9: Implementation codes (type of record, bibliographic level, ...)
//! - Position 10: Indicator length
//! - Position 11: Subfield identifier length
//! - Positions 12-16: Base address of data (5 digits)
//! - Positions 17-19: For user systems
//! - Position 20: Length of "length of field" in a directory entry
//! - Position 21: Length of "starting character position" in a directory entry
//! - Position 22: Length of the implementation-defined portion of a directory entry
//! - Position 23: Undefined

use crate::error::{MarcError, Result};
use std::fmt;
use std::str::FromStr;

/// Width of the record label in characters.
pub const LABEL_LENGTH: usize = 24;

/// Width of the tag portion of every directory entry.
pub const TAG_LENGTH: usize = 3;

const DEFAULT_INDICATOR_LENGTH: usize = 2;
const DEFAULT_SUBFIELD_IDENTIFIER_LENGTH: usize = 2;
const DEFAULT_LENGTH_OF_FIELD_LENGTH: usize = 4;
const DEFAULT_LENGTH_OF_STARTING_POSITION: usize = 5;
const DEFAULT_LENGTH_OF_IMPLEMENTATION_DEFINED: usize = 0;

/// Parsed ISO 2709 record label.
///
/// A label is immutable once parsed. The single-character positions are kept
/// so the label can be rendered back to its exact 24-character form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordLabel {
    record_length: usize,
    record_status: char,
    implementation_codes: [char; 4],
    indicator_length: usize,
    subfield_identifier_length: usize,
    base_address_of_data: usize,
    user_system_chars: [char; 3],
    length_of_field_length: usize,
    length_of_starting_character_position: usize,
    length_of_implementation_defined_portion: usize,
    reserved: char,
}

impl RecordLabel {
    /// Parse a label from the first 24 bytes of a record.
    ///
    /// Blank positions 10, 11, 20, 21 and 22 fall back to the ISO 2709
    /// defaults (2, 2, 4, 5 and 0); any other non-digit is rejected.
    ///
    /// # Errors
    ///
    /// Returns [`MarcError::InvalidLabel`] naming the position that failed, if
    /// fewer than 24 bytes are supplied, or if the base address of data lies
    /// inside the label or beyond the declared record length.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < LABEL_LENGTH {
            return Err(MarcError::InvalidLabel(format!(
                "Label must be {LABEL_LENGTH} bytes, got {}",
                bytes.len()
            )));
        }
        let bytes = &bytes[..LABEL_LENGTH];
        if !bytes.is_ascii() {
            return Err(MarcError::InvalidLabel(
                "Label contains non-ASCII bytes".to_string(),
            ));
        }

        let record_length = parse_number(&bytes[0..5], "record length (0-4)")?;
        let base_address_of_data = parse_number(&bytes[12..17], "base address of data (12-16)")?;

        let label = RecordLabel {
            record_length,
            record_status: bytes[5] as char,
            implementation_codes: [
                bytes[6] as char,
                bytes[7] as char,
                bytes[8] as char,
                bytes[9] as char,
            ],
            indicator_length: parse_width(bytes[10], 10, DEFAULT_INDICATOR_LENGTH)?,
            subfield_identifier_length: parse_width(
                bytes[11],
                11,
                DEFAULT_SUBFIELD_IDENTIFIER_LENGTH,
            )?,
            base_address_of_data,
            user_system_chars: [bytes[17] as char, bytes[18] as char, bytes[19] as char],
            length_of_field_length: parse_width(bytes[20], 20, DEFAULT_LENGTH_OF_FIELD_LENGTH)?,
            length_of_starting_character_position: parse_width(
                bytes[21],
                21,
                DEFAULT_LENGTH_OF_STARTING_POSITION,
            )?,
            length_of_implementation_defined_portion: parse_width(
                bytes[22],
                22,
                DEFAULT_LENGTH_OF_IMPLEMENTATION_DEFINED,
            )?,
            reserved: bytes[23] as char,
        };
        label.validate()?;
        Ok(label)
    }

    fn validate(&self) -> Result<()> {
        if self.base_address_of_data < LABEL_LENGTH {
            return Err(MarcError::InvalidLabel(format!(
                "Base address of data must be at least {LABEL_LENGTH}, got {}",
                self.base_address_of_data
            )));
        }
        if self.record_length < self.base_address_of_data {
            return Err(MarcError::InvalidLabel(format!(
                "Record length {} is smaller than base address of data {}",
                self.record_length, self.base_address_of_data
            )));
        }
        if self.length_of_field_length == 0 {
            return Err(MarcError::InvalidLabel(
                "Length of field length (20) must not be zero".to_string(),
            ));
        }
        if self.length_of_starting_character_position == 0 {
            return Err(MarcError::InvalidLabel(
                "Length of starting character position (21) must not be zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Total declared length of the record, terminator included.
    #[must_use]
    pub fn record_length(&self) -> usize {
        self.record_length
    }

    /// Record status (position 5).
    #[must_use]
    pub fn record_status(&self) -> char {
        self.record_status
    }

    /// Implementation codes (positions 6-9).
    #[must_use]
    pub fn implementation_codes(&self) -> [char; 4] {
        self.implementation_codes
    }

    /// Number of indicator characters per data field.
    #[must_use]
    pub fn indicator_length(&self) -> usize {
        self.indicator_length
    }

    /// Width of a subfield identifier, delimiter included.
    #[must_use]
    pub fn subfield_identifier_length(&self) -> usize {
        self.subfield_identifier_length
    }

    /// Offset of the first data character; the directory ends here.
    #[must_use]
    pub fn base_address_of_data(&self) -> usize {
        self.base_address_of_data
    }

    /// Characters reserved for user systems (positions 17-19).
    #[must_use]
    pub fn user_system_chars(&self) -> [char; 3] {
        self.user_system_chars
    }

    /// Width of the field length part of a directory entry.
    #[must_use]
    pub fn length_of_field_length(&self) -> usize {
        self.length_of_field_length
    }

    /// Width of the starting position part of a directory entry.
    #[must_use]
    pub fn length_of_starting_character_position(&self) -> usize {
        self.length_of_starting_character_position
    }

    /// Width of the implementation-defined part of a directory entry.
    #[must_use]
    pub fn length_of_implementation_defined_portion(&self) -> usize {
        self.length_of_implementation_defined_portion
    }

    /// Size of one directory entry: tag, length, position and implementation part.
    #[must_use]
    pub fn directory_entry_length(&self) -> usize {
        TAG_LENGTH
            + self.length_of_field_length
            + self.length_of_starting_character_position
            + self.length_of_implementation_defined_portion
    }

    /// Whether position 9 declares UCS/Unicode character coding.
    #[must_use]
    pub fn is_utf8(&self) -> bool {
        self.implementation_codes[3] == 'a'
    }

    /// Whether subfields can be identified at all.
    ///
    /// An identifier needs a delimiter plus at least one code character.
    #[must_use]
    pub fn has_subfields(&self) -> bool {
        self.subfield_identifier_length >= 2
    }
}

impl fmt::Display for RecordLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [c6, c7, c8, c9] = self.implementation_codes;
        let [u17, u18, u19] = self.user_system_chars;
        write!(
            f,
            "{:05}{}{c6}{c7}{c8}{c9}{}{}{:05}{u17}{u18}{u19}{}{}{}{}",
            self.record_length,
            self.record_status,
            self.indicator_length,
            self.subfield_identifier_length,
            self.base_address_of_data,
            self.length_of_field_length,
            self.length_of_starting_character_position,
            self.length_of_implementation_defined_portion,
            self.reserved,
        )
    }
}

impl FromStr for RecordLabel {
    type Err = MarcError;

    fn from_str(s: &str) -> Result<Self> {
        if s.len() != LABEL_LENGTH {
            return Err(MarcError::InvalidLabel(format!(
                "Label must be exactly {LABEL_LENGTH} characters, got {}",
                s.len()
            )));
        }
        RecordLabel::from_bytes(s.as_bytes())
    }
}

/// Parse a 5-digit numeric label component.
fn parse_number(bytes: &[u8], what: &str) -> Result<usize> {
    let mut result = 0usize;
    for &byte in bytes {
        if !byte.is_ascii_digit() {
            return Err(MarcError::InvalidLabel(format!(
                "Invalid {what}: '{}'",
                String::from_utf8_lossy(bytes)
            )));
        }
        result = result * 10 + usize::from(byte - b'0');
    }
    Ok(result)
}

/// Parse a single-digit width, treating a blank as the default.
fn parse_width(byte: u8, position: usize, default: usize) -> Result<usize> {
    match byte {
        b'0'..=b'9' => Ok(usize::from(byte - b'0')),
        b' ' => Ok(default),
        _ => Err(MarcError::InvalidLabel(format!(
            "Invalid digit at position {position}: '{}'",
            byte as char
        ))),
    }
}
