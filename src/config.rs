//! Configuration options for [`Iso2709Reader`](crate::reader::Iso2709Reader).
//!
//! This module provides the [`ReaderConfig`] struct which selects the record
//! format and type, the error policy, and how raw bytes become field data.
//!
//! # Examples
//!
//! ```
//! use marcxchange::{Dialect, ReaderConfig};
//!
//! let config = ReaderConfig::default()
//!     .with_format("MAB2")
//!     .with_fatal_errors(true);
//! assert_eq!(config.dialect(), Dialect::Mab);
//!
//! let config = ReaderConfig::from_json(r#"{"record_type": "Holdings", "silent_errors": true}"#)?;
//! assert_eq!(config.record_type, "Holdings");
//! assert_eq!(config.format, "MARC21");
//! # Ok::<(), marcxchange::MarcError>(())
//! ```

use crate::error::{MarcError, Result};
use crate::field::Dialect;
use crate::transform::NormalizationForm;
use encoding_rs::Encoding;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Default subfield delimiter (ISO 2709 IS1).
pub const SUBFIELD_DELIMITER: char = '\u{1F}';

/// Record types a reader can announce in `begin_record`.
pub const RECORD_TYPES: [&str; 5] = [
    "Bibliographic",
    "Holdings",
    "Authority",
    "Classification",
    "Community",
];

/// Configuration for ISO 2709 decoding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
#[allow(clippy::struct_excessive_bools)]
pub struct ReaderConfig {
    // === Record identity ===
    /// Format name announced with every record. Names starting with `MAB`
    /// select the MAB dialect.
    pub format: String,

    /// Record type announced with every record.
    pub record_type: String,

    // === Error Handling ===
    /// Abort on the first structural error instead of skipping the
    /// offending record or field.
    pub fatal_errors: bool,

    /// Do not log skipped records and fields.
    pub silent_errors: bool,

    /// Report skipped fields to the listener as `999` data fields whose
    /// data is the error message.
    pub emit_error_fields: bool,

    // === Decoding ===
    /// Capacity of the buffered reader wrapping the input.
    pub buffer_size: usize,

    /// Subfield delimiter replacing the ISO 2709 default `0x1F`.
    pub subfield_delimiter: Option<char>,

    /// Tag replacements applied before fields are emitted. Fields whose
    /// tag maps to an empty string are dropped.
    pub field_map: IndexMap<String, String>,

    /// Character encoding of field data, as a WHATWG encoding label.
    pub encoding: String,

    /// Unicode normalization applied to all field data.
    pub normalization: Option<NormalizationForm>,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        ReaderConfig {
            format: "MARC21".to_string(),
            record_type: "Bibliographic".to_string(),
            fatal_errors: false,
            silent_errors: false,
            emit_error_fields: false,
            buffer_size: 65536,
            subfield_delimiter: None,
            field_map: IndexMap::new(),
            encoding: "UTF-8".to_string(),
            normalization: None,
        }
    }
}

impl ReaderConfig {
    /// Load a configuration from JSON; missing keys keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`MarcError::Config`] if the JSON is malformed or the
    /// resulting configuration fails [`validate`](Self::validate).
    pub fn from_json(json: &str) -> Result<Self> {
        let config: ReaderConfig = serde_json::from_str(json)
            .map_err(|e| MarcError::Config(format!("Invalid configuration: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Set the format name.
    #[must_use]
    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = format.into();
        self
    }

    /// Set the record type.
    #[must_use]
    pub fn with_record_type(mut self, record_type: impl Into<String>) -> Self {
        self.record_type = record_type.into();
        self
    }

    /// Abort on the first structural error.
    #[must_use]
    pub fn with_fatal_errors(mut self, fatal: bool) -> Self {
        self.fatal_errors = fatal;
        self
    }

    /// Suppress logging of recoverable errors.
    #[must_use]
    pub fn with_silent_errors(mut self, silent: bool) -> Self {
        self.silent_errors = silent;
        self
    }

    /// Report skipped fields as error fields.
    #[must_use]
    pub fn with_error_fields(mut self, emit: bool) -> Self {
        self.emit_error_fields = emit;
        self
    }

    /// Set the input buffer capacity.
    #[must_use]
    pub fn with_buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size;
        self
    }

    /// Override the subfield delimiter.
    #[must_use]
    pub fn with_subfield_delimiter(mut self, delimiter: char) -> Self {
        self.subfield_delimiter = Some(delimiter);
        self
    }

    /// Replace tag `from` with `to` before emitting.
    #[must_use]
    pub fn map_tag(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.field_map.insert(from.into(), to.into());
        self
    }

    /// Set the encoding label.
    #[must_use]
    pub fn with_encoding(mut self, encoding: impl Into<String>) -> Self {
        self.encoding = encoding.into();
        self
    }

    /// Normalize all field data to `form`.
    #[must_use]
    pub fn with_normalization(mut self, form: NormalizationForm) -> Self {
        self.normalization = Some(form);
        self
    }

    /// Dialect derived from the format name.
    #[must_use]
    pub fn dialect(&self) -> Dialect {
        Dialect::from_format(&self.format)
    }

    /// Effective subfield delimiter.
    #[must_use]
    pub fn delimiter(&self) -> char {
        self.subfield_delimiter.unwrap_or(SUBFIELD_DELIMITER)
    }

    /// Resolve the encoding label.
    ///
    /// # Errors
    ///
    /// Returns [`MarcError::Config`] for labels `encoding_rs` does not know.
    pub fn resolve_encoding(&self) -> Result<&'static Encoding> {
        Encoding::for_label(self.encoding.trim().as_bytes())
            .ok_or_else(|| MarcError::Config(format!("Unknown encoding: {}", self.encoding)))
    }

    /// Check the configuration for unusable settings.
    ///
    /// # Errors
    ///
    /// Returns [`MarcError::Config`] for a zero buffer size, an unknown
    /// encoding, or an unsupported record type.
    pub fn validate(&self) -> Result<()> {
        if self.buffer_size == 0 {
            return Err(MarcError::Config(
                "Buffer size must be greater than zero".to_string(),
            ));
        }
        if !RECORD_TYPES.contains(&self.record_type.as_str()) {
            return Err(MarcError::Config(format!(
                "Unsupported record type: {}",
                self.record_type
            )));
        }
        self.resolve_encoding()?;
        Ok(())
    }
}
