//! Error types for ISO 2709 decoding.
//!
//! This module provides the [`MarcError`] type for all decoder operations
//! and the [`Result`] convenience type.
//!
//! Errors fall into two groups. Structural errors (a malformed label, a
//! misaligned directory, a field slice outside the record, a bad tag) are
//! subject to the reader's fatal/silent policy. Everything else (listener,
//! transformer, configuration and I/O failures) always propagates.

use thiserror::Error;

/// Error type for all decoder operations.
#[derive(Error, Debug)]
pub enum MarcError {
    /// The 24-character record label could not be parsed.
    #[error("Invalid record label: {0}")]
    InvalidLabel(String),

    /// The directory does not divide into whole entries or an entry is unreadable.
    #[error("Invalid directory: {0}")]
    InvalidDirectory(String),

    /// A directory entry points outside the record or is not terminated where declared.
    #[error("Field {tag} out of bounds: {message}")]
    FieldOutOfBounds {
        /// Tag of the offending directory entry
        tag: String,
        /// What went wrong
        message: String,
    },

    /// A directory entry carries a tag that is not three alphanumeric characters.
    #[error("Invalid tag: '{0}'")]
    InvalidTag(String),

    /// A field could not be decoded.
    #[error("Invalid field: {0}")]
    InvalidField(String),

    /// Listener events arrived outside the begin/end order.
    #[error("Unexpected event: {0}")]
    EventOrder(String),

    /// A string transformer rejected its input.
    #[error("Transform error: {0}")]
    Transform(String),

    /// A downstream listener or observer failed.
    #[error("Listener error: {0}")]
    Listener(String),

    /// The reader configuration is unusable.
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error from the underlying source.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl MarcError {
    /// Whether this error describes malformed input.
    ///
    /// Only structural errors are subject to the reader's `fatal_errors`
    /// policy; all other errors abort the parse.
    #[must_use]
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            MarcError::InvalidLabel(_)
                | MarcError::InvalidDirectory(_)
                | MarcError::FieldOutOfBounds { .. }
                | MarcError::InvalidTag(_)
                | MarcError::InvalidField(_)
        )
    }
}

/// Convenience type alias for [`std::result::Result`] with [`MarcError`].
pub type Result<T> = std::result::Result<T, MarcError>;
