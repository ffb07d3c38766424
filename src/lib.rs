#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

//! # marcxchange: ISO 2709 to MarcXchange events
//!
//! Decodes ISO 2709 record streams (MARC 21, UNIMARC, MAB and other members
//! of the family) into a push stream of MarcXchange events, and assembles
//! those events into [`FieldList`]s for downstream consumers.
//!
//! ## Quick Start
//!
//! ```no_run
//! use marcxchange::{FieldList, Iso2709Reader, MarcXchangeStream, ReaderConfig};
//! use std::fs::File;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ReaderConfig::default().with_fatal_errors(true);
//! let mut reader = Iso2709Reader::with_config(File::open("records.mrc")?, config)?;
//!
//! let mut lists: Vec<FieldList> = Vec::new();
//! let mut stream = MarcXchangeStream::new();
//! stream.add(&mut lists);
//! reader.parse(&mut stream)?;
//! drop(stream);
//!
//! for list in &lists {
//!     println!("{list}");
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`label`] - The 24-character record label
//! - [`field`] - Field, designator and subfield occurrences
//! - [`field_list`] - Groups of sibling fields
//! - [`reader`] - The ISO 2709 decoder
//! - [`stream`] - Event to field list assembly
//! - [`listener`] - Listener, observer and transformer traits
//! - [`transform`] - Unicode normalization
//! - [`config`] - Reader configuration
//! - [`error`] - Error types and result type

pub mod config;
pub mod error;
pub mod field;
pub mod field_list;
pub mod label;
pub mod listener;
pub mod reader;
pub mod stream;
pub mod transform;

pub use config::ReaderConfig;
pub use error::{MarcError, Result};
pub use field::{Dialect, Field};
pub use field_list::FieldList;
pub use label::RecordLabel;
pub use listener::{MarcXchangeListener, StreamObserver, StringTransformer};
pub use reader::Iso2709Reader;
pub use stream::{MarcXchangeStream, ObserverId};
pub use transform::{NormalizationForm, UnicodeNormalizer};
