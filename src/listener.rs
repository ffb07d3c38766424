//! Listener interfaces fed by the decoder.
//!
//! Two levels of consumer are supported:
//!
//! - [`MarcXchangeListener`] receives the fine-grained begin/end events for
//!   collections, records, control fields, data fields and subfields, in the
//!   order they appear in the source.
//! - [`StreamObserver`] receives assembled [`FieldList`]s from a
//!   [`MarcXchangeStream`](crate::stream::MarcXchangeStream).
//!
//! Every callback returns [`Result`] so a consumer can stop the parse; errors
//! are passed back to the caller of the reader untouched.

use crate::error::{MarcError, Result};
use crate::field::Field;
use crate::field_list::FieldList;
use crate::label::RecordLabel;
use crossbeam_channel::Sender;

/// Receiver of MarcXchange structural events.
///
/// All methods default to doing nothing, so implementors only override the
/// events they care about.
pub trait MarcXchangeListener {
    /// A stream of records starts.
    fn begin_collection(&mut self) -> Result<()> {
        Ok(())
    }

    /// The stream of records ended.
    fn end_collection(&mut self) -> Result<()> {
        Ok(())
    }

    /// A record of the given format and type starts.
    fn begin_record(&mut self, _format: &str, _record_type: &str) -> Result<()> {
        Ok(())
    }

    /// The current record ended.
    fn end_record(&mut self) -> Result<()> {
        Ok(())
    }

    /// The label of the current record.
    fn leader(&mut self, _label: &RecordLabel) -> Result<()> {
        Ok(())
    }

    /// A control field starts.
    fn begin_control_field(&mut self, _field: &Field) -> Result<()> {
        Ok(())
    }

    /// A control field ended.
    fn end_control_field(&mut self, _field: &Field) -> Result<()> {
        Ok(())
    }

    /// A data field starts; `field` is its designator.
    fn begin_data_field(&mut self, _field: &Field) -> Result<()> {
        Ok(())
    }

    /// A data field ended; `field` is its designator.
    fn end_data_field(&mut self, _field: &Field) -> Result<()> {
        Ok(())
    }

    /// A subfield starts.
    fn begin_subfield(&mut self, _field: &Field) -> Result<()> {
        Ok(())
    }

    /// A subfield ended.
    fn end_subfield(&mut self, _field: &Field) -> Result<()> {
        Ok(())
    }
}

impl<T: MarcXchangeListener + ?Sized> MarcXchangeListener for &mut T {
    fn begin_collection(&mut self) -> Result<()> {
        (**self).begin_collection()
    }

    fn end_collection(&mut self) -> Result<()> {
        (**self).end_collection()
    }

    fn begin_record(&mut self, format: &str, record_type: &str) -> Result<()> {
        (**self).begin_record(format, record_type)
    }

    fn end_record(&mut self) -> Result<()> {
        (**self).end_record()
    }

    fn leader(&mut self, label: &RecordLabel) -> Result<()> {
        (**self).leader(label)
    }

    fn begin_control_field(&mut self, field: &Field) -> Result<()> {
        (**self).begin_control_field(field)
    }

    fn end_control_field(&mut self, field: &Field) -> Result<()> {
        (**self).end_control_field(field)
    }

    fn begin_data_field(&mut self, field: &Field) -> Result<()> {
        (**self).begin_data_field(field)
    }

    fn end_data_field(&mut self, field: &Field) -> Result<()> {
        (**self).end_data_field(field)
    }

    fn begin_subfield(&mut self, field: &Field) -> Result<()> {
        (**self).begin_subfield(field)
    }

    fn end_subfield(&mut self, field: &Field) -> Result<()> {
        (**self).end_subfield(field)
    }
}

/// Receiver of assembled field lists.
pub trait StreamObserver {
    /// A stream starts.
    fn on_begin(&mut self) -> Result<()> {
        Ok(())
    }

    /// One control field, pseudo-field, or data field with its subfields.
    fn on_object(&mut self, list: &FieldList) -> Result<()>;

    /// The stream ended.
    fn on_end(&mut self) -> Result<()> {
        Ok(())
    }
}

impl<T: StreamObserver + ?Sized> StreamObserver for &mut T {
    fn on_begin(&mut self) -> Result<()> {
        (**self).on_begin()
    }

    fn on_object(&mut self, list: &FieldList) -> Result<()> {
        (**self).on_object(list)
    }

    fn on_end(&mut self) -> Result<()> {
        (**self).on_end()
    }
}

/// Collects every list in arrival order.
impl StreamObserver for Vec<FieldList> {
    fn on_object(&mut self, list: &FieldList) -> Result<()> {
        self.push(list.clone());
        Ok(())
    }
}

/// Hands every list to a consumer on another thread.
///
/// A disconnected receiver stops the parse with [`MarcError::Listener`].
impl StreamObserver for Sender<FieldList> {
    fn on_object(&mut self, list: &FieldList) -> Result<()> {
        self.send(list.clone())
            .map_err(|e| MarcError::Listener(format!("Field list receiver gone: {e}")))
    }
}

/// Rewrites field data before it reaches a listener.
///
/// Failures are not swallowed; they abort the parse.
pub trait StringTransformer {
    /// Transform one field's data.
    ///
    /// # Errors
    ///
    /// Returns [`MarcError::Transform`] if the data cannot be transformed.
    fn transform(&self, input: &str) -> Result<String>;
}

impl<F> StringTransformer for F
where
    F: Fn(&str) -> Result<String>,
{
    fn transform(&self, input: &str) -> Result<String> {
        self(input)
    }
}
