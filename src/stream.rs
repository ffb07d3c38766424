//! Assembling decoder events into field lists.
//!
//! [`MarcXchangeStream`] is a [`MarcXchangeListener`] that collects the
//! begin/end events of one field into a [`FieldList`] and hands the finished
//! list to every registered [`StreamObserver`]. Record format, record type and
//! label travel the same way, as single-field lists under the synthetic tags
//! [`FORMAT_TAG`], [`TYPE_TAG`] and [`LEADER_TAG`].
//!
//! Data placed directly on a data field instead of in a subfield is moved
//! into a synthesized subfield `a`, so observers only ever see subfield data.

use crate::error::{MarcError, Result};
use crate::field::{Field, FORMAT_TAG, LEADER_TAG, TYPE_TAG};
use crate::field_list::FieldList;
use crate::label::RecordLabel;
use crate::listener::{MarcXchangeListener, StreamObserver, StringTransformer};
use std::fmt;

/// Handle returned by [`MarcXchangeStream::add`], used to remove an observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(usize);

/// Field list under construction.
#[derive(Debug, Default)]
enum Assembly {
    #[default]
    Idle,
    Control(FieldList),
    Data(FieldList),
}

impl Assembly {
    fn name(&self) -> &'static str {
        match self {
            Assembly::Idle => "no field",
            Assembly::Control(_) => "a control field",
            Assembly::Data(_) => "a data field",
        }
    }
}

/// Listener that republishes decoder events as [`FieldList`]s.
///
/// Observers are called in registration order, synchronously, before the
/// triggering event returns. Their errors are not caught.
#[derive(Default)]
pub struct MarcXchangeStream<'a> {
    observers: Vec<(ObserverId, Box<dyn StreamObserver + 'a>)>,
    next_id: usize,
    listener: Option<Box<dyn MarcXchangeListener + 'a>>,
    transformer: Option<Box<dyn StringTransformer + 'a>>,
    state: Assembly,
}

impl fmt::Debug for MarcXchangeStream<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MarcXchangeStream")
            .field("observers", &self.observers.len())
            .field("listener", &self.listener.is_some())
            .field("transformer", &self.transformer.is_some())
            .field("state", &self.state)
            .finish()
    }
}

impl<'a> MarcXchangeStream<'a> {
    /// Create a stream without observers.
    #[must_use]
    pub fn new() -> Self {
        MarcXchangeStream::default()
    }

    /// Forward every raw event to `listener` before assembling it.
    #[must_use]
    pub fn with_listener(mut self, listener: impl MarcXchangeListener + 'a) -> Self {
        self.listener = Some(Box::new(listener));
        self
    }

    /// Transform control field and subfield data before publishing.
    #[must_use]
    pub fn with_transformer(mut self, transformer: impl StringTransformer + 'a) -> Self {
        self.transformer = Some(Box::new(transformer));
        self
    }

    /// Register an observer; it receives lists after all earlier observers.
    pub fn add(&mut self, observer: impl StreamObserver + 'a) -> ObserverId {
        let id = ObserverId(self.next_id);
        self.next_id += 1;
        self.observers.push((id, Box::new(observer)));
        id
    }

    /// Unregister an observer. Returns whether it was registered.
    pub fn remove(&mut self, id: ObserverId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(registered, _)| *registered != id);
        self.observers.len() != before
    }

    /// Number of registered observers.
    #[must_use]
    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    /// Announce the start of a stream to every observer.
    ///
    /// # Errors
    ///
    /// Returns the first observer error.
    pub fn on_begin(&mut self) -> Result<()> {
        for (_, observer) in &mut self.observers {
            observer.on_begin()?;
        }
        Ok(())
    }

    /// Hand a finished list to every observer.
    ///
    /// # Errors
    ///
    /// Returns the first observer error; later observers do not see the list.
    pub fn on_object(&mut self, list: &FieldList) -> Result<()> {
        for (_, observer) in &mut self.observers {
            observer.on_object(list)?;
        }
        Ok(())
    }

    /// Announce the end of a stream to every observer.
    ///
    /// # Errors
    ///
    /// Returns the first observer error.
    pub fn on_end(&mut self) -> Result<()> {
        for (_, observer) in &mut self.observers {
            observer.on_end()?;
        }
        Ok(())
    }

    fn publish_pseudo_field(&mut self, tag: &str, data: &str) -> Result<()> {
        let mut field = Field::new(tag);
        field.set_data(data);
        self.on_object(&FieldList::of(field))
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

    fn forward(
        &mut self,
        event: impl FnOnce(&mut (dyn MarcXchangeListener + 'a)) -> Result<()>,
    ) -> Result<()> {
        match &mut self.listener {
            Some(listener) => event(listener.as_mut()),
            None => Ok(()),
        }
    }

    fn begin(&mut self, assembly: Assembly) -> Result<()> {
        if let Assembly::Idle = self.state {
            self.state = assembly;
            Ok(())
        } else {
            Err(MarcError::EventOrder(format!(
                "field started inside {}",
                self.state.name()
            )))
        }
    }
}

/// Move data placed directly on a data field into a subfield `a`.
///
/// The subfield is inserted right after the designator and the designator's
/// data is emptied, so a second call is a no-op. Returns whether a subfield
/// was synthesized.
pub fn normalize_direct_data(list: &mut FieldList) -> bool {
    let Some(designator) = list.first_mut() else {
        return false;
    };
    if designator.is_control_field() || designator.is_subfield() || designator.data().is_empty() {
        return false;
    }
    let data = designator.take_data();
    let mut subfield = Field::new(designator.tag());
    subfield
        .set_indicator(designator.indicator().map(str::to_string))
        .set_subfield_id(Some("a".to_string()))
        .set_data(data);
    if let (Some(position), Some(length)) = (designator.position(), designator.length()) {
        subfield.set_span(position, length);
    }
    list.insert(1, subfield);
    true
}

impl MarcXchangeListener for MarcXchangeStream<'_> {
    fn begin_collection(&mut self) -> Result<()> {
        self.forward(|l| l.begin_collection())?;
        self.on_begin()
    }

    fn end_collection(&mut self) -> Result<()> {
        self.forward(|l| l.end_collection())?;
        self.on_end()
    }

    fn begin_record(&mut self, format: &str, record_type: &str) -> Result<()> {
        self.forward(|l| l.begin_record(format, record_type))?;
        self.state = Assembly::Idle;
        self.publish_pseudo_field(FORMAT_TAG, format)?;
        self.publish_pseudo_field(TYPE_TAG, record_type)
    }

    fn end_record(&mut self) -> Result<()> {
        self.forward(|l| l.end_record())?;
        match std::mem::take(&mut self.state) {
            Assembly::Idle => Ok(()),
            open => Err(MarcError::EventOrder(format!(
                "record ended inside {}",
                open.name()
            ))),
        }
    }

    fn leader(&mut self, label: &RecordLabel) -> Result<()> {
        self.forward(|l| l.leader(label))?;
        self.publish_pseudo_field(LEADER_TAG, &label.to_string())
    }

    fn begin_control_field(&mut self, field: &Field) -> Result<()> {
        self.forward(|l| l.begin_control_field(field))?;
        self.begin(Assembly::Control(FieldList::of(field.clone())))
    }

    fn end_control_field(&mut self, field: &Field) -> Result<()> {
        self.forward(|l| l.end_control_field(field))?;
        let Assembly::Control(mut list) = std::mem::take(&mut self.state) else {
            return Err(MarcError::EventOrder(format!(
                "control field {} ended outside a control field",
                field.tag()
            )));
        };
        if let Some(first) = list.first_mut() {
            self.transform(first)?;
        }
        self.on_object(&list)
    }

    fn begin_data_field(&mut self, field: &Field) -> Result<()> {
        self.forward(|l| l.begin_data_field(field))?;
        self.begin(Assembly::Data(FieldList::of(field.clone())))
    }

    fn end_data_field(&mut self, field: &Field) -> Result<()> {
        self.forward(|l| l.end_data_field(field))?;
        let Assembly::Data(mut list) = std::mem::take(&mut self.state) else {
            return Err(MarcError::EventOrder(format!(
                "data field {} ended outside a data field",
                field.tag()
            )));
        };
        if let Some(first) = list.first_mut() {
            self.transform(first)?;
        }
        normalize_direct_data(&mut list);
        self.on_object(&list)
    }

    fn begin_subfield(&mut self, field: &Field) -> Result<()> {
        self.forward(|l| l.begin_subfield(field))?;
        match self.state {
            Assembly::Data(_) => Ok(()),
            _ => Err(MarcError::EventOrder(format!(
                "subfield {} started inside {}",
                field.to_key(),
                self.state.name()
            ))),
        }
    }

    fn end_subfield(&mut self, field: &Field) -> Result<()> {
        self.forward(|l| l.end_subfield(field))?;
        let mut subfield = field.clone();
        self.transform(&mut subfield)?;
        match &mut self.state {
            Assembly::Data(list) => {
                list.push(subfield);
                Ok(())
            },
            other => Err(MarcError::EventOrder(format!(
                "subfield {} ended inside {}",
                field.to_key(),
                other.name()
            ))),
        }
    }
}
