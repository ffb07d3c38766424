//! Ordered groups of sibling fields.
//!
//! A [`FieldList`] is either a single control field, or a data field
//! designator followed by its subfields in physical order. It is the unit
//! handed to [`StreamObserver`](crate::listener::StreamObserver)s.

use crate::field::Field;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;
use std::ops::Index;

/// Fields sharing one tag: a control field, or a designator plus subfields.
///
/// Stored in a `SmallVec` since nearly all data fields have four or fewer subfields.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FieldList {
    fields: SmallVec<[Field; 4]>,
}

impl FieldList {
    /// Create an empty list.
    #[must_use]
    pub fn new() -> Self {
        FieldList::default()
    }

    /// Create a list holding one field.
    #[must_use]
    pub fn of(field: Field) -> Self {
        let mut list = FieldList::new();
        list.push(field);
        list
    }

    /// Append a field.
    pub fn push(&mut self, field: Field) {
        self.fields.push(field);
    }

    /// Insert a field at `index`, shifting later fields right.
    ///
    /// # Panics
    ///
    /// Panics if `index > len`.
    pub fn insert(&mut self, index: usize, field: Field) {
        self.fields.insert(index, field);
    }

    /// The control field or data field designator.
    #[must_use]
    pub fn first(&self) -> Option<&Field> {
        self.fields.first()
    }

    /// Mutable access to the control field or designator.
    pub fn first_mut(&mut self) -> Option<&mut Field> {
        self.fields.first_mut()
    }

    /// The most recently appended field.
    #[must_use]
    pub fn last(&self) -> Option<&Field> {
        self.fields.last()
    }

    /// Tag shared by the members, if any.
    #[must_use]
    pub fn tag(&self) -> Option<&str> {
        self.first().map(Field::tag)
    }

    /// Number of fields, designator included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the list holds no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterate in physical order.
    pub fn iter(&self) -> std::slice::Iter<'_, Field> {
        self.fields.iter()
    }

    /// Iterate mutably in physical order.
    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Field> {
        self.fields.iter_mut()
    }

    /// The subfields, i.e. everything after the designator.
    #[must_use]
    pub fn subfields(&self) -> &[Field] {
        self.fields.get(1..).unwrap_or_default()
    }

    /// Concatenation of the member keys, describing the shape of the whole group.
    #[must_use]
    pub fn to_key(&self) -> String {
        self.fields.iter().map(Field::to_key).collect()
    }
}

impl Index<usize> for FieldList {
    type Output = Field;

    fn index(&self, index: usize) -> &Field {
        &self.fields[index]
    }
}

impl IntoIterator for FieldList {
    type Item = Field;
    type IntoIter = smallvec::IntoIter<[Field; 4]>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}

impl<'a> IntoIterator for &'a FieldList {
    type Item = &'a Field;
    type IntoIter = std::slice::Iter<'a, Field>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.iter()
    }
}

impl FromIterator<Field> for FieldList {
    fn from_iter<I: IntoIterator<Item = Field>>(iter: I) -> Self {
        FieldList {
            fields: iter.into_iter().collect(),
        }
    }
}

impl fmt::Display for FieldList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_key())
    }
}
