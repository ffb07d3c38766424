//! Field and subfield occurrences.
//!
//! A [`Field`] is one occurrence of a control field, a data field designator,
//! or a subfield inside a data field. All three share one shape: a tag, an
//! optional indicator, an optional subfield identifier and a data payload.
//! The [`designator`](Field::designator) and [`key`](Field::to_key) of a
//! field describe its shape independent of its data and are used downstream
//! for routing, sorting and deduplication.
//!
//! # Examples
//!
//! ```
//! use marcxchange::{Dialect, Field, RecordLabel};
//!
//! let label = RecordLabel::from_bytes(b"00714cam a2200205 a 4500")?;
//! let designator = Field::from_designator(&label, &Field::new("245"), "10", false);
//! let subfield = Field::from_designator(&label, &designator, "aTitle", true);
//!
//! assert_eq!(designator.designator(), "24510");
//! assert_eq!(subfield.designator(), "24510a");
//! assert_eq!(subfield.data(), "Title");
//! assert_eq!(subfield.to_key(), "245$10$a");
//! # Ok::<(), marcxchange::MarcError>(())
//! ```

use crate::label::RecordLabel;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Sentinel tag for an absent field.
pub const NULL_TAG: &str = "000";

/// Tag carried by fields reporting a decoding error.
pub const ERROR_TAG: &str = "999";

/// Synthetic tag carrying the configured record format.
pub const FORMAT_TAG: &str = "FMT";

/// Synthetic tag carrying the configured record type.
pub const TYPE_TAG: &str = "TYP";

/// Synthetic tag carrying the rendered record label.
pub const LEADER_TAG: &str = "LDR";

/// Separator between tag, indicator and subfield identifier in a field key.
pub const KEY_DELIMITER: char = '$';

/// Subfield layout rules for a record format.
///
/// Chosen once per reader from the configured format name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Dialect {
    /// ISO 2709 layout: indicator, then delimiter-prefixed subfields.
    #[default]
    Standard,
    /// MAB layout: indicator, then the remainder as data. Never split into subfields.
    Mab,
}

impl Dialect {
    /// Pick the dialect for a format name such as `"MARC21"` or `"MAB2"`.
    #[must_use]
    pub fn from_format(format: &str) -> Self {
        if format
            .get(..3)
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case("MAB"))
        {
            Dialect::Mab
        } else {
            Dialect::Standard
        }
    }

    /// Whether data fields of this dialect are split into subfields.
    #[must_use]
    pub fn splits_subfields(&self) -> bool {
        matches!(self, Dialect::Standard)
    }
}

/// Whether a tag denotes a control field (`"000"` through `"009"`).
#[must_use]
pub fn is_control_tag(tag: &str) -> bool {
    tag.as_bytes().starts_with(b"00")
}

/// One field, data field designator, or subfield occurrence.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Field {
    tag: String,
    indicator: Option<String>,
    subfield_id: Option<String>,
    data: String,
    position: Option<usize>,
    length: Option<usize>,
}

impl Field {
    /// Create a bare field carrying only a tag.
    #[must_use]
    pub fn new(tag: impl Into<String>) -> Self {
        Field {
            tag: tag.into(),
            ..Field::default()
        }
    }

    /// Decode a complete field from its raw content using the label widths.
    ///
    /// Control fields keep the whole content as data. Data fields lose their
    /// leading indicator characters; under [`Dialect::Standard`] the next
    /// `subfield_identifier_length` characters are taken as a subfield
    /// identifier (delimiter dropped) and the rest is data, under
    /// [`Dialect::Mab`] the whole remainder is data.
    ///
    /// Content too short for the indicator or identifier is kept as data
    /// with neither indicator nor identifier set.
    #[must_use]
    pub fn from_raw(label: &RecordLabel, dialect: Dialect, tag: &str, raw: &str) -> Self {
        let mut field = Field::new(tag);
        if field.is_control_field() {
            field.data = raw.to_string();
            return field;
        }
        let Some((indicator, rest)) = split_chars(raw, label.indicator_length()) else {
            field.data = raw.to_string();
            return field;
        };
        if dialect.splits_subfields() && label.has_subfields() && !rest.is_empty() {
            match split_chars(rest, label.subfield_identifier_length()) {
                Some((identifier, data)) => {
                    // first character is the delimiter
                    let code: String = identifier.chars().skip(1).collect();
                    field.indicator = Some(indicator.to_string());
                    field.subfield_id = Some(code);
                    field.data = data.to_string();
                },
                None => field.data = raw.to_string(),
            }
            return field;
        }
        field.indicator = Some(indicator.to_string());
        field.data = rest.to_string();
        field
    }

    /// Decode a field segment that belongs to an already known designator.
    ///
    /// With `as_subfield` set, `raw` is the text following a subfield
    /// delimiter: its first `subfield_identifier_length - 1` characters are
    /// the subfield identifier and the rest is data. The result inherits tag
    /// and indicator from `designator`.
    ///
    /// Without `as_subfield`, `raw` is the leading segment of a data field:
    /// indicator characters followed by any data placed directly on the field.
    #[must_use]
    pub fn from_designator(
        label: &RecordLabel,
        designator: &Field,
        raw: &str,
        as_subfield: bool,
    ) -> Self {
        let mut field = Field::new(designator.tag.clone());
        if field.is_control_field() {
            field.data = raw.to_string();
            return field;
        }
        if as_subfield {
            field.indicator.clone_from(&designator.indicator);
            let width = label.subfield_identifier_length().saturating_sub(1);
            match split_chars(raw, width) {
                Some((code, data)) if width > 0 => {
                    field.subfield_id = Some(code.to_string());
                    field.data = data.to_string();
                },
                _ => field.data = raw.to_string(),
            }
            return field;
        }
        match split_chars(raw, label.indicator_length()) {
            Some((indicator, data)) => {
                field.indicator = Some(indicator.to_string());
                field.data = data.to_string();
            },
            None => field.data = raw.to_string(),
        }
        field
    }

    /// Rebuild the shape of a field from a key produced by [`Field::to_key`].
    ///
    /// Data, position and length are left unset.
    #[must_use]
    pub fn from_key(key: &str) -> Self {
        let mut parts = key.splitn(3, KEY_DELIMITER);
        let mut field = Field::new(parts.next().unwrap_or_default());
        field.indicator = parts.next().filter(|s| !s.is_empty()).map(str::to_string);
        field.subfield_id = parts.next().filter(|s| !s.is_empty()).map(str::to_string);
        field
    }

    /// The three-character tag.
    #[must_use]
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Indicator characters, unset for control fields.
    #[must_use]
    pub fn indicator(&self) -> Option<&str> {
        self.indicator.as_deref()
    }

    /// Subfield identifier without its delimiter.
    #[must_use]
    pub fn subfield_id(&self) -> Option<&str> {
        self.subfield_id.as_deref()
    }

    /// Character payload.
    #[must_use]
    pub fn data(&self) -> &str {
        &self.data
    }

    /// Offset of this occurrence inside the source record, if decoded from one.
    #[must_use]
    pub fn position(&self) -> Option<usize> {
        self.position
    }

    /// Length of this occurrence inside the source record, if decoded from one.
    #[must_use]
    pub fn length(&self) -> Option<usize> {
        self.length
    }

    /// Whether the tag is in the `00X` control field range.
    #[must_use]
    pub fn is_control_field(&self) -> bool {
        is_control_tag(&self.tag)
    }

    /// Whether this occurrence is a subfield.
    #[must_use]
    pub fn is_subfield(&self) -> bool {
        self.subfield_id.is_some()
    }

    /// Tag, indicator and subfield identifier concatenated.
    #[must_use]
    pub fn designator(&self) -> String {
        let mut designator = self.tag.clone();
        if let Some(indicator) = &self.indicator {
            designator.push_str(indicator);
        }
        if let Some(subfield_id) = &self.subfield_id {
            designator.push_str(subfield_id);
        }
        designator
    }

    /// Delimited form of the designator, e.g. `245$10$a`.
    ///
    /// Keys are unambiguous where designators are not: `"24510a"` could be
    /// a three or a two character indicator.
    #[must_use]
    pub fn to_key(&self) -> String {
        let mut key = self.tag.clone();
        if self.indicator.is_some() || self.subfield_id.is_some() {
            key.push(KEY_DELIMITER);
            key.push_str(self.indicator.as_deref().unwrap_or_default());
        }
        if let Some(subfield_id) = &self.subfield_id {
            key.push(KEY_DELIMITER);
            key.push_str(subfield_id);
        }
        key
    }

    /// Replace the tag.
    pub fn set_tag(&mut self, tag: impl Into<String>) -> &mut Self {
        self.tag = tag.into();
        self
    }

    /// Replace the indicator.
    pub fn set_indicator(&mut self, indicator: Option<String>) -> &mut Self {
        self.indicator = indicator;
        self
    }

    /// Replace the subfield identifier.
    pub fn set_subfield_id(&mut self, subfield_id: Option<String>) -> &mut Self {
        self.subfield_id = subfield_id;
        self
    }

    /// Replace the data, e.g. after Unicode normalization.
    pub fn set_data(&mut self, data: impl Into<String>) -> &mut Self {
        self.data = data.into();
        self
    }

    /// Record where this occurrence was found in the source record.
    pub fn set_span(&mut self, position: usize, length: usize) -> &mut Self {
        self.position = Some(position);
        self.length = Some(length);
        self
    }

    /// Move the data out, leaving an empty payload behind.
    pub fn take_data(&mut self) -> String {
        std::mem::take(&mut self.data)
    }

    /// Reset every attribute so the instance can be reused.
    pub fn clear(&mut self) -> &mut Self {
        self.tag.clear();
        self.indicator = None;
        self.subfield_id = None;
        self.data.clear();
        self.position = None;
        self.length = None;
        self
    }
}

impl PartialOrd for Field {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Field {
    /// Designator order: tag, then indicator, then subfield identifier.
    /// Ties are broken by data and span to stay consistent with `Eq`.
    fn cmp(&self, other: &Self) -> Ordering {
        self.designator()
            .cmp(&other.designator())
            .then_with(|| self.to_key().cmp(&other.to_key()))
            .then_with(|| self.data.cmp(&other.data))
            .then_with(|| self.position.cmp(&other.position))
            .then_with(|| self.length.cmp(&other.length))
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.to_key(), self.data)
    }
}

/// Split after `n` characters; `None` when the text is shorter.
fn split_chars(s: &str, n: usize) -> Option<(&str, &str)> {
    if n == 0 {
        return Some(("", s));
    }
    match s.char_indices().nth(n) {
        Some((index, _)) => Some(s.split_at(index)),
        None if s.chars().count() == n => Some((s, "")),
        None => None,
    }
}
