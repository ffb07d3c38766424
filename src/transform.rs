//! Stock [`StringTransformer`]s.
//!
//! Records from older systems frequently carry decomposed diacritics (a base
//! letter followed by a combining mark), while newer records use precomposed
//! characters. Normalizing field data makes the two compare equal downstream.

use crate::error::{MarcError, Result};
use crate::listener::StringTransformer;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use unicode_normalization::UnicodeNormalization;

/// Unicode normalization form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum NormalizationForm {
    /// Canonical composition
    #[default]
    Nfc,
    /// Canonical decomposition
    Nfd,
    /// Compatibility composition
    Nfkc,
    /// Compatibility decomposition
    Nfkd,
}

impl FromStr for NormalizationForm {
    type Err = MarcError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "NFC" => Ok(NormalizationForm::Nfc),
            "NFD" => Ok(NormalizationForm::Nfd),
            "NFKC" => Ok(NormalizationForm::Nfkc),
            "NFKD" => Ok(NormalizationForm::Nfkd),
            _ => Err(MarcError::Config(format!(
                "Unknown normalization form: {s}"
            ))),
        }
    }
}

/// Normalizes field data to one Unicode normalization form.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnicodeNormalizer {
    form: NormalizationForm,
}

impl UnicodeNormalizer {
    /// Create a normalizer for `form`.
    #[must_use]
    pub fn new(form: NormalizationForm) -> Self {
        UnicodeNormalizer { form }
    }

    /// The form this normalizer produces.
    #[must_use]
    pub fn form(&self) -> NormalizationForm {
        self.form
    }
}

impl StringTransformer for UnicodeNormalizer {
    fn transform(&self, input: &str) -> Result<String> {
        Ok(match self.form {
            NormalizationForm::Nfc => input.nfc().collect(),
            NormalizationForm::Nfd => input.nfd().collect(),
            NormalizationForm::Nfkc => input.nfkc().collect(),
            NormalizationForm::Nfkd => input.nfkd().collect(),
        })
    }
}
