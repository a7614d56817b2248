use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("option permutation must use every key exactly once")]
    InvalidPermutation,

    #[error("unknown option key: {0}")]
    UnknownKey(String),
}

//
// ─── OPTION KEYS ───────────────────────────────────────────────────────────────
//

/// One of the four fixed option labels of a question.
///
/// Serialized with the Bengali labels used by question banks and backups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum OptionKey {
    #[serde(rename = "ক")]
    Ka,
    #[serde(rename = "খ")]
    Kha,
    #[serde(rename = "গ")]
    Ga,
    #[serde(rename = "ঘ")]
    Gha,
}

impl OptionKey {
    /// All keys in display order.
    pub const ALL: [OptionKey; 4] = [OptionKey::Ka, OptionKey::Kha, OptionKey::Ga, OptionKey::Gha];

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            OptionKey::Ka => "ক",
            OptionKey::Kha => "খ",
            OptionKey::Ga => "গ",
            OptionKey::Gha => "ঘ",
        }
    }

    /// Position of this key within [`OptionKey::ALL`].
    #[must_use]
    pub fn position(self) -> usize {
        match self {
            OptionKey::Ka => 0,
            OptionKey::Kha => 1,
            OptionKey::Ga => 2,
            OptionKey::Gha => 3,
        }
    }

    /// Parses a stored label.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError::UnknownKey` for anything but the four labels.
    pub fn from_label(label: &str) -> Result<Self, QuestionError> {
        Self::ALL
            .into_iter()
            .find(|key| key.label() == label.trim())
            .ok_or_else(|| QuestionError::UnknownKey(label.to_string()))
    }
}

impl fmt::Display for OptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

//
// ─── OPTIONS ───────────────────────────────────────────────────────────────────
//

/// Option texts keyed by the four fixed labels.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct QuestionOptions {
    #[serde(rename = "ক", default)]
    ka: String,
    #[serde(rename = "খ", default)]
    kha: String,
    #[serde(rename = "গ", default)]
    ga: String,
    #[serde(rename = "ঘ", default)]
    gha: String,
}

impl QuestionOptions {
    /// Builds options from texts given in key order (ক, খ, গ, ঘ).
    #[must_use]
    pub fn from_texts(texts: [String; 4]) -> Self {
        let [ka, kha, ga, gha] = texts;
        Self { ka, kha, ga, gha }
    }

    #[must_use]
    pub fn get(&self, key: OptionKey) -> &str {
        match key {
            OptionKey::Ka => &self.ka,
            OptionKey::Kha => &self.kha,
            OptionKey::Ga => &self.ga,
            OptionKey::Gha => &self.gha,
        }
    }

    /// Texts in key order.
    #[must_use]
    pub fn texts(&self) -> [&str; 4] {
        [&self.ka, &self.kha, &self.ga, &self.gha]
    }

    /// Iterates `(key, text)` pairs in key order.
    pub fn iter(&self) -> impl Iterator<Item = (OptionKey, &str)> {
        OptionKey::ALL.into_iter().zip(self.texts())
    }
}

//
// ─── QUESTION RECORD ───────────────────────────────────────────────────────────
//

/// A parsed multiple-choice question.
///
/// Records are produced by the bank parser and never edited afterwards;
/// [`QuestionRecord::reordered`] derives a new record instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionRecord {
    #[serde(rename = "q")]
    text: String,
    #[serde(rename = "opt")]
    options: QuestionOptions,
    #[serde(rename = "a")]
    correct: OptionKey,
    #[serde(rename = "originalIndex", default)]
    original_index: usize,
}

impl QuestionRecord {
    #[must_use]
    pub fn new(
        text: impl Into<String>,
        options: QuestionOptions,
        correct: OptionKey,
        original_index: usize,
    ) -> Self {
        Self {
            text: text.into(),
            options,
            correct,
            original_index,
        }
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn options(&self) -> &QuestionOptions {
        &self.options
    }

    #[must_use]
    pub fn correct(&self) -> OptionKey {
        self.correct
    }

    #[must_use]
    pub fn correct_text(&self) -> &str {
        self.options.get(self.correct)
    }

    /// Position of this question in the bank it was parsed from.
    #[must_use]
    pub fn original_index(&self) -> usize {
        self.original_index
    }

    /// Returns a copy whose options are rearranged so that the new key at
    /// position `i` holds the text previously under `order[i]`.
    ///
    /// The correct key follows its text.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError::InvalidPermutation` if `order` repeats a key.
    pub fn reordered(&self, order: [OptionKey; 4]) -> Result<Self, QuestionError> {
        let mut seen = [false; 4];
        for key in order {
            let slot = &mut seen[key.position()];
            if *slot {
                return Err(QuestionError::InvalidPermutation);
            }
            *slot = true;
        }

        let texts = order.map(|key| self.options.get(key).to_string());
        let correct = OptionKey::ALL
            .into_iter()
            .zip(order)
            .find_map(|(new_key, old_key)| (old_key == self.correct).then_some(new_key))
            .ok_or(QuestionError::InvalidPermutation)?;

        Ok(Self {
            text: self.text.clone(),
            options: QuestionOptions::from_texts(texts),
            correct,
            original_index: self.original_index,
        })
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
