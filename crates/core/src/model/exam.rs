use chrono::{DateTime, Utc};
use serde::de::{Deserializer, IgnoredAny};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{ExamId, OptionKey, QuestionRecord};
use crate::scoring;

/// Penalty per wrong answer applied when a result is first recorded.
pub const DEFAULT_NEGATIVE_MARK: f64 = 0.25;

/// The other preset offered next to the default for comparison.
pub const ALTERNATE_NEGATIVE_MARK: f64 = 0.50;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum ExamResultError {
    #[error("expected {expected} answers, got {actual}")]
    ChoiceCountMismatch { expected: usize, actual: usize },

    #[error("negative mark must be a finite, positive number (got {0})")]
    InvalidNegativeMark(f64),

    #[error("total ({total}) does not match counts ({sum})")]
    CountMismatch { total: u32, sum: u32 },

    #[error("stats cover {total} questions, result has {questions}")]
    TotalMismatch { total: u32, questions: usize },
}

//
// ─── STATS ─────────────────────────────────────────────────────────────────────
//

/// Per-attempt tallies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ExamStats {
    pub correct: u32,
    pub wrong: u32,
    pub skipped: u32,
    pub total: u32,
}

impl ExamStats {
    /// Rehydrate stats from persisted counts.
    ///
    /// # Errors
    ///
    /// Returns `ExamResultError::CountMismatch` if the counts do not add up.
    pub fn from_persisted(
        correct: u32,
        wrong: u32,
        skipped: u32,
        total: u32,
    ) -> Result<Self, ExamResultError> {
        let sum = correct.saturating_add(wrong).saturating_add(skipped);
        if sum != total {
            return Err(ExamResultError::CountMismatch { total, sum });
        }
        Ok(Self {
            correct,
            wrong,
            skipped,
            total,
        })
    }

    /// `correct − wrong × negative_mark`, unrounded.
    #[must_use]
    pub fn raw_score(&self, negative_mark: f64) -> f64 {
        f64::from(self.correct) - f64::from(self.wrong) * negative_mark
    }

    /// Score rounded to two decimals for display.
    #[must_use]
    pub fn display_score(&self, negative_mark: f64) -> f64 {
        scoring::round_score(self.raw_score(negative_mark))
    }
}

//
// ─── EXAM RESULT ───────────────────────────────────────────────────────────────
//

/// One submitted attempt.
///
/// Everything except the negative mark and the name is fixed at creation.
/// Deserialized records go through [`ExamResult::from_persisted`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "PersistedExamResult")]
pub struct ExamResult {
    id: ExamId,
    timestamp: i64,
    questions: Vec<QuestionRecord>,
    user_choices: Vec<Option<OptionKey>>,
    stats: ExamStats,
    negative_mark: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    parent_exam_id: Option<ExamId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    exam_name: Option<String>,
}

impl ExamResult {
    /// Grade a finished batch and record it with the default negative mark.
    ///
    /// # Errors
    ///
    /// Returns `ExamResultError::ChoiceCountMismatch` if there is not exactly
    /// one choice per question.
    pub fn record(
        id: ExamId,
        timestamp: i64,
        questions: Vec<QuestionRecord>,
        user_choices: Vec<Option<OptionKey>>,
        parent_exam_id: Option<ExamId>,
        exam_name: Option<String>,
    ) -> Result<Self, ExamResultError> {
        if questions.len() != user_choices.len() {
            return Err(ExamResultError::ChoiceCountMismatch {
                expected: questions.len(),
                actual: user_choices.len(),
            });
        }
        let stats = scoring::score(&questions, &user_choices);

        Ok(Self {
            id,
            timestamp,
            questions,
            user_choices,
            stats,
            negative_mark: DEFAULT_NEGATIVE_MARK,
            parent_exam_id,
            exam_name: normalize_name(exam_name),
        })
    }

    /// Rehydrate a result from persisted storage.
    ///
    /// # Errors
    ///
    /// Returns `ExamResultError` if choices and questions disagree in length,
    /// the stats do not add up to the question count, or the negative mark is
    /// invalid.
    #[allow(clippy::too_many_arguments)]
    pub fn from_persisted(
        id: ExamId,
        timestamp: i64,
        questions: Vec<QuestionRecord>,
        user_choices: Vec<Option<OptionKey>>,
        stats: ExamStats,
        negative_mark: f64,
        parent_exam_id: Option<ExamId>,
        exam_name: Option<String>,
    ) -> Result<Self, ExamResultError> {
        if questions.len() != user_choices.len() {
            return Err(ExamResultError::ChoiceCountMismatch {
                expected: questions.len(),
                actual: user_choices.len(),
            });
        }
        let stats =
            ExamStats::from_persisted(stats.correct, stats.wrong, stats.skipped, stats.total)?;
        if usize::try_from(stats.total).ok() != Some(questions.len()) {
            return Err(ExamResultError::TotalMismatch {
                total: stats.total,
                questions: questions.len(),
            });
        }
        validate_mark(negative_mark)?;

        Ok(Self {
            id,
            timestamp,
            questions,
            user_choices,
            stats,
            negative_mark,
            parent_exam_id,
            exam_name,
        })
    }

    #[must_use]
    pub fn id(&self) -> ExamId {
        self.id
    }

    /// Submission time in epoch milliseconds.
    #[must_use]
    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    #[must_use]
    pub fn recorded_at(&self) -> DateTime<Utc> {
        crate::time::from_millis(self.timestamp)
    }

    #[must_use]
    pub fn questions(&self) -> &[QuestionRecord] {
        &self.questions
    }

    #[must_use]
    pub fn user_choices(&self) -> &[Option<OptionKey>] {
        &self.user_choices
    }

    #[must_use]
    pub fn stats(&self) -> ExamStats {
        self.stats
    }

    #[must_use]
    pub fn negative_mark(&self) -> f64 {
        self.negative_mark
    }

    #[must_use]
    pub fn parent_exam_id(&self) -> Option<ExamId> {
        self.parent_exam_id
    }

    #[must_use]
    pub fn exam_name(&self) -> Option<&str> {
        self.exam_name.as_deref()
    }

    #[must_use]
    pub fn is_root(&self) -> bool {
        self.parent_exam_id.is_none()
    }

    /// Id of the attempt a retake of this result should point at.
    #[must_use]
    pub fn root_id(&self) -> ExamId {
        self.parent_exam_id.unwrap_or(self.id)
    }

    /// Score at the stored negative mark, rounded for display.
    #[must_use]
    pub fn score(&self) -> f64 {
        self.stats.display_score(self.negative_mark)
    }

    /// Change the penalty weight used for this result's score.
    ///
    /// # Errors
    ///
    /// Returns `ExamResultError::InvalidNegativeMark` for NaN, infinite, zero or
    /// negative weights.
    pub fn set_negative_mark(&mut self, mark: f64) -> Result<(), ExamResultError> {
        validate_mark(mark)?;
        self.negative_mark = mark;
        Ok(())
    }

    /// Rename the attempt; blank names clear it.
    pub fn rename(&mut self, name: Option<String>) {
        self.exam_name = normalize_name(name);
    }
}

/// Wire shape of an `ExamResult`; converted through `from_persisted`.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PersistedExamResult {
    id: ExamId,
    timestamp: i64,
    questions: Vec<QuestionRecord>,
    #[serde(deserialize_with = "lenient_choices")]
    user_choices: Vec<Option<OptionKey>>,
    stats: ExamStats,
    #[serde(default = "default_negative_mark", deserialize_with = "lenient_mark")]
    negative_mark: f64,
    #[serde(default)]
    parent_exam_id: Option<ExamId>,
    #[serde(default)]
    exam_name: Option<String>,
}

impl TryFrom<PersistedExamResult> for ExamResult {
    type Error = ExamResultError;

    fn try_from(raw: PersistedExamResult) -> Result<Self, Self::Error> {
        ExamResult::from_persisted(
            raw.id,
            raw.timestamp,
            raw.questions,
            raw.user_choices,
            raw.stats,
            raw.negative_mark,
            raw.parent_exam_id,
            raw.exam_name,
        )
    }
}

fn validate_mark(mark: f64) -> Result<(), ExamResultError> {
    if mark.is_finite() && mark > 0.0 {
        Ok(())
    } else {
        Err(ExamResultError::InvalidNegativeMark(mark))
    }
}

fn normalize_name(name: Option<String>) -> Option<String> {
    name.map(|n| n.trim().to_string()).filter(|n| !n.is_empty())
}

fn default_negative_mark() -> f64 {
    DEFAULT_NEGATIVE_MARK
}

#[derive(Deserialize)]
#[serde(untagged)]
enum LooseMark {
    Number(f64),
    Other(IgnoredAny),
}

fn lenient_mark<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match LooseMark::deserialize(deserializer)? {
        LooseMark::Number(v) if v.is_finite() && v > 0.0 => v,
        LooseMark::Number(_) | LooseMark::Other(_) => DEFAULT_NEGATIVE_MARK,
    })
}

fn lenient_choices<'de, D>(deserializer: D) -> Result<Vec<Option<OptionKey>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Vec<Option<String>> = Vec::deserialize(deserializer)?;
    raw.into_iter()
        .map(|choice| match choice.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(label) => OptionKey::from_label(label)
                .map(Some)
                .map_err(serde::de::Error::custom),
        })
        .collect()
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
