use serde::de::{Deserializer, IgnoredAny};
use serde::{Deserialize, Serialize};

use crate::model::ProgressionState;

/// Upper bound for the automatically derived question limit.
pub const SMART_LIMIT_CAP: u32 = 25;

/// Minutes granted per question when deriving a time limit.
pub const MINUTES_PER_QUESTION: f64 = 0.6;

/// Time limit used when no bank is loaded.
pub const DEFAULT_TIME_MINUTES: u32 = 15;

/// How the next batch is drawn from the bank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuizMode {
    /// Contiguous slices in bank order, wrapping when the bank is consumed.
    #[default]
    Serial,
    /// Random draws without repeats until the whole bank has been served.
    RandomLimited,
    /// Independent random draws; nothing is tracked.
    RandomUnlimited,
}

/// User-facing quiz settings.
///
/// The numeric fields accept whatever an older backup or a half-edited form
/// left behind; invalid values are stored as 0 and clamped on use through
/// [`QuizConfig::effective_limit`] and [`QuizConfig::effective_time_minutes`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QuizConfig {
    #[serde(deserialize_with = "lenient_u32")]
    pub time_minutes: u32,
    #[serde(deserialize_with = "lenient_u32")]
    pub question_limit: u32,
    pub mode: QuizMode,
    pub shuffle_options: bool,
}

impl Default for QuizConfig {
    fn default() -> Self {
        Self {
            time_minutes: DEFAULT_TIME_MINUTES,
            question_limit: SMART_LIMIT_CAP,
            mode: QuizMode::Serial,
            shuffle_options: true,
        }
    }
}

impl QuizConfig {
    /// Question limit clamped to at least 1.
    #[must_use]
    pub fn effective_limit(&self) -> usize {
        usize::try_from(self.question_limit.max(1)).unwrap_or(usize::MAX)
    }

    /// Time limit in minutes clamped to at least 1.
    #[must_use]
    pub fn effective_time_minutes(&self) -> u32 {
        self.time_minutes.max(1)
    }

    /// Sets the question limit and lets the time limit follow it.
    #[must_use]
    pub fn with_question_limit(mut self, limit: u32) -> Self {
        self.question_limit = limit;
        if limit > 0 {
            self.time_minutes = time_for_questions(limit as usize);
        }
        self
    }

    /// Recomputes limit and time from what is left in the bank.
    ///
    /// `total == 0` restores the empty-bank defaults; callers are expected to
    /// reset progression alongside.
    #[must_use]
    pub fn with_smart_defaults(mut self, total: usize, progression: &ProgressionState) -> Self {
        if total == 0 {
            self.question_limit = SMART_LIMIT_CAP;
            self.time_minutes = DEFAULT_TIME_MINUTES;
            return self;
        }

        let available = progression.available_count(self.mode, total);
        let limit = available.min(SMART_LIMIT_CAP as usize);
        self.question_limit = u32::try_from(limit).unwrap_or(SMART_LIMIT_CAP);
        self.time_minutes = time_for_questions(limit);
        self
    }
}

/// Time limit for a batch of `count` questions: `max(1, round(count × 0.6))`.
#[must_use]
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn time_for_questions(count: usize) -> u32 {
    let minutes = (count as f64 * MINUTES_PER_QUESTION).round();
    if minutes >= f64::from(u32::MAX) {
        return u32::MAX;
    }
    (minutes as u32).max(1)
}

#[derive(Deserialize)]
#[serde(untagged)]
enum LooseNumber {
    Unsigned(u64),
    Signed(i64),
    Float(f64),
    Text(String),
    Other(IgnoredAny),
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn float_to_u32(value: f64) -> u32 {
    if !value.is_finite() || value <= 0.0 {
        0
    } else if value >= f64::from(u32::MAX) {
        u32::MAX
    } else {
        value.round() as u32
    }
}

fn lenient_u32<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = match LooseNumber::deserialize(deserializer)? {
        LooseNumber::Unsigned(v) => u32::try_from(v).unwrap_or(u32::MAX),
        LooseNumber::Signed(_) | LooseNumber::Other(_) => 0,
        LooseNumber::Float(v) => float_to_u32(v),
        LooseNumber::Text(s) => s.trim().parse::<f64>().map(float_to_u32).unwrap_or(0),
    };
    Ok(value)
}
