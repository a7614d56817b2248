//! Grading of submitted batches and negative-mark arithmetic.

use crate::model::{
    ALTERNATE_NEGATIVE_MARK, DEFAULT_NEGATIVE_MARK, ExamResult, ExamStats, OptionKey,
    QuestionRecord,
};

/// How a single answer was graded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnswerOutcome {
    Correct,
    Wrong,
    Skipped,
}

/// Grade one answer by exact key equality.
#[must_use]
pub fn outcome(question: &QuestionRecord, choice: Option<OptionKey>) -> AnswerOutcome {
    match choice {
        None => AnswerOutcome::Skipped,
        Some(key) if key == question.correct() => AnswerOutcome::Correct,
        Some(_) => AnswerOutcome::Wrong,
    }
}

/// Tally a finished batch.
///
/// Positions without a matching entry in `choices` count as skipped.
#[must_use]
pub fn score(questions: &[QuestionRecord], choices: &[Option<OptionKey>]) -> ExamStats {
    let mut stats = ExamStats::default();
    for (idx, question) in questions.iter().enumerate() {
        let choice = choices.get(idx).copied().flatten();
        match outcome(question, choice) {
            AnswerOutcome::Correct => stats.correct = stats.correct.saturating_add(1),
            AnswerOutcome::Wrong => stats.wrong = stats.wrong.saturating_add(1),
            AnswerOutcome::Skipped => stats.skipped = stats.skipped.saturating_add(1),
        }
        stats.total = stats.total.saturating_add(1);
    }
    stats
}

/// Round to two decimal places.
#[must_use]
pub fn round_score(raw: f64) -> f64 {
    (raw * 100.0).round() / 100.0
}

/// The preset offered for comparison next to `current`.
#[must_use]
pub fn alternate_mark(current: f64) -> f64 {
    if (current - DEFAULT_NEGATIVE_MARK).abs() < f64::EPSILON {
        ALTERNATE_NEGATIVE_MARK
    } else {
        DEFAULT_NEGATIVE_MARK
    }
}

/// A result's score under its stored mark next to the alternate preset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreComparison {
    pub current_mark: f64,
    pub current_score: f64,
    pub alternate_mark: f64,
    pub alternate_score: f64,
}

impl ScoreComparison {
    #[must_use]
    pub fn for_result(result: &ExamResult) -> Self {
        let stats = result.stats();
        let current_mark = result.negative_mark();
        let alternate = alternate_mark(current_mark);
        Self {
            current_mark,
            current_score: stats.display_score(current_mark),
            alternate_mark: alternate,
            alternate_score: stats.display_score(alternate),
        }
    }
}

/// Which answers to show when reviewing a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReviewFilter {
    #[default]
    All,
    Correct,
    Wrong,
    Skipped,
}

impl ReviewFilter {
    #[must_use]
    pub fn matches(self, outcome: AnswerOutcome) -> bool {
        match self {
            ReviewFilter::All => true,
            ReviewFilter::Correct => outcome == AnswerOutcome::Correct,
            ReviewFilter::Wrong => outcome == AnswerOutcome::Wrong,
            ReviewFilter::Skipped => outcome == AnswerOutcome::Skipped,
        }
    }

    /// Clicking the active filter again goes back to `All`.
    #[must_use]
    pub fn toggle(self, requested: ReviewFilter) -> ReviewFilter {
        if self == requested {
            ReviewFilter::All
        } else {
            requested
        }
    }
}

/// Question positions of `result` that pass `filter`.
#[must_use]
pub fn review_positions(result: &ExamResult, filter: ReviewFilter) -> Vec<usize> {
    result
        .questions()
        .iter()
        .enumerate()
        .filter(|(idx, question)| {
            let choice = result.user_choices().get(*idx).copied().flatten();
            filter.matches(outcome(question, choice))
        })
        .map(|(idx, _)| idx)
        .collect()
}
