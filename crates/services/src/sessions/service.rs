use chrono::{DateTime, Duration, Utc};

use quiz_core::model::{ExamId, ExamResult, OptionKey, QuestionRecord};

use super::progress::SessionProgress;
use crate::error::SessionError;

//
// ─── EXAM SESSION ──────────────────────────────────────────────────────────────
//

/// An attempt that has been started but not submitted.
///
/// The batch is frozen at start; only the answers change until submission.
#[derive(Debug, Clone, PartialEq)]
pub struct ExamSession {
    questions: Vec<QuestionRecord>,
    answers: Vec<Option<OptionKey>>,
    time_limit_minutes: u32,
    started_at: DateTime<Utc>,
    parent_exam_id: Option<ExamId>,
    exam_name: Option<String>,
}

impl ExamSession {
    /// Open a session over `questions`.
    ///
    /// `started_at` should come from the services layer clock to keep time deterministic.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NoQuestionsAvailable` if `questions` is empty.
    pub fn new(
        questions: Vec<QuestionRecord>,
        time_limit_minutes: u32,
        started_at: DateTime<Utc>,
        parent_exam_id: Option<ExamId>,
        exam_name: Option<String>,
    ) -> Result<Self, SessionError> {
        if questions.is_empty() {
            return Err(SessionError::NoQuestionsAvailable);
        }
        let answers = vec![None; questions.len()];
        Ok(Self {
            questions,
            answers,
            time_limit_minutes: time_limit_minutes.max(1),
            started_at,
            parent_exam_id,
            exam_name,
        })
    }

    #[must_use]
    pub fn questions(&self) -> &[QuestionRecord] {
        &self.questions
    }

    #[must_use]
    pub fn answers(&self) -> &[Option<OptionKey>] {
        &self.answers
    }

    #[must_use]
    pub fn answer_for(&self, index: usize) -> Option<OptionKey> {
        self.answers.get(index).copied().flatten()
    }

    #[must_use]
    pub fn time_limit_minutes(&self) -> u32 {
        self.time_limit_minutes
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Moment the timer runs out.
    #[must_use]
    pub fn deadline(&self) -> DateTime<Utc> {
        self.started_at + Duration::minutes(i64::from(self.time_limit_minutes))
    }

    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.deadline()
    }

    /// Time left on the timer, never negative.
    #[must_use]
    pub fn time_remaining(&self, now: DateTime<Utc>) -> Duration {
        (self.deadline() - now).max(Duration::zero())
    }

    /// Root attempt this session retakes, if any.
    #[must_use]
    pub fn parent_exam_id(&self) -> Option<ExamId> {
        self.parent_exam_id
    }

    #[must_use]
    pub fn exam_name(&self) -> Option<&str> {
        self.exam_name.as_deref()
    }

    #[must_use]
    pub fn total_questions(&self) -> usize {
        self.questions.len()
    }

    #[must_use]
    pub fn answered_count(&self) -> usize {
        self.answers.iter().filter(|a| a.is_some()).count()
    }

    /// Returns a summary of the current session progress.
    #[must_use]
    pub fn progress(&self) -> SessionProgress {
        let total = self.total_questions();
        let answered = self.answered_count();
        SessionProgress {
            total,
            answered,
            remaining: total.saturating_sub(answered),
            is_complete: answered == total,
        }
    }

    /// Select or change the answer at `index`.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::AnswerOutOfRange` for an index past the batch.
    pub fn answer(&mut self, index: usize, key: OptionKey) -> Result<(), SessionError> {
        self.set(index, Some(key))
    }

    /// Remove the answer at `index`, turning it back into a skip.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::AnswerOutOfRange` for an index past the batch.
    pub fn clear_answer(&mut self, index: usize) -> Result<(), SessionError> {
        self.set(index, None)
    }

    fn set(&mut self, index: usize, value: Option<OptionKey>) -> Result<(), SessionError> {
        let len = self.answers.len();
        let slot = self
            .answers
            .get_mut(index)
            .ok_or(SessionError::AnswerOutOfRange { index, len })?;
        *slot = value;
        Ok(())
    }

    /// Grade the attempt and turn it into a history record.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Exam` if the record cannot be built.
    pub fn finish(self, id: ExamId, timestamp: i64) -> Result<ExamResult, SessionError> {
        Ok(ExamResult::record(
            id,
            timestamp,
            self.questions,
            self.answers,
            self.parent_exam_id,
            self.exam_name,
        )?)
    }
}
