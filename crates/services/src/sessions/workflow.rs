use std::collections::HashMap;

use rand::Rng;
use tracing::{info, warn};

use quiz_core::Clock;
use quiz_core::labels::{ExamLabel, assign_labels, label_for_pending};
use quiz_core::model::{
    BackupDocument, BankParser, ExamId, ExamResult, ImportSummary, OptionKey, ProgressStats,
    ProgressionState, QuestionBank, QuizConfig, QuizMode, SessionBackup, SessionSnapshot,
    time_for_questions,
};

use super::plan::{ExhaustionReset, select_batch};
use super::service::ExamSession;
use super::shuffle::{ShufflePolicy, prepare_batch, prepare_retake};
use super::view::{HistoryListItem, history_items};
use crate::error::{BackupError, SessionError};

//
// ─── STATE ─────────────────────────────────────────────────────────────────────
//

/// Everything the engine knows about one user's session.
///
/// Engine operations never mutate a state; they return a new one.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SessionState {
    bank: QuestionBank,
    config: QuizConfig,
    progress: ProgressionState,
    history: Vec<ExamResult>,
    active: Option<ExamSession>,
}

impl SessionState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn bank(&self) -> &QuestionBank {
        &self.bank
    }

    #[must_use]
    pub fn config(&self) -> &QuizConfig {
        &self.config
    }

    #[must_use]
    pub fn progress(&self) -> &ProgressionState {
        &self.progress
    }

    #[must_use]
    pub fn history(&self) -> &[ExamResult] {
        &self.history
    }

    #[must_use]
    pub fn active(&self) -> Option<&ExamSession> {
        self.active.as_ref()
    }

    #[must_use]
    pub fn is_in_exam(&self) -> bool {
        self.active.is_some()
    }

    #[must_use]
    pub fn result(&self, id: ExamId) -> Option<&ExamResult> {
        self.history.iter().find(|r| r.id() == id)
    }

    /// The persisted part of this state.
    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            raw_input: self.bank.raw().to_string(),
            config: self.config.clone(),
            progress: self.progress.clone(),
            history: self.history.clone(),
        }
    }

    fn ensure_idle(&self) -> Result<(), SessionError> {
        if self.active.is_some() {
            return Err(SessionError::ExamInProgress);
        }
        Ok(())
    }

    fn counters(&self) -> (usize, QuizMode, usize, usize) {
        (
            self.bank.len(),
            self.config.mode,
            self.progress.next_serial_index,
            self.progress.used_random_indices.len(),
        )
    }
}

//
// ─── OUTCOMES ──────────────────────────────────────────────────────────────────
//

/// A started exam and any exhaustion notice raised while selecting it.
#[derive(Debug, Clone, PartialEq)]
pub struct ExamStart {
    pub state: SessionState,
    pub reset: Option<ExhaustionReset>,
}

/// A submitted exam and the record added to history.
#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    pub state: SessionState,
    pub result: ExamResult,
}

/// State after applying a backup document.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportOutcome {
    pub state: SessionState,
    pub summary: ImportSummary,
}

//
// ─── ENGINE ────────────────────────────────────────────────────────────────────
//

/// Applies user actions to a `SessionState`.
///
/// The engine owns only the time source; randomness is passed per call.
#[derive(Debug, Clone, Copy, Default)]
pub struct QuizEngine {
    clock: Clock,
}

impl QuizEngine {
    #[must_use]
    pub fn new(clock: Clock) -> Self {
        Self { clock }
    }

    #[must_use]
    pub fn clock(&self) -> Clock {
        self.clock
    }

    /// Rebuild a state from a persisted snapshot.
    ///
    /// Stored config and progress are kept as saved unless the bank parses
    /// empty, in which case the empty-bank defaults apply.
    #[must_use]
    pub fn restore(&self, snapshot: SessionSnapshot, parser: &dyn BankParser) -> SessionState {
        let mut state = SessionState {
            bank: QuestionBank::parse(snapshot.raw_input, parser),
            config: snapshot.config,
            progress: snapshot.progress,
            history: snapshot.history,
            active: None,
        };
        if state.bank.is_empty() {
            reset_for_empty_bank(&mut state);
        }
        state
    }

    /// Replace the bank text and re-derive limit and time.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::ExamInProgress` while an exam is running.
    pub fn load_bank(
        &self,
        state: &SessionState,
        raw: &str,
        parser: &dyn BankParser,
    ) -> Result<SessionState, SessionError> {
        state.ensure_idle()?;
        let mut next = state.clone();
        next.bank = QuestionBank::parse(raw, parser);
        info!(questions = next.bank.len(), title = ?next.bank.title(), "loaded question bank");
        Ok(derive_limits(state, next))
    }

    /// # Errors
    ///
    /// Returns `SessionError::ExamInProgress` while an exam is running.
    pub fn set_mode(&self, state: &SessionState, mode: QuizMode) -> Result<SessionState, SessionError> {
        state.ensure_idle()?;
        let mut next = state.clone();
        next.config.mode = mode;
        Ok(derive_limits(state, next))
    }

    /// Set the question limit; the time limit follows it.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::ExamInProgress` while an exam is running.
    pub fn set_question_limit(
        &self,
        state: &SessionState,
        limit: u32,
    ) -> Result<SessionState, SessionError> {
        state.ensure_idle()?;
        let mut next = state.clone();
        next.config = next.config.with_question_limit(limit);
        Ok(next)
    }

    /// # Errors
    ///
    /// Returns `SessionError::ExamInProgress` while an exam is running.
    pub fn set_time_minutes(
        &self,
        state: &SessionState,
        minutes: u32,
    ) -> Result<SessionState, SessionError> {
        state.ensure_idle()?;
        let mut next = state.clone();
        next.config.time_minutes = minutes;
        Ok(next)
    }

    /// # Errors
    ///
    /// Returns `SessionError::ExamInProgress` while an exam is running.
    pub fn set_shuffle_options(
        &self,
        state: &SessionState,
        enabled: bool,
    ) -> Result<SessionState, SessionError> {
        state.ensure_idle()?;
        let mut next = state.clone();
        next.config.shuffle_options = enabled;
        Ok(next)
    }

    /// Select a batch under the configured mode and open it as the active exam.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::ExamInProgress`, `SessionError::EmptyBank` or
    /// `SessionError::NoQuestionsAvailable`; the input state is unchanged.
    pub fn start_exam<R: Rng + ?Sized>(
        &self,
        state: &SessionState,
        rng: &mut R,
    ) -> Result<ExamStart, SessionError> {
        state.ensure_idle()?;
        let config = &state.config;
        let plan = select_batch(
            state.bank.questions(),
            config.mode,
            config.effective_limit(),
            &state.progress,
            rng,
        )?;
        if let Some(reset) = plan.reset {
            info!(?reset, "question pool exhausted, starting over");
        }

        let reset = plan.reset;
        let batch = prepare_batch(
            plan.questions,
            ShufflePolicy::FollowConfig(config.shuffle_options),
            rng,
        );
        let session = ExamSession::new(
            batch,
            config.effective_time_minutes(),
            self.clock.now(),
            None,
            state.bank.title().map(ToString::to_string),
        )?;
        info!(
            mode = ?config.mode,
            questions = session.total_questions(),
            minutes = session.time_limit_minutes(),
            "exam started"
        );

        let mut next = state.clone();
        next.progress = plan.progression;
        next.active = Some(session);
        Ok(ExamStart {
            state: derive_limits(state, next),
            reset,
        })
    }

    /// Open a retake of a past attempt.
    ///
    /// The questions are copied, reordered and option-shuffled; the time
    /// limit is derived from their count and progression is untouched.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::UnknownExam` or `SessionError::EmptyRetake` for
    /// unusable sources and `SessionError::ExamInProgress` while an exam runs.
    pub fn retake<R: Rng + ?Sized>(
        &self,
        state: &SessionState,
        exam_id: ExamId,
        rng: &mut R,
    ) -> Result<SessionState, SessionError> {
        state.ensure_idle()?;
        let source = state
            .result(exam_id)
            .ok_or(SessionError::UnknownExam(exam_id))?;
        if source.questions().is_empty() {
            return Err(SessionError::EmptyRetake(exam_id));
        }

        let batch = prepare_retake(source.questions(), rng);
        let minutes = time_for_questions(batch.len());
        let session = ExamSession::new(
            batch,
            minutes,
            self.clock.now(),
            Some(source.root_id()),
            source.exam_name().map(ToString::to_string),
        )?;
        info!(source = %exam_id, root = %source.root_id(), minutes, "retake started");

        let mut next = state.clone();
        next.active = Some(session);
        Ok(next)
    }

    /// # Errors
    ///
    /// Returns `SessionError::NoActiveExam` or `SessionError::AnswerOutOfRange`.
    pub fn answer(
        &self,
        state: &SessionState,
        index: usize,
        key: OptionKey,
    ) -> Result<SessionState, SessionError> {
        let mut next = state.clone();
        next.active
            .as_mut()
            .ok_or(SessionError::NoActiveExam)?
            .answer(index, key)?;
        Ok(next)
    }

    /// # Errors
    ///
    /// Returns `SessionError::NoActiveExam` or `SessionError::AnswerOutOfRange`.
    pub fn clear_answer(
        &self,
        state: &SessionState,
        index: usize,
    ) -> Result<SessionState, SessionError> {
        let mut next = state.clone();
        next.active
            .as_mut()
            .ok_or(SessionError::NoActiveExam)?
            .clear_answer(index)?;
        Ok(next)
    }

    /// Grade the active exam, append it to history and close it.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NoActiveExam` if nothing is running.
    pub fn submit(&self, state: &SessionState) -> Result<Submission, SessionError> {
        let session = state.active.clone().ok_or(SessionError::NoActiveExam)?;
        let now_ms = self.clock.now_millis();
        let id = next_exam_id(&state.history, now_ms);
        let result = session.finish(id, now_ms)?;

        let stats = result.stats();
        info!(
            exam_id = %id,
            correct = stats.correct,
            wrong = stats.wrong,
            skipped = stats.skipped,
            score = result.score(),
            "exam submitted"
        );

        let mut next = state.clone();
        next.history.push(result.clone());
        next.active = None;
        Ok(Submission {
            state: next,
            result,
        })
    }

    /// Drop the active exam without recording it.
    #[must_use]
    pub fn abandon_exam(&self, state: &SessionState) -> SessionState {
        let mut next = state.clone();
        if next.active.take().is_some() {
            info!("exam abandoned");
        }
        next
    }

    /// # Errors
    ///
    /// Returns `SessionError::UnknownExam` or `SessionError::Exam` for an
    /// invalid mark.
    pub fn update_negative_mark(
        &self,
        state: &SessionState,
        exam_id: ExamId,
        mark: f64,
    ) -> Result<SessionState, SessionError> {
        self.edit_result(state, exam_id, |result| result.set_negative_mark(mark))
    }

    /// # Errors
    ///
    /// Returns `SessionError::UnknownExam` if the exam is not in history.
    pub fn rename_exam(
        &self,
        state: &SessionState,
        exam_id: ExamId,
        name: Option<String>,
    ) -> Result<SessionState, SessionError> {
        self.edit_result(state, exam_id, |result| {
            result.rename(name);
            Ok(())
        })
    }

    fn edit_result<F>(
        &self,
        state: &SessionState,
        exam_id: ExamId,
        edit: F,
    ) -> Result<SessionState, SessionError>
    where
        F: FnOnce(&mut ExamResult) -> Result<(), quiz_core::model::ExamResultError>,
    {
        let mut next = state.clone();
        let result = next
            .history
            .iter_mut()
            .find(|r| r.id() == exam_id)
            .ok_or(SessionError::UnknownExam(exam_id))?;
        edit(result)?;
        Ok(next)
    }

    /// Clear progression and history and restore the default config.
    ///
    /// The bank text stays; any active exam is dropped.
    #[must_use]
    pub fn reset(&self, state: &SessionState) -> SessionState {
        let next = SessionState {
            bank: state.bank.clone(),
            ..SessionState::default()
        };
        info!(dropped = state.history.len(), "session reset");
        derive_limits(state, next)
    }

    /// Apply an import document.
    ///
    /// History is merged first-wins; an envelope also replaces whichever of
    /// bank text, config and progress it carries.
    ///
    /// # Errors
    ///
    /// Returns `BackupError` if the document is unrecognized or too new; the
    /// input state is unchanged.
    pub fn import_backup(
        &self,
        state: &SessionState,
        document: &BackupDocument,
        parser: &dyn BankParser,
    ) -> Result<ImportOutcome, BackupError> {
        let document = document.clone().validate().inspect_err(|err| {
            warn!(%err, "rejected backup document");
        })?;
        let (snapshot, summary) = document.apply_to(&state.snapshot());

        let mut next = state.clone();
        if summary.raw_input_replaced {
            next.bank = QuestionBank::parse(snapshot.raw_input, parser);
        }
        next.config = snapshot.config;
        next.progress = snapshot.progress;
        next.history = snapshot.history;
        info!(
            legacy = summary.legacy,
            added = summary.added,
            bank_replaced = summary.raw_input_replaced,
            "backup imported"
        );

        Ok(ImportOutcome {
            state: derive_limits(state, next),
            summary,
        })
    }

    /// Full envelope stamped with the current time.
    #[must_use]
    pub fn export_backup(&self, state: &SessionState) -> SessionBackup {
        let backup = state.snapshot().to_backup(self.clock.now_millis());
        info!(results = backup.history.len(), "backup exported");
        backup
    }

    #[must_use]
    pub fn labels(&self, state: &SessionState) -> HashMap<ExamId, ExamLabel> {
        assign_labels(&state.history)
    }

    /// Label of the active exam, as if it were submitted next.
    #[must_use]
    pub fn current_label(&self, state: &SessionState) -> Option<ExamLabel> {
        state
            .active
            .as_ref()
            .map(|session| label_for_pending(&state.history, session.parent_exam_id()))
    }

    #[must_use]
    pub fn progress_stats(&self, state: &SessionState) -> ProgressStats {
        state.progress.stats(state.config.mode, state.bank.len())
    }

    #[must_use]
    pub fn history_items(&self, state: &SessionState) -> Vec<HistoryListItem> {
        history_items(&state.history)
    }
}

/// Re-derive limit and time when bank size, mode or a progression counter
/// changed between `before` and `after`.
fn derive_limits(before: &SessionState, mut after: SessionState) -> SessionState {
    if after.bank.is_empty() {
        reset_for_empty_bank(&mut after);
        return after;
    }
    if before.counters() != after.counters() {
        after.config = after
            .config
            .clone()
            .with_smart_defaults(after.bank.len(), &after.progress);
    }
    after
}

fn reset_for_empty_bank(state: &mut SessionState) {
    state.config = state.config.clone().with_smart_defaults(0, &state.progress);
    state.progress = ProgressionState::default();
}

/// Ids are creation milliseconds, bumped past the newest id on collision.
fn next_exam_id(history: &[ExamResult], now_ms: i64) -> ExamId {
    let now = ExamId::new(u64::try_from(now_ms).unwrap_or(0));
    match history.iter().map(ExamResult::id).max() {
        Some(last) if last >= now => last.successor(),
        _ => now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::model::{QuestionOptions, QuestionRecord};
    use quiz_core::time::fixed_clock;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    /// One question per non-empty line; `#` lines name the bank.
    struct LineParser;

    impl BankParser for LineParser {
        fn parse(&self, raw: &str) -> Vec<QuestionRecord> {
            raw.lines()
                .map(str::trim)
                .filter(|l| !l.is_empty() && !l.starts_with('#'))
                .enumerate()
                .map(|(i, l)| {
                    QuestionRecord::new(
                        l,
                        QuestionOptions::from_texts([
                            "right".into(),
                            "w1".into(),
                            "w2".into(),
                            "w3".into(),
                        ]),
                        OptionKey::Ka,
                        i,
                    )
                })
                .collect()
        }

        fn title(&self, raw: &str) -> Option<String> {
            raw.lines().find_map(|l| l.strip_prefix('#')).map(str::to_string)
        }
    }

    fn bank_text(n: usize) -> String {
        let mut text = String::from("#Biology\n");
        for i in 0..n {
            text.push_str(&format!("Question {i}\n"));
        }
        text
    }

    fn loaded(n: usize) -> (QuizEngine, SessionState) {
        let engine = QuizEngine::new(fixed_clock());
        let state = engine
            .load_bank(&SessionState::new(), &bank_text(n), &LineParser)
            .unwrap();
        (engine, state)
    }

    #[test]
    fn loading_a_bank_derives_limit_and_time() {
        let (_, state) = loaded(40);
        assert_eq!(state.config().question_limit, 25);
        assert_eq!(state.config().time_minutes, 15);

        let (_, small) = loaded(10);
        assert_eq!(small.config().question_limit, 10);
        assert_eq!(small.config().time_minutes, 6);
    }

    #[test]
    fn empty_bank_restores_defaults_and_resets_progress() {
        let (engine, state) = loaded(10);
        let mut rng = StdRng::seed_from_u64(1);
        let started = engine.start_exam(&state, &mut rng).unwrap().state;
        let submitted = engine.submit(&started).unwrap().state;
        assert_eq!(submitted.progress().next_serial_index, 10);

        let cleared = engine.load_bank(&submitted, "", &LineParser).unwrap();
        assert!(cleared.progress().is_fresh());
        assert_eq!(cleared.config().question_limit, 25);
        assert_eq!(cleared.config().time_minutes, 15);
        assert_eq!(cleared.history().len(), 1);
    }

    #[test]
    fn manual_limit_sticks_until_counters_change() {
        let (engine, state) = loaded(40);
        let state = engine.set_question_limit(&state, 10).unwrap();
        assert_eq!(state.config().time_minutes, 6);
        let state = engine.set_shuffle_options(&state, false).unwrap();
        assert_eq!(state.config().question_limit, 10);

        let mut rng = StdRng::seed_from_u64(2);
        let start = engine.start_exam(&state, &mut rng).unwrap();
        let active = start.state.active().unwrap();
        assert_eq!(active.total_questions(), 10);
        assert_eq!(active.time_limit_minutes(), 6);
        assert_eq!(active.exam_name(), Some("Biology"));
        assert_eq!(start.state.config().question_limit, 25);
    }

    #[test]
    fn start_and_submit_records_history() {
        let (engine, state) = loaded(3);
        let state = engine.set_shuffle_options(&state, false).unwrap();
        let mut rng = StdRng::seed_from_u64(3);
        let state = engine.start_exam(&state, &mut rng).unwrap().state;
        assert_eq!(engine.current_label(&state), Some(ExamLabel::Root(1)));
        assert!(matches!(
            engine.start_exam(&state, &mut rng).unwrap_err(),
            SessionError::ExamInProgress
        ));

        let state = engine.answer(&state, 0, OptionKey::Ka).unwrap();
        let state = engine.answer(&state, 1, OptionKey::Ga).unwrap();
        let submission = engine.submit(&state).unwrap();
        let stats = submission.result.stats();
        assert_eq!((stats.correct, stats.wrong, stats.skipped), (1, 1, 1));
        assert_eq!(submission.result.score(), 0.75);
        assert!(!submission.state.is_in_exam());
        assert_eq!(submission.state.history().len(), 1);
        assert!(matches!(
            engine.submit(&submission.state).unwrap_err(),
            SessionError::NoActiveExam
        ));
    }

    #[test]
    fn failed_start_leaves_state_untouched() {
        let engine = QuizEngine::new(fixed_clock());
        let state = SessionState::new();
        let mut rng = StdRng::seed_from_u64(4);
        let err = engine.start_exam(&state, &mut rng).unwrap_err();
        assert!(matches!(err, SessionError::EmptyBank));
        assert_eq!(state, SessionState::new());
    }

    #[test]
    fn serial_exhaustion_is_reported() {
        let (engine, state) = loaded(2);
        let mut rng = StdRng::seed_from_u64(5);
        let first = engine.start_exam(&state, &mut rng).unwrap();
        assert_eq!(first.reset, None);
        let state = engine.submit(&first.state).unwrap().state;

        let second = engine.start_exam(&state, &mut rng).unwrap();
        assert_eq!(second.reset, Some(ExhaustionReset::Serial));
    }

    #[test]
    fn retake_links_to_root_and_keeps_progression() {
        let (engine, state) = loaded(5);
        let state = engine.set_shuffle_options(&state, false).unwrap();
        let mut rng = StdRng::seed_from_u64(6);
        let state = engine.start_exam(&state, &mut rng).unwrap().state;
        let first = engine.submit(&state).unwrap();
        let root_id = first.result.id();

        let retaking = engine.retake(&first.state, root_id, &mut rng).unwrap();
        let active = retaking.active().unwrap();
        assert_eq!(active.parent_exam_id(), Some(root_id));
        assert_eq!(active.time_limit_minutes(), 3);
        assert_eq!(active.exam_name(), Some("Biology"));
        assert_eq!(retaking.progress(), first.state.progress());
        assert_eq!(
            engine.current_label(&retaking),
            Some(ExamLabel::Retake { root: 1, seq: 1 })
        );

        let retake = engine.submit(&retaking).unwrap();
        let again = engine
            .retake(&retake.state, retake.result.id(), &mut rng)
            .unwrap();
        assert_eq!(again.active().unwrap().parent_exam_id(), Some(root_id));

        let labels = engine.labels(&retake.state);
        assert_eq!(labels[&retake.result.id()].to_string(), "1.1");
        assert!(matches!(
            engine
                .retake(&retake.state, ExamId::new(1), &mut rng)
                .unwrap_err(),
            SessionError::UnknownExam(_)
        ));
    }

    #[test]
    fn retake_shuffles_options_even_when_shuffling_is_off() {
        let (engine, state) = loaded(20);
        let state = engine.set_shuffle_options(&state, false).unwrap();
        let mut rng = StdRng::seed_from_u64(21);
        let started = engine.start_exam(&state, &mut rng).unwrap().state;
        let source = engine.submit(&started).unwrap();
        assert_eq!(source.result.questions().len(), 20);
        assert!(
            source
                .result
                .questions()
                .iter()
                .all(|q| q.correct() == OptionKey::Ka)
        );

        let retaking = engine
            .retake(&source.state, source.result.id(), &mut rng)
            .unwrap();
        let batch = retaking.active().unwrap().questions();
        assert_eq!(batch.len(), 20);
        assert!(batch.iter().any(|q| q.correct() != OptionKey::Ka));
        for q in batch {
            let original = source
                .result
                .questions()
                .iter()
                .find(|o| o.original_index() == q.original_index())
                .unwrap();
            assert_eq!(q.text(), original.text());
            assert_eq!(q.correct_text(), original.correct_text());
        }
    }

    #[test]
    fn ids_stay_unique_under_a_fixed_clock() {
        let (engine, state) = loaded(4);
        let mut rng = StdRng::seed_from_u64(7);
        let mut state = state;
        let mut ids = Vec::new();
        for _ in 0..3 {
            let started = engine.start_exam(&state, &mut rng).unwrap().state;
            let submission = engine.submit(&started).unwrap();
            ids.push(submission.result.id());
            state = submission.state;
        }
        assert!(ids.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn edits_change_only_the_target_result() {
        let (engine, state) = loaded(3);
        let mut rng = StdRng::seed_from_u64(8);
        let state = engine.start_exam(&state, &mut rng).unwrap().state;
        let submission = engine.submit(&state).unwrap();
        let id = submission.result.id();

        let state = engine.update_negative_mark(&submission.state, id, 0.5).unwrap();
        let state = engine.rename_exam(&state, id, Some(" Mock ".into())).unwrap();
        let edited = state.result(id).unwrap();
        assert_eq!(edited.negative_mark(), 0.5);
        assert_eq!(edited.exam_name(), Some("Mock"));
        assert_eq!(edited.questions(), submission.result.questions());

        assert!(matches!(
            engine.update_negative_mark(&state, id, -1.0).unwrap_err(),
            SessionError::Exam(_)
        ));
    }

    #[test]
    fn reset_keeps_bank_only() {
        let (engine, state) = loaded(30);
        let state = engine.set_mode(&state, QuizMode::RandomLimited).unwrap();
        let mut rng = StdRng::seed_from_u64(9);
        let state = engine.start_exam(&state, &mut rng).unwrap().state;
        let state = engine.submit(&state).unwrap().state;

        let fresh = engine.reset(&state);
        assert_eq!(fresh.bank(), state.bank());
        assert!(fresh.history().is_empty());
        assert!(fresh.progress().is_fresh());
        assert_eq!(fresh.config(), &QuizConfig::default());
    }

    #[test]
    fn progress_stats_follow_mode() {
        let (engine, state) = loaded(10);
        let mut rng = StdRng::seed_from_u64(10);
        let state = engine.start_exam(&state, &mut rng).unwrap().state;
        let state = engine.submit(&state).unwrap().state;
        let stats = engine.progress_stats(&state);
        assert_eq!((stats.total, stats.taken, stats.remaining), (10, Some(10), Some(0)));

        let state = engine.set_mode(&state, QuizMode::RandomUnlimited).unwrap();
        let stats = engine.progress_stats(&state);
        assert_eq!((stats.taken, stats.remaining), (None, None));
    }

    #[test]
    fn export_then_import_is_idempotent() {
        let (engine, state) = loaded(6);
        let mut rng = StdRng::seed_from_u64(11);
        let state = engine.start_exam(&state, &mut rng).unwrap().state;
        let state = engine.submit(&state).unwrap().state;

        let document = BackupDocument::from(engine.export_backup(&state));
        let outcome = engine.import_backup(&state, &document, &LineParser).unwrap();
        assert_eq!(outcome.summary.added, 0);
        assert_eq!(outcome.state.history(), state.history());
        assert_eq!(outcome.state.bank(), state.bank());
    }

    #[test]
    fn legacy_import_merges_history_only() {
        let (engine, state) = loaded(6);
        let state = engine.set_mode(&state, QuizMode::RandomLimited).unwrap();
        let mut rng = StdRng::seed_from_u64(12);
        let started = engine.start_exam(&state, &mut rng).unwrap().state;
        let foreign = engine.submit(&started).unwrap().result;

        let document = BackupDocument::Legacy(vec![foreign.clone(), foreign]);
        let outcome = engine.import_backup(&state, &document, &LineParser).unwrap();
        assert_eq!(outcome.summary.added, 1);
        assert_eq!(outcome.state.history().len(), 1);
        assert_eq!(outcome.state.config(), state.config());
        assert_eq!(outcome.state.progress(), state.progress());
    }

    #[test]
    fn next_id_is_monotonic() {
        let history: Vec<ExamResult> = Vec::new();
        assert_eq!(next_exam_id(&history, 50), ExamId::new(50));
        assert_eq!(next_exam_id(&history, -5), ExamId::new(0));
    }
}
