use rand::Rng;
use rand::seq::SliceRandom;
use tracing::debug;

use quiz_core::model::{ProgressionState, QuestionRecord, QuizMode};

use crate::error::SessionError;

/// Notice that a mode ran out of questions and started over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExhaustionReset {
    /// Serial position wrapped back to the first question.
    Serial,
    /// Every question had been drawn; the used set was cleared.
    RandomLimited,
}

/// Selection result for the next batch.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchPlan {
    pub questions: Vec<QuestionRecord>,
    /// Progression after this batch is taken.
    pub progression: ProgressionState,
    pub reset: Option<ExhaustionReset>,
}

impl BatchPlan {
    #[must_use]
    pub fn total(&self) -> usize {
        self.questions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }
}

/// Pick the next batch from `bank` under `mode`.
///
/// - `Serial` takes up to `limit` contiguous questions from the saved
///   position, wrapping to the start once the bank is exhausted.
/// - `RandomLimited` draws uniformly from questions whose `original_index`
///   has not been served yet, clearing the used set when none are left.
/// - `RandomUnlimited` draws uniformly from the whole bank and neither reads
///   nor writes progression.
///
/// `limit` is clamped to at least 1.
///
/// # Errors
///
/// Returns `SessionError::EmptyBank` for an empty bank and
/// `SessionError::NoQuestionsAvailable` if the computed batch is empty.
pub fn select_batch<R: Rng + ?Sized>(
    bank: &[QuestionRecord],
    mode: QuizMode,
    limit: usize,
    progression: &ProgressionState,
    rng: &mut R,
) -> Result<BatchPlan, SessionError> {
    if bank.is_empty() {
        return Err(SessionError::EmptyBank);
    }
    let limit = limit.max(1);

    let plan = match mode {
        QuizMode::Serial => select_serial(bank, limit, progression),
        QuizMode::RandomLimited => select_random_limited(bank, limit, progression, rng),
        QuizMode::RandomUnlimited => {
            let mut pool: Vec<&QuestionRecord> = bank.iter().collect();
            pool.shuffle(rng);
            BatchPlan {
                questions: pool.into_iter().take(limit).cloned().collect(),
                progression: progression.clone(),
                reset: None,
            }
        }
    };

    if plan.is_empty() {
        return Err(SessionError::NoQuestionsAvailable);
    }
    debug!(?mode, size = plan.total(), reset = ?plan.reset, "selected batch");
    Ok(plan)
}

fn select_serial(
    bank: &[QuestionRecord],
    limit: usize,
    progression: &ProgressionState,
) -> BatchPlan {
    let mut start = progression.next_serial_index;
    let mut reset = None;
    if start >= bank.len() {
        start = 0;
        reset = Some(ExhaustionReset::Serial);
    }
    let end = start.saturating_add(limit).min(bank.len());

    let mut next = progression.clone();
    next.next_serial_index = end;
    BatchPlan {
        questions: bank[start..end].to_vec(),
        progression: next,
        reset,
    }
}

fn select_random_limited<R: Rng + ?Sized>(
    bank: &[QuestionRecord],
    limit: usize,
    progression: &ProgressionState,
    rng: &mut R,
) -> BatchPlan {
    let mut next = progression.clone();
    let mut eligible: Vec<&QuestionRecord> = bank
        .iter()
        .filter(|q| !next.used_random_indices.contains(&q.original_index()))
        .collect();

    let mut reset = None;
    if eligible.is_empty() {
        next.used_random_indices.clear();
        eligible = bank.iter().collect();
        reset = Some(ExhaustionReset::RandomLimited);
    }

    eligible.shuffle(rng);
    let questions: Vec<QuestionRecord> = eligible.into_iter().take(limit).cloned().collect();
    next.used_random_indices
        .extend(questions.iter().map(QuestionRecord::original_index));

    BatchPlan {
        questions,
        progression: next,
        reset,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::model::{OptionKey, QuestionOptions};
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::collections::HashSet;

    fn build_bank(n: usize) -> Vec<QuestionRecord> {
        (0..n)
            .map(|i| {
                QuestionRecord::new(
                    format!("Q{i}"),
                    QuestionOptions::from_texts(["a".into(), "b".into(), "c".into(), "d".into()]),
                    OptionKey::Ka,
                    i,
                )
            })
            .collect()
    }

    fn indices(questions: &[QuestionRecord]) -> Vec<usize> {
        questions.iter().map(QuestionRecord::original_index).collect()
    }

    #[test]
    fn serial_takes_contiguous_batches_and_wraps() {
        let bank = build_bank(10);
        let mut rng = StdRng::seed_from_u64(1);
        let mut progression = ProgressionState::default();

        let first = select_batch(&bank, QuizMode::Serial, 4, &progression, &mut rng).unwrap();
        assert_eq!(indices(&first.questions), vec![0, 1, 2, 3]);
        assert_eq!(first.progression.next_serial_index, 4);
        assert_eq!(first.reset, None);
        progression = first.progression;

        let second = select_batch(&bank, QuizMode::Serial, 4, &progression, &mut rng).unwrap();
        progression = second.progression;
        let tail = select_batch(&bank, QuizMode::Serial, 4, &progression, &mut rng).unwrap();
        assert_eq!(indices(&tail.questions), vec![8, 9]);
        assert_eq!(tail.progression.next_serial_index, 10);
        progression = tail.progression;

        let wrapped = select_batch(&bank, QuizMode::Serial, 4, &progression, &mut rng).unwrap();
        assert_eq!(wrapped.reset, Some(ExhaustionReset::Serial));
        assert_eq!(indices(&wrapped.questions), vec![0, 1, 2, 3]);
    }

    #[test]
    fn serial_wraps_when_saved_index_is_past_a_shrunken_bank() {
        let bank = build_bank(3);
        let progression = ProgressionState {
            next_serial_index: 7,
            ..ProgressionState::default()
        };
        let mut rng = StdRng::seed_from_u64(2);
        let plan = select_batch(&bank, QuizMode::Serial, 25, &progression, &mut rng).unwrap();
        assert_eq!(plan.reset, Some(ExhaustionReset::Serial));
        assert_eq!(plan.total(), 3);
        assert_eq!(plan.progression.next_serial_index, 3);
    }

    #[test]
    fn random_limited_never_repeats_until_exhausted() {
        let bank = build_bank(10);
        let mut rng = StdRng::seed_from_u64(3);
        let mut progression = ProgressionState::default();
        let mut seen = HashSet::new();

        for _ in 0..3 {
            let plan =
                select_batch(&bank, QuizMode::RandomLimited, 3, &progression, &mut rng).unwrap();
            assert_eq!(plan.reset, None);
            for idx in indices(&plan.questions) {
                assert!(seen.insert(idx), "index {idx} drawn twice");
            }
            progression = plan.progression;
        }

        let last = select_batch(&bank, QuizMode::RandomLimited, 3, &progression, &mut rng).unwrap();
        assert_eq!(last.total(), 1);
        assert_eq!(last.reset, None);
        assert_eq!(last.progression.used_random_indices.len(), 10);
        progression = last.progression;

        let again = select_batch(&bank, QuizMode::RandomLimited, 3, &progression, &mut rng).unwrap();
        assert_eq!(again.reset, Some(ExhaustionReset::RandomLimited));
        assert_eq!(again.total(), 3);
        assert_eq!(again.progression.used_random_indices.len(), 3);
    }

    #[test]
    fn random_unlimited_leaves_progression_alone() {
        let bank = build_bank(5);
        let progression = ProgressionState {
            next_serial_index: 2,
            used_random_indices: [1, 4].into_iter().collect(),
        };
        let mut rng = StdRng::seed_from_u64(4);
        let plan =
            select_batch(&bank, QuizMode::RandomUnlimited, 10, &progression, &mut rng).unwrap();
        assert_eq!(plan.progression, progression);
        assert_eq!(plan.total(), 5);
        let unique: HashSet<_> = indices(&plan.questions).into_iter().collect();
        assert_eq!(unique.len(), 5);
    }

    #[test]
    fn empty_bank_and_zero_limit() {
        let mut rng = StdRng::seed_from_u64(5);
        let err = select_batch(&[], QuizMode::Serial, 5, &ProgressionState::default(), &mut rng)
            .unwrap_err();
        assert!(matches!(err, SessionError::EmptyBank));

        let bank = build_bank(4);
        let plan =
            select_batch(&bank, QuizMode::Serial, 0, &ProgressionState::default(), &mut rng)
                .unwrap();
        assert_eq!(plan.total(), 1);
    }

    #[test]
    fn random_draws_are_roughly_uniform() {
        let bank = build_bank(4);
        let mut rng = StdRng::seed_from_u64(42);
        let mut counts = [0_usize; 4];
        for _ in 0..4000 {
            let plan = select_batch(
                &bank,
                QuizMode::RandomUnlimited,
                1,
                &ProgressionState::default(),
                &mut rng,
            )
            .unwrap();
            counts[plan.questions[0].original_index()] += 1;
        }
        for count in counts {
            assert!((800..1200).contains(&count), "skewed counts: {counts:?}");
        }
    }
}
