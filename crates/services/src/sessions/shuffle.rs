use rand::Rng;
use rand::seq::SliceRandom;

use quiz_core::model::{OptionKey, QuestionRecord};

/// Whether a batch gets its options shuffled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShufflePolicy {
    /// Shuffle only if the live config says so.
    FollowConfig(bool),
    /// Retakes always shuffle so positions cannot be memorized.
    ForceForRetake,
}

impl ShufflePolicy {
    #[must_use]
    pub fn shuffles(self) -> bool {
        match self {
            ShufflePolicy::FollowConfig(enabled) => enabled,
            ShufflePolicy::ForceForRetake => true,
        }
    }
}

/// Copy of `question` with a fresh uniform permutation of its options.
#[must_use]
pub fn shuffle_question<R: Rng + ?Sized>(question: &QuestionRecord, rng: &mut R) -> QuestionRecord {
    let mut order = OptionKey::ALL;
    order.shuffle(rng);
    // A shuffled copy of all four keys is always a valid permutation.
    question
        .reordered(order)
        .unwrap_or_else(|_| question.clone())
}

/// Shuffle every question's options independently.
#[must_use]
pub fn shuffle_options<R: Rng + ?Sized>(
    batch: &[QuestionRecord],
    rng: &mut R,
) -> Vec<QuestionRecord> {
    batch.iter().map(|q| shuffle_question(q, rng)).collect()
}

/// Apply `policy` to a freshly selected batch.
#[must_use]
pub fn prepare_batch<R: Rng + ?Sized>(
    batch: Vec<QuestionRecord>,
    policy: ShufflePolicy,
    rng: &mut R,
) -> Vec<QuestionRecord> {
    if policy.shuffles() {
        shuffle_options(&batch, rng)
    } else {
        batch
    }
}

/// Copy a past batch for a retake: question order and options are both shuffled.
#[must_use]
pub fn prepare_retake<R: Rng + ?Sized>(
    questions: &[QuestionRecord],
    rng: &mut R,
) -> Vec<QuestionRecord> {
    let mut batch = questions.to_vec();
    batch.shuffle(rng);
    prepare_batch(batch, ShufflePolicy::ForceForRetake, rng)
}
