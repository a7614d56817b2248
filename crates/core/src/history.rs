//! Combining history collections from different sources.

use std::collections::HashSet;

use crate::model::{ExamId, ExamResult};

/// Merge `incoming` into `existing`.
///
/// Records whose id is already known are dropped (first wins, including
/// duplicates inside `incoming`), then the union is stably sorted by
/// timestamp. Merging the same collection twice is a no-op the second time.
#[must_use]
pub fn merge_history(existing: &[ExamResult], incoming: &[ExamResult]) -> Vec<ExamResult> {
    let mut seen: HashSet<ExamId> = existing.iter().map(ExamResult::id).collect();
    let mut merged: Vec<ExamResult> = existing.to_vec();
    merged.extend(
        incoming
            .iter()
            .filter(|exam| seen.insert(exam.id()))
            .cloned(),
    );
    merged.sort_by_key(ExamResult::timestamp);
    merged
}

/// Number of `incoming` records that [`merge_history`] would add.
#[must_use]
pub fn count_new(existing: &[ExamResult], incoming: &[ExamResult]) -> usize {
    let mut seen: HashSet<ExamId> = existing.iter().map(ExamResult::id).collect();
    incoming.iter().filter(|exam| seen.insert(exam.id())).count()
}

/// Replace the record with the same id, leaving everything else in place.
///
/// Returns `false` if no record matched.
pub fn replace_result(history: &mut [ExamResult], updated: ExamResult) -> bool {
    match history.iter_mut().find(|exam| exam.id() == updated.id()) {
        Some(slot) => {
            *slot = updated;
            true
        }
        None => false,
    }
}
