use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::model::QuizMode;

/// How much of the current bank has been consumed.
///
/// Both counters are relative to the bank they were built against; loading
/// an empty bank resets them.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProgressionState {
    /// Next unconsumed position for serial mode.
    pub next_serial_index: usize,
    /// `originalIndex` values already served in random-limited mode.
    pub used_random_indices: BTreeSet<usize>,
}

/// Consumption counters for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressStats {
    pub total: usize,
    /// `None` when the mode does not track consumption.
    pub taken: Option<usize>,
    pub remaining: Option<usize>,
}

impl ProgressionState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Questions still available under `mode`, falling back to the whole
    /// bank when nothing is left (a reset is pending in that case).
    #[must_use]
    pub fn available_count(&self, mode: QuizMode, total: usize) -> usize {
        let remaining = match mode {
            QuizMode::Serial => total.saturating_sub(self.next_serial_index),
            QuizMode::RandomLimited => total.saturating_sub(self.used_random_indices.len()),
            QuizMode::RandomUnlimited => total,
        };
        if remaining == 0 { total } else { remaining }
    }

    #[must_use]
    pub fn stats(&self, mode: QuizMode, total: usize) -> ProgressStats {
        match mode {
            QuizMode::Serial => ProgressStats {
                total,
                taken: Some(self.next_serial_index),
                remaining: Some(total.saturating_sub(self.next_serial_index)),
            },
            QuizMode::RandomLimited => ProgressStats {
                total,
                taken: Some(self.used_random_indices.len()),
                remaining: Some(total.saturating_sub(self.used_random_indices.len())),
            },
            QuizMode::RandomUnlimited => ProgressStats {
                total,
                taken: None,
                remaining: None,
            },
        }
    }

    #[must_use]
    pub fn is_fresh(&self) -> bool {
        self.next_serial_index == 0 && self.used_random_indices.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn available_count_per_mode() {
        let state = ProgressionState {
            next_serial_index: 7,
            used_random_indices: [1, 2, 3].into_iter().collect(),
        };
        assert_eq!(state.available_count(QuizMode::Serial, 10), 3);
        assert_eq!(state.available_count(QuizMode::RandomLimited, 10), 7);
        assert_eq!(state.available_count(QuizMode::RandomUnlimited, 10), 10);
    }

    #[test]
    fn available_count_falls_back_when_exhausted() {
        let state = ProgressionState {
            next_serial_index: 10,
            used_random_indices: (0..10).collect(),
        };
        assert_eq!(state.available_count(QuizMode::Serial, 10), 10);
        assert_eq!(state.available_count(QuizMode::RandomLimited, 10), 10);
    }

    #[test]
    fn stats_hide_counters_for_unlimited_mode() {
        let stats = ProgressionState::new().stats(QuizMode::RandomUnlimited, 5);
        assert_eq!(stats.total, 5);
        assert_eq!(stats.taken, None);
        assert_eq!(stats.remaining, None);
    }

    #[test]
    fn wire_shape_matches_backup_progress() {
        let state: ProgressionState =
            serde_json::from_str(r#"{"nextSerialIndex":4,"usedRandomIndices":[3,1,3]}"#).unwrap();
        assert_eq!(state.next_serial_index, 4);
        assert_eq!(state.used_random_indices.len(), 2);
        assert!(!state.is_fresh());
    }
}
