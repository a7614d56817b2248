use chrono::{DateTime, Utc};

use quiz_core::labels::{ExamLabel, assign_labels};
use quiz_core::model::{ExamId, ExamResult};

/// Presentation-agnostic list item for a history entry.
///
/// This is intentionally **not** a UI view-model:
/// - no pre-formatted strings
/// - no localization assumptions
///
/// The UI may format the label and timestamp as needed.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryListItem {
    pub id: ExamId,
    pub label: ExamLabel,
    pub exam_name: Option<String>,
    pub recorded_at: DateTime<Utc>,

    pub correct: u32,
    pub wrong: u32,
    pub skipped: u32,
    pub total: u32,

    pub negative_mark: f64,
    /// Score at `negative_mark`, rounded to two decimals.
    pub score: f64,
}

impl HistoryListItem {
    #[must_use]
    pub fn from_result(result: &ExamResult, label: ExamLabel) -> Self {
        let stats = result.stats();
        Self {
            id: result.id(),
            label,
            exam_name: result.exam_name().map(ToString::to_string),
            recorded_at: result.recorded_at(),
            correct: stats.correct,
            wrong: stats.wrong,
            skipped: stats.skipped,
            total: stats.total,
            negative_mark: result.negative_mark(),
            score: result.score(),
        }
    }

    #[must_use]
    pub fn is_retake(&self) -> bool {
        !matches!(self.label, ExamLabel::Root(_))
    }
}

/// List items for `history`, newest first.
#[must_use]
pub fn history_items(history: &[ExamResult]) -> Vec<HistoryListItem> {
    let labels = assign_labels(history);
    let mut sorted: Vec<&ExamResult> = history.iter().collect();
    sorted.sort_by_key(|r| (r.timestamp(), r.id()));
    sorted
        .into_iter()
        .rev()
        .map(|r| {
            let label = labels
                .get(&r.id())
                .copied()
                .unwrap_or(ExamLabel::UnlinkedRetake);
            HistoryListItem::from_result(r, label)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::model::{OptionKey, QuestionOptions, QuestionRecord};

    fn build_result(id: u64, timestamp: i64, parent: Option<u64>) -> ExamResult {
        let questions = (0..4)
            .map(|i| {
                QuestionRecord::new(
                    format!("Q{i}"),
                    QuestionOptions::from_texts(["a".into(), "b".into(), "c".into(), "d".into()]),
                    OptionKey::Ka,
                    i,
                )
            })
            .collect();
        ExamResult::record(
            ExamId::new(id),
            timestamp,
            questions,
            vec![Some(OptionKey::Ka), Some(OptionKey::Ka), Some(OptionKey::Kha), None],
            parent.map(ExamId::new),
            None,
        )
        .unwrap()
    }

    #[test]
    fn items_are_newest_first_with_labels() {
        let history = vec![
            build_result(1, 10, None),
            build_result(2, 20, Some(1)),
            build_result(3, 30, None),
        ];
        let items = history_items(&history);
        let labels: Vec<String> = items.iter().map(|i| i.label.to_string()).collect();
        assert_eq!(labels, vec!["2", "1.1", "1"]);
        assert!(items[1].is_retake());
        assert!(!items[0].is_retake());
    }

    #[test]
    fn item_carries_counts_and_score() {
        let items = history_items(&[build_result(1, 10, None)]);
        let item = &items[0];
        assert_eq!((item.correct, item.wrong, item.skipped, item.total), (2, 1, 1, 4));
        assert_eq!(item.negative_mark, 0.25);
        assert_eq!(item.score, 1.75);
    }
}
