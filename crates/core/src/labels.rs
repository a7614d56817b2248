//! Display numbering for exam attempts.
//!
//! Labels are derived from history on every call and never stored, so they
//! stay consistent after merges, imports and edits.

use std::collections::HashMap;
use std::fmt;

use crate::model::{ExamId, ExamResult};

/// Hierarchical display label of an attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExamLabel {
    /// The `n`-th root attempt.
    Root(u32),
    /// The `seq`-th retake of root number `root`.
    Retake { root: u32, seq: u32 },
    /// A retake whose root is not in history.
    UnlinkedRetake,
}

impl fmt::Display for ExamLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExamLabel::Root(n) => write!(f, "{n}"),
            ExamLabel::Retake { root, seq } => write!(f, "{root}.{seq}"),
            ExamLabel::UnlinkedRetake => f.write_str("Retake"),
        }
    }
}

#[derive(Default)]
struct Numbering {
    next_root: u32,
    roots: HashMap<ExamId, (u32, u32)>,
}

impl Numbering {
    fn from_history(history: &[ExamResult]) -> (Self, HashMap<ExamId, ExamLabel>) {
        let mut numbering = Self {
            next_root: 1,
            roots: HashMap::new(),
        };
        let mut labels = HashMap::with_capacity(history.len());
        for exam in chronological(history) {
            let label = numbering.push(exam.parent_exam_id(), exam.id());
            labels.insert(exam.id(), label);
        }
        (numbering, labels)
    }

    fn push(&mut self, parent: Option<ExamId>, id: ExamId) -> ExamLabel {
        match parent {
            None => {
                let n = self.next_root;
                self.next_root = self.next_root.saturating_add(1);
                self.roots.insert(id, (n, 0));
                ExamLabel::Root(n)
            }
            Some(parent) => self.next_retake(parent, true),
        }
    }

    fn next_retake(&mut self, parent: ExamId, commit: bool) -> ExamLabel {
        match self.roots.get_mut(&parent) {
            Some((root, count)) => {
                let seq = count.saturating_add(1);
                if commit {
                    *count = seq;
                }
                ExamLabel::Retake { root: *root, seq }
            }
            None => ExamLabel::UnlinkedRetake,
        }
    }
}

fn chronological(history: &[ExamResult]) -> Vec<&ExamResult> {
    let mut sorted: Vec<&ExamResult> = history.iter().collect();
    sorted.sort_by_key(|exam| (exam.timestamp(), exam.id()));
    sorted
}

/// Label every record in `history`.
#[must_use]
pub fn assign_labels(history: &[ExamResult]) -> HashMap<ExamId, ExamLabel> {
    Numbering::from_history(history).1
}

/// Label for an attempt that has not been submitted yet, as if it were
/// appended after everything in `history`.
#[must_use]
pub fn label_for_pending(history: &[ExamResult], parent: Option<ExamId>) -> ExamLabel {
    let (mut numbering, _) = Numbering::from_history(history);
    match parent {
        None => ExamLabel::Root(numbering.next_root),
        Some(parent) => numbering.next_retake(parent, false),
    }
}
