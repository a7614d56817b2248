mod plan;
mod progress;
mod service;
mod shuffle;
mod view;
mod workflow;

// Public API of the session subsystem.
pub use crate::error::SessionError;
pub use plan::{BatchPlan, ExhaustionReset, select_batch};
pub use progress::SessionProgress;
pub use service::ExamSession;
pub use shuffle::{ShufflePolicy, prepare_batch, prepare_retake, shuffle_options, shuffle_question};
pub use view::{HistoryListItem, history_items};
pub use workflow::{ExamStart, ImportOutcome, QuizEngine, SessionState, Submission};
