#![forbid(unsafe_code)]

pub mod backup;
pub mod error;
pub mod explain;
pub mod session_store;
pub mod sessions;

pub use quiz_core::Clock;

pub use backup::{backup_filename, parse_backup, to_json};
pub use error::{BackupError, ExplainError, SessionError, StoreError};
pub use explain::{
    ChatClient, ChatConfig, ChatKey, ChatMessage, ChatRole, ExplanationProvider,
    ExplanationService,
};
pub use session_store::SessionStore;
pub use sessions::{
    ExamSession, ExamStart, ExhaustionReset, HistoryListItem, ImportOutcome, QuizEngine,
    SessionState, Submission,
};
