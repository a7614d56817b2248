mod backup;
mod bank;
mod config;
mod exam;
mod ids;
mod progression;
mod question;

pub use backup::{
    BACKUP_VERSION, BackupDocument, BackupFormatError, EnvelopeDocument, ImportSummary,
    SessionBackup, SessionSnapshot,
};
pub use bank::{BankParser, QuestionBank};
pub use config::{
    DEFAULT_TIME_MINUTES, MINUTES_PER_QUESTION, QuizConfig, QuizMode, SMART_LIMIT_CAP,
    time_for_questions,
};
pub use exam::{
    ALTERNATE_NEGATIVE_MARK, DEFAULT_NEGATIVE_MARK, ExamResult, ExamResultError, ExamStats,
};
pub use ids::{ExamId, ParseIdError};
pub use progression::{ProgressStats, ProgressionState};
pub use question::{OptionKey, QuestionError, QuestionOptions, QuestionRecord};
