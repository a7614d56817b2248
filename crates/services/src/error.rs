//! Shared error types for the services crate.

use thiserror::Error;

use quiz_core::model::{BackupFormatError, ExamResultError};
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Errors emitted by the session engine.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error("question bank is empty")]
    EmptyBank,
    #[error("no questions available for this batch")]
    NoQuestionsAvailable,
    #[error("no exam in progress")]
    NoActiveExam,
    #[error("an exam is already in progress")]
    ExamInProgress,
    #[error("exam {0} is not in history")]
    UnknownExam(quiz_core::model::ExamId),
    #[error("exam {0} has no questions to retake")]
    EmptyRetake(quiz_core::model::ExamId),
    #[error("question {index} is out of range for a batch of {len}")]
    AnswerOutOfRange { index: usize, len: usize },
    #[error(transparent)]
    Exam(#[from] ExamResultError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted while reading or applying a backup document.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum BackupError {
    #[error("malformed backup: {0}")]
    Malformed(String),
    #[error("backup version {0} is not supported")]
    UnsupportedVersion(u32),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl From<BackupFormatError> for BackupError {
    fn from(err: BackupFormatError) -> Self {
        match err {
            BackupFormatError::UnsupportedVersion(version) => {
                BackupError::UnsupportedVersion(version)
            }
            other => BackupError::Malformed(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for BackupError {
    fn from(err: serde_json::Error) -> Self {
        BackupError::Malformed(err.to_string())
    }
}

/// Errors emitted by `ExplanationService` and its providers.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ExplainError {
    #[error("explanations are not configured")]
    Disabled,
    #[error("explanation provider returned an empty response")]
    EmptyResponse,
    #[error("explanation request failed with status {0}")]
    HttpStatus(reqwest::StatusCode),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error("a request for this question is already running")]
    InFlight,
    #[error("question {index} is out of range for exam {exam_id}")]
    InvalidQuestion {
        exam_id: quiz_core::model::ExamId,
        index: usize,
    },
}

/// Errors emitted while opening the persistent session store.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StoreError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Backup(#[from] BackupError),
}
