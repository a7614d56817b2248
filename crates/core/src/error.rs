use thiserror::Error;

use crate::model::{BackupFormatError, ExamResultError, ParseIdError, QuestionError};

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Question(#[from] QuestionError),
    #[error(transparent)]
    ExamResult(#[from] ExamResultError),
    #[error(transparent)]
    BackupFormat(#[from] BackupFormatError),
    #[error(transparent)]
    ParseId(#[from] ParseIdError),
}
