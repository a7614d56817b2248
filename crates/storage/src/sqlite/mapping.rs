use quiz_core::model::{
    ExamId, ExamResult, ExamStats, OptionKey, ProgressionState, QuestionRecord, QuizConfig,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use sqlx::Row;

use crate::repository::{SessionRecord, StorageError};

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

fn i64_to_u64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

fn u32_from_i64(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(crate) fn exam_id_from_i64(v: i64) -> Result<ExamId, StorageError> {
    Ok(ExamId::new(i64_to_u64("exam_id", v)?))
}

pub(crate) fn exam_id_to_i64(id: ExamId) -> Result<i64, StorageError> {
    i64::try_from(id.value()).map_err(|_| StorageError::Serialization("exam_id overflow".into()))
}

/// JSON columns hold nested values that have no relational use.
pub(crate) fn to_json<T: Serialize>(value: &T) -> Result<String, StorageError> {
    serde_json::to_string(value).map_err(ser)
}

fn from_json<T: DeserializeOwned>(field: &'static str, raw: &str) -> Result<T, StorageError> {
    serde_json::from_str(raw)
        .map_err(|e| StorageError::Serialization(format!("invalid {field}: {e}")))
}

pub(crate) fn map_exam_result_row(
    row: &sqlx::sqlite::SqliteRow,
) -> Result<ExamResult, StorageError> {
    let questions: Vec<QuestionRecord> =
        from_json("questions", &row.try_get::<String, _>("questions").map_err(ser)?)?;
    let user_choices: Vec<Option<OptionKey>> = from_json(
        "user_choices",
        &row.try_get::<String, _>("user_choices").map_err(ser)?,
    )?;

    let stats = ExamStats::from_persisted(
        u32_from_i64("correct", row.try_get::<i64, _>("correct").map_err(ser)?)?,
        u32_from_i64("wrong", row.try_get::<i64, _>("wrong").map_err(ser)?)?,
        u32_from_i64("skipped", row.try_get::<i64, _>("skipped").map_err(ser)?)?,
        u32_from_i64("total", row.try_get::<i64, _>("total").map_err(ser)?)?,
    )
    .map_err(ser)?;

    ExamResult::from_persisted(
        exam_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        row.try_get("timestamp").map_err(ser)?,
        questions,
        user_choices,
        stats,
        row.try_get("negative_mark").map_err(ser)?,
        row.try_get::<Option<i64>, _>("parent_exam_id")
            .map_err(ser)?
            .map(exam_id_from_i64)
            .transpose()?,
        row.try_get("exam_name").map_err(ser)?,
    )
    .map_err(ser)
}

pub(crate) fn map_session_row(row: &sqlx::sqlite::SqliteRow) -> Result<SessionRecord, StorageError> {
    let config: QuizConfig = from_json("config", &row.try_get::<String, _>("config").map_err(ser)?)?;
    let progress: ProgressionState = from_json(
        "progress",
        &row.try_get::<String, _>("progress").map_err(ser)?,
    )?;
    Ok(SessionRecord {
        raw_input: row.try_get("raw_input").map_err(ser)?,
        config,
        progress,
    })
}
