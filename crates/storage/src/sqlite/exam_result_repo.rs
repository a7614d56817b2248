use async_trait::async_trait;
use quiz_core::model::{ExamId, ExamResult};
use sqlx::Sqlite;
use sqlx::query::Query;
use sqlx::sqlite::SqliteArguments;

use super::SqliteRepository;
use super::mapping::{exam_id_to_i64, map_exam_result_row, ser, to_json};
use crate::repository::{HistoryRepository, StorageError};

const INSERT_RESULT: &str = r"
    INSERT INTO exam_results (
        id, timestamp, questions, user_choices,
        correct, wrong, skipped, total,
        negative_mark, parent_exam_id, exam_name
    )
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
";

const INSERT_RESULT_OR_IGNORE: &str = r"
    INSERT OR IGNORE INTO exam_results (
        id, timestamp, questions, user_choices,
        correct, wrong, skipped, total,
        negative_mark, parent_exam_id, exam_name
    )
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
";

const SELECT_COLUMNS: &str = r"
    SELECT
        id, timestamp, questions, user_choices,
        correct, wrong, skipped, total,
        negative_mark, parent_exam_id, exam_name
    FROM exam_results
";

/// Column values of one `exam_results` row.
struct ResultRow {
    id: i64,
    timestamp: i64,
    questions: String,
    user_choices: String,
    correct: i64,
    wrong: i64,
    skipped: i64,
    total: i64,
    negative_mark: f64,
    parent_exam_id: Option<i64>,
    exam_name: Option<String>,
}

impl ResultRow {
    fn from_result(result: &ExamResult) -> Result<Self, StorageError> {
        let stats = result.stats();
        Ok(Self {
            id: exam_id_to_i64(result.id())?,
            timestamp: result.timestamp(),
            questions: to_json(&result.questions())?,
            user_choices: to_json(&result.user_choices())?,
            correct: i64::from(stats.correct),
            wrong: i64::from(stats.wrong),
            skipped: i64::from(stats.skipped),
            total: i64::from(stats.total),
            negative_mark: result.negative_mark(),
            parent_exam_id: result.parent_exam_id().map(exam_id_to_i64).transpose()?,
            exam_name: result.exam_name().map(ToString::to_string),
        })
    }

    fn bind(self, sql: &'static str) -> Query<'static, Sqlite, SqliteArguments<'static>> {
        sqlx::query(sql)
            .bind(self.id)
            .bind(self.timestamp)
            .bind(self.questions)
            .bind(self.user_choices)
            .bind(self.correct)
            .bind(self.wrong)
            .bind(self.skipped)
            .bind(self.total)
            .bind(self.negative_mark)
            .bind(self.parent_exam_id)
            .bind(self.exam_name)
    }
}

#[async_trait]
impl HistoryRepository for SqliteRepository {
    async fn append_result(&self, result: &ExamResult) -> Result<(), StorageError> {
        let row = ResultRow::from_result(result)?;
        row.bind(INSERT_RESULT)
            .execute(&self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(db) if db.is_unique_violation() => StorageError::Conflict,
                other => StorageError::Connection(other.to_string()),
            })?;
        Ok(())
    }

    async fn get_result(&self, id: ExamId) -> Result<ExamResult, StorageError> {
        let sql = format!("{SELECT_COLUMNS} WHERE id = ?1");
        let row = sqlx::query(&sql)
            .bind(exam_id_to_i64(id)?)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?
            .ok_or(StorageError::NotFound)?;

        map_exam_result_row(&row)
    }

    async fn list_results(&self) -> Result<Vec<ExamResult>, StorageError> {
        let sql = format!("{SELECT_COLUMNS} ORDER BY timestamp ASC, id ASC");
        let rows = sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut results = Vec::with_capacity(rows.len());
        for row in rows {
            results.push(map_exam_result_row(&row)?);
        }
        Ok(results)
    }

    async fn merge_results(&self, results: &[ExamResult]) -> Result<usize, StorageError> {
        let rows = results
            .iter()
            .map(ResultRow::from_result)
            .collect::<Result<Vec<_>, _>>()?;

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let mut added: u64 = 0;
        for row in rows {
            let res = row
                .bind(INSERT_RESULT_OR_IGNORE)
                .execute(&mut *tx)
                .await
                .map_err(|e| StorageError::Connection(e.to_string()))?;
            added += res.rows_affected();
        }
        tx.commit()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        usize::try_from(added).map_err(ser)
    }

    async fn replace_results(&self, results: &[ExamResult]) -> Result<(), StorageError> {
        let rows = results
            .iter()
            .map(ResultRow::from_result)
            .collect::<Result<Vec<_>, _>>()?;

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        sqlx::query("DELETE FROM exam_results")
            .execute(&mut *tx)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        for row in rows {
            row.bind(INSERT_RESULT)
                .execute(&mut *tx)
                .await
                .map_err(|e| match e {
                    sqlx::Error::Database(db) if db.is_unique_violation() => StorageError::Conflict,
                    other => StorageError::Connection(other.to_string()),
                })?;
        }
        tx.commit()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))
    }

    async fn clear_results(&self) -> Result<(), StorageError> {
        sqlx::query("DELETE FROM exam_results")
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(())
    }
}
