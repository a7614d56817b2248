use async_trait::async_trait;
use chrono::Utc;

use super::SqliteRepository;
use super::mapping::{map_session_row, to_json};
use crate::repository::{SessionRecord, SessionStateRepository, StorageError};

#[async_trait]
impl SessionStateRepository for SqliteRepository {
    async fn load_session(&self) -> Result<Option<SessionRecord>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT raw_input, config, progress
            FROM session_state
            WHERE id = 1
            ",
        )
        .fetch_optional(&self.pool)
        .await
        .map_err(|err| StorageError::Connection(err.to_string()))?;

        let Some(row) = row else {
            return Ok(None);
        };
        map_session_row(&row).map(Some)
    }

    async fn save_session(&self, session: &SessionRecord) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO session_state (id, raw_input, config, progress, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(id) DO UPDATE SET
                raw_input = excluded.raw_input,
                config = excluded.config,
                progress = excluded.progress,
                updated_at = excluded.updated_at
            ",
        )
        .bind(1_i64)
        .bind(&session.raw_input)
        .bind(to_json(&session.config)?)
        .bind(to_json(&session.progress)?)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|err| StorageError::Connection(err.to_string()))?;

        Ok(())
    }
}
