use std::sync::Arc;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnection, SqlitePoolOptions};
use sqlx::SqlitePool;
use thiserror::Error;

use crate::repository::{HistoryRepository, SessionStateRepository, Storage};

mod exam_result_repo;
mod mapping;
mod migrate;
mod session_state_repo;

/// Pool size for a database file; one user, a few concurrent readers.
const FILE_POOL_SIZE: u32 = 4;
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);
const BUSY_TIMEOUT_MS: u32 = 5_000;

/// Exam history and the saved session, kept in one `SQLite` database.
#[derive(Clone)]
pub struct SqliteRepository {
    pool: SqlitePool,
}

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SqliteInitError {
    #[error("sqlite: {0}")]
    Sqlx(#[from] sqlx::Error),
}

/// In-memory databases live only as long as a connection holds them.
fn is_in_memory(database_url: &str) -> bool {
    database_url.contains(":memory:") || database_url.contains("mode=memory")
}

async fn prepare_connection(conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    sqlx::query("PRAGMA journal_mode = WAL;")
        .execute(&mut *conn)
        .await?;
    sqlx::query(&format!("PRAGMA busy_timeout = {BUSY_TIMEOUT_MS};"))
        .execute(&mut *conn)
        .await?;
    Ok(())
}

impl SqliteRepository {
    /// Open the quiz database at `database_url` without touching the schema.
    ///
    /// In-memory URLs get a single connection that is never recycled, so the
    /// history survives for the lifetime of the repository.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` if the database cannot be opened or a
    /// connection cannot be prepared.
    pub async fn connect(database_url: &str) -> Result<Self, SqliteInitError> {
        let options = SqlitePoolOptions::new()
            .acquire_timeout(ACQUIRE_TIMEOUT)
            .after_connect(|conn, _meta| Box::pin(async move { prepare_connection(conn).await }));
        let options = if is_in_memory(database_url) {
            options
                .min_connections(1)
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            options.max_connections(FILE_POOL_SIZE)
        };

        let pool = options.connect(database_url).await?;
        Ok(Self { pool })
    }

    /// Bring the exam tables up to the current schema version.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` if a migration step fails.
    pub async fn migrate(&self) -> Result<(), SqliteInitError> {
        migrate::run_migrations(&self.pool).await
    }
}

impl Storage {
    /// Session storage in a migrated `SQLite` database.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` if the database cannot be opened or migrated.
    pub async fn sqlite(database_url: &str) -> Result<Self, SqliteInitError> {
        let repo = SqliteRepository::connect(database_url).await?;
        repo.migrate().await?;
        let history: Arc<dyn HistoryRepository> = Arc::new(repo.clone());
        let session: Arc<dyn SessionStateRepository> = Arc::new(repo);
        Ok(Self { history, session })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::model::SessionSnapshot;

    #[test]
    fn recognizes_memory_urls() {
        assert!(is_in_memory("sqlite::memory:"));
        assert!(is_in_memory("sqlite:file:quiz?mode=memory&cache=shared"));
        assert!(!is_in_memory("sqlite:///var/lib/quiz/quiz.sqlite3"));
    }

    #[tokio::test]
    async fn plain_memory_url_keeps_its_session() {
        let storage = Storage::sqlite("sqlite::memory:").await.unwrap();
        let snapshot = SessionSnapshot {
            raw_input: "bank".into(),
            ..SessionSnapshot::default()
        };
        storage.save_snapshot(&snapshot).await.unwrap();
        assert_eq!(storage.load_snapshot().await.unwrap(), snapshot);
    }
}
