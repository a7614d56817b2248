use async_trait::async_trait;
use quiz_core::model::{
    ExamId, ExamResult, ProgressionState, QuizConfig, SessionSnapshot,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Persisted session settings: everything in a snapshot except history.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SessionRecord {
    pub raw_input: String,
    pub config: QuizConfig,
    pub progress: ProgressionState,
}

impl SessionRecord {
    #[must_use]
    pub fn from_snapshot(snapshot: &SessionSnapshot) -> Self {
        Self {
            raw_input: snapshot.raw_input.clone(),
            config: snapshot.config.clone(),
            progress: snapshot.progress.clone(),
        }
    }

    #[must_use]
    pub fn into_snapshot(self, history: Vec<ExamResult>) -> SessionSnapshot {
        SessionSnapshot {
            raw_input: self.raw_input,
            config: self.config,
            progress: self.progress,
            history,
        }
    }
}

/// Repository contract for submitted attempts.
#[async_trait]
pub trait HistoryRepository: Send + Sync {
    /// Store a freshly submitted result.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if a result with the same id exists.
    async fn append_result(&self, result: &ExamResult) -> Result<(), StorageError>;


    /// Fetch one result.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn get_result(&self, id: ExamId) -> Result<ExamResult, StorageError>;

    /// All results, oldest first (ties by id).
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the results cannot be read.
    async fn list_results(&self) -> Result<Vec<ExamResult>, StorageError>;

    /// Insert every result whose id is not stored yet; existing ids win.
    ///
    /// Returns the number of results added.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the batch cannot be written.
    async fn merge_results(&self, results: &[ExamResult]) -> Result<usize, StorageError>;

    /// Make the stored history exactly `results`, all or nothing.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if `results` repeats an id; the stored
    /// history is left untouched.
    async fn replace_results(&self, results: &[ExamResult]) -> Result<(), StorageError>;

    /// Remove all results.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the results cannot be deleted.
    async fn clear_results(&self) -> Result<(), StorageError>;
}

/// Repository contract for the single stored session.
#[async_trait]
pub trait SessionStateRepository: Send + Sync {
    /// Load the stored session, if one was ever saved.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the row exists but cannot be decoded.
    async fn load_session(&self) -> Result<Option<SessionRecord>, StorageError>;

    /// Replace the stored session.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the session cannot be stored.
    async fn save_session(&self, session: &SessionRecord) -> Result<(), StorageError>;
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    results: Arc<Mutex<HashMap<ExamId, ExamResult>>>,
    session: Arc<Mutex<Option<SessionRecord>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self {
            results: Arc::new(Mutex::new(HashMap::new())),
            session: Arc::new(Mutex::new(None)),
        }
    }
}

#[async_trait]
impl HistoryRepository for InMemoryRepository {
    async fn append_result(&self, result: &ExamResult) -> Result<(), StorageError> {
        let mut guard = self
            .results
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        if guard.contains_key(&result.id()) {
            return Err(StorageError::Conflict);
        }
        guard.insert(result.id(), result.clone());
        Ok(())
    }

    async fn get_result(&self, id: ExamId) -> Result<ExamResult, StorageError> {
        let guard = self
            .results
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.get(&id).cloned().ok_or(StorageError::NotFound)
    }

    async fn list_results(&self) -> Result<Vec<ExamResult>, StorageError> {
        let guard = self
            .results
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let mut results: Vec<ExamResult> = guard.values().cloned().collect();
        results.sort_by_key(|r| (r.timestamp(), r.id()));
        Ok(results)
    }

    async fn merge_results(&self, results: &[ExamResult]) -> Result<usize, StorageError> {
        let mut guard = self
            .results
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let mut added = 0;
        for result in results {
            if !guard.contains_key(&result.id()) {
                guard.insert(result.id(), result.clone());
                added += 1;
            }
        }
        Ok(added)
    }

    async fn replace_results(&self, results: &[ExamResult]) -> Result<(), StorageError> {
        let mut next = HashMap::with_capacity(results.len());
        for result in results {
            if next.insert(result.id(), result.clone()).is_some() {
                return Err(StorageError::Conflict);
            }
        }
        let mut guard = self
            .results
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        *guard = next;
        Ok(())
    }

    async fn clear_results(&self) -> Result<(), StorageError> {
        let mut guard = self
            .results
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.clear();
        Ok(())
    }
}

#[async_trait]
impl SessionStateRepository for InMemoryRepository {
    async fn load_session(&self) -> Result<Option<SessionRecord>, StorageError> {
        let guard = self
            .session
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.clone())
    }

    async fn save_session(&self, session: &SessionRecord) -> Result<(), StorageError> {
        let mut guard = self
            .session
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        *guard = Some(session.clone());
        Ok(())
    }
}

/// Aggregates history and session repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub history: Arc<dyn HistoryRepository>,
    pub session: Arc<dyn SessionStateRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        let history: Arc<dyn HistoryRepository> = Arc::new(repo.clone());
        let session: Arc<dyn SessionStateRepository> = Arc::new(repo);
        Self { history, session }
    }

    /// Load the stored session together with its history.
    ///
    /// A store that was never written yields the default snapshot.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if either repository fails.
    pub async fn load_snapshot(&self) -> Result<SessionSnapshot, StorageError> {
        let session = self.session.load_session().await?.unwrap_or_default();
        let history = self.history.list_results().await?;
        Ok(session.into_snapshot(history))
    }

    /// Persist session settings and merge the snapshot's history.
    ///
    /// History already stored is kept; see [`Storage::replace_snapshot`] to
    /// overwrite it.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if either repository fails.
    pub async fn save_snapshot(&self, snapshot: &SessionSnapshot) -> Result<usize, StorageError> {
        self.session
            .save_session(&SessionRecord::from_snapshot(snapshot))
            .await?;
        self.history.merge_results(&snapshot.history).await
    }

    /// Persist session settings and make the stored history match the
    /// snapshot's, dropping results it no longer holds.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if either repository fails.
    pub async fn replace_snapshot(&self, snapshot: &SessionSnapshot) -> Result<(), StorageError> {
        self.history.replace_results(&snapshot.history).await?;
        self.session
            .save_session(&SessionRecord::from_snapshot(snapshot))
            .await
    }
}
