use tracing::info;

use quiz_core::Clock;
use quiz_core::model::{BankParser, ImportSummary, SessionBackup};
use storage::repository::Storage;

use crate::backup::parse_backup;
use crate::error::StoreError;
use crate::sessions::{HistoryListItem, QuizEngine, SessionState, history_items};

/// Persists engine state through a `Storage` backend.
#[derive(Clone)]
pub struct SessionStore {
    clock: Clock,
    storage: Storage,
}

impl SessionStore {
    #[must_use]
    pub fn new(clock: Clock, storage: Storage) -> Self {
        Self { clock, storage }
    }

    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Clock::default(), Storage::in_memory())
    }

    /// Open (and migrate) a `SQLite` database.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Sqlite` if the database cannot be opened.
    pub async fn open_sqlite(database_url: &str) -> Result<Self, StoreError> {
        let storage = Storage::sqlite(database_url).await?;
        Ok(Self::new(Clock::default(), storage))
    }

    #[must_use]
    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    /// Rebuild engine state from what was stored.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Storage` if loading fails.
    pub async fn restore(&self, parser: &dyn BankParser) -> Result<SessionState, StoreError> {
        let snapshot = self.storage.load_snapshot().await?;
        Ok(QuizEngine::new(self.clock).restore(snapshot, parser))
    }

    /// Write `state` back.
    ///
    /// The stored history is replaced by the state's, so edited results are
    /// rewritten and results dropped by a reset are deleted.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Storage` if any write fails.
    pub async fn save(&self, state: &SessionState) -> Result<(), StoreError> {
        let snapshot = state.snapshot();
        let stored = self.storage.history.list_results().await?;
        let removed = stored
            .iter()
            .filter(|old| !snapshot.history.iter().any(|r| r.id() == old.id()))
            .count();
        let added = snapshot
            .history
            .iter()
            .filter(|r| !stored.iter().any(|old| old.id() == r.id()))
            .count();

        self.storage.replace_snapshot(&snapshot).await?;
        info!(added, removed, results = snapshot.history.len(), "session saved");
        Ok(())
    }

    /// Apply a backup file to the stored session.
    ///
    /// Nothing is written if the document is rejected.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Backup` for a bad document or `StoreError::Storage`
    /// if a write fails.
    pub async fn import_json(&self, json: &str) -> Result<ImportSummary, StoreError> {
        let document = parse_backup(json)?;
        let current = self.storage.load_snapshot().await?;
        let (next, summary) = document.apply_to(&current);
        self.storage.save_snapshot(&next).await?;
        info!(
            legacy = summary.legacy,
            added = summary.added,
            bank_replaced = summary.raw_input_replaced,
            "backup imported into store"
        );
        Ok(summary)
    }

    /// Full envelope of the stored session, stamped with the current time.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Storage` if loading fails.
    pub async fn export(&self) -> Result<SessionBackup, StoreError> {
        let snapshot = self.storage.load_snapshot().await?;
        let backup = snapshot.to_backup(self.clock.now_millis());
        info!(results = backup.history.len(), "backup exported from store");
        Ok(backup)
    }

    /// Stored history as list items, newest first.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Storage` if loading fails.
    pub async fn history_items(&self) -> Result<Vec<HistoryListItem>, StoreError> {
        let history = self.storage.history.list_results().await?;
        Ok(history_items(&history))
    }
}
