use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::history::{count_new, merge_history};
use crate::model::{ExamResult, ProgressionState, QuizConfig};

/// Version written into every exported envelope.
pub const BACKUP_VERSION: u32 = 1;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum BackupFormatError {
    #[error("document is neither a session backup nor a history list")]
    Unrecognized,

    #[error("backup version {0} is newer than supported version {BACKUP_VERSION}")]
    UnsupportedVersion(u32),
}

//
// ─── DOCUMENTS ─────────────────────────────────────────────────────────────────
//

/// Full export envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionBackup {
    pub version: u32,
    /// Export time in epoch milliseconds.
    pub timestamp: i64,
    pub raw_input: String,
    pub config: QuizConfig,
    pub progress: ProgressionState,
    pub history: Vec<ExamResult>,
}

/// Envelope as found in an imported file; every part is optional.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvelopeDocument {
    pub version: Option<u32>,
    pub timestamp: Option<i64>,
    pub raw_input: Option<String>,
    pub config: Option<QuizConfig>,
    pub progress: Option<ProgressionState>,
    pub history: Option<Vec<ExamResult>>,
}

/// Anything accepted by import.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum BackupDocument {
    /// Bare list of results written by older versions.
    Legacy(Vec<ExamResult>),
    Envelope(EnvelopeDocument),
}

impl From<SessionBackup> for BackupDocument {
    fn from(backup: SessionBackup) -> Self {
        BackupDocument::Envelope(EnvelopeDocument {
            version: Some(backup.version),
            timestamp: Some(backup.timestamp),
            raw_input: Some(backup.raw_input),
            config: Some(backup.config),
            progress: Some(backup.progress),
            history: Some(backup.history),
        })
    }
}

impl BackupDocument {
    /// Reject documents that carry no recognizable session data.
    ///
    /// # Errors
    ///
    /// Returns `BackupFormatError::Unrecognized` for envelopes with neither
    /// a history list nor versioned bank text, and
    /// `BackupFormatError::UnsupportedVersion` for newer envelopes.
    pub fn validate(self) -> Result<Self, BackupFormatError> {
        if let BackupDocument::Envelope(env) = &self {
            if let Some(version) = env.version {
                if version > BACKUP_VERSION {
                    return Err(BackupFormatError::UnsupportedVersion(version));
                }
            }
            let has_session = env.version.is_some() && env.raw_input.is_some();
            if env.history.is_none() && !has_session {
                return Err(BackupFormatError::Unrecognized);
            }
        }
        Ok(self)
    }

    #[must_use]
    pub fn history(&self) -> &[ExamResult] {
        match self {
            BackupDocument::Legacy(history) => history,
            BackupDocument::Envelope(env) => env.history.as_deref().unwrap_or_default(),
        }
    }

    #[must_use]
    pub fn is_legacy(&self) -> bool {
        matches!(self, BackupDocument::Legacy(_))
    }

    /// Apply this document to a snapshot.
    ///
    /// History is always merged first-wins. Bank text, config and progress
    /// are replaced only by an envelope that carries them.
    #[must_use]
    pub fn apply_to(&self, snapshot: &SessionSnapshot) -> (SessionSnapshot, ImportSummary) {
        let added = count_new(&snapshot.history, self.history());
        let history = merge_history(&snapshot.history, self.history());

        let mut next = SessionSnapshot {
            raw_input: snapshot.raw_input.clone(),
            config: snapshot.config.clone(),
            progress: snapshot.progress.clone(),
            history,
        };
        let mut summary = ImportSummary {
            legacy: self.is_legacy(),
            added,
            ..ImportSummary::default()
        };

        if let BackupDocument::Envelope(env) = self {
            if let Some(raw) = env.raw_input.as_ref().filter(|raw| !raw.is_empty()) {
                summary.raw_input_replaced = *raw != snapshot.raw_input;
                next.raw_input.clone_from(raw);
            }
            if let Some(config) = &env.config {
                summary.config_replaced = true;
                next.config = config.clone();
            }
            if let Some(progress) = &env.progress {
                summary.progress_replaced = true;
                next.progress = progress.clone();
            }
        }

        (next, summary)
    }
}

/// What an import changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ImportSummary {
    pub legacy: bool,
    /// History records that were not already present.
    pub added: usize,
    pub raw_input_replaced: bool,
    pub config_replaced: bool,
    pub progress_replaced: bool,
}

//
// ─── SNAPSHOT ──────────────────────────────────────────────────────────────────
//

/// Persisted part of a session: everything a backup carries besides its
/// version and export time.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SessionSnapshot {
    pub raw_input: String,
    pub config: QuizConfig,
    pub progress: ProgressionState,
    pub history: Vec<ExamResult>,
}

impl SessionSnapshot {
    /// Wrap the snapshot in an export envelope stamped with `timestamp`.
    #[must_use]
    pub fn to_backup(&self, timestamp: i64) -> SessionBackup {
        SessionBackup {
            version: BACKUP_VERSION,
            timestamp,
            raw_input: self.raw_input.clone(),
            config: self.config.clone(),
            progress: self.progress.clone(),
            history: self.history.clone(),
        }
    }
}
