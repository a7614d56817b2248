//! Reading and writing session backup files.

use chrono::{DateTime, Utc};
use tracing::warn;

use quiz_core::model::{BackupDocument, SessionBackup};

use crate::error::BackupError;

/// Slug used when the bank has no usable title.
pub const DEFAULT_BACKUP_SLUG: &str = "quiz";

/// Parse and validate a backup file.
///
/// Accepts a full envelope or a bare history array.
///
/// # Errors
///
/// Returns `BackupError::Malformed` for invalid JSON or an unrecognized shape
/// and `BackupError::UnsupportedVersion` for envelopes newer than this build.
pub fn parse_backup(json: &str) -> Result<BackupDocument, BackupError> {
    let document: BackupDocument = serde_json::from_str(json).map_err(|err| {
        warn!(%err, "backup is not valid JSON");
        BackupError::from(err)
    })?;
    document.validate().map_err(|err| {
        warn!(%err, "rejected backup document");
        BackupError::from(err)
    })
}

/// Pretty-printed JSON for `backup`.
///
/// # Errors
///
/// Returns `BackupError::Malformed` if serialization fails.
pub fn to_json(backup: &SessionBackup) -> Result<String, BackupError> {
    Ok(serde_json::to_string_pretty(backup)?)
}

/// File name for an export taken at `at`: `<slug>_<YYYY-MM-DD_HH-MM-SS>.json`.
#[must_use]
pub fn backup_filename(title: Option<&str>, at: DateTime<Utc>) -> String {
    let slug = title.map(slugify).filter(|s| !s.is_empty());
    format!(
        "{}_{}.json",
        slug.as_deref().unwrap_or(DEFAULT_BACKUP_SLUG),
        at.format("%Y-%m-%d_%H-%M-%S")
    )
}

/// Drop characters file systems reject, join words with `_`.
fn slugify(title: &str) -> String {
    let cleaned: String = title
        .chars()
        .filter(|c| !c.is_control() && !matches!(c, '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|'))
        .collect();
    cleaned.split_whitespace().collect::<Vec<_>>().join("_")
}
