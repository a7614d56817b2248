use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Unique identifier for a completed exam attempt.
///
/// Values are epoch milliseconds at creation time, so ordering by id follows
/// creation order.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExamId(u64);

impl ExamId {
    /// Creates a new `ExamId`
    #[must_use]
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the underlying u64 value
    #[must_use]
    pub fn value(&self) -> u64 {
        self.0
    }

    /// The next id strictly after this one.
    #[must_use]
    pub fn successor(&self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

impl fmt::Debug for ExamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ExamId({})", self.0)
    }
}

// ─── Display Implementations ───────────────────────────────────────────────────

impl fmt::Display for ExamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ─── FromStr Implementations ───────────────────────────────────────────────────

/// Error type for parsing ID from string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseIdError {
    kind: String,
}

impl fmt::Display for ParseIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to parse {} from string", self.kind)
    }
}

impl std::error::Error for ParseIdError {}

impl FromStr for ExamId {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u64>()
            .map(ExamId::new)
            .map_err(|_| ParseIdError {
                kind: "ExamId".to_string(),
            })
    }
}

// ─── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exam_id_display() {
        let id = ExamId::new(1_700_000_000_000);
        assert_eq!(id.to_string(), "1700000000000");
    }

    #[test]
    fn test_exam_id_from_str() {
        let id: ExamId = "123".parse().unwrap();
        assert_eq!(id, ExamId::new(123));
    }

    #[test]
    fn test_exam_id_from_str_invalid() {
        let result = "not-a-number".parse::<ExamId>();
        assert!(result.is_err());
    }

    #[test]
    fn test_exam_id_serializes_as_plain_number() {
        let json = serde_json::to_string(&ExamId::new(42)).unwrap();
        assert_eq!(json, "42");
        let back: ExamId = serde_json::from_str("42").unwrap();
        assert_eq!(back, ExamId::new(42));
    }

    #[test]
    fn test_successor_is_strictly_greater() {
        let id = ExamId::new(9);
        assert!(id.successor() > id);
        assert_eq!(ExamId::new(u64::MAX).successor(), ExamId::new(u64::MAX));
    }
}
