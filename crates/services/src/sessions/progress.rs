/// Aggregated view of an active exam's progress, useful for UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionProgress {
    pub total: usize,
    pub answered: usize,
    pub remaining: usize,
    /// Every question has an answer.
    pub is_complete: bool,
}
