use crate::model::QuestionRecord;

/// Seam for the question-bank text format.
///
/// Implementations turn raw bank text into ordered records whose
/// `original_index` is stable for the same input.
pub trait BankParser: Send + Sync {
    fn parse(&self, raw: &str) -> Vec<QuestionRecord>;

    /// Title embedded in the bank text, if the format has one.
    fn title(&self, _raw: &str) -> Option<String> {
        None
    }
}

/// Parsed bank together with the text it came from.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct QuestionBank {
    raw: String,
    questions: Vec<QuestionRecord>,
    title: Option<String>,
}

impl QuestionBank {
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn parse(raw: impl Into<String>, parser: &dyn BankParser) -> Self {
        let raw = raw.into();
        let questions = parser.parse(&raw);
        let title = parser
            .title(&raw)
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());
        Self {
            raw,
            questions,
            title,
        }
    }

    #[must_use]
    pub fn raw(&self) -> &str {
        &self.raw
    }

    #[must_use]
    pub fn questions(&self) -> &[QuestionRecord] {
        &self.questions
    }

    #[must_use]
    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }
}
