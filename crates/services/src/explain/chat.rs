use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{info, warn};

use quiz_core::model::{ExamId, ExamResult};

use super::prompt::{EXPLAIN_REQUEST, build_tutor_prompt};
use super::{ChatMessage, ExplanationProvider};
use crate::error::ExplainError;

/// Cache key: one transcript per question of an attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChatKey {
    pub exam_id: ExamId,
    pub question_index: usize,
}

impl ChatKey {
    #[must_use]
    pub fn new(exam_id: ExamId, question_index: usize) -> Self {
        Self {
            exam_id,
            question_index,
        }
    }
}

#[derive(Default)]
struct ChatCache {
    transcripts: HashMap<ChatKey, Vec<ChatMessage>>,
    in_flight: HashSet<ChatKey>,
}

/// Per-question tutor conversations on top of an `ExplanationProvider`.
///
/// Transcripts hold only user and assistant turns; the tutor context is
/// rebuilt from the result on every request. At most one request per key
/// runs at a time.
#[derive(Clone)]
pub struct ExplanationService {
    provider: Arc<dyn ExplanationProvider>,
    cache: Arc<Mutex<ChatCache>>,
}

impl ExplanationService {
    #[must_use]
    pub fn new(provider: Arc<dyn ExplanationProvider>) -> Self {
        Self {
            provider,
            cache: Arc::new(Mutex::new(ChatCache::default())),
        }
    }

    /// Cached transcript for `key`, empty if none.
    #[must_use]
    pub fn transcript(&self, key: ChatKey) -> Vec<ChatMessage> {
        self.lock().transcripts.get(&key).cloned().unwrap_or_default()
    }

    pub fn clear(&self) {
        self.lock().transcripts.clear();
    }

    /// Explanation for question `index`, fetched once and then served from cache.
    ///
    /// `force_reset` discards the cached transcript and asks again.
    ///
    /// # Errors
    ///
    /// Returns `ExplainError::InFlight` if a request for the same question is
    /// running, `ExplainError::InvalidQuestion` for a bad index, or whatever
    /// the provider reports. A failed request leaves no transcript behind.
    pub async fn explain(
        &self,
        result: &ExamResult,
        index: usize,
        force_reset: bool,
    ) -> Result<Vec<ChatMessage>, ExplainError> {
        let key = ChatKey::new(result.id(), index);
        let context = build_tutor_prompt(result, index)?;

        let _guard = {
            let mut cache = self.lock();
            if !force_reset {
                if let Some(cached) = cache.transcripts.get(&key).filter(|t| !t.is_empty()) {
                    return Ok(cached.clone());
                }
            }
            let guard = InFlightGuard::claim(&self.cache, &mut cache, key)?;
            cache.transcripts.remove(&key);
            guard
        };

        let messages = [ChatMessage::system(context), ChatMessage::user(EXPLAIN_REQUEST)];
        let reply = self.provider.complete(&messages).await.inspect_err(|err| {
            warn!(exam_id = %key.exam_id, index, %err, "explanation failed");
        })?;
        let reply = non_empty(reply)?;
        info!(exam_id = %key.exam_id, index, "explanation received");

        let transcript = vec![ChatMessage::assistant(reply)];
        self.lock().transcripts.insert(key, transcript.clone());
        Ok(transcript)
    }

    /// Ask a follow-up about question `index`.
    ///
    /// The user message is appended first and stays even if the provider
    /// fails; the reply is appended on success. Blank messages are ignored.
    ///
    /// # Errors
    ///
    /// Same as [`ExplanationService::explain`].
    pub async fn ask(
        &self,
        result: &ExamResult,
        index: usize,
        message: &str,
    ) -> Result<Vec<ChatMessage>, ExplainError> {
        let key = ChatKey::new(result.id(), index);
        let context = build_tutor_prompt(result, index)?;
        let message = message.trim();

        let (_guard, history) = {
            let mut cache = self.lock();
            if message.is_empty() {
                return Ok(cache.transcripts.get(&key).cloned().unwrap_or_default());
            }
            let guard = InFlightGuard::claim(&self.cache, &mut cache, key)?;
            let transcript = cache.transcripts.entry(key).or_default();
            transcript.push(ChatMessage::user(message));
            (guard, transcript.clone())
        };

        let mut messages = Vec::with_capacity(history.len() + 1);
        messages.push(ChatMessage::system(context));
        messages.extend(history);

        let reply = self.provider.complete(&messages).await.inspect_err(|err| {
            warn!(exam_id = %key.exam_id, index, %err, "follow-up failed");
        })?;
        let reply = non_empty(reply)?;

        let mut cache = self.lock();
        let transcript = cache.transcripts.entry(key).or_default();
        transcript.push(ChatMessage::assistant(reply));
        Ok(transcript.clone())
    }

    fn lock(&self) -> MutexGuard<'_, ChatCache> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn non_empty(reply: String) -> Result<String, ExplainError> {
    let trimmed = reply.trim();
    if trimmed.is_empty() {
        warn!("provider returned an empty reply");
        return Err(ExplainError::EmptyResponse);
    }
    Ok(trimmed.to_string())
}

/// Marks a key as in flight until dropped.
struct InFlightGuard {
    cache: Arc<Mutex<ChatCache>>,
    key: ChatKey,
}

impl InFlightGuard {
    fn claim(
        shared: &Arc<Mutex<ChatCache>>,
        cache: &mut ChatCache,
        key: ChatKey,
    ) -> Result<Self, ExplainError> {
        if !cache.in_flight.insert(key) {
            return Err(ExplainError::InFlight);
        }
        Ok(Self {
            cache: Arc::clone(shared),
            key,
        })
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .in_flight
            .remove(&self.key);
    }
}
