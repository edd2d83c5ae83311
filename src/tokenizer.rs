/*!
 * Token counting for context budgeting.
 *
 * The concrete tokenizer is an external collaborator reached through the
 * `TokenCounter` trait. `TokenizerAdapter` wraps a counter with a per-text
 * cache and degrades to a `chars / 4` estimate when the counter cannot load
 * its model, so a missing tokenizer never aborts a translation.
 */

use async_trait::async_trait;
use log::{debug, warn};
use parking_lot::RwLock;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::errors::TokenizerError;

/// Characters per token used by the heuristic estimate
pub const HEURISTIC_CHARS_PER_TOKEN: usize = 4;

/// Conservative token estimate: character count divided by four, rounded up
pub fn heuristic_count(text: &str) -> usize {
    text.chars().count().div_ceil(HEURISTIC_CHARS_PER_TOKEN)
}

/// Model specific token counter
#[async_trait]
pub trait TokenCounter: Send + Sync + Debug {
    /// Count the tokens `text` encodes to for `model_id`
    ///
    /// Must be deterministic for a given model and free of side effects.
    async fn count(&self, text: &str, model_id: &str) -> Result<usize, TokenizerError>;
}

/// Counter that always uses the heuristic estimate
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicCounter;

#[async_trait]
impl TokenCounter for HeuristicCounter {
    async fn count(&self, text: &str, _model_id: &str) -> Result<usize, TokenizerError> {
        Ok(heuristic_count(text))
    }
}

/// Caching, fail-soft front end for a `TokenCounter`
#[derive(Debug, Clone)]
pub struct TokenizerAdapter {
    counter: Arc<dyn TokenCounter>,
    model_id: String,
    /// Exact counts keyed by the SHA-256 of the text
    cache: Arc<RwLock<HashMap<String, usize>>>,
    fallbacks: Arc<AtomicUsize>,
}

impl TokenizerAdapter {
    /// Create an adapter for the given counter and model
    pub fn new(counter: Arc<dyn TokenCounter>, model_id: &str) -> Self {
        Self {
            counter,
            model_id: model_id.to_string(),
            cache: Arc::new(RwLock::new(HashMap::new())),
            fallbacks: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Create an adapter backed by the heuristic counter
    pub fn heuristic(model_id: &str) -> Self {
        Self::new(Arc::new(HeuristicCounter), model_id)
    }

    /// Model identifier passed to the counter
    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    /// Count tokens, falling back to the heuristic if the tokenizer is unavailable
    pub async fn count(&self, text: &str) -> usize {
        if text.is_empty() {
            return 0;
        }

        let key = hash_text(text);
        if let Some(count) = self.cache.read().get(&key) {
            return *count;
        }

        match self.counter.count(text, &self.model_id).await {
            Ok(count) => {
                self.cache.write().insert(key, count);
                count
            }
            Err(TokenizerError::Unavailable(reason)) => {
                self.fallbacks.fetch_add(1, Ordering::Relaxed);
                let estimate = heuristic_count(text);
                warn!(
                    "Tokenizer for {} unavailable ({}), estimating {} tokens",
                    self.model_id, reason, estimate
                );
                estimate
            }
        }
    }

    /// Number of counts that had to use the heuristic
    pub fn fallback_count(&self) -> usize {
        self.fallbacks.load(Ordering::Relaxed)
    }

    /// Number of cached exact counts
    pub fn cached_entries(&self) -> usize {
        self.cache.read().len()
    }

    /// Drop every cached count
    pub fn clear_cache(&self) {
        let mut cache = self.cache.write();
        debug!("Clearing {} cached token counts", cache.len());
        cache.clear();
    }
}

/// Compute SHA256 hash of text
pub fn hash_text(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}
