/*!
 * Mock backends for testing and dry runs.
 *
 * - `MockLlmClient::working()` - Always succeeds, echoing the task text
 * - `MockLlmClient::intermittent(n)` - Fails every nth request
 * - `MockLlmClient::failing()` - Always fails with an error
 * - `MockLlmClient::empty()` - Answers with an empty translation
 * - `MockScorer` - Fixed verdict or failure for the quality loop
 * - `MockTokenCounter` - Word counting tokenizer, or one that is unavailable
 */

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::context::{Message, Role};
use crate::errors::{ProviderError, TokenizerError};
use crate::providers::{LlmClient, LlmResponse, TokenUsage};
use crate::quality::{QualityScorer, QualityVerdict};
use crate::tokenizer::TokenCounter;

/// Behavior mode for the mock LLM client
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MockBehavior {
    /// Always succeeds with a translation
    Working,
    /// Fails every Nth request
    Intermittent { fail_every: usize },
    /// Always fails with an error
    Failing,
    /// Returns an empty translation
    Empty,
}

/// Mock LLM client that records every request it receives
#[derive(Debug)]
pub struct MockLlmClient {
    behavior: MockBehavior,
    model_id: String,
    request_count: Arc<AtomicUsize>,
    requests: Arc<Mutex<Vec<Vec<Message>>>>,
    custom_response: Option<fn(&[Message]) -> String>,
}

impl MockLlmClient {
    /// Create a new mock client with the specified behavior
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            model_id: "mock-model".to_string(),
            request_count: Arc::new(AtomicUsize::new(0)),
            requests: Arc::new(Mutex::new(Vec::new())),
            custom_response: None,
        }
    }

    /// Create a mock client that always succeeds
    pub fn working() -> Self {
        Self::new(MockBehavior::Working)
    }

    /// Create an intermittently failing mock client
    pub fn intermittent(fail_every: usize) -> Self {
        Self::new(MockBehavior::Intermittent { fail_every })
    }

    /// Create a mock client that always errors
    pub fn failing() -> Self {
        Self::new(MockBehavior::Failing)
    }

    /// Create a mock client that answers with nothing
    pub fn empty() -> Self {
        Self::new(MockBehavior::Empty)
    }

    /// Set a custom response generator
    pub fn with_custom_response(mut self, generator: fn(&[Message]) -> String) -> Self {
        self.custom_response = Some(generator);
        self
    }

    /// Number of requests received so far
    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }

    /// Copy of the most recent request
    pub fn last_request(&self) -> Option<Vec<Message>> {
        self.requests.lock().last().cloned()
    }

    fn translate(&self, messages: &[Message]) -> String {
        if let Some(generator) = self.custom_response {
            return generator(messages);
        }
        let task = messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
            .unwrap_or_default();
        format!("[TRANSLATED] {}", task)
    }
}

impl Clone for MockLlmClient {
    fn clone(&self) -> Self {
        Self {
            behavior: self.behavior,
            model_id: self.model_id.clone(),
            request_count: Arc::clone(&self.request_count),
            requests: Arc::clone(&self.requests),
            custom_response: self.custom_response,
        }
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn send(&self, messages: &[Message]) -> Result<LlmResponse, ProviderError> {
        let count = self.request_count.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().push(messages.to_vec());

        let prompt_tokens: u64 = messages
            .iter()
            .map(|m| m.content.split_whitespace().count() as u64)
            .sum();

        let translation = match self.behavior {
            MockBehavior::Working => self.translate(messages),
            MockBehavior::Intermittent { fail_every } => {
                if fail_every > 0 && count % fail_every == fail_every - 1 {
                    return Err(ProviderError::ApiError {
                        status_code: 503,
                        message: format!("Simulated intermittent failure (request #{})", count + 1),
                    });
                }
                self.translate(messages)
            }
            MockBehavior::Failing => {
                return Err(ProviderError::ApiError {
                    status_code: 500,
                    message: "Simulated provider failure".to_string(),
                });
            }
            MockBehavior::Empty => String::new(),
        };

        let completion_tokens = translation.split_whitespace().count() as u64;
        Ok(LlmResponse {
            translation,
            usage: TokenUsage {
                prompt_tokens,
                completion_tokens,
            },
        })
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

/// Mock quality scorer
#[derive(Debug, Clone)]
pub struct MockScorer {
    verdict: Option<QualityVerdict>,
    calls: Arc<AtomicUsize>,
}

impl MockScorer {
    /// Scorer that always returns the given verdict
    pub fn fixed(score: u8, feedback: &str, is_good_quality: bool) -> Self {
        Self {
            verdict: Some(QualityVerdict {
                score,
                feedback: feedback.to_string(),
                is_good_quality,
            }),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Scorer whose backend is always down
    pub fn failing() -> Self {
        Self {
            verdict: None,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Number of scoring requests received
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl QualityScorer for MockScorer {
    async fn score(
        &self,
        _source_content: &str,
        _translated_content: &str,
        _source_language: &str,
        _target_language: &str,
    ) -> Result<QualityVerdict, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.verdict
            .clone()
            .ok_or_else(|| ProviderError::ConnectionError("Simulated scorer outage".to_string()))
    }
}

/// Mock tokenizer counting whitespace separated words
#[derive(Debug, Clone)]
pub struct MockTokenCounter {
    available: bool,
    calls: Arc<AtomicUsize>,
}

impl MockTokenCounter {
    /// One token per whitespace separated word
    pub fn words() -> Self {
        Self {
            available: true,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// A tokenizer whose model never loads
    pub fn unavailable() -> Self {
        Self {
            available: false,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Number of counting requests received
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TokenCounter for MockTokenCounter {
    async fn count(&self, text: &str, model_id: &str) -> Result<usize, TokenizerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.available {
            return Err(TokenizerError::Unavailable(format!(
                "model files for {} not found",
                model_id
            )));
        }
        Ok(text.split_whitespace().count())
    }
}
