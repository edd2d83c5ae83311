/*!
 * Interfaces to the external services a chapter translation talks to.
 *
 * The concrete network clients live outside this crate. The translation
 * pipeline only sees these traits:
 * - `LlmClient`: sends an assembled message list and returns the translation
 * - `QualityScorer` (in `crate::quality`): grades a finished translation
 * - `TokenCounter` (in `crate::tokenizer`): counts tokens for budgeting
 *
 * `mock` provides deterministic implementations of all three for tests and
 * dry runs.
 */

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

use crate::context::Message;
use crate::errors::ProviderError;

/// Token usage reported by the LLM for one call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Tokens consumed by the prompt
    pub prompt_tokens: u64,
    /// Tokens generated for the answer
    pub completion_tokens: u64,
}

impl TokenUsage {
    /// Prompt plus completion tokens
    pub fn total(&self) -> u64 {
        self.prompt_tokens + self.completion_tokens
    }
}

/// Result of a successful LLM call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmResponse {
    /// Translated text
    pub translation: String,
    /// Token usage for billing and debugging
    pub usage: TokenUsage,
}

/// Common trait for all LLM backends
///
/// Implementations must be usable from several pipelines at once.
#[async_trait]
pub trait LlmClient: Send + Sync + Debug {
    /// Send the final, budget-fitting message list
    ///
    /// # Arguments
    /// * `messages` - The assembled conversation, system messages first
    ///
    /// # Returns
    /// * `Result<LlmResponse, ProviderError>` - The translation or an error
    async fn send(&self, messages: &[Message]) -> Result<LlmResponse, ProviderError>;

    /// Identifier of the model behind this client, used for token counting
    fn model_id(&self) -> &str;
}

pub mod mock;
