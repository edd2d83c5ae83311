/*!
 * Error types for the novellama library.
 *
 * This module contains custom error types for the different stages of a
 * chapter translation, using the thiserror crate for ergonomic error definitions.
 */

use thiserror::Error;

/// Errors reported by a token counter
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenizerError {
    /// The underlying tokenizer model could not be loaded
    #[error("Tokenizer unavailable: {0}")]
    Unavailable(String),
}

/// Errors that can occur when working with an LLM or scorer backend
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Error when making an API request fails
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// Error when parsing an API response fails
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Error returned by the API itself
    #[error("API responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the API
        message: String,
    },

    /// Error establishing or maintaining a connection
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Error related to rate limiting
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// Error with authentication
    #[error("Authentication error: {0}")]
    AuthenticationError(String),

    /// The backend answered but produced no usable text
    #[error("Empty response from provider")]
    EmptyResponse,
}

/// Errors that can occur while translating a chapter
#[derive(Error, Debug)]
pub enum TranslationError {
    /// The request was rejected before any I/O took place
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The tokenizer could not be used
    #[error("Tokenizer unavailable: {0}")]
    TokenizerUnavailable(String),

    /// Pinned sections alone do not fit in the token budget
    #[error("Token budget exceeded: pinned sections need {required} tokens but the budget is {budget}")]
    BudgetExceeded {
        /// Minimum number of tokens the request needs
        required: usize,
        /// Configured maximum number of input tokens
        budget: usize,
    },

    /// The LLM call failed
    #[error("Translation failed: {0}")]
    TranslationFailed(#[from] ProviderError),

    /// The quality scorer failed
    #[error("Quality check failed: {0}")]
    QualityCheckFailed(String),

    /// The storage layer failed
    #[error("Repository error: {0}")]
    Repository(String),

    /// A novel, chapter or revision does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// The caller asked the pipeline to stop before this step started
    #[error("Translation cancelled")]
    Cancelled,
}

impl TranslationError {
    /// Wrap a storage failure, keeping the whole context chain in the message
    pub fn repository(error: anyhow::Error) -> Self {
        Self::Repository(format!("{:#}", error))
    }

    /// Number of tokens missing for a budget failure, zero for other errors
    pub fn shortfall(&self) -> usize {
        match self {
            Self::BudgetExceeded { required, budget } => required.saturating_sub(*budget),
            _ => 0,
        }
    }
}

impl From<TokenizerError> for TranslationError {
    fn from(error: TokenizerError) -> Self {
        match error {
            TokenizerError::Unavailable(message) => Self::TokenizerUnavailable(message),
        }
    }
}
