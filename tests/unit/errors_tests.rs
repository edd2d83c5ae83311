/*!
 * Tests for error types and conversions
 */

use novellama::errors::{ProviderError, TokenizerError, TranslationError};

#[test]
fn test_providerError_shouldConvertIntoTranslationFailed() {
    let error: TranslationError = ProviderError::RateLimitExceeded("slow down".to_string()).into();

    assert!(matches!(error, TranslationError::TranslationFailed(ProviderError::RateLimitExceeded(_))));
    assert_eq!(error.to_string(), "Translation failed: Rate limit exceeded: slow down");
}

#[test]
fn test_tokenizerError_shouldConvertIntoTokenizerUnavailable() {
    let error: TranslationError = TokenizerError::Unavailable("no vocab".to_string()).into();

    assert!(matches!(error, TranslationError::TokenizerUnavailable(ref reason) if reason == "no vocab"));
}

#[test]
fn test_budgetExceeded_display_shouldNameBothNumbers() {
    let error = TranslationError::BudgetExceeded {
        required: 9000,
        budget: 8000,
    };

    let message = error.to_string();
    assert!(message.contains("9000"));
    assert!(message.contains("8000"));
    assert_eq!(error.shortfall(), 1000);
}

#[test]
fn test_apiError_display_shouldIncludeStatus() {
    let error = ProviderError::ApiError {
        status_code: 429,
        message: "Too many requests".to_string(),
    };

    assert_eq!(error.to_string(), "API responded with error: 429 - Too many requests");
}
