/*!
 * Tests for the tokenizer adapter
 */

use std::sync::Arc;

use novellama::providers::mock::MockTokenCounter;
use novellama::tokenizer::{TokenizerAdapter, heuristic_count};

#[tokio::test]
async fn test_count_shouldOnlyCallCounterOncePerText() {
    let counter = MockTokenCounter::words();
    let adapter = TokenizerAdapter::new(Arc::new(counter.clone()), "gpt-3.5-turbo");

    assert_eq!(adapter.count("one two three").await, 3);
    assert_eq!(adapter.count("one two three").await, 3);
    assert_eq!(adapter.count("four five").await, 2);

    assert_eq!(counter.calls(), 2);
    assert_eq!(adapter.cached_entries(), 2);
    assert_eq!(adapter.model_id(), "gpt-3.5-turbo");
}

#[tokio::test]
async fn test_clearCache_shouldForceRecount() {
    let counter = MockTokenCounter::words();
    let adapter = TokenizerAdapter::new(Arc::new(counter.clone()), "m");
    adapter.count("a b").await;

    adapter.clear_cache();
    adapter.count("a b").await;

    assert_eq!(counter.calls(), 2);
}

#[tokio::test]
async fn test_count_withUnavailableCounter_shouldDegradeWithoutCaching() {
    let adapter = TokenizerAdapter::new(Arc::new(MockTokenCounter::unavailable()), "m");
    let text = "長い文章のテスト";

    let first = adapter.count(text).await;
    let second = adapter.count(text).await;

    assert_eq!(first, heuristic_count(text));
    assert_eq!(second, first);
    assert_eq!(adapter.fallback_count(), 2);
    assert_eq!(adapter.cached_entries(), 0);
}

#[tokio::test]
async fn test_clonedAdapter_shouldShareCache() {
    let adapter = TokenizerAdapter::new(Arc::new(MockTokenCounter::words()), "m");
    let clone = adapter.clone();

    adapter.count("shared words").await;

    assert_eq!(clone.cached_entries(), 1);
}
