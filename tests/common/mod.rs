/*!
 * Common test utilities for the novellama test suite
 */

use std::path::{Path, PathBuf};
use std::fs;
use std::sync::Arc;
use anyhow::Result;
use tempfile::TempDir;

use novellama::context::{TranslationRequestBuilder, TruncationEngine};
use novellama::database::{ChapterDraft, ChapterRepository, NovelRecord, Repository};
use novellama::providers::mock::{MockLlmClient, MockScorer, MockTokenCounter};
use novellama::quality::QualityFeedbackLoop;
use novellama::tokenizer::TokenizerAdapter;
use novellama::translation::ChapterPipeline;

/// Creates a temporary directory for test files
pub fn create_temp_dir() -> Result<TempDir> {
    Ok(TempDir::new()?)
}

/// Creates a test file with the given content in the specified directory
pub fn create_test_file(dir: &Path, filename: &str, content: &str) -> Result<PathBuf> {
    let file_path = dir.join(filename);
    fs::write(&file_path, content)?;
    Ok(file_path)
}

/// `n` whitespace separated words, `n` tokens for the word counter
pub fn words(n: usize) -> String {
    vec!["w"; n].join(" ")
}

/// Adapter counting one token per word
pub fn word_tokenizer() -> TokenizerAdapter {
    TokenizerAdapter::new(Arc::new(MockTokenCounter::words()), "mock-model")
}

/// In-memory repository holding one Japanese to English novel
pub async fn repository_with_novel(title: &str) -> Result<(Repository, NovelRecord)> {
    let repository = Repository::new_in_memory()?;
    let novel = repository.create_novel(&NovelRecord::new(title, "ja", "en")).await?;
    Ok((repository, novel))
}

/// Store chapters `1..=count` with a translation each
pub async fn seed_translated_chapters(repository: &Repository, novel_id: &str, count: i64) -> Result<()> {
    for number in 1..=count {
        let draft = ChapterDraft::new(
            number,
            &format!("Chapter {}", number),
            &format!("source {}", number),
            &format!("translation {}", number),
        );
        repository.save_chapter(novel_id, draft).await?;
    }
    Ok(())
}

/// Pipeline over `repository` using word counting and a fixed scorer
pub fn pipeline(
    repository: &Repository,
    client: MockLlmClient,
    scorer: MockScorer,
    max_input_tokens: usize,
) -> ChapterPipeline {
    let builder = TranslationRequestBuilder::new(TruncationEngine::new(word_tokenizer()), max_input_tokens);
    ChapterPipeline::new(
        Arc::new(repository.clone()),
        builder,
        Arc::new(client),
        QualityFeedbackLoop::new(Arc::new(scorer)),
    )
}

/// Route library logs to the test output
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
