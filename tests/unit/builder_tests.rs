/*!
 * Tests for translation request assembly through the public API
 */

use novellama::context::templates::REFERENCE_NOTICE;
use novellama::context::{Role, SectionKind, TranslationRequest, TranslationRequestBuilder, TruncationEngine};
use novellama::database::{ChapterRecord, NovelRecord, ReferenceRecord};
use novellama::errors::TranslationError;

use crate::common::{word_tokenizer, words};

fn builder(budget: usize) -> TranslationRequestBuilder {
    TranslationRequestBuilder::new(TruncationEngine::new(word_tokenizer()), budget)
}

fn translated(novel: &NovelRecord, number: i64, source_words: usize, translated_words: usize) -> ChapterRecord {
    let mut chapter = ChapterRecord::new(&novel.id, number, &format!("Chapter {}", number), &words(source_words));
    chapter.translated_text = words(translated_words);
    chapter
}

#[tokio::test]
async fn test_forNovel_shouldUseNovelPromptAndTemplate() {
    let novel = NovelRecord::new("Tale", "zh", "en")
        .with_system_prompt("You translate {source_language} xianxia.")
        .with_translation_template("[{target_language}] {source_content}");
    let request = TranslationRequest::for_novel(&novel, "第一章");

    let assembled = builder(1000).build(&request).await.unwrap();

    assert_eq!(assembled.messages[0].content, "You translate Chinese xianxia.");
    assert_eq!(assembled.messages[1].content, "[English] 第一章");
}

#[tokio::test]
async fn test_forNovel_withBlankPrompt_shouldFallBackToDefaults() {
    let novel = NovelRecord::new("Tale", "ja", "en");
    let request = TranslationRequest::for_novel(&novel, "本文");

    let assembled = builder(1000).build(&request).await.unwrap();

    assert_eq!(assembled.messages[0].role, Role::System);
    assert!(!assembled.messages[0].content.is_empty());
    assert!(assembled.messages[1].content.ends_with("本文"));
}

#[tokio::test]
async fn test_build_underBudget_totalShouldMatchSectionSum() {
    let novel = NovelRecord::new("Tale", "ja", "en");
    let request = TranslationRequest::for_novel(&novel, &words(30))
        .with_references(vec![ReferenceRecord::new(&novel.id, "Glossary", &words(12))])
        .with_prior_chapters(vec![translated(&novel, 1, 20, 25)]);

    let assembled = builder(10_000).build(&request).await.unwrap();

    assert!(!assembled.was_truncated());
    assert_eq!(assembled.total_tokens, assembled.section_tokens.total());
    assert_eq!(assembled.section_tokens.get(SectionKind::PriorContext), 45);
    assert!(assembled.messages[0].content.ends_with(REFERENCE_NOTICE));
    assert_eq!(assembled.headroom(), 10_000 - assembled.total_tokens);
}

#[tokio::test]
async fn test_build_underPressure_shouldDropOldestChaptersBeforeReferences() {
    let novel = NovelRecord::new("Tale", "ja", "en").with_system_prompt(&words(10));
    let request = TranslationRequest::for_novel(&novel, "task")
        .with_template("{source_content}")
        .with_references(vec![ReferenceRecord::new(&novel.id, "Glossary", &words(5))])
        .with_prior_chapters(vec![
            translated(&novel, 1, 50, 50),
            translated(&novel, 2, 50, 50),
            translated(&novel, 3, 50, 50),
        ]);

    let assembled = builder(200).build(&request).await.unwrap();

    let labels: Vec<&str> = assembled.dropped.iter().map(|d| d.label.as_str()).collect();
    assert_eq!(labels, vec!["chapter 1", "chapter 2"]);
    assert_eq!(assembled.section_tokens.prior_context, 100);
    assert!(assembled.section_tokens.references > 0);
    assert!(assembled.total_tokens <= 200);
}

#[tokio::test]
async fn test_build_withOversizedTask_shouldReportShortfall() {
    let request = TranslationRequest::new(&words(500), "ja", "en").with_template("{source_content}");

    let error = builder(100).build(&request).await.unwrap_err();

    assert!(matches!(error, TranslationError::BudgetExceeded { budget: 100, .. }));
    assert!(error.shortfall() > 400);
}

#[test]
fn test_sections_shouldFollowConversationOrder() {
    let request = TranslationRequest::new("text", "ja", "en");

    let sections = builder(100).sections(&request).unwrap();
    let kinds: Vec<SectionKind> = sections.iter().map(|s| s.kind).collect();

    assert_eq!(
        kinds,
        vec![SectionKind::System, SectionKind::References, SectionKind::PriorContext, SectionKind::Task]
    );
    assert!(sections[1].is_empty());
}
