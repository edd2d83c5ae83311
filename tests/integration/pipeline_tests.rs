/*!
 * End-to-end chapter translation over an in-memory SQLite repository
 */

use novellama::context::Role;
use novellama::database::{ChapterDraft, ChapterRepository, ReferenceRecord};
use novellama::errors::{ProviderError, TranslationError};
use novellama::providers::mock::{MockLlmClient, MockScorer};
use novellama::quality::{MANUAL_REVIEW_FEEDBACK, QualityCheck, QualityFeedbackLoop};
use novellama::translation::{CancellationFlag, ChapterJob, ChapterPipeline};
use std::sync::Arc;

use crate::common;

#[tokio::test]
async fn test_translateBatch_withIntermittentFailures_shouldContinueAfterFailedChapter() {
    common::init_logging();
    let (repository, novel) = common::repository_with_novel("Batch").await.unwrap();
    let client = MockLlmClient::intermittent(2);
    let pipeline = common::pipeline(&repository, client.clone(), MockScorer::fixed(8, "Good", true), 8000);

    let jobs = (1..=4)
        .map(|n| ChapterJob::new(&novel, n, &format!("Chapter {}", n), &format!("source {}", n)))
        .collect();
    let report = pipeline.translate_batch(jobs).await;

    assert_eq!(report.results.len(), 4);
    assert_eq!(report.succeeded(), 2);
    assert_eq!(report.failed(), 2);
    assert_eq!(report.cancelled(), 0);
    assert!(matches!(
        report.results[1].1,
        Err(TranslationError::TranslationFailed(ProviderError::ApiError { status_code: 503, .. }))
    ));
    assert_eq!(client.request_count(), 4);

    let stored = repository.list_chapters(&novel.id, None, None).await.unwrap();
    let numbers: Vec<i64> = stored.iter().map(|c| c.number).collect();
    assert_eq!(numbers, vec![1, 3]);
    assert!(report.usage().total() > 0);
}

#[tokio::test]
async fn test_translateChapter_withFailingScorer_shouldStillSaveWithManualReview() {
    let (repository, novel) = common::repository_with_novel("Outage").await.unwrap();
    let pipeline = common::pipeline(&repository, MockLlmClient::working(), MockScorer::failing(), 8000);

    let outcome = pipeline
        .translate_chapter(&ChapterJob::new(&novel, 1, "One", "吾輩は猫である。"))
        .await
        .unwrap();

    let check = outcome.save.chapter.quality_check.clone().unwrap();
    assert_eq!(check.score, 0);
    assert!(check.is_good_quality);
    assert_eq!(check.feedback, MANUAL_REVIEW_FEEDBACK);

    let stored = repository.get_chapter(&novel.id, 1).await.unwrap().unwrap();
    assert_eq!(stored.quality_check.unwrap().feedback, MANUAL_REVIEW_FEEDBACK);
}

#[tokio::test]
async fn test_translateChapter_shouldFeedSavedChaptersAsPriorContext() {
    let (repository, novel) = common::repository_with_novel("Context").await.unwrap();
    let client = MockLlmClient::working();
    let pipeline = common::pipeline(&repository, client.clone(), MockScorer::fixed(9, "Good", true), 8000);

    pipeline
        .translate_chapter(&ChapterJob::new(&novel, 1, "One", "first source"))
        .await
        .unwrap();
    let references = vec![ReferenceRecord::new(&novel.id, "Names", "Neko = Cat")];
    pipeline
        .translate_chapter(&ChapterJob::new(&novel, 2, "Two", "second source").with_references(references))
        .await
        .unwrap();

    let request = client.last_request().unwrap();
    let roles: Vec<Role> = request.iter().map(|m| m.role).collect();
    assert_eq!(roles, vec![Role::System, Role::System, Role::User, Role::Assistant, Role::User]);
    assert_eq!(request[2].content, "first source");
    assert!(request[3].content.starts_with("[TRANSLATED] "));
    assert!(request[4].content.ends_with("second source"));
}

#[tokio::test]
async fn test_translateChapter_twice_shouldKeepFirstTranslationAsRevision() {
    let (repository, novel) = common::repository_with_novel("Retranslate").await.unwrap();
    let pipeline = common::pipeline(&repository, MockLlmClient::working(), MockScorer::fixed(9, "Good", true), 8000);
    let job = ChapterJob::new(&novel, 1, "One", "source");

    let first = pipeline.translate_chapter(&job).await.unwrap();
    let second = pipeline.translate_chapter(&job).await.unwrap();

    assert!(first.save.created);
    assert!(!second.save.created);
    let revisions = repository.list_revisions(&novel.id, 1).await.unwrap();
    assert_eq!(revisions.len(), 1);
    assert_eq!(Some(revisions[0].id), second.save.revision_id);
    assert_eq!(revisions[0].translated_text, first.save.chapter.translated_text);
}

#[tokio::test]
async fn test_translateBatch_whenCancelledMidway_shouldReportRemainingAsCancelled() {
    let (repository, novel) = common::repository_with_novel("Cancel").await.unwrap();
    let cancellation = CancellationFlag::new();
    let pipeline = common::pipeline(&repository, MockLlmClient::working(), MockScorer::fixed(9, "Good", true), 8000)
        .with_cancellation(cancellation.clone());

    pipeline
        .translate_chapter(&ChapterJob::new(&novel, 1, "One", "source"))
        .await
        .unwrap();
    cancellation.cancel();
    let report = pipeline
        .translate_batch(vec![
            ChapterJob::new(&novel, 2, "Two", "source"),
            ChapterJob::new(&novel, 3, "Three", "source"),
        ])
        .await;

    assert_eq!(report.cancelled(), 2);
    assert_eq!(report.succeeded(), 0);
    assert_eq!(repository.list_chapters(&novel.id, None, None).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_translateChapter_whenPinnedSectionsTooLarge_shouldNotCallClient() {
    let (repository, novel) = common::repository_with_novel("Huge").await.unwrap();
    let client = MockLlmClient::working();
    let pipeline = common::pipeline(&repository, client.clone(), MockScorer::fixed(9, "Good", true), 50);

    let error = pipeline
        .translate_chapter(&ChapterJob::new(&novel, 1, "One", &common::words(200)))
        .await
        .unwrap_err();

    assert!(matches!(error, TranslationError::BudgetExceeded { budget: 50, .. }));
    assert!(error.shortfall() > 0);
    assert_eq!(client.request_count(), 0);
}

#[tokio::test]
async fn test_plan_withTightBudget_shouldDropOldestPriorChapter() {
    let (repository, novel) = common::repository_with_novel("Plan").await.unwrap();
    for number in 1..=2 {
        let draft = novellama::database::ChapterDraft::new(
            number,
            "title",
            &common::words(50),
            &common::words(50),
        );
        repository.save_chapter(&novel.id, draft).await.unwrap();
    }
    let pipeline = common::pipeline(&repository, MockLlmClient::working(), MockScorer::fixed(9, "Good", true), 220);

    let context = pipeline
        .plan(&ChapterJob::new(&novel, 3, "Three", &common::words(10)))
        .await
        .unwrap();

    assert_eq!(context.dropped.len(), 1);
    assert_eq!(context.dropped[0].label, "chapter 1");
    assert_eq!(context.section_tokens.prior_context, 100);
}

#[tokio::test]
async fn test_translateChapter_withDisabledQualityLoop_shouldClearPreviousVerdict() {
    let (repository, novel) = common::repository_with_novel("Stale").await.unwrap();
    let draft = ChapterDraft::new(1, "One", "source", "old translation")
        .with_quality_check(Some(QualityCheck::new(9, "Great", true)));
    repository.save_chapter(&novel.id, draft).await.unwrap();

    let builder = novellama::context::TranslationRequestBuilder::new(
        novellama::context::TruncationEngine::new(common::word_tokenizer()),
        8000,
    );
    let pipeline = ChapterPipeline::new(
        Arc::new(repository.clone()),
        builder,
        Arc::new(MockLlmClient::working()),
        QualityFeedbackLoop::disabled(),
    );

    let outcome = pipeline
        .translate_chapter(&ChapterJob::new(&novel, 1, "One", "source"))
        .await
        .unwrap();

    assert!(!outcome.save.created);
    assert_eq!(outcome.save.chapter.quality_check, None);
    let stored = repository.get_chapter(&novel.id, 1).await.unwrap().unwrap();
    assert_ne!(stored.translated_text, "old translation");
    assert_eq!(stored.quality_check, None);
    assert_eq!(repository.list_revisions(&novel.id, 1).await.unwrap().len(), 1);
}
