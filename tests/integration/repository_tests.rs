/*!
 * Chapter repository behavior across revisions, restores and concurrent saves
 */

use novellama::database::{
    ChapterDraft, ChapterRepository, DatabaseConnection, NovelRecord, ReferenceRecord, Repository,
};
use novellama::quality::QualityCheck;

use crate::common;

#[tokio::test]
async fn test_successiveSaves_shouldCreateOneRevisionEachOldestFirst() {
    let (repository, novel) = common::repository_with_novel("Revisions").await.unwrap();

    for version in 1..=3 {
        let draft = ChapterDraft::new(1, "One", "source", &format!("version {}", version));
        repository.save_chapter(&novel.id, draft).await.unwrap();
    }

    let revisions = repository.list_revisions(&novel.id, 1).await.unwrap();
    let texts: Vec<&str> = revisions.iter().map(|r| r.translated_text.as_str()).collect();
    assert_eq!(texts, vec!["version 1", "version 2"]);
    assert!(revisions[0].id < revisions[1].id);

    let current = repository.get_chapter(&novel.id, 1).await.unwrap().unwrap();
    assert_eq!(current.translated_text, "version 3");
}

#[tokio::test]
async fn test_concurrentSaves_ofSameChapter_shouldSerialize() {
    let (repository, novel) = common::repository_with_novel("Concurrent").await.unwrap();

    let (first, second) = tokio::join!(
        repository.save_chapter(&novel.id, ChapterDraft::new(1, "One", "source", "left")),
        repository.save_chapter(&novel.id, ChapterDraft::new(1, "One", "source", "right")),
    );
    let first = first.unwrap();
    let second = second.unwrap();

    assert_ne!(first.created, second.created);
    let revisions = repository.list_revisions(&novel.id, 1).await.unwrap();
    assert_eq!(revisions.len(), 1);

    let current = repository.get_chapter(&novel.id, 1).await.unwrap().unwrap();
    let overwritten = if first.created { &second } else { &first };
    assert_eq!(current.translated_text, overwritten.chapter.translated_text);
    assert_ne!(revisions[0].translated_text, current.translated_text);
    assert_eq!(repository.get_novel(&novel.id).await.unwrap().unwrap().chapter_count, 1);
}

#[tokio::test]
async fn test_restoreThenDeleteChapter_shouldLeaveNothingBehind() {
    let (repository, novel) = common::repository_with_novel("Restore").await.unwrap();
    repository
        .save_chapter(
            &novel.id,
            ChapterDraft::new(1, "One", "source", "draft")
                .with_quality_check(Some(QualityCheck::new(4, "Stiff", false))),
        )
        .await
        .unwrap();
    let overwrite = repository
        .save_chapter(&novel.id, ChapterDraft::new(1, "One", "source", "polished"))
        .await
        .unwrap();
    let revision_id = overwrite.revision_id.unwrap();

    let restored = repository
        .restore_revision(&novel.id, 1, revision_id)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(restored.translated_text, "draft");
    assert!(restored.quality_check.is_none());
    let revisions = repository.list_revisions(&novel.id, 1).await.unwrap();
    assert_eq!(revisions.len(), 2);
    assert_eq!(revisions[1].translated_text, "polished");

    assert!(repository.delete_chapter(&novel.id, 1).await.unwrap());
    assert!(repository.get_chapter(&novel.id, 1).await.unwrap().is_none());
    assert!(repository.list_revisions(&novel.id, 1).await.unwrap().is_empty());
    assert!(repository.restore_revision(&novel.id, 1, revision_id).await.unwrap().is_none());
    assert!(!repository.delete_chapter(&novel.id, 1).await.unwrap());
}

#[tokio::test]
async fn test_recentChapters_shouldRespectLimitAndSkipUntranslated() {
    let (repository, novel) = common::repository_with_novel("Recent").await.unwrap();
    common::seed_translated_chapters(&repository, &novel.id, 5).await.unwrap();
    repository
        .save_chapter(&novel.id, ChapterDraft::new(6, "Six", "source 6", ""))
        .await
        .unwrap();

    let recent = repository.recent_chapters(&novel.id, 7, 3).await.unwrap();

    let numbers: Vec<i64> = recent.iter().map(|c| c.number).collect();
    assert_eq!(numbers, vec![3, 4, 5]);
    assert!(repository.recent_chapters(&novel.id, 7, 0).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_fileDatabase_shouldPersistAcrossConnections() {
    let temp_dir = common::create_temp_dir().unwrap();
    let path = temp_dir.path().join("novellama.db");

    let novel_id = {
        let repository = Repository::new(DatabaseConnection::open(Some(path.as_path())).unwrap());
        let novel = repository
            .create_novel(&NovelRecord::new("Persisted", "ko", "en"))
            .await
            .unwrap();
        repository
            .add_reference(&ReferenceRecord::new(&novel.id, "Glossary", "Hyung = brother"))
            .await
            .unwrap();
        common::seed_translated_chapters(&repository, &novel.id, 2).await.unwrap();
        novel.id
    };

    let repository = Repository::new(DatabaseConnection::open(Some(path.as_path())).unwrap());
    let chapters = repository.list_chapters(&novel_id, None, None).await.unwrap();
    assert_eq!(chapters.len(), 2);
    assert_eq!(repository.list_references(&novel_id).await.unwrap().len(), 1);

    let stats = repository.stats().await.unwrap();
    assert_eq!(stats.novel_count, 1);
    assert_eq!(stats.chapter_count, 2);
    assert_eq!(stats.translated_chapters, 2);
    assert_eq!(stats.reference_count, 1);
    assert!(stats.file_size_bytes > 0);
}
