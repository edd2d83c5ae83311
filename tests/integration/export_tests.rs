/*!
 * Export of stored chapters
 */

use novellama::database::{ChapterDraft, ChapterRepository};
use novellama::export::{export_novel, write_export};

use crate::common;

#[tokio::test]
async fn test_exportNovel_withReversedRange_shouldSwapBounds() {
    let (repository, novel) = common::repository_with_novel("Swap Test").await.unwrap();
    common::seed_translated_chapters(&repository, &novel.id, 10).await.unwrap();

    let export = export_novel(&repository, &novel.id, Some(5), Some(2)).await.unwrap();

    assert_eq!(export.chapter_count, 4);
    assert_eq!(export.filename, "Swap_Test.txt");
    assert!(export.content.contains("Chapters: 4\n"));
    for number in 2..=5 {
        assert!(export.content.contains(&format!("## Chapter {}: Chapter {}", number, number)));
    }
    assert!(!export.content.contains("## Chapter 1:"));
    assert!(!export.content.contains("## Chapter 6:"));
}

#[tokio::test]
async fn test_exportNovel_withoutChapters_shouldOnlyWriteHeader() {
    let (repository, novel) = common::repository_with_novel("Empty").await.unwrap();

    let export = export_novel(&repository, &novel.id, None, None).await.unwrap();

    assert_eq!(export.chapter_count, 0);
    assert_eq!(export.content, "# Novel: Empty\nSource: ja  Target: en\nChapters: 0\n");
}

#[tokio::test]
async fn test_exportNovel_withUnknownNovel_shouldFail() {
    let (repository, _novel) = common::repository_with_novel("Known").await.unwrap();

    let error = export_novel(&repository, "missing", None, None).await.unwrap_err();

    assert!(error.to_string().contains("Novel not found"));
}

#[tokio::test]
async fn test_exportNovel_thenWrite_shouldProduceReadableFile() {
    let (repository, novel) = common::repository_with_novel("On Disk").await.unwrap();
    common::seed_translated_chapters(&repository, &novel.id, 2).await.unwrap();
    let temp_dir = common::create_temp_dir().unwrap();

    let export = export_novel(&repository, &novel.id, None, None).await.unwrap();
    let path = write_export(temp_dir.path(), &export).unwrap();

    let written = std::fs::read_to_string(path).unwrap();
    assert!(written.contains("### Translation\n\ntranslation 2\n"));
}

#[tokio::test]
async fn test_exportNovel_afterDeletingMiddleChapter_shouldKeepLaterChapters() {
    let (repository, novel) = common::repository_with_novel("Gap").await.unwrap();
    common::seed_translated_chapters(&repository, &novel.id, 3).await.unwrap();
    assert!(repository.delete_chapter(&novel.id, 2).await.unwrap());

    let listed: Vec<i64> = repository
        .list_chapters(&novel.id, None, None)
        .await
        .unwrap()
        .iter()
        .map(|c| c.number)
        .collect();
    let export = export_novel(&repository, &novel.id, None, None).await.unwrap();

    assert_eq!(listed, vec![1, 3]);
    assert_eq!(export.chapter_count, 2);
    assert!(export.content.contains("## Chapter 3: Chapter 3"));
    assert!(!export.content.contains("## Chapter 2:"));
}

#[tokio::test]
async fn test_exportNovel_withChapterSavedOutOfOrder_shouldIncludeIt() {
    let (repository, novel) = common::repository_with_novel("Sparse").await.unwrap();
    repository
        .save_chapter(&novel.id, ChapterDraft::new(5, "Five", "source 5", "translation 5"))
        .await
        .unwrap();

    let export = export_novel(&repository, &novel.id, Some(1), Some(99)).await.unwrap();

    assert_eq!(export.chapter_count, 1);
    assert!(export.content.contains("## Chapter 5: Five"));
}
