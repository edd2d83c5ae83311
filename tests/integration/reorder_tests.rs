/*!
 * Novel reordering through the single consumer queue
 */

use std::sync::Arc;

use novellama::database::{NovelRecord, Repository};
use novellama::errors::TranslationError;
use novellama::reorder::ReorderQueue;

async fn repository_with_novels(titles: &[&str]) -> (Repository, Vec<String>) {
    let repository = Repository::new_in_memory().unwrap();
    let mut ids = Vec::new();
    for title in titles {
        let novel = repository.create_novel(&NovelRecord::new(title, "ja", "en")).await.unwrap();
        ids.push(novel.id);
    }
    (repository, ids)
}

async fn titles(repository: &Repository) -> Vec<String> {
    repository
        .list_novels()
        .await
        .unwrap()
        .into_iter()
        .map(|n| n.title)
        .collect()
}

#[tokio::test]
async fn test_queuedReorders_shouldLeaveLastSubmissionInPlace() {
    let (repository, ids) = repository_with_novels(&["A", "B", "C"]).await;
    let queue = ReorderQueue::start(Arc::new(repository.clone()));

    let tickets = vec![
        queue.enqueue(vec![ids[2].clone(), ids[1].clone(), ids[0].clone()]).await.unwrap(),
        queue.enqueue(vec![ids[1].clone(), ids[0].clone(), ids[2].clone()]).await.unwrap(),
        queue.enqueue(vec![ids[0].clone(), ids[2].clone(), ids[1].clone()]).await.unwrap(),
    ];
    for ticket in tickets {
        ticket.wait().await.unwrap();
    }

    assert_eq!(titles(&repository).await, vec!["A", "C", "B"]);
}

#[tokio::test]
async fn test_reorder_withUnknownNovel_shouldKeepPreviousOrder() {
    let (repository, ids) = repository_with_novels(&["A", "B"]).await;
    let queue = ReorderQueue::start(Arc::new(repository.clone()));

    let error = queue
        .submit(vec![ids[1].clone(), "no-such-novel".to_string()])
        .await
        .unwrap_err();

    assert!(matches!(error, TranslationError::Repository(_)));
    assert_eq!(titles(&repository).await, vec!["A", "B"]);

    queue.submit(vec![ids[1].clone(), ids[0].clone()]).await.unwrap();
    assert_eq!(titles(&repository).await, vec!["B", "A"]);
}

#[tokio::test]
async fn test_shutdown_shouldRejectLaterSubmissions() {
    let (repository, ids) = repository_with_novels(&["A"]).await;
    let queue = ReorderQueue::start(Arc::new(repository));
    let handle = queue.clone();

    queue.shutdown().await;

    assert!(handle.is_stopped());
    assert!(matches!(handle.submit(ids).await, Err(TranslationError::Cancelled)));
}
