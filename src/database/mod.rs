/*!
 * Database module for persistent storage of novels and chapters.
 *
 * This module provides SQLite-based persistence for:
 * - Novels and their reference materials
 * - Chapters with their latest quality check
 * - Immutable revision history of every chapter overwrite
 */

use anyhow::Result;
use async_trait::async_trait;

pub mod schema;
pub mod connection;
pub mod repository;
pub mod models;

pub use connection::{DatabaseConnection, DatabaseStats};
pub use models::{
    ChapterDraft, ChapterRange, ChapterRecord, ChapterRevisionRecord, NovelRecord, ReferenceRecord,
    SaveOutcome,
};
pub use repository::Repository;

/// Chapter storage used by the translation pipeline
#[async_trait]
pub trait ChapterRepository: Send + Sync {
    /// Chapter by its number within a novel
    async fn get_chapter(&self, novel_id: &str, number: i64) -> Result<Option<ChapterRecord>>;

    /// Chapters in `[start, end]` ascending by number
    ///
    /// Bounds are clamped to the stored chapters and swapped when reversed.
    async fn list_chapters(
        &self,
        novel_id: &str,
        start: Option<i64>,
        end: Option<i64>,
    ) -> Result<Vec<ChapterRecord>>;

    /// Insert or overwrite a chapter, keeping the previous content as a revision
    async fn save_chapter(&self, novel_id: &str, draft: ChapterDraft) -> Result<SaveOutcome>;

    /// Delete a chapter with its revisions and quality check
    async fn delete_chapter(&self, novel_id: &str, number: i64) -> Result<bool>;

    /// Revisions of a chapter, oldest first
    async fn list_revisions(&self, novel_id: &str, number: i64) -> Result<Vec<ChapterRevisionRecord>>;

    async fn delete_revision(&self, novel_id: &str, number: i64, revision_id: i64) -> Result<bool>;

    /// Last `limit` translated chapters numbered below `before_number`, oldest first
    async fn recent_chapters(
        &self,
        novel_id: &str,
        before_number: i64,
        limit: usize,
    ) -> Result<Vec<ChapterRecord>>;

    /// Copy a revision back into its chapter
    ///
    /// The content being replaced is kept as a new revision. Returns `None`
    /// when the chapter or the revision does not exist.
    async fn restore_revision(
        &self,
        novel_id: &str,
        number: i64,
        revision_id: i64,
    ) -> Result<Option<ChapterRecord>>;
}
