/*!
 * Repository layer for database operations.
 *
 * This module provides a high-level API for all database operations,
 * abstracting away the SQL details and providing type-safe access.
 */

use anyhow::{Context, Result};
use async_trait::async_trait;
use log::{debug, info};
use rusqlite::{params, Connection, OptionalExtension};

use super::connection::{DatabaseConnection, DatabaseStats};
use super::models::{
    ChapterDraft, ChapterRange, ChapterRecord, ChapterRevisionRecord, NovelRecord, ReferenceRecord,
    SaveOutcome,
};
use super::ChapterRepository;
use crate::quality::QualityCheck;

const NOVEL_COLUMNS: &str = r#"
    id, title, source_language, target_language, system_prompt, source_url,
    translation_template, chapter_count, sort_order, created_at, updated_at
"#;

const CHAPTER_SELECT: &str = r#"
    SELECT c.id, c.novel_id, c.number, c.title, c.source_text, c.translated_text,
           c.created_at, c.updated_at,
           q.score, q.feedback, q.is_good_quality, q.created_at
    FROM chapters c
    LEFT JOIN quality_checks q ON q.chapter_id = c.id
"#;

const REFERENCE_COLUMNS: &str =
    "id, novel_id, title, content, token_count, created_at, updated_at";

fn now() -> String {
    chrono::Utc::now().to_rfc3339()
}

fn parse_novel_row(row: &rusqlite::Row) -> rusqlite::Result<NovelRecord> {
    Ok(NovelRecord {
        id: row.get(0)?,
        title: row.get(1)?,
        source_language: row.get(2)?,
        target_language: row.get(3)?,
        system_prompt: row.get(4)?,
        source_url: row.get(5)?,
        translation_template: row.get(6)?,
        chapter_count: row.get(7)?,
        sort_order: row.get(8)?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}

fn parse_chapter_row(row: &rusqlite::Row) -> rusqlite::Result<ChapterRecord> {
    let quality_check = match row.get::<_, Option<i64>>(8)? {
        Some(score) => Some(QualityCheck {
            score: score.clamp(0, 10) as u8,
            feedback: row.get(9)?,
            is_good_quality: row.get(10)?,
            created_at: row.get(11)?,
        }),
        None => None,
    };

    Ok(ChapterRecord {
        id: row.get(0)?,
        novel_id: row.get(1)?,
        number: row.get(2)?,
        title: row.get(3)?,
        source_text: row.get(4)?,
        translated_text: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
        quality_check,
    })
}

fn parse_revision_row(row: &rusqlite::Row) -> rusqlite::Result<ChapterRevisionRecord> {
    Ok(ChapterRevisionRecord {
        id: row.get(0)?,
        chapter_id: row.get(1)?,
        source_text: row.get(2)?,
        translated_text: row.get(3)?,
        created_at: row.get(4)?,
    })
}

fn parse_reference_row(row: &rusqlite::Row) -> rusqlite::Result<ReferenceRecord> {
    Ok(ReferenceRecord {
        id: row.get(0)?,
        novel_id: row.get(1)?,
        title: row.get(2)?,
        content: row.get(3)?,
        token_count: row.get(4)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

/// SQLite-backed store for novels, references, chapters and revisions
#[derive(Clone)]
pub struct Repository {
    /// Database connection
    db: DatabaseConnection,
}

impl Repository {
    /// Create a new repository with the given database connection
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Create a repository with the default database location
    pub fn new_default() -> Result<Self> {
        let db = DatabaseConnection::new_default()?;
        Ok(Self::new(db))
    }

    /// Create a repository with an in-memory database (for testing)
    pub fn new_in_memory() -> Result<Self> {
        let db = DatabaseConnection::new_in_memory()?;
        Ok(Self::new(db))
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }

    // =========================================================================
    // Novel Operations
    // =========================================================================

    /// Store a new novel at the end of the novel list
    pub async fn create_novel(&self, novel: &NovelRecord) -> Result<NovelRecord> {
        let novel = novel.clone();

        self.db
            .transaction_async(move |tx| {
                let sort_order: i64 = tx.query_row(
                    "SELECT COALESCE(MAX(sort_order) + 1, 0) FROM novels",
                    [],
                    |row| row.get(0),
                )?;
                tx.execute(
                    r#"
                    INSERT INTO novels (
                        id, title, source_language, target_language, system_prompt, source_url,
                        translation_template, chapter_count, sort_order, created_at, updated_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 0, ?8, ?9, ?10)
                    "#,
                    params![
                        novel.id,
                        novel.title,
                        novel.source_language,
                        novel.target_language,
                        novel.system_prompt,
                        novel.source_url,
                        novel.translation_template,
                        sort_order,
                        novel.created_at,
                        novel.updated_at,
                    ],
                )
                .with_context(|| format!("Failed to create novel '{}'", novel.title))?;

                info!("Created novel '{}' ({})", novel.title, novel.id);
                Ok(NovelRecord {
                    chapter_count: 0,
                    sort_order,
                    ..novel
                })
            })
            .await
    }

    /// Get a novel by ID
    pub async fn get_novel(&self, novel_id: &str) -> Result<Option<NovelRecord>> {
        let novel_id = novel_id.to_string();

        self.db
            .execute_async(move |conn| Self::get_novel_sync(conn, &novel_id))
            .await
    }

    /// Get a novel by ID (synchronous version for use within transactions)
    fn get_novel_sync(conn: &Connection, novel_id: &str) -> Result<Option<NovelRecord>> {
        let sql = format!("SELECT {} FROM novels WHERE id = ?1", NOVEL_COLUMNS);
        let result = conn
            .query_row(&sql, [novel_id], parse_novel_row)
            .optional()?;
        Ok(result)
    }

    /// All novels in list order
    pub async fn list_novels(&self) -> Result<Vec<NovelRecord>> {
        self.db
            .execute_async(|conn| {
                let sql = format!(
                    "SELECT {} FROM novels ORDER BY sort_order, created_at",
                    NOVEL_COLUMNS
                );
                let mut stmt = conn.prepare(&sql)?;
                let novels = stmt
                    .query_map([], parse_novel_row)?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                Ok(novels)
            })
            .await
    }

    /// Update the editable fields of a novel
    pub async fn update_novel(&self, novel: &NovelRecord) -> Result<bool> {
        let novel = novel.clone();
        let now = now();

        self.db
            .execute_async(move |conn| {
                let updated = conn.execute(
                    r#"
                    UPDATE novels
                    SET title = ?2, source_language = ?3, target_language = ?4,
                        system_prompt = ?5, source_url = ?6, translation_template = ?7,
                        updated_at = ?8
                    WHERE id = ?1
                    "#,
                    params![
                        novel.id,
                        novel.title,
                        novel.source_language,
                        novel.target_language,
                        novel.system_prompt,
                        novel.source_url,
                        novel.translation_template,
                        now,
                    ],
                )?;
                Ok(updated > 0)
            })
            .await
    }

    /// Delete a novel with everything it owns
    pub async fn delete_novel(&self, novel_id: &str) -> Result<bool> {
        let novel_id = novel_id.to_string();

        self.db
            .execute_async(move |conn| {
                let deleted = conn.execute("DELETE FROM novels WHERE id = ?1", [&novel_id])?;
                if deleted > 0 {
                    info!("Deleted novel {}", novel_id);
                }
                Ok(deleted > 0)
            })
            .await
    }

    /// Rewrite the novel list order in one transaction
    ///
    /// `novel_ids[i]` gets position `i`. An unknown id fails the whole batch.
    pub async fn apply_novel_order(&self, novel_ids: Vec<String>) -> Result<()> {
        let now = now();

        self.db
            .transaction_async(move |tx| {
                for (position, novel_id) in novel_ids.iter().enumerate() {
                    let updated = tx.execute(
                        "UPDATE novels SET sort_order = ?2, updated_at = ?3 WHERE id = ?1",
                        params![novel_id, position as i64, now],
                    )?;
                    if updated == 0 {
                        return Err(anyhow::anyhow!("Novel not found: {}", novel_id));
                    }
                }
                debug!("Applied order for {} novels", novel_ids.len());
                Ok(())
            })
            .await
    }

    // =========================================================================
    // Reference Operations
    // =========================================================================

    /// Attach a reference to its novel
    pub async fn add_reference(&self, reference: &ReferenceRecord) -> Result<()> {
        let reference = reference.clone();

        self.db
            .execute_async(move |conn| {
                conn.execute(
                    &format!(
                        "INSERT INTO novel_references ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                        REFERENCE_COLUMNS
                    ),
                    params![
                        reference.id,
                        reference.novel_id,
                        reference.title,
                        reference.content,
                        reference.token_count,
                        reference.created_at,
                        reference.updated_at,
                    ],
                )
                .with_context(|| {
                    format!("Failed to add reference '{}' to novel {}", reference.title, reference.novel_id)
                })?;
                Ok(())
            })
            .await
    }

    /// References of a novel in insertion order
    pub async fn list_references(&self, novel_id: &str) -> Result<Vec<ReferenceRecord>> {
        let novel_id = novel_id.to_string();

        self.db
            .execute_async(move |conn| {
                let sql = format!(
                    "SELECT {} FROM novel_references WHERE novel_id = ?1 ORDER BY created_at, rowid",
                    REFERENCE_COLUMNS
                );
                let mut stmt = conn.prepare(&sql)?;
                let references = stmt
                    .query_map([&novel_id], parse_reference_row)?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                Ok(references)
            })
            .await
    }

    /// Cache the measured token count of a reference
    pub async fn update_reference_token_count(&self, reference_id: &str, token_count: i64) -> Result<bool> {
        let reference_id = reference_id.to_string();
        let now = now();

        self.db
            .execute_async(move |conn| {
                let updated = conn.execute(
                    "UPDATE novel_references SET token_count = ?2, updated_at = ?3 WHERE id = ?1",
                    params![reference_id, token_count, now],
                )?;
                Ok(updated > 0)
            })
            .await
    }

    pub async fn delete_reference(&self, reference_id: &str) -> Result<bool> {
        let reference_id = reference_id.to_string();

        self.db
            .execute_async(move |conn| {
                let deleted = conn.execute("DELETE FROM novel_references WHERE id = ?1", [&reference_id])?;
                Ok(deleted > 0)
            })
            .await
    }

    // =========================================================================
    // Chapter Operations (synchronous helpers for use within transactions)
    // =========================================================================

    fn get_chapter_sync(conn: &Connection, novel_id: &str, number: i64) -> Result<Option<ChapterRecord>> {
        let sql = format!("{} WHERE c.novel_id = ?1 AND c.number = ?2", CHAPTER_SELECT);
        let result = conn
            .query_row(&sql, params![novel_id, number], parse_chapter_row)
            .optional()?;
        Ok(result)
    }

    fn insert_revision_sync(conn: &Connection, chapter: &ChapterRecord, created_at: &str) -> Result<i64> {
        conn.execute(
            r#"
            INSERT INTO chapter_revisions (chapter_id, source_text, translated_text, created_at)
            VALUES (?1, ?2, ?3, ?4)
            "#,
            params![chapter.id, chapter.source_text, chapter.translated_text, created_at],
        )?;
        Ok(conn.last_insert_rowid())
    }

    fn upsert_quality_check_sync(conn: &Connection, chapter_id: &str, check: &QualityCheck) -> Result<()> {
        conn.execute(
            r#"
            INSERT INTO quality_checks (chapter_id, score, feedback, is_good_quality, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(chapter_id) DO UPDATE SET
                score = excluded.score,
                feedback = excluded.feedback,
                is_good_quality = excluded.is_good_quality,
                created_at = excluded.created_at
            "#,
            params![
                chapter_id,
                check.score.min(10) as i64,
                check.feedback,
                check.is_good_quality,
                check.created_at,
            ],
        )?;
        Ok(())
    }

    fn refresh_chapter_count_sync(conn: &Connection, novel_id: &str, updated_at: &str) -> Result<()> {
        conn.execute(
            r#"
            UPDATE novels
            SET chapter_count = (SELECT COUNT(*) FROM chapters WHERE novel_id = ?1),
                updated_at = ?2
            WHERE id = ?1
            "#,
            params![novel_id, updated_at],
        )?;
        Ok(())
    }

    fn save_chapter_sync(conn: &Connection, novel_id: &str, draft: &ChapterDraft) -> Result<SaveOutcome> {
        if draft.number < 1 {
            return Err(anyhow::anyhow!("Chapter number must be at least 1, got {}", draft.number));
        }
        if Self::get_novel_sync(conn, novel_id)?.is_none() {
            return Err(anyhow::anyhow!("Novel not found: {}", novel_id));
        }

        let now = now();
        let existing = Self::get_chapter_sync(conn, novel_id, draft.number)?;

        let (chapter_id, revision_id) = match &existing {
            Some(previous) => {
                let revision_id = Self::insert_revision_sync(conn, previous, &now)?;
                conn.execute(
                    r#"
                    UPDATE chapters
                    SET title = ?2, source_text = ?3, translated_text = ?4, updated_at = ?5
                    WHERE id = ?1
                    "#,
                    params![previous.id, draft.title, draft.source_text, draft.translated_text, now],
                )?;
                debug!(
                    "Chapter {} of novel {} overwritten, previous content kept as revision {}",
                    draft.number, novel_id, revision_id
                );
                (previous.id.clone(), Some(revision_id))
            }
            None => {
                let chapter_id = uuid::Uuid::new_v4().to_string();
                conn.execute(
                    r#"
                    INSERT INTO chapters (
                        id, novel_id, number, title, source_text, translated_text, created_at, updated_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)
                    "#,
                    params![
                        chapter_id,
                        novel_id,
                        draft.number,
                        draft.title,
                        draft.source_text,
                        draft.translated_text,
                        now,
                    ],
                )?;
                (chapter_id, None)
            }
        };

        match &draft.quality_check {
            Some(check) => Self::upsert_quality_check_sync(conn, &chapter_id, check)?,
            None if draft.replace_quality_check => {
                conn.execute("DELETE FROM quality_checks WHERE chapter_id = ?1", [&chapter_id])?;
            }
            None => {}
        }
        Self::refresh_chapter_count_sync(conn, novel_id, &now)?;

        let chapter = Self::get_chapter_sync(conn, novel_id, draft.number)?
            .ok_or_else(|| anyhow::anyhow!("Chapter {} vanished during save", draft.number))?;

        Ok(SaveOutcome {
            chapter,
            created: existing.is_none(),
            revision_id,
        })
    }

    fn restore_revision_sync(
        conn: &Connection,
        novel_id: &str,
        number: i64,
        revision_id: i64,
    ) -> Result<Option<ChapterRecord>> {
        let Some(current) = Self::get_chapter_sync(conn, novel_id, number)? else {
            return Ok(None);
        };
        let revision = conn
            .query_row(
                r#"
                SELECT id, chapter_id, source_text, translated_text, created_at
                FROM chapter_revisions WHERE id = ?1 AND chapter_id = ?2
                "#,
                params![revision_id, current.id],
                parse_revision_row,
            )
            .optional()?;
        let Some(revision) = revision else {
            return Ok(None);
        };

        let now = now();
        Self::insert_revision_sync(conn, &current, &now)?;
        conn.execute(
            "UPDATE chapters SET source_text = ?2, translated_text = ?3, updated_at = ?4 WHERE id = ?1",
            params![current.id, revision.source_text, revision.translated_text, now],
        )?;
        // The stored verdict rated the content being replaced
        conn.execute("DELETE FROM quality_checks WHERE chapter_id = ?1", [&current.id])?;

        info!("Restored chapter {} of novel {} from revision {}", number, novel_id, revision_id);
        Self::get_chapter_sync(conn, novel_id, number)
    }

    // =========================================================================
    // Statistics
    // =========================================================================

    /// Row counts and file size
    pub async fn stats(&self) -> Result<DatabaseStats> {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || db.stats())
            .await
            .context("Database stats task panicked")?
    }
}

#[async_trait]
impl ChapterRepository for Repository {
    async fn get_chapter(&self, novel_id: &str, number: i64) -> Result<Option<ChapterRecord>> {
        let novel_id = novel_id.to_string();

        self.db
            .execute_async(move |conn| Self::get_chapter_sync(conn, &novel_id, number))
            .await
    }

    async fn list_chapters(
        &self,
        novel_id: &str,
        start: Option<i64>,
        end: Option<i64>,
    ) -> Result<Vec<ChapterRecord>> {
        let novel_id = novel_id.to_string();

        self.db
            .execute_async(move |conn| {
                let last_number: Option<i64> = conn.query_row(
                    "SELECT MAX(number) FROM chapters WHERE novel_id = ?1",
                    [&novel_id],
                    |row| row.get(0),
                )?;
                let Some(range) = ChapterRange::clamp(start, end, last_number.unwrap_or(0)) else {
                    return Ok(Vec::new());
                };

                let sql = format!(
                    "{} WHERE c.novel_id = ?1 AND c.number BETWEEN ?2 AND ?3 ORDER BY c.number",
                    CHAPTER_SELECT
                );
                let mut stmt = conn.prepare(&sql)?;
                let chapters = stmt
                    .query_map(params![novel_id, range.start, range.end], parse_chapter_row)?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                Ok(chapters)
            })
            .await
    }

    async fn save_chapter(&self, novel_id: &str, draft: ChapterDraft) -> Result<SaveOutcome> {
        let novel_id = novel_id.to_string();

        self.db
            .transaction_async(move |tx| Self::save_chapter_sync(tx, &novel_id, &draft))
            .await
    }

    async fn delete_chapter(&self, novel_id: &str, number: i64) -> Result<bool> {
        let novel_id = novel_id.to_string();

        self.db
            .transaction_async(move |tx| {
                let deleted = tx.execute(
                    "DELETE FROM chapters WHERE novel_id = ?1 AND number = ?2",
                    params![novel_id, number],
                )?;
                if deleted > 0 {
                    Self::refresh_chapter_count_sync(tx, &novel_id, &now())?;
                    info!("Deleted chapter {} of novel {}", number, novel_id);
                }
                Ok(deleted > 0)
            })
            .await
    }

    async fn list_revisions(&self, novel_id: &str, number: i64) -> Result<Vec<ChapterRevisionRecord>> {
        let novel_id = novel_id.to_string();

        self.db
            .execute_async(move |conn| {
                let mut stmt = conn.prepare(
                    r#"
                    SELECT r.id, r.chapter_id, r.source_text, r.translated_text, r.created_at
                    FROM chapter_revisions r
                    JOIN chapters c ON c.id = r.chapter_id
                    WHERE c.novel_id = ?1 AND c.number = ?2
                    ORDER BY r.created_at, r.id
                    "#,
                )?;
                let revisions = stmt
                    .query_map(params![novel_id, number], parse_revision_row)?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                Ok(revisions)
            })
            .await
    }

    async fn delete_revision(&self, novel_id: &str, number: i64, revision_id: i64) -> Result<bool> {
        let novel_id = novel_id.to_string();

        self.db
            .execute_async(move |conn| {
                let deleted = conn.execute(
                    r#"
                    DELETE FROM chapter_revisions
                    WHERE id = ?3
                      AND chapter_id = (SELECT id FROM chapters WHERE novel_id = ?1 AND number = ?2)
                    "#,
                    params![novel_id, number, revision_id],
                )?;
                Ok(deleted > 0)
            })
            .await
    }

    async fn recent_chapters(
        &self,
        novel_id: &str,
        before_number: i64,
        limit: usize,
    ) -> Result<Vec<ChapterRecord>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let novel_id = novel_id.to_string();

        self.db
            .execute_async(move |conn| {
                let sql = format!(
                    r#"{}
                    WHERE c.novel_id = ?1 AND c.number < ?2 AND TRIM(c.translated_text) <> ''
                    ORDER BY c.number DESC
                    LIMIT ?3"#,
                    CHAPTER_SELECT
                );
                let mut stmt = conn.prepare(&sql)?;
                let mut chapters = stmt
                    .query_map(params![novel_id, before_number, limit as i64], parse_chapter_row)?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                chapters.reverse();
                Ok(chapters)
            })
            .await
    }

    async fn restore_revision(
        &self,
        novel_id: &str,
        number: i64,
        revision_id: i64,
    ) -> Result<Option<ChapterRecord>> {
        let novel_id = novel_id.to_string();

        self.db
            .transaction_async(move |tx| Self::restore_revision_sync(tx, &novel_id, number, revision_id))
            .await
    }
}
