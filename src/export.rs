/*!
 * Plain text export of a novel's chapters.
 *
 * ```text
 * # Novel: <title>
 * Source: <lang>  Target: <lang>
 * Chapters: <n>
 *
 * ## Chapter <n>: <title>
 *
 * ### Source
 *
 * <source text>
 *
 * ### Translation
 *
 * <translated text>
 * ```
 */

use anyhow::{Context, Result};
use log::info;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};

use crate::database::{ChapterRecord, ChapterRepository, NovelRecord, Repository};

/// Everything that is not an ASCII letter or digit
static UNSAFE_FILENAME_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^A-Za-z0-9]").unwrap());

/// Rendered export ready to be written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NovelExport {
    pub filename: String,
    pub content: String,
    /// Number of chapters included
    pub chapter_count: usize,
}

/// File name for a novel title
pub fn export_filename(title: &str) -> String {
    let stem = UNSAFE_FILENAME_CHARS.replace_all(title, "_");
    if stem.is_empty() {
        return "novel.txt".to_string();
    }
    format!("{}.txt", stem)
}

/// Render the header block followed by one block per chapter
pub fn render_export(novel: &NovelRecord, chapters: &[ChapterRecord]) -> String {
    let mut blocks = vec![format!(
        "# Novel: {}\nSource: {}  Target: {}\nChapters: {}",
        novel.title,
        novel.source_language,
        novel.target_language,
        chapters.len()
    )];

    for chapter in chapters {
        blocks.push(format!("## Chapter {}: {}", chapter.number, chapter.title));
        blocks.push("### Source".to_string());
        blocks.push(chapter.source_text.clone());
        blocks.push("### Translation".to_string());
        blocks.push(chapter.translated_text.clone());
    }

    let mut content = blocks.join("\n\n");
    content.push('\n');
    content
}

/// Export a chapter range of a novel
///
/// The range follows `list_chapters`: clamped to the stored chapters and
/// swapped when given in reverse.
pub async fn export_novel(
    repository: &Repository,
    novel_id: &str,
    start: Option<i64>,
    end: Option<i64>,
) -> Result<NovelExport> {
    let novel = repository
        .get_novel(novel_id)
        .await?
        .with_context(|| format!("Novel not found: {}", novel_id))?;
    let chapters = repository
        .list_chapters(novel_id, start, end)
        .await
        .with_context(|| format!("Failed to load chapters of '{}'", novel.title))?;

    Ok(NovelExport {
        filename: export_filename(&novel.title),
        content: render_export(&novel, &chapters),
        chapter_count: chapters.len(),
    })
}

/// Write an export into `dir`, returning the file path
pub fn write_export(dir: &Path, export: &NovelExport) -> Result<PathBuf> {
    fs::create_dir_all(dir).with_context(|| format!("Failed to create export directory: {:?}", dir))?;
    let path = dir.join(&export.filename);
    fs::write(&path, &export.content).with_context(|| format!("Failed to write export: {:?}", path))?;
    info!("Exported {} chapters to {:?}", export.chapter_count, path);
    Ok(path)
}
