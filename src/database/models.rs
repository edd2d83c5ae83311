/*!
 * Database entity models and DTOs.
 *
 * These structures map directly to database tables and provide
 * type-safe access to persisted data.
 */

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::quality::QualityCheck;

fn now() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Novel record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NovelRecord {
    /// Unique novel identifier (UUID)
    pub id: String,
    pub title: String,
    /// Source language tag
    pub source_language: String,
    /// Target language tag
    pub target_language: String,
    /// Per-novel system prompt, blank means default
    pub system_prompt: String,
    /// Where the raw chapters come from
    pub source_url: String,
    /// Per-novel task template, blank means default
    pub translation_template: String,
    /// Number of stored chapters
    pub chapter_count: i64,
    /// Position in the novel list
    pub sort_order: i64,
    /// Creation timestamp (RFC 3339)
    pub created_at: String,
    /// Last update timestamp (RFC 3339)
    pub updated_at: String,
}

impl NovelRecord {
    /// Create a new novel record with a fresh id
    pub fn new(title: &str, source_language: &str, target_language: &str) -> Self {
        let now = now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            title: title.to_string(),
            source_language: source_language.to_string(),
            target_language: target_language.to_string(),
            system_prompt: String::new(),
            source_url: String::new(),
            translation_template: String::new(),
            chapter_count: 0,
            sort_order: 0,
            created_at: now.clone(),
            updated_at: now,
        }
    }

    pub fn with_system_prompt(mut self, prompt: &str) -> Self {
        self.system_prompt = prompt.to_string();
        self
    }

    pub fn with_translation_template(mut self, template: &str) -> Self {
        self.translation_template = template.to_string();
        self
    }

    pub fn with_source_url(mut self, url: &str) -> Self {
        self.source_url = url.to_string();
        self
    }
}

/// Reference material attached to a novel (glossary, character sheet, ...)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceRecord {
    pub id: String,
    pub novel_id: String,
    pub title: String,
    pub content: String,
    /// Cached token count of the wrapped reference, if measured
    pub token_count: Option<i64>,
    pub created_at: String,
    pub updated_at: String,
}

impl ReferenceRecord {
    /// Create a new reference record with a fresh id
    pub fn new(novel_id: &str, title: &str, content: &str) -> Self {
        let now = now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            novel_id: novel_id.to_string(),
            title: title.to_string(),
            content: content.to_string(),
            token_count: None,
            created_at: now.clone(),
            updated_at: now,
        }
    }
}

/// Chapter record with its current quality check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterRecord {
    pub id: String,
    pub novel_id: String,
    /// Natural key within the novel, starts at 1
    pub number: i64,
    pub title: String,
    pub source_text: String,
    /// Empty until translated
    pub translated_text: String,
    pub created_at: String,
    pub updated_at: String,
    pub quality_check: Option<QualityCheck>,
}

impl ChapterRecord {
    /// Create an untranslated chapter record with a fresh id
    pub fn new(novel_id: &str, number: i64, title: &str, source_text: &str) -> Self {
        let now = now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            novel_id: novel_id.to_string(),
            number,
            title: title.to_string(),
            source_text: source_text.to_string(),
            translated_text: String::new(),
            created_at: now.clone(),
            updated_at: now,
            quality_check: None,
        }
    }

    /// Whether the chapter carries a non-blank translation
    pub fn is_translated(&self) -> bool {
        !self.translated_text.trim().is_empty()
    }
}

/// Immutable snapshot of a chapter taken before it was overwritten
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterRevisionRecord {
    /// Monotonic database ID
    pub id: i64,
    pub chapter_id: String,
    pub source_text: String,
    pub translated_text: String,
    pub created_at: String,
}

/// Content to store for a chapter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterDraft {
    pub number: i64,
    pub title: String,
    pub source_text: String,
    pub translated_text: String,
    /// Replaces the stored check when present, otherwise the old one is kept
    /// unless `replace_quality_check` is set
    pub quality_check: Option<QualityCheck>,
    /// Drop the stored check even when `quality_check` is `None`
    #[serde(default)]
    pub replace_quality_check: bool,
}

impl ChapterDraft {
    pub fn new(number: i64, title: &str, source_text: &str, translated_text: &str) -> Self {
        Self {
            number,
            title: title.to_string(),
            source_text: source_text.to_string(),
            translated_text: translated_text.to_string(),
            quality_check: None,
            replace_quality_check: false,
        }
    }

    pub fn with_quality_check(mut self, check: Option<QualityCheck>) -> Self {
        self.quality_check = check;
        self
    }

    /// Store `check` as the chapter's only verdict, clearing the old one when `None`
    pub fn replacing_quality_check(mut self, check: Option<QualityCheck>) -> Self {
        self.quality_check = check;
        self.replace_quality_check = true;
        self
    }
}

/// Result of a save
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveOutcome {
    /// Chapter as stored after the save
    pub chapter: ChapterRecord,
    /// True when the chapter did not exist before
    pub created: bool,
    /// Revision holding the previous content, for overwrites
    pub revision_id: Option<i64>,
}

/// Inclusive range of chapter numbers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterRange {
    pub start: i64,
    pub end: i64,
}

impl ChapterRange {
    /// Clamp requested bounds to `[1, last_number]`
    ///
    /// `last_number` is the highest stored chapter number, which exceeds the
    /// chapter count when numbering has gaps. Missing bounds default to the
    /// first and last chapter. Bounds given in reverse order are swapped.
    /// Returns `None` for a novel without chapters.
    pub fn clamp(start: Option<i64>, end: Option<i64>, last_number: i64) -> Option<Self> {
        if last_number < 1 {
            return None;
        }
        let start = start.unwrap_or(1).clamp(1, last_number);
        let end = end.unwrap_or(last_number).clamp(1, last_number);
        let (start, end) = if start > end { (end, start) } else { (start, end) };
        Some(Self { start, end })
    }

    pub fn contains(&self, number: i64) -> bool {
        (self.start..=self.end).contains(&number)
    }

    pub fn len(&self) -> usize {
        (self.end - self.start + 1).max(0) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Display for ChapterRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}
