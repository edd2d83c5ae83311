/*!
 * Prompt templates for chapter translation.
 *
 * Templates use `{source_language}`, `{target_language}` and
 * `{source_content}` placeholders. Language tags are rendered through
 * `language_utils::display_name`, so "ja" becomes "Japanese".
 */

use crate::language_utils::display_name;
use crate::database::models::ReferenceRecord;

/// Placeholder for the source language name
pub const SOURCE_LANGUAGE: &str = "{source_language}";
/// Placeholder for the target language name
pub const TARGET_LANGUAGE: &str = "{target_language}";
/// Placeholder for the chapter text
pub const SOURCE_CONTENT: &str = "{source_content}";

/// System prompt used when a novel has none configured
pub const DEFAULT_SYSTEM_PROMPT: &str =
    "You are a professional translator. Translate the given text into the target language.";

/// Task template used when a novel has none configured
pub const DEFAULT_TRANSLATION_TEMPLATE: &str = "Translate the following {source_language} text into {target_language}. \
Keep names, tone and paragraph breaks consistent with the previous chapters and output only the translation.

{source_content}";

/// Line appended to the system prompt when reference materials are attached
pub const REFERENCE_NOTICE: &str = "Reference materials are provided below. Use them for names, terminology and background, but never mention or quote them in your output.";

/// Template with language and content placeholders
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    template: String,
}

impl PromptTemplate {
    /// Create a new prompt template.
    pub fn new(template: &str) -> Self {
        Self {
            template: template.to_string(),
        }
    }

    /// Default task template.
    pub fn translation_task() -> Self {
        Self::new(DEFAULT_TRANSLATION_TEMPLATE)
    }

    /// Use `template` unless it is missing or blank.
    pub fn or_default(template: Option<&str>, default: &str) -> Self {
        match template {
            Some(t) if !t.trim().is_empty() => Self::new(t),
            _ => Self::new(default),
        }
    }

    /// Raw template text
    pub fn as_str(&self) -> &str {
        &self.template
    }

    /// Whether the template has a slot for the chapter text
    pub fn has_content_slot(&self) -> bool {
        self.template.contains(SOURCE_CONTENT)
    }

    /// Render the language placeholders only.
    pub fn render_languages(&self, source_language: &str, target_language: &str) -> String {
        self.template
            .replace(SOURCE_LANGUAGE, &display_name(source_language))
            .replace(TARGET_LANGUAGE, &display_name(target_language))
    }

    /// Render every placeholder.
    ///
    /// A template without a content slot gets the source text appended after
    /// a blank line so the chapter is never silently left out.
    pub fn render(&self, source_language: &str, target_language: &str, source_content: &str) -> String {
        let rendered = self.render_languages(source_language, target_language);
        if self.has_content_slot() {
            rendered.replace(SOURCE_CONTENT, source_content)
        } else {
            format!("{}\n\n{}", rendered.trim_end(), source_content)
        }
    }
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self::translation_task()
    }
}

/// Wrap a reference in boundary markers
pub fn wrap_reference(index: usize, reference: &ReferenceRecord) -> String {
    format!(
        "--- Reference {index}: {title} ---\n{content}\n--- End of Reference {index} ---",
        index = index,
        title = reference.title.trim(),
        content = reference.content.trim(),
    )
}
