/*!
 * Assembly of the message sequence for one chapter translation.
 */

use log::debug;

use crate::context::section::{ContextUnit, Message, Section, SectionKind};
use crate::context::templates::{
    DEFAULT_SYSTEM_PROMPT, DEFAULT_TRANSLATION_TEMPLATE, PromptTemplate, REFERENCE_NOTICE,
    wrap_reference,
};
use crate::context::truncation::{AssembledContext, TruncationEngine};
use crate::database::models::{ChapterRecord, NovelRecord, ReferenceRecord};
use crate::errors::TranslationError;

/// Everything needed to translate one chapter
#[derive(Debug, Clone, Default)]
pub struct TranslationRequest {
    pub source_text: String,
    pub source_language: String,
    pub target_language: String,
    pub system_prompt: Option<String>,
    pub references: Vec<ReferenceRecord>,
    /// Already translated chapters, oldest first
    pub prior_chapters: Vec<ChapterRecord>,
    pub template: Option<String>,
}

impl TranslationRequest {
    pub fn new(source_text: &str, source_language: &str, target_language: &str) -> Self {
        Self {
            source_text: source_text.to_string(),
            source_language: source_language.to_string(),
            target_language: target_language.to_string(),
            ..Default::default()
        }
    }

    /// Request using a novel's languages, system prompt and template
    pub fn for_novel(novel: &NovelRecord, source_text: &str) -> Self {
        Self {
            system_prompt: Some(novel.system_prompt.clone()),
            template: Some(novel.translation_template.clone()),
            ..Self::new(source_text, &novel.source_language, &novel.target_language)
        }
    }

    pub fn with_system_prompt(mut self, prompt: &str) -> Self {
        self.system_prompt = Some(prompt.to_string());
        self
    }

    pub fn with_references(mut self, references: Vec<ReferenceRecord>) -> Self {
        self.references = references;
        self
    }

    pub fn with_prior_chapters(mut self, chapters: Vec<ChapterRecord>) -> Self {
        self.prior_chapters = chapters;
        self
    }

    pub fn with_template(mut self, template: &str) -> Self {
        self.template = Some(template.to_string());
        self
    }
}

/// Renders requests into sections and fits them into the input budget
#[derive(Debug, Clone)]
pub struct TranslationRequestBuilder {
    engine: TruncationEngine,
    max_input_tokens: usize,
    /// Newest prior chapters kept before budgeting, 0 keeps all
    max_context_chapters: usize,
}

impl TranslationRequestBuilder {
    pub fn new(engine: TruncationEngine, max_input_tokens: usize) -> Self {
        Self {
            engine,
            max_input_tokens,
            max_context_chapters: 0,
        }
    }

    pub fn with_max_context_chapters(mut self, max_context_chapters: usize) -> Self {
        self.max_context_chapters = max_context_chapters;
        self
    }

    pub fn max_input_tokens(&self) -> usize {
        self.max_input_tokens
    }

    pub fn engine(&self) -> &TruncationEngine {
        &self.engine
    }

    /// Render the four sections in conversation order
    pub fn sections(&self, request: &TranslationRequest) -> Result<Vec<Section>, TranslationError> {
        if request.source_text.trim().is_empty() {
            return Err(TranslationError::InvalidInput(
                "source text is empty".to_string(),
            ));
        }

        Ok(vec![
            self.system_section(request),
            self.reference_section(&request.references),
            self.prior_context_section(&request.prior_chapters),
            self.task_section(request),
        ])
    }

    /// Build the final, budget-fitting message list
    pub async fn build(&self, request: &TranslationRequest) -> Result<AssembledContext, TranslationError> {
        let sections = self.sections(request)?;
        let assembled = self.engine.fit(sections, self.max_input_tokens).await?;
        debug!("Assembled request: {}", assembled.section_tokens);
        Ok(assembled)
    }

    fn system_section(&self, request: &TranslationRequest) -> Section {
        let template = PromptTemplate::or_default(request.system_prompt.as_deref(), DEFAULT_SYSTEM_PROMPT);
        let mut prompt = template
            .render_languages(&request.source_language, &request.target_language)
            .trim()
            .to_string();
        if !request.references.is_empty() {
            prompt.push_str("\n\n");
            prompt.push_str(REFERENCE_NOTICE);
        }
        Section::new(
            SectionKind::System,
            vec![ContextUnit::single("system prompt", Message::system(prompt))],
        )
    }

    fn reference_section(&self, references: &[ReferenceRecord]) -> Section {
        let units = references
            .iter()
            .enumerate()
            .map(|(i, reference)| {
                ContextUnit::single(
                    format!("reference {} ({})", i + 1, reference.title),
                    Message::system(wrap_reference(i + 1, reference)),
                )
            })
            .collect();
        Section::new(SectionKind::References, units)
    }

    fn prior_context_section(&self, chapters: &[ChapterRecord]) -> Section {
        let finished: Vec<&ChapterRecord> = chapters
            .iter()
            .filter(|c| !c.translated_text.trim().is_empty())
            .collect();

        let skip = if self.max_context_chapters > 0 {
            finished.len().saturating_sub(self.max_context_chapters)
        } else {
            0
        };
        if skip > 0 {
            debug!("Keeping the newest {} of {} prior chapters", self.max_context_chapters, finished.len());
        }

        let units = finished
            .into_iter()
            .skip(skip)
            .map(|chapter| {
                ContextUnit::new(
                    format!("chapter {}", chapter.number),
                    vec![
                        Message::user(chapter.source_text.clone()),
                        Message::assistant(chapter.translated_text.clone()),
                    ],
                )
            })
            .collect();
        Section::new(SectionKind::PriorContext, units)
    }

    fn task_section(&self, request: &TranslationRequest) -> Section {
        let template = PromptTemplate::or_default(request.template.as_deref(), DEFAULT_TRANSLATION_TEMPLATE);
        let task = template.render(&request.source_language, &request.target_language, &request.source_text);
        Section::new(
            SectionKind::Task,
            vec![ContextUnit::single("task", Message::user(task))],
        )
    }
}
