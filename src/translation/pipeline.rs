/*!
 * Chapter translation pipeline.
 *
 * One chapter flows through four steps:
 * 1. **Plan**: fetch the latest finished chapters and assemble a request that fits the budget
 * 2. **Translate**: send the request to the LLM client
 * 3. **Review**: run the quality feedback loop (never fails)
 * 4. **Persist**: save the chapter, keeping the previous content as a revision
 *
 * The cancellation flag is checked before every step. An in-flight LLM call
 * is never interrupted; the pipeline stops at the next step boundary.
 */

use log::{debug, error, info, warn};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crate::context::{AssembledContext, TranslationRequest, TranslationRequestBuilder};
use crate::database::{ChapterDraft, ChapterRepository, NovelRecord, ReferenceRecord, SaveOutcome};
use crate::errors::{ProviderError, TranslationError};
use crate::providers::{LlmClient, TokenUsage};
use crate::quality::QualityFeedbackLoop;

/// Shared cancellation switch
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// `Err(Cancelled)` once cancelled
    pub fn check(&self) -> Result<(), TranslationError> {
        if self.is_cancelled() {
            Err(TranslationError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// A chapter waiting to be translated
#[derive(Debug, Clone)]
pub struct ChapterJob {
    pub novel: NovelRecord,
    pub references: Vec<ReferenceRecord>,
    pub number: i64,
    pub title: String,
    pub source_text: String,
}

impl ChapterJob {
    pub fn new(novel: &NovelRecord, number: i64, title: &str, source_text: &str) -> Self {
        Self {
            novel: novel.clone(),
            references: Vec::new(),
            number,
            title: title.to_string(),
            source_text: source_text.to_string(),
        }
    }

    pub fn with_references(mut self, references: Vec<ReferenceRecord>) -> Self {
        self.references = references;
        self
    }
}

/// Result of one translated chapter
#[derive(Debug, Clone)]
pub struct ChapterOutcome {
    pub save: SaveOutcome,
    /// Request that was sent
    pub context: AssembledContext,
    pub usage: TokenUsage,
    pub duration: Duration,
}

/// Per-chapter results of a batch run, in job order
#[derive(Debug, Default)]
pub struct BatchReport {
    pub results: Vec<(i64, Result<ChapterOutcome, TranslationError>)>,
}

impl BatchReport {
    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|(_, r)| r.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.results
            .iter()
            .filter(|(_, r)| matches!(r, Err(e) if !matches!(e, TranslationError::Cancelled)))
            .count()
    }

    pub fn cancelled(&self) -> usize {
        self.results
            .iter()
            .filter(|(_, r)| matches!(r, Err(TranslationError::Cancelled)))
            .count()
    }

    /// Total tokens spent by the successful chapters
    pub fn usage(&self) -> TokenUsage {
        self.results
            .iter()
            .filter_map(|(_, r)| r.as_ref().ok())
            .fold(TokenUsage::default(), |mut acc, outcome| {
                acc.prompt_tokens += outcome.usage.prompt_tokens;
                acc.completion_tokens += outcome.usage.completion_tokens;
                acc
            })
    }

    pub fn summary(&self) -> String {
        format!(
            "{} translated, {} failed, {} cancelled, {} tokens",
            self.succeeded(),
            self.failed(),
            self.cancelled(),
            self.usage().total()
        )
    }
}

/// Runs chapters through plan, translate, review and persist
pub struct ChapterPipeline {
    repository: Arc<dyn ChapterRepository>,
    builder: TranslationRequestBuilder,
    client: Arc<dyn LlmClient>,
    quality: QualityFeedbackLoop,
    cancellation: CancellationFlag,
    /// How many finished chapters are fetched as context
    context_chapters: usize,
}

impl ChapterPipeline {
    pub fn new(
        repository: Arc<dyn ChapterRepository>,
        builder: TranslationRequestBuilder,
        client: Arc<dyn LlmClient>,
        quality: QualityFeedbackLoop,
    ) -> Self {
        Self {
            repository,
            builder,
            client,
            quality,
            cancellation: CancellationFlag::new(),
            context_chapters: 10,
        }
    }

    pub fn with_cancellation(mut self, cancellation: CancellationFlag) -> Self {
        self.cancellation = cancellation;
        self
    }

    pub fn with_context_chapters(mut self, context_chapters: usize) -> Self {
        self.context_chapters = context_chapters;
        self
    }

    pub fn cancellation(&self) -> &CancellationFlag {
        &self.cancellation
    }

    /// Assemble the request for a chapter without sending it
    pub async fn plan(&self, job: &ChapterJob) -> Result<AssembledContext, TranslationError> {
        if job.source_text.trim().is_empty() {
            return Err(TranslationError::InvalidInput(format!(
                "chapter {} has no source text",
                job.number
            )));
        }

        let prior_chapters = self
            .repository
            .recent_chapters(&job.novel.id, job.number, self.context_chapters)
            .await
            .map_err(TranslationError::repository)?;
        debug!(
            "Chapter {}: {} prior chapters available as context",
            job.number,
            prior_chapters.len()
        );

        let request = TranslationRequest::for_novel(&job.novel, &job.source_text)
            .with_references(job.references.clone())
            .with_prior_chapters(prior_chapters);

        self.builder.build(&request).await
    }

    /// Translate, review and store one chapter
    pub async fn translate_chapter(&self, job: &ChapterJob) -> Result<ChapterOutcome, TranslationError> {
        let start_time = Instant::now();

        self.cancellation.check()?;
        let context = self.plan(job).await?;
        if context.was_truncated() {
            info!(
                "Chapter {}: dropped {} context units to fit {} tokens",
                job.number,
                context.dropped.len(),
                context.budget
            );
        }

        self.cancellation.check()?;
        let response = self.client.send(&context.messages).await?;
        if response.translation.trim().is_empty() {
            warn!("Chapter {}: the model returned an empty translation", job.number);
            return Err(TranslationError::TranslationFailed(ProviderError::EmptyResponse));
        }

        self.cancellation.check()?;
        let quality_check = self
            .quality
            .evaluate(
                &job.source_text,
                &response.translation,
                &job.novel.source_language,
                &job.novel.target_language,
            )
            .await;

        self.cancellation.check()?;
        let draft = ChapterDraft::new(job.number, &job.title, &job.source_text, &response.translation)
            .replacing_quality_check(quality_check);
        let save = self
            .repository
            .save_chapter(&job.novel.id, draft)
            .await
            .map_err(TranslationError::repository)?;

        let duration = start_time.elapsed();
        info!(
            "Chapter {} of '{}' translated in {:.2}s ({} prompt + {} completion tokens)",
            job.number,
            job.novel.title,
            duration.as_secs_f32(),
            response.usage.prompt_tokens,
            response.usage.completion_tokens
        );

        Ok(ChapterOutcome {
            save,
            context,
            usage: response.usage,
            duration,
        })
    }

    /// Translate chapters one after another
    ///
    /// A failed chapter does not stop the batch. Once cancelled, every
    /// remaining chapter is reported as `Cancelled`.
    pub async fn translate_batch(&self, jobs: Vec<ChapterJob>) -> BatchReport {
        let mut report = BatchReport::default();

        for job in jobs {
            let result = match self.cancellation.check() {
                Ok(()) => self.translate_chapter(&job).await,
                Err(e) => Err(e),
            };
            match &result {
                Ok(_) => {}
                Err(TranslationError::Cancelled) => {
                    debug!("Chapter {} skipped after cancellation", job.number);
                }
                Err(e) => error!("Chapter {} failed: {}", job.number, e),
            }
            report.results.push((job.number, result));
        }

        info!("Batch finished: {}", report.summary());
        report
    }
}
