/*!
 * # novellama - chapter-by-chapter novel translation with LLMs
 *
 * A Rust library that keeps long novel translations consistent by feeding
 * the model the novel's references and its previously translated chapters,
 * trimmed to fit the model's token budget.
 *
 * ## Features
 *
 * - Context truncation with pinned sections and whole-unit dropping
 * - Reference materials and prior chapters as context
 * - Quality feedback loop that never blocks a save
 * - SQLite chapter repository with an immutable revision history
 * - Ordered novel reordering through a single consumer queue
 * - Plain text export of chapter ranges
 * - ISO 639-1 and ISO 639-2 language code support
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `app_config`: Configuration management
 * - `tokenizer`: Token counting with a cached, degrading adapter
 * - `context`: Request sections, templates, the builder and the truncation engine
 * - `quality`: Quality verdicts, scorers and the feedback loop
 * - `database`: SQLite persistence of novels, references, chapters and revisions
 * - `translation`: The chapter pipeline (plan, translate, review, persist)
 * - `reorder`: Ordered application of novel list reorderings
 * - `export`: Plain text export
 * - `language_utils`: ISO language code utilities
 * - `providers`: LLM client seam and mock implementations
 * - `errors`: Custom error types for the application
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Global lints configuration
// These lints will be allowed but not auto-fixed
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod context;
pub mod database;
pub mod errors;
pub mod export;
pub mod language_utils;
pub mod providers;
pub mod quality;
pub mod reorder;
pub mod tokenizer;
pub mod translation;

// Re-export main types for easier usage
pub use app_config::Config;
pub use context::{AssembledContext, Message, Role, TranslationRequest, TranslationRequestBuilder, TruncationEngine};
pub use database::{ChapterRecord, ChapterRepository, NovelRecord, ReferenceRecord, Repository};
pub use errors::{ProviderError, TokenizerError, TranslationError};
pub use language_utils::{get_language_name, language_codes_match, normalize_to_part2t};
pub use quality::{QualityCheck, QualityFeedbackLoop, QualityScorer};
pub use reorder::ReorderQueue;
pub use tokenizer::{TokenCounter, TokenizerAdapter};
pub use translation::{ChapterJob, ChapterPipeline};
