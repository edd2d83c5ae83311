/*!
 * Chapter translation orchestration.
 */

pub mod pipeline;

pub use pipeline::{BatchReport, CancellationFlag, ChapterJob, ChapterOutcome, ChapterPipeline};
