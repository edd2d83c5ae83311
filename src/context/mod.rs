/*!
 * Translation request assembly.
 *
 * A request is made of four sections:
 * - `System`: the novel's system prompt, pinned
 * - `References`: glossary and background material, one unit per reference
 * - `PriorContext`: earlier chapters as user/assistant pairs, one unit per chapter
 * - `Task`: the chapter to translate, pinned
 *
 * The builder turns a novel, its references and its finished chapters into
 * sections; the truncation engine fits them into the token budget.
 */

pub mod builder;
pub mod section;
pub mod templates;
pub mod truncation;

pub use builder::{TranslationRequest, TranslationRequestBuilder};
pub use section::{ContextUnit, Message, Role, Section, SectionKind, SectionTokens};
pub use templates::PromptTemplate;
pub use truncation::{
    AssembledContext, DEFAULT_POLICIES, DropGranularity, DroppedUnit, SectionPolicy, TruncationEngine,
};
