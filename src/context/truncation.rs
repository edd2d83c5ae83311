/*!
 * Token budget truncation for assembled translation requests.
 *
 * Truncation is driven by a policy table of `(section, priority, granularity)`
 * rows. Pinned sections (system prompt, task) are never touched; droppable
 * sections lose whole units from their front, lowest priority first, until the
 * request fits. Because units are dropped whole, a reference or a prior
 * chapter's user/assistant pair is either fully present or fully absent.
 */

use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::context::section::{ContextUnit, Message, Section, SectionKind, SectionTokens};
use crate::errors::TranslationError;
use crate::tokenizer::TokenizerAdapter;

/// How a section may be reduced under budget pressure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DropGranularity {
    /// Never reduced; overflow is a hard failure
    Pinned,
    /// Whole units removed from the front of the section (oldest or least relevant first)
    WholeUnit,
}

/// One row of the truncation policy table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionPolicy {
    pub kind: SectionKind,
    /// Higher values are more important and dropped later
    pub priority: u8,
    pub granularity: DropGranularity,
}

impl SectionPolicy {
    pub const fn new(kind: SectionKind, priority: u8, granularity: DropGranularity) -> Self {
        Self {
            kind,
            priority,
            granularity,
        }
    }

    pub fn is_pinned(&self) -> bool {
        self.granularity == DropGranularity::Pinned
    }
}

/// Narrative importance of each section, most important first
pub const DEFAULT_POLICIES: [SectionPolicy; 4] = [
    SectionPolicy::new(SectionKind::Task, 3, DropGranularity::Pinned),
    SectionPolicy::new(SectionKind::System, 2, DropGranularity::Pinned),
    SectionPolicy::new(SectionKind::References, 1, DropGranularity::WholeUnit),
    SectionPolicy::new(SectionKind::PriorContext, 0, DropGranularity::WholeUnit),
];

/// A unit removed to satisfy the budget
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DroppedUnit {
    pub section: SectionKind,
    pub label: String,
    pub tokens: usize,
}

/// Final, budget-fitting request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssembledContext {
    /// Messages in conversation order
    pub messages: Vec<Message>,
    /// Tokens per section after truncation
    pub section_tokens: SectionTokens,
    /// Tokens of the returned messages
    pub total_tokens: usize,
    /// Tokens of the input before truncation
    pub requested_tokens: usize,
    /// Budget the request was fitted into
    pub budget: usize,
    /// Units removed, in drop order
    pub dropped: Vec<DroppedUnit>,
}

impl AssembledContext {
    pub fn was_truncated(&self) -> bool {
        !self.dropped.is_empty()
    }

    /// Unused budget
    pub fn headroom(&self) -> usize {
        self.budget.saturating_sub(self.total_tokens)
    }
}

#[derive(Debug)]
struct MeasuredUnit {
    unit: ContextUnit,
    tokens: usize,
}

#[derive(Debug)]
struct MeasuredSection {
    kind: SectionKind,
    units: VecDeque<MeasuredUnit>,
}

impl MeasuredSection {
    fn tokens(&self) -> usize {
        self.units.iter().map(|u| u.tokens).sum()
    }
}

/// Fits sections into a token budget according to a policy table
#[derive(Debug, Clone)]
pub struct TruncationEngine {
    tokenizer: TokenizerAdapter,
    policies: Vec<SectionPolicy>,
}

impl TruncationEngine {
    /// Create an engine with the default policy table
    pub fn new(tokenizer: TokenizerAdapter) -> Self {
        Self::with_policies(tokenizer, DEFAULT_POLICIES.to_vec())
    }

    /// Create an engine with a custom policy table
    pub fn with_policies(tokenizer: TokenizerAdapter, policies: Vec<SectionPolicy>) -> Self {
        Self {
            tokenizer,
            policies,
        }
    }

    pub fn tokenizer(&self) -> &TokenizerAdapter {
        &self.tokenizer
    }

    pub fn policies(&self) -> &[SectionPolicy] {
        &self.policies
    }

    /// Policy for a section kind; kinds missing from the table are pinned
    pub fn policy_for(&self, kind: SectionKind) -> SectionPolicy {
        self.policies
            .iter()
            .copied()
            .find(|p| p.kind == kind)
            .unwrap_or(SectionPolicy::new(kind, u8::MAX, DropGranularity::Pinned))
    }

    /// Fit `sections` into `budget` tokens
    ///
    /// Sections keep their input order in the output. Fails with
    /// `BudgetExceeded` when the pinned sections alone are larger than the
    /// budget.
    pub async fn fit(
        &self,
        sections: Vec<Section>,
        budget: usize,
    ) -> Result<AssembledContext, TranslationError> {
        let mut measured = self.measure(sections).await;

        let pinned_tokens: usize = measured
            .iter()
            .filter(|s| self.policy_for(s.kind).is_pinned())
            .map(MeasuredSection::tokens)
            .sum();
        if pinned_tokens > budget {
            return Err(TranslationError::BudgetExceeded {
                required: pinned_tokens,
                budget,
            });
        }

        let requested_tokens: usize = measured.iter().map(MeasuredSection::tokens).sum();
        let mut total = requested_tokens;
        let mut dropped = Vec::new();

        if total > budget {
            let mut drop_order: Vec<usize> = (0..measured.len())
                .filter(|&i| !self.policy_for(measured[i].kind).is_pinned())
                .collect();
            drop_order.sort_by_key(|&i| self.policy_for(measured[i].kind).priority);

            for index in drop_order {
                let section = &mut measured[index];
                while total > budget {
                    let Some(victim) = section.units.pop_front() else {
                        break;
                    };
                    total -= victim.tokens;
                    debug!(
                        "Dropped {} from {} ({} tokens, {} remaining of {})",
                        victim.unit.label, section.kind, victim.tokens, total, budget
                    );
                    dropped.push(DroppedUnit {
                        section: section.kind,
                        label: victim.unit.label,
                        tokens: victim.tokens,
                    });
                }
                if total <= budget {
                    break;
                }
            }

            info!(
                "Context truncated from {} to {} tokens (budget {}, {} units dropped)",
                requested_tokens,
                total,
                budget,
                dropped.len()
            );
        }

        let mut section_tokens = SectionTokens::default();
        let mut messages = Vec::new();
        for section in measured {
            section_tokens.add(section.kind, section.tokens());
            for measured_unit in section.units {
                messages.extend(measured_unit.unit.messages);
            }
        }

        Ok(AssembledContext {
            messages,
            section_tokens,
            total_tokens: total,
            requested_tokens,
            budget,
            dropped,
        })
    }

    async fn measure(&self, sections: Vec<Section>) -> Vec<MeasuredSection> {
        let mut measured = Vec::with_capacity(sections.len());
        for section in sections {
            let mut units = VecDeque::with_capacity(section.units.len());
            for unit in section.units {
                let mut tokens = 0;
                for message in &unit.messages {
                    tokens += self.tokenizer.count(&message.content).await;
                }
                units.push_back(MeasuredUnit { unit, tokens });
            }
            measured.push(MeasuredSection {
                kind: section.kind,
                units,
            });
        }
        measured
    }
}
