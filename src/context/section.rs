/*!
 * Messages and the sections they are grouped into.
 */

use serde::{Deserialize, Serialize};
use std::fmt;

/// Role of a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::System => write!(f, "system"),
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

/// A single chat message, the atomic unit that gets measured
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// Logical section of an assembled translation request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionKind {
    /// System prompt
    System,
    /// Reference materials
    References,
    /// Previously translated chapters
    PriorContext,
    /// The chapter to translate
    Task,
}

impl SectionKind {
    /// All kinds in conversation order
    pub const ALL: [SectionKind; 4] = [
        SectionKind::System,
        SectionKind::References,
        SectionKind::PriorContext,
        SectionKind::Task,
    ];
}

impl fmt::Display for SectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SectionKind::System => write!(f, "system"),
            SectionKind::References => write!(f, "references"),
            SectionKind::PriorContext => write!(f, "prior_context"),
            SectionKind::Task => write!(f, "task"),
        }
    }
}

/// Smallest droppable piece of a section
///
/// A reference is one unit of one message; a prior chapter is one unit
/// holding its user/assistant pair, so the pair is always kept or dropped
/// together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextUnit {
    /// Label used in logs and drop reports ("chapter 12", "reference 2")
    pub label: String,
    pub messages: Vec<Message>,
}

impl ContextUnit {
    pub fn new(label: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            label: label.into(),
            messages,
        }
    }

    /// Unit made of a single message
    pub fn single(label: impl Into<String>, message: Message) -> Self {
        Self::new(label, vec![message])
    }
}

/// Ordered group of units sharing a truncation policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub kind: SectionKind,
    pub units: Vec<ContextUnit>,
}

impl Section {
    pub fn new(kind: SectionKind, units: Vec<ContextUnit>) -> Self {
        Self { kind, units }
    }

    pub fn empty(kind: SectionKind) -> Self {
        Self::new(kind, Vec::new())
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Number of messages across all units
    pub fn message_count(&self) -> usize {
        self.units.iter().map(|u| u.messages.len()).sum()
    }
}

/// Token counts per section
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionTokens {
    pub system: usize,
    pub references: usize,
    pub prior_context: usize,
    pub task: usize,
}

impl SectionTokens {
    pub fn get(&self, kind: SectionKind) -> usize {
        match kind {
            SectionKind::System => self.system,
            SectionKind::References => self.references,
            SectionKind::PriorContext => self.prior_context,
            SectionKind::Task => self.task,
        }
    }

    pub fn add(&mut self, kind: SectionKind, tokens: usize) {
        let slot = match kind {
            SectionKind::System => &mut self.system,
            SectionKind::References => &mut self.references,
            SectionKind::PriorContext => &mut self.prior_context,
            SectionKind::Task => &mut self.task,
        };
        *slot += tokens;
    }

    pub fn total(&self) -> usize {
        self.system + self.references + self.prior_context + self.task
    }
}

impl fmt::Display for SectionTokens {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "system: {}, references: {}, prior_context: {}, task: {}, total: {}",
            self.system,
            self.references,
            self.prior_context,
            self.task,
            self.total()
        )
    }
}
