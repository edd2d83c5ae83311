/*!
 * Quality feedback for finished chapter translations.
 *
 * A `QualityScorer` rates a translation on a 0-10 scale. The
 * `QualityFeedbackLoop` wraps a scorer and never fails: when the scorer is
 * unreachable or returns garbage, the chapter gets a manual review marker
 * instead of blocking the save.
 */

use async_trait::async_trait;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::errors::ProviderError;

pub mod heuristic;

pub use heuristic::LengthRatioScorer;

/// Highest score a check can carry
pub const MAX_SCORE: u8 = 10;

/// Feedback stored when no real score could be obtained
pub const MANUAL_REVIEW_FEEDBACK: &str = "Quality check unavailable - manual review needed";

/// Raw answer of a scorer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityVerdict {
    pub score: u8,
    pub feedback: String,
    pub is_good_quality: bool,
}

/// Quality assessment attached to a chapter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityCheck {
    /// 0 to 10 inclusive
    pub score: u8,
    pub feedback: String,
    pub is_good_quality: bool,
    /// RFC 3339
    pub created_at: String,
}

impl QualityCheck {
    /// Create a check, clamping the score into 0..=10
    pub fn new(score: i64, feedback: &str, is_good_quality: bool) -> Self {
        Self {
            score: score.clamp(0, MAX_SCORE as i64) as u8,
            feedback: feedback.to_string(),
            is_good_quality,
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Marker used when the scorer failed
    pub fn manual_review() -> Self {
        Self::new(0, MANUAL_REVIEW_FEEDBACK, true)
    }

    /// Whether this is the failure marker rather than a genuine score of 0
    pub fn is_manual_review(&self) -> bool {
        self.score == 0 && self.is_good_quality && self.feedback == MANUAL_REVIEW_FEEDBACK
    }
}

impl From<QualityVerdict> for QualityCheck {
    fn from(verdict: QualityVerdict) -> Self {
        Self::new(verdict.score as i64, &verdict.feedback, verdict.is_good_quality)
    }
}

impl fmt::Display for QualityCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verdict = if self.is_manual_review() {
            "manual review"
        } else if self.is_good_quality {
            "good"
        } else {
            "needs work"
        };
        write!(f, "{}/{} ({}): {}", self.score, MAX_SCORE, verdict, self.feedback)
    }
}

/// Rates a translation against its source
#[async_trait]
pub trait QualityScorer: Send + Sync + fmt::Debug {
    async fn score(
        &self,
        source_content: &str,
        translated_content: &str,
        source_language: &str,
        target_language: &str,
    ) -> Result<QualityVerdict, ProviderError>;
}

/// Fail-open wrapper around a scorer
#[derive(Debug, Clone)]
pub struct QualityFeedbackLoop {
    scorer: Arc<dyn QualityScorer>,
    enabled: bool,
}

impl QualityFeedbackLoop {
    pub fn new(scorer: Arc<dyn QualityScorer>) -> Self {
        Self {
            scorer,
            enabled: true,
        }
    }

    /// A loop that never scores anything
    pub fn disabled() -> Self {
        Self {
            scorer: Arc::new(LengthRatioScorer::default()),
            enabled: false,
        }
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Score a translation; `None` when the loop is disabled
    pub async fn evaluate(
        &self,
        source_content: &str,
        translated_content: &str,
        source_language: &str,
        target_language: &str,
    ) -> Option<QualityCheck> {
        if !self.enabled {
            return None;
        }

        let check = match self
            .scorer
            .score(source_content, translated_content, source_language, target_language)
            .await
        {
            Ok(verdict) => {
                debug!("Quality verdict: {}/{} good={}", verdict.score, MAX_SCORE, verdict.is_good_quality);
                QualityCheck::from(verdict)
            }
            Err(e) => {
                warn!("Quality check failed, marking for manual review: {}", e);
                QualityCheck::manual_review()
            }
        };
        Some(check)
    }
}
