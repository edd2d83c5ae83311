/*!
 * Offline scorer based on the translated/source length ratio.
 */

use async_trait::async_trait;

use crate::errors::ProviderError;
use crate::quality::{MAX_SCORE, QualityScorer, QualityVerdict};

/// Scores translations by how far their length strays from the source
#[derive(Debug, Clone)]
pub struct LengthRatioScorer {
    /// Minimum translated/source character ratio
    pub min_length_ratio: f32,
    /// Maximum translated/source character ratio
    pub max_length_ratio: f32,
    /// Lowest score still considered good
    pub min_good_score: u8,
}

impl Default for LengthRatioScorer {
    fn default() -> Self {
        Self {
            min_length_ratio: 0.3,
            max_length_ratio: 1.5,
            min_good_score: 7,
        }
    }
}

impl LengthRatioScorer {
    pub fn new(min_good_score: u8) -> Self {
        Self {
            min_good_score,
            ..Default::default()
        }
    }

    pub fn with_bounds(mut self, min_length_ratio: f32, max_length_ratio: f32) -> Self {
        self.min_length_ratio = min_length_ratio;
        self.max_length_ratio = max_length_ratio;
        self
    }

    /// Score for a ratio, 10 inside the bounds
    pub fn score_ratio(&self, ratio: f32) -> u8 {
        let penalty = if ratio > self.max_length_ratio {
            ((ratio - self.max_length_ratio) / self.max_length_ratio).min(1.0)
        } else if ratio < self.min_length_ratio {
            ((self.min_length_ratio - ratio) / self.min_length_ratio).min(1.0)
        } else {
            0.0
        };
        ((1.0 - penalty) * MAX_SCORE as f32).round() as u8
    }

    fn feedback(&self, ratio: f32) -> String {
        if ratio > self.max_length_ratio {
            format!(
                "Translation is {:.2}x the source length, above the expected maximum of {:.2}; check for additions or repeated passages",
                ratio, self.max_length_ratio
            )
        } else if ratio < self.min_length_ratio {
            format!(
                "Translation is {:.2}x the source length, below the expected minimum of {:.2}; check for omitted passages",
                ratio, self.min_length_ratio
            )
        } else {
            format!(
                "Length ratio {:.2} within expected bounds ({:.2}-{:.2})",
                ratio, self.min_length_ratio, self.max_length_ratio
            )
        }
    }
}

#[async_trait]
impl QualityScorer for LengthRatioScorer {
    async fn score(
        &self,
        source_content: &str,
        translated_content: &str,
        _source_language: &str,
        _target_language: &str,
    ) -> Result<QualityVerdict, ProviderError> {
        let translated_chars = translated_content.trim().chars().count();
        if translated_chars == 0 {
            return Ok(QualityVerdict {
                score: 0,
                feedback: "Translation is empty".to_string(),
                is_good_quality: false,
            });
        }

        let source_chars = source_content.trim().chars().count().max(1);
        let ratio = translated_chars as f32 / source_chars as f32;
        let score = self.score_ratio(ratio);

        Ok(QualityVerdict {
            score,
            feedback: self.feedback(ratio),
            is_good_quality: score >= self.min_good_score,
        })
    }
}
