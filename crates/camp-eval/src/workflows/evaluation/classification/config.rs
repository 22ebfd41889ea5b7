use serde::{Deserialize, Serialize};

use super::super::domain::ScoreScale;

/// Tag thresholds expressed on the 1-5 reference scale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationThresholds {
    pub high_score: f64,
    pub low_score: f64,
    pub high_spread: f64,
}

impl Default for ClassificationThresholds {
    fn default() -> Self {
        Self {
            high_score: 4.0,
            low_score: 3.5,
            high_spread: 1.0,
        }
    }
}

impl ClassificationThresholds {
    /// Projects the reference thresholds onto `scale`. Score levels move with the
    /// scale origin; the spread threshold is a distance and only stretches.
    pub fn scaled_to(&self, scale: ScoreScale) -> Self {
        Self {
            high_score: scale.rescale_level(self.high_score),
            low_score: scale.rescale_level(self.low_score),
            high_spread: scale.rescale_distance(self.high_spread),
        }
    }
}
