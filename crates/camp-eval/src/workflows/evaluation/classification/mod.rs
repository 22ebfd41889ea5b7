mod config;
mod policy;
mod trend;

pub use config::ClassificationThresholds;
pub use trend::TREND_TOLERANCE;

use std::fmt;

use serde::{Deserialize, Serialize};

use super::aggregation::{one_decimal, one_decimal_opt, CriterionAggregate, PlayerAggregate};
use super::domain::{CriterionId, EventId, PlayerId, ScoreScale};
use policy::decide_tag;

/// Roster-decision label derived from one event's aggregates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tag {
    None,
    Cemented,
    Watch,
    Overvalued,
}

impl Tag {
    pub const ALL: [Tag; 4] = [Tag::None, Tag::Cemented, Tag::Watch, Tag::Overvalued];

    pub const fn label(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Cemented => "cemented",
            Self::Watch => "watch",
            Self::Overvalued => "overvalued",
        }
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Direction of a score relative to the player's previous event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Up,
    Down,
    Stable,
    Unknown,
}

impl Trend {
    pub const ALL: [Trend; 4] = [Trend::Up, Trend::Down, Trend::Stable, Trend::Unknown];

    pub const fn label(self) -> &'static str {
        match self {
            Self::Up => "up",
            Self::Down => "down",
            Self::Stable => "stable",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CriterionTrend {
    pub criterion_id: CriterionId,
    #[serde(serialize_with = "one_decimal")]
    pub mean: f64,
    #[serde(serialize_with = "one_decimal_opt")]
    pub previous_mean: Option<f64>,
    pub trend: Trend,
}

/// Classified view of one player for one evaluation event.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerSummary {
    pub player_id: PlayerId,
    pub event_id: EventId,
    #[serde(serialize_with = "one_decimal")]
    pub overall_score: f64,
    pub per_criterion: Vec<CriterionAggregate>,
    #[serde(serialize_with = "one_decimal")]
    pub max_criterion_spread: f64,
    pub tag: Tag,
    pub trend: Trend,
    #[serde(serialize_with = "one_decimal_opt")]
    pub previous_overall_score: Option<f64>,
    pub criterion_trends: Vec<CriterionTrend>,
}

impl PlayerSummary {
    pub fn sample_count(&self) -> usize {
        self.per_criterion
            .iter()
            .map(|criterion| criterion.sample_count)
            .sum()
    }
}

/// Stateless classifier holding thresholds already projected onto the
/// deployment's scale.
#[derive(Debug, Clone)]
pub struct ClassificationEngine {
    thresholds: ClassificationThresholds,
}

impl ClassificationEngine {
    pub fn new(reference: &ClassificationThresholds, scale: ScoreScale) -> Self {
        Self {
            thresholds: reference.scaled_to(scale),
        }
    }

    /// Effective thresholds on the configured scale.
    pub fn thresholds(&self) -> &ClassificationThresholds {
        &self.thresholds
    }

    pub fn tag(&self, aggregate: &PlayerAggregate) -> Tag {
        decide_tag(aggregate.overall_score, aggregate.max_spread(), &self.thresholds)
    }

    /// `previous` is the same player's aggregate from the most recent earlier
    /// event in which the player was scored.
    pub fn summarize(
        &self,
        event_id: &EventId,
        current: &PlayerAggregate,
        previous: Option<&PlayerAggregate>,
    ) -> PlayerSummary {
        let criterion_trends = current
            .criteria
            .iter()
            .map(|criterion| {
                let previous_mean = previous
                    .and_then(|previous| previous.criterion(&criterion.criterion_id))
                    .map(|previous| previous.mean);
                CriterionTrend {
                    criterion_id: criterion.criterion_id.clone(),
                    mean: criterion.mean,
                    previous_mean,
                    trend: trend::compare(criterion.mean, previous_mean),
                }
            })
            .collect();

        let previous_overall_score = previous.map(|previous| previous.overall_score);

        PlayerSummary {
            player_id: current.player_id.clone(),
            event_id: event_id.clone(),
            overall_score: current.overall_score,
            per_criterion: current.criteria.clone(),
            max_criterion_spread: current.max_spread(),
            tag: self.tag(current),
            trend: trend::compare(current.overall_score, previous_overall_score),
            previous_overall_score,
            criterion_trends,
        }
    }
}

impl Default for ClassificationEngine {
    fn default() -> Self {
        Self::new(&ClassificationThresholds::default(), ScoreScale::default())
    }
}
