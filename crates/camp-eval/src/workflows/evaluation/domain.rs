use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

string_id!(
    /// Identifier wrapper for a camp.
    CampId
);
string_id!(
    /// Identifier wrapper for one scoring round inside a camp.
    EventId
);
string_id!(
    /// Identifier wrapper for an evaluated athlete.
    PlayerId
);
string_id!(
    /// Identifier wrapper for a rater.
    EvaluatorId
);
string_id!(
    /// Identifier wrapper for a rated skill axis.
    CriterionId
);

/// Named skill axis (e.g. "Skating") declared for an evaluation event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Criterion {
    pub id: CriterionId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evaluator {
    pub id: EvaluatorId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
}

/// One discrete round of scoring. Criteria are fixed once the camp is created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationEvent {
    pub id: EventId,
    pub name: String,
    pub criteria: Vec<Criterion>,
}

impl EvaluationEvent {
    pub fn criterion(&self, id: &CriterionId) -> Option<&Criterion> {
        self.criteria.iter().find(|criterion| &criterion.id == id)
    }
}

/// Identity sets supplied by the roster provider. Events are listed in
/// chronological order; the last one is the camp's current event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Roster {
    pub players: Vec<Player>,
    pub evaluators: Vec<Evaluator>,
    pub events: Vec<EvaluationEvent>,
}

impl Roster {
    pub fn player(&self, id: &PlayerId) -> Option<&Player> {
        self.players.iter().find(|player| &player.id == id)
    }

    pub fn evaluator(&self, id: &EvaluatorId) -> Option<&Evaluator> {
        self.evaluators.iter().find(|evaluator| &evaluator.id == id)
    }

    pub fn event(&self, id: &EventId) -> Option<&EvaluationEvent> {
        self.events.iter().find(|event| &event.id == id)
    }

    pub fn current_event(&self) -> Option<&EvaluationEvent> {
        self.events.last()
    }

    /// Events declared before `id`, oldest first. `None` when `id` is unknown.
    pub fn events_before(&self, id: &EventId) -> Option<&[EvaluationEvent]> {
        let position = self.events.iter().position(|event| &event.id == id)?;
        Some(&self.events[..position])
    }
}

/// Bounded rating scale. Every accepted score lies within `[min, max]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreScale {
    pub min: f64,
    pub max: f64,
}

impl ScoreScale {
    pub const FIVE_POINT: Self = Self { min: 1.0, max: 5.0 };
    pub const TEN_POINT: Self = Self {
        min: 1.0,
        max: 10.0,
    };

    pub fn new(min: f64, max: f64) -> Option<Self> {
        if min.is_finite() && max.is_finite() && min < max {
            Some(Self { min, max })
        } else {
            None
        }
    }

    pub fn contains(&self, value: f64) -> bool {
        value.is_finite() && value >= self.min && value <= self.max
    }

    pub fn width(&self) -> f64 {
        self.max - self.min
    }

    /// Maps a level expressed on the 1-5 reference scale onto this scale.
    pub fn rescale_level(&self, reference: f64) -> f64 {
        self.min + (reference - 1.0) * self.width() / 4.0
    }

    /// Maps a distance (e.g. a spread) expressed on the 1-5 reference scale.
    pub fn rescale_distance(&self, reference: f64) -> f64 {
        reference * self.width() / 4.0
    }
}

impl Default for ScoreScale {
    fn default() -> Self {
        Self::FIVE_POINT
    }
}

/// Uniqueness key of a score: one current value per rater, player, criterion and event.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ScoreKey {
    pub player_id: PlayerId,
    pub evaluator_id: EvaluatorId,
    pub criterion_id: CriterionId,
    pub event_id: EventId,
}

/// Raw submission as received from an evaluator. `submitted_at` defaults to
/// the time of receipt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreSubmission {
    pub event_id: EventId,
    pub player_id: PlayerId,
    pub evaluator_id: EvaluatorId,
    pub criterion_id: CriterionId,
    pub value: f64,
    #[serde(default)]
    pub submitted_at: Option<DateTime<Utc>>,
}

/// Validated score held by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreRecord {
    pub player_id: PlayerId,
    pub evaluator_id: EvaluatorId,
    pub criterion_id: CriterionId,
    pub event_id: EventId,
    pub value: f64,
    pub submitted_at: DateTime<Utc>,
}

impl ScoreRecord {
    pub fn key(&self) -> ScoreKey {
        ScoreKey {
            player_id: self.player_id.clone(),
            evaluator_id: self.evaluator_id.clone(),
            criterion_id: self.criterion_id.clone(),
            event_id: self.event_id.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceKind {
    Event,
    Player,
    Evaluator,
    Criterion,
}

impl ReferenceKind {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Event => "event",
            Self::Player => "player",
            Self::Evaluator => "evaluator",
            Self::Criterion => "criterion",
        }
    }
}

impl fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Ingestion-time rejection. Values are never clamped and unknown ids are
/// never dropped silently.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("score {value} is outside the configured scale {min}..={max}")]
    OutOfRange { value: f64, min: f64, max: f64 },
    #[error("unknown {kind} reference '{id}'")]
    InvalidReference { kind: ReferenceKind, id: String },
}
