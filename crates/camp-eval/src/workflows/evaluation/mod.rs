//! Score ingestion, aggregation and classification.

mod aggregation;
mod classification;
mod domain;
mod guard;
mod store;
mod summary;

pub use aggregation::{round_one_decimal, AggregationEngine, CriterionAggregate, PlayerAggregate};
pub(crate) use aggregation::{one_decimal, one_decimal_opt};
pub use classification::{
    ClassificationEngine, ClassificationThresholds, CriterionTrend, PlayerSummary, Tag, Trend,
    TREND_TOLERANCE,
};
pub use domain::{
    CampId, Criterion, CriterionId, EvaluationEvent, Evaluator, EvaluatorId, EventId, Player,
    PlayerId, ReferenceKind, Roster, ScoreKey, ScoreRecord, ScoreScale, ScoreSubmission,
    ValidationError,
};
pub use guard::ScoreGuard;
pub use store::{ScoreSnapshot, ScoreStore, SealError, StoreError, UpsertOutcome};
pub use summary::summarize_event;

#[cfg(test)]
mod tests;
