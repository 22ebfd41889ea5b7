use chrono::{DateTime, Utc};

use super::domain::{ReferenceKind, Roster, ScoreRecord, ScoreScale, ScoreSubmission, ValidationError};

/// Validates submissions against the roster and the configured scale before
/// they reach the store.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScoreGuard {
    scale: ScoreScale,
}

impl ScoreGuard {
    pub fn new(scale: ScoreScale) -> Self {
        Self { scale }
    }

    pub fn scale(&self) -> ScoreScale {
        self.scale
    }

    /// Turns a submission into a storable record, stamping `received_at` when
    /// the evaluator did not supply a submission time.
    pub fn admit(
        &self,
        roster: &Roster,
        submission: ScoreSubmission,
        received_at: DateTime<Utc>,
    ) -> Result<ScoreRecord, ValidationError> {
        let event = roster
            .event(&submission.event_id)
            .ok_or_else(|| unknown(ReferenceKind::Event, submission.event_id.as_str()))?;

        if roster.player(&submission.player_id).is_none() {
            return Err(unknown(ReferenceKind::Player, submission.player_id.as_str()));
        }

        if roster.evaluator(&submission.evaluator_id).is_none() {
            return Err(unknown(
                ReferenceKind::Evaluator,
                submission.evaluator_id.as_str(),
            ));
        }

        if event.criterion(&submission.criterion_id).is_none() {
            return Err(unknown(
                ReferenceKind::Criterion,
                submission.criterion_id.as_str(),
            ));
        }

        if !self.scale.contains(submission.value) {
            return Err(ValidationError::OutOfRange {
                value: submission.value,
                min: self.scale.min,
                max: self.scale.max,
            });
        }

        Ok(ScoreRecord {
            player_id: submission.player_id,
            evaluator_id: submission.evaluator_id,
            criterion_id: submission.criterion_id,
            event_id: submission.event_id,
            value: submission.value,
            submitted_at: submission.submitted_at.unwrap_or(received_at),
        })
    }
}

fn unknown(kind: ReferenceKind, id: &str) -> ValidationError {
    ValidationError::InvalidReference {
        kind,
        id: id.to_string(),
    }
}
