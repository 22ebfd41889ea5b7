use chrono::{DateTime, TimeZone, Utc};

use crate::workflows::evaluation::{
    Criterion, CriterionId, EvaluationEvent, Evaluator, EvaluatorId, EventId, Player, PlayerId,
    Roster, ScoreRecord, ScoreSubmission,
};

pub(super) fn at(minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 7, 12, 9, minute, 0)
        .single()
        .expect("valid timestamp")
}

pub(super) fn event(id: &str, criteria: &[&str]) -> EvaluationEvent {
    EvaluationEvent {
        id: EventId::new(id),
        name: id.replace('-', " "),
        criteria: criteria
            .iter()
            .map(|name| Criterion {
                id: CriterionId::new(name.to_ascii_lowercase()),
                name: name.to_string(),
            })
            .collect(),
    }
}

/// Two events (`day-1`, `day-2`) scored on shooting and skating by three raters.
pub(super) fn roster() -> Roster {
    Roster {
        players: ["p1", "p2", "p3"]
            .iter()
            .map(|id| Player {
                id: PlayerId::new(*id),
                name: format!("Player {id}"),
            })
            .collect(),
        evaluators: ["e1", "e2", "e3"]
            .iter()
            .map(|id| Evaluator {
                id: EvaluatorId::new(*id),
                name: format!("Coach {id}"),
            })
            .collect(),
        events: vec![
            event("day-1", &["Shooting", "Skating"]),
            event("day-2", &["Shooting", "Skating"]),
        ],
    }
}

pub(super) fn submission(
    event: &str,
    player: &str,
    evaluator: &str,
    criterion: &str,
    value: f64,
) -> ScoreSubmission {
    ScoreSubmission {
        event_id: EventId::new(event),
        player_id: PlayerId::new(player),
        evaluator_id: EvaluatorId::new(evaluator),
        criterion_id: CriterionId::new(criterion),
        value,
        submitted_at: None,
    }
}

pub(super) fn record(
    event: &str,
    player: &str,
    evaluator: &str,
    criterion: &str,
    value: f64,
    minute: u32,
) -> ScoreRecord {
    ScoreRecord {
        player_id: PlayerId::new(player),
        evaluator_id: EvaluatorId::new(evaluator),
        criterion_id: CriterionId::new(criterion),
        event_id: EventId::new(event),
        value,
        submitted_at: at(minute),
    }
}
