use std::collections::BTreeMap;

use serde::Serialize;

use crate::workflows::evaluation::{
    one_decimal, one_decimal_opt, CriterionId, EvaluationEvent, EvaluatorId, EventId,
    PlayerSummary, Roster, ScoreSnapshot, Tag, Trend,
};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CriterionStatistics {
    pub criterion_id: CriterionId,
    pub name: String,
    /// Mean of the per-player criterion means.
    #[serde(serialize_with = "one_decimal_opt")]
    pub average: Option<f64>,
    #[serde(serialize_with = "one_decimal")]
    pub max_spread: f64,
    pub samples: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EvaluatorParticipation {
    pub evaluator_id: EvaluatorId,
    pub name: String,
    pub submissions: usize,
}

/// Camp-wide figures for the current event, compiled once per closure.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CampStatistics {
    pub event_id: EventId,
    pub evaluated_players: usize,
    pub pending_players: usize,
    #[serde(serialize_with = "one_decimal_opt")]
    pub average_overall: Option<f64>,
    pub criteria: Vec<CriterionStatistics>,
    pub tag_counts: BTreeMap<Tag, usize>,
    pub trend_counts: BTreeMap<Trend, usize>,
    pub evaluator_participation: Vec<EvaluatorParticipation>,
}

impl CampStatistics {
    pub fn compile(
        roster: &Roster,
        event: &EvaluationEvent,
        summaries: &[PlayerSummary],
        snapshot: &ScoreSnapshot,
    ) -> Self {
        let evaluated_players = summaries.len();
        let average_overall = mean(summaries.iter().map(|summary| summary.overall_score));

        let criteria = event
            .criteria
            .iter()
            .map(|criterion| {
                let aggregates: Vec<_> = summaries
                    .iter()
                    .filter_map(|summary| {
                        summary
                            .per_criterion
                            .iter()
                            .find(|aggregate| aggregate.criterion_id == criterion.id)
                    })
                    .collect();
                CriterionStatistics {
                    criterion_id: criterion.id.clone(),
                    name: criterion.name.clone(),
                    average: mean(aggregates.iter().map(|aggregate| aggregate.mean)),
                    max_spread: aggregates
                        .iter()
                        .map(|aggregate| aggregate.spread)
                        .fold(0.0, f64::max),
                    samples: aggregates.iter().map(|aggregate| aggregate.sample_count).sum(),
                }
            })
            .collect();

        let mut tag_counts: BTreeMap<Tag, usize> = Tag::ALL.into_iter().map(|tag| (tag, 0)).collect();
        let mut trend_counts: BTreeMap<Trend, usize> =
            Trend::ALL.into_iter().map(|trend| (trend, 0)).collect();
        for summary in summaries {
            *tag_counts.entry(summary.tag).or_default() += 1;
            *trend_counts.entry(summary.trend).or_default() += 1;
        }

        let evaluator_participation = roster
            .evaluators
            .iter()
            .map(|evaluator| EvaluatorParticipation {
                evaluator_id: evaluator.id.clone(),
                name: evaluator.name.clone(),
                submissions: snapshot
                    .for_event(&event.id)
                    .filter(|record| record.evaluator_id == evaluator.id)
                    .count(),
            })
            .collect();

        Self {
            event_id: event.id.clone(),
            evaluated_players,
            pending_players: roster.players.len().saturating_sub(evaluated_players),
            average_overall,
            criteria,
            tag_counts,
            trend_counts,
            evaluator_participation,
        }
    }
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0usize), |(sum, count), value| (sum + value, count + 1));
    (count > 0).then(|| sum / count as f64)
}
