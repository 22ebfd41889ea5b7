use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use serde::{Serialize, Serializer};

use super::domain::{CriterionId, EventId, PlayerId, ScoreKey, ScoreRecord};
use super::store::ScoreSnapshot;

/// Per (player, criterion) statistics. Values keep full precision; only the
/// serialized form is rounded to one decimal.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CriterionAggregate {
    pub player_id: PlayerId,
    pub criterion_id: CriterionId,
    #[serde(serialize_with = "one_decimal")]
    pub mean: f64,
    #[serde(serialize_with = "one_decimal")]
    pub spread: f64,
    pub sample_count: usize,
}

/// Every criterion aggregate of one player plus the unweighted overall score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerAggregate {
    pub player_id: PlayerId,
    #[serde(serialize_with = "one_decimal")]
    pub overall_score: f64,
    pub criteria: Vec<CriterionAggregate>,
}

impl PlayerAggregate {
    /// Largest per-criterion disagreement; one disputed criterion is enough.
    pub fn max_spread(&self) -> f64 {
        self.criteria
            .iter()
            .map(|criterion| criterion.spread)
            .fold(0.0, f64::max)
    }

    pub fn sample_count(&self) -> usize {
        self.criteria
            .iter()
            .map(|criterion| criterion.sample_count)
            .sum()
    }

    pub fn criterion(&self, id: &CriterionId) -> Option<&CriterionAggregate> {
        self.criteria
            .iter()
            .find(|criterion| &criterion.criterion_id == id)
    }
}

/// Stateless reducer from score records to aggregates.
#[derive(Debug, Clone, Copy, Default)]
pub struct AggregationEngine;

impl AggregationEngine {
    pub fn new() -> Self {
        Self
    }

    /// Aggregates the records of a single evaluation event. Duplicate keys
    /// resolve to the latest `submitted_at`; players without records are absent.
    pub fn aggregate<'a, I>(&self, records: I) -> Vec<PlayerAggregate>
    where
        I: IntoIterator<Item = &'a ScoreRecord>,
    {
        let mut latest: BTreeMap<ScoreKey, &ScoreRecord> = BTreeMap::new();
        for record in records {
            match latest.entry(record.key()) {
                Entry::Vacant(slot) => {
                    slot.insert(record);
                }
                Entry::Occupied(mut slot) => {
                    if record.submitted_at >= slot.get().submitted_at {
                        slot.insert(record);
                    }
                }
            }
        }

        let mut groups: BTreeMap<PlayerId, BTreeMap<CriterionId, Vec<f64>>> = BTreeMap::new();
        for (key, record) in latest {
            groups
                .entry(key.player_id)
                .or_default()
                .entry(key.criterion_id)
                .or_default()
                .push(record.value);
        }

        groups
            .into_iter()
            .map(|(player_id, criteria)| {
                let criteria: Vec<CriterionAggregate> = criteria
                    .into_iter()
                    .map(|(criterion_id, values)| {
                        let (mean, spread) = mean_and_spread(&values);
                        CriterionAggregate {
                            player_id: player_id.clone(),
                            criterion_id,
                            mean,
                            spread,
                            sample_count: values.len(),
                        }
                    })
                    .collect();

                let overall_score = criteria.iter().map(|criterion| criterion.mean).sum::<f64>()
                    / criteria.len() as f64;

                PlayerAggregate {
                    player_id,
                    overall_score,
                    criteria,
                }
            })
            .collect()
    }

    pub fn aggregate_event(&self, snapshot: &ScoreSnapshot, event_id: &EventId) -> Vec<PlayerAggregate> {
        self.aggregate(snapshot.for_event(event_id))
    }
}

fn mean_and_spread(values: &[f64]) -> (f64, f64) {
    let sum: f64 = values.iter().sum();
    let mean = sum / values.len() as f64;
    let max = values.iter().copied().fold(f64::MIN, f64::max);
    let min = values.iter().copied().fold(f64::MAX, f64::min);
    (mean, max - min)
}

/// Presentation rounding (one decimal place).
pub fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

pub(crate) fn one_decimal<S>(value: &f64, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_f64(round_one_decimal(*value))
}

pub(crate) fn one_decimal_opt<S>(value: &Option<f64>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match value {
        Some(value) => serializer.serialize_some(&round_one_decimal(*value)),
        None => serializer.serialize_none(),
    }
}
