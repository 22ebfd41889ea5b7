use std::collections::HashMap;

use super::aggregation::{AggregationEngine, PlayerAggregate};
use super::classification::{ClassificationEngine, PlayerSummary};
use super::domain::{EventId, PlayerId, Roster};
use super::store::ScoreSnapshot;

/// Classifies every scored player of `event_id` against the snapshot.
///
/// Trends look back through earlier events, newest first, and use the first
/// one in which the player has aggregates. Returns `None` for an event the
/// roster does not declare.
pub fn summarize_event(
    snapshot: &ScoreSnapshot,
    roster: &Roster,
    event_id: &EventId,
    classifier: &ClassificationEngine,
) -> Option<Vec<PlayerSummary>> {
    let earlier = roster.events_before(event_id)?;
    let aggregator = AggregationEngine::new();
    let current = aggregator.aggregate_event(snapshot, event_id);

    let mut previous: HashMap<PlayerId, PlayerAggregate> = HashMap::new();
    for event in earlier.iter().rev() {
        for aggregate in aggregator.aggregate_event(snapshot, &event.id) {
            previous
                .entry(aggregate.player_id.clone())
                .or_insert(aggregate);
        }
    }

    Some(
        current
            .iter()
            .map(|aggregate| {
                classifier.summarize(event_id, aggregate, previous.get(&aggregate.player_id))
            })
            .collect(),
    )
}
