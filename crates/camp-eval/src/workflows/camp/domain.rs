use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::workflows::closure::{ClosureBlueprint, ClosureWorkflow};
use crate::workflows::evaluation::{
    CampId, EvaluationEvent, Evaluator, EventId, Player, Roster, ScoreStore,
};

/// Payload accepted when registering a camp. Events are listed oldest first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CampSetup {
    pub id: CampId,
    pub name: String,
    pub players: Vec<Player>,
    pub evaluators: Vec<Evaluator>,
    pub events: Vec<EvaluationEvent>,
}

impl CampSetup {
    /// Rejects setups the engine could never score: blank ids, duplicate
    /// ids, or events without criteria.
    pub fn validate(&self) -> Result<(), String> {
        if self.id.as_str().trim().is_empty() {
            return Err("camp id must not be blank".to_string());
        }
        if self.events.is_empty() {
            return Err("camp must declare at least one evaluation event".to_string());
        }

        unique("player", self.players.iter().map(|player| player.id.as_str()))?;
        unique(
            "evaluator",
            self.evaluators.iter().map(|evaluator| evaluator.id.as_str()),
        )?;
        unique("event", self.events.iter().map(|event| event.id.as_str()))?;

        for event in &self.events {
            if event.criteria.is_empty() {
                return Err(format!("event {} declares no criteria", event.id));
            }
            unique(
                "criterion",
                event.criteria.iter().map(|criterion| criterion.id.as_str()),
            )?;
        }

        Ok(())
    }

    pub fn roster(&self) -> Roster {
        Roster {
            players: self.players.clone(),
            evaluators: self.evaluators.clone(),
            events: self.events.clone(),
        }
    }
}

fn unique<'a>(kind: &str, ids: impl Iterator<Item = &'a str>) -> Result<(), String> {
    let mut seen = HashSet::new();
    for id in ids {
        if id.trim().is_empty() {
            return Err(format!("{kind} id must not be blank"));
        }
        if !seen.insert(id) {
            return Err(format!("duplicate {kind} id '{id}'"));
        }
    }
    Ok(())
}

/// Aggregate root: identity sets, the score store, and the closure state.
/// Steps of one camp run one at a time behind `closure`.
#[derive(Debug)]
pub struct Camp {
    pub id: CampId,
    pub name: String,
    pub roster: Roster,
    pub scores: ScoreStore,
    pub closure: Mutex<ClosureWorkflow>,
    pub created_at: DateTime<Utc>,
}

impl Camp {
    pub fn new(setup: CampSetup, blueprint: &ClosureBlueprint) -> Self {
        let roster = setup.roster();
        Self {
            id: setup.id,
            name: setup.name,
            roster,
            scores: ScoreStore::new(),
            closure: Mutex::new(ClosureWorkflow::new(blueprint)),
            created_at: Utc::now(),
        }
    }

    pub fn is_archived(&self) -> bool {
        self.scores.is_sealed()
    }

    pub fn to_view(&self) -> CampView {
        CampView {
            id: self.id.clone(),
            name: self.name.clone(),
            players: self.roster.players.clone(),
            evaluators: self.roster.evaluators.clone(),
            events: self.roster.events.clone(),
            current_event: self.roster.current_event().map(|event| event.id.clone()),
            scores_recorded: self.scores.len(),
            is_archived: self.is_archived(),
            created_at: self.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CampView {
    pub id: CampId,
    pub name: String,
    pub players: Vec<Player>,
    pub evaluators: Vec<Evaluator>,
    pub events: Vec<EvaluationEvent>,
    pub current_event: Option<EventId>,
    pub scores_recorded: usize,
    pub is_archived: bool,
    pub created_at: DateTime<Utc>,
}
