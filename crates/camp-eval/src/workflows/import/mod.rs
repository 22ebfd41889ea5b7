//! Evaluator score sheets (CSV) turned into score submissions.
//!
//! Expected columns: `Event,Player,Evaluator,Criterion,Score,Submitted At`.
//! Header names match case-insensitively; `Submitted At` may be blank.

mod normalizer;
mod parser;

pub use parser::ScoreSheetRow;

use std::collections::BTreeSet;
use std::io::Read;
use std::path::Path;

use serde::Serialize;

use crate::workflows::evaluation::{
    Criterion, CriterionId, EvaluationEvent, Evaluator, EvaluatorId, EventId, Player, PlayerId,
    Roster, ScoreSubmission,
};
use normalizer::{normalize_name, resolve_criterion, slug};
use parser::parse_datetime;

#[derive(Debug)]
pub enum ScoreImportError {
    Io(std::io::Error),
    Csv(csv::Error),
}

impl std::fmt::Display for ScoreImportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScoreImportError::Io(err) => write!(f, "failed to read score sheet: {}", err),
            ScoreImportError::Csv(err) => write!(f, "invalid score sheet CSV: {}", err),
        }
    }
}

impl std::error::Error for ScoreImportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ScoreImportError::Io(err) => Some(err),
            ScoreImportError::Csv(err) => Some(err),
        }
    }
}

impl From<std::io::Error> for ScoreImportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<csv::Error> for ScoreImportError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}

/// Row-level rejection; the rest of the sheet is still imported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RejectedRow {
    pub line: u64,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScoreImportReport {
    pub accepted: usize,
    pub replaced: usize,
    pub stale: usize,
    pub rejected: Vec<RejectedRow>,
}

impl ScoreImportReport {
    pub fn reject(&mut self, line: u64, reason: impl Into<String>) {
        self.rejected.push(RejectedRow {
            line,
            reason: reason.into(),
        });
    }
}

/// A submission decoded from one sheet row, or the reason it could not be.
#[derive(Debug, Clone, PartialEq)]
pub struct SheetSubmission {
    pub line: u64,
    pub submission: Result<ScoreSubmission, String>,
}

#[derive(Debug, Clone, Default)]
pub struct ScoreSheet {
    rows: Vec<ScoreSheetRow>,
}

impl ScoreSheet {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, ScoreImportError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, ScoreImportError> {
        Ok(Self {
            rows: parser::parse_rows(reader)?,
        })
    }

    pub fn rows(&self) -> &[ScoreSheetRow] {
        &self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Decodes every row against `roster`. Cells may name an entity by id or
    /// by display name; unresolvable references are passed through as ids so
    /// that ingestion validation reports them.
    pub fn submissions(&self, roster: &Roster) -> Vec<SheetSubmission> {
        self.rows
            .iter()
            .map(|row| SheetSubmission {
                line: row.line,
                submission: decode_row(row, roster),
            })
            .collect()
    }

    /// Builds a roster from the sheet alone, for ad-hoc reporting on sheets
    /// that do not belong to a registered camp. Events keep their order of
    /// first appearance.
    pub fn infer_roster(&self) -> Roster {
        let mut roster = Roster::default();
        let mut players = BTreeSet::new();
        let mut evaluators = BTreeSet::new();

        for row in &self.rows {
            if players.insert(row.player.clone()) {
                roster.players.push(Player {
                    id: PlayerId::new(row.player.as_str()),
                    name: row.player.clone(),
                });
            }
            if evaluators.insert(row.evaluator.clone()) {
                roster.evaluators.push(Evaluator {
                    id: EvaluatorId::new(row.evaluator.as_str()),
                    name: row.evaluator.clone(),
                });
            }

            let event_id = EventId::new(row.event.as_str());
            let position = match roster.events.iter().position(|event| event.id == event_id) {
                Some(position) => position,
                None => {
                    roster.events.push(EvaluationEvent {
                        id: event_id,
                        name: row.event.clone(),
                        criteria: Vec::new(),
                    });
                    roster.events.len() - 1
                }
            };
            let event = &mut roster.events[position];
            if resolve_criterion(event, &row.criterion).is_none() {
                event.criteria.push(Criterion {
                    id: CriterionId::new(slug(&row.criterion)),
                    name: row.criterion.clone(),
                });
            }
        }

        roster
    }
}

fn decode_row(row: &ScoreSheetRow, roster: &Roster) -> Result<ScoreSubmission, String> {
    let value: f64 = row
        .score
        .parse()
        .map_err(|_| format!("score '{}' is not a number", row.score))?;

    let submitted_at = match row.submitted_at.as_deref() {
        Some(raw) => Some(
            parse_datetime(raw).ok_or_else(|| format!("submitted at '{raw}' is not a date"))?,
        ),
        None => None,
    };

    let event_id = EventId::new(lookup(
        &row.event,
        roster
            .events
            .iter()
            .map(|event| (event.id.as_str(), event.name.as_str())),
    ));
    let criterion_id = roster
        .event(&event_id)
        .and_then(|event| resolve_criterion(event, &row.criterion))
        .unwrap_or_else(|| CriterionId::new(row.criterion.as_str()));

    Ok(ScoreSubmission {
        event_id,
        player_id: PlayerId::new(lookup(
            &row.player,
            roster.players.iter().map(|player| (player.id.as_str(), player.name.as_str())),
        )),
        evaluator_id: EvaluatorId::new(lookup(
            &row.evaluator,
            roster
                .evaluators
                .iter()
                .map(|evaluator| (evaluator.id.as_str(), evaluator.name.as_str())),
        )),
        criterion_id,
        value,
        submitted_at,
    })
}

/// Matches a cell against `(id, name)` pairs: exact id first, then name.
fn lookup<'a>(cell: &str, candidates: impl Iterator<Item = (&'a str, &'a str)> + Clone) -> String {
    if let Some((id, _)) = candidates.clone().find(|(id, _)| *id == cell) {
        return id.to_string();
    }

    let normalized = normalize_name(cell);
    candidates
        .into_iter()
        .find(|(_, name)| normalize_name(name) == normalized)
        .map(|(id, _)| id.to_string())
        .unwrap_or_else(|| cell.to_string())
}
