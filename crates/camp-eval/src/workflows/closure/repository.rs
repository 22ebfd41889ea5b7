use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::domain::StepResult;
use super::reports::{ReportArtifact, ReportGenerator};
use super::statistics::CampStatistics;
use crate::workflows::evaluation::{
    one_decimal, CampId, EventId, PlayerId, PlayerSummary, Tag, Trend,
};

/// Closure outputs handed to downstream consumers (spreadsheets, BI).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportBundle {
    pub camp_id: CampId,
    pub event_id: EventId,
    pub summaries_csv: String,
    pub statistics_json: String,
    pub generated_at: DateTime<Utc>,
}

/// One line of a player's long-term record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerHistoryEntry {
    pub camp_id: CampId,
    pub event_id: EventId,
    pub player_id: PlayerId,
    pub player_name: String,
    #[serde(serialize_with = "one_decimal")]
    pub overall_score: f64,
    pub tag: Tag,
    pub trend: Trend,
    pub recorded_at: DateTime<Utc>,
}

/// Final audit artefact of a closed camp.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArchiveRecord {
    pub camp_id: CampId,
    pub event_id: EventId,
    pub archived_at: DateTime<Utc>,
    pub summaries: Vec<PlayerSummary>,
    pub statistics: Option<CampStatistics>,
    pub step_results: Vec<StepResult>,
    pub warnings: Vec<String>,
    pub reports: Vec<ReportArtifact>,
}

pub trait ExportSink: Send + Sync {
    fn export(&self, bundle: ExportBundle) -> Result<(), SinkError>;
}

pub trait HistoryStore: Send + Sync {
    fn append(&self, entries: Vec<PlayerHistoryEntry>) -> Result<(), SinkError>;
}

/// Called once the store is sealing; writes to the camp are rejected until it
/// returns, and an error reopens the camp.
pub trait ArchiveStore: Send + Sync {
    fn store(&self, record: &ArchiveRecord) -> Result<(), SinkError>;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SinkError {
    #[error("sink unavailable: {0}")]
    Unavailable(String),
    #[error("sink rejected payload: {0}")]
    Rejected(String),
}

/// Outbound adapters the closure steps write to.
#[derive(Clone)]
pub struct ClosureCollaborators {
    pub reports: Arc<dyn ReportGenerator>,
    pub exports: Arc<dyn ExportSink>,
    pub history: Arc<dyn HistoryStore>,
    pub archive: Arc<dyn ArchiveStore>,
}
