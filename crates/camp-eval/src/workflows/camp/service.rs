use std::io::Read;
use std::sync::Arc;

use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::{debug, info, warn};

use super::domain::{Camp, CampSetup, CampView};
use crate::config::EngineConfig;
use crate::workflows::closure::{
    CancelSignal, ClosureBlueprint, ClosureCollaborators, ClosureContext, ClosureError,
    ClosureProgress, ClosureRun, ReportSettings, StepKey, StepResult,
};
use crate::workflows::evaluation::{
    summarize_event, CampId, ClassificationEngine, EventId, PlayerId, PlayerSummary, ScoreGuard,
    ScoreSubmission, StoreError, UpsertOutcome, ValidationError,
};
use crate::workflows::import::{ScoreImportError, ScoreImportReport, ScoreSheet};

/// Service composing ingestion validation, classification, and the closure
/// workflow for every registered camp.
pub struct CampService {
    camps: DashMap<CampId, Arc<Camp>>,
    guard: ScoreGuard,
    classifier: ClassificationEngine,
    blueprint: ClosureBlueprint,
    collaborators: ClosureCollaborators,
    reports: ReportSettings,
}

impl CampService {
    pub fn new(engine: &EngineConfig, collaborators: ClosureCollaborators) -> Self {
        Self {
            camps: DashMap::new(),
            guard: ScoreGuard::new(engine.scale),
            classifier: ClassificationEngine::new(&engine.thresholds, engine.scale),
            blueprint: ClosureBlueprint::standard(),
            collaborators,
            reports: engine.reports.clone(),
        }
    }

    pub fn create_camp(&self, setup: CampSetup) -> Result<CampView, CampError> {
        setup.validate().map_err(CampError::InvalidSetup)?;

        match self.camps.entry(setup.id.clone()) {
            Entry::Occupied(_) => Err(CampError::Conflict(setup.id)),
            Entry::Vacant(slot) => {
                let camp = Camp::new(setup, &self.blueprint);
                info!(
                    camp_id = %camp.id,
                    players = camp.roster.players.len(),
                    events = camp.roster.events.len(),
                    "camp registered"
                );
                let view = camp.to_view();
                slot.insert(Arc::new(camp));
                Ok(view)
            }
        }
    }

    pub fn camp_view(&self, camp_id: &CampId) -> Result<CampView, CampError> {
        Ok(self.camp(camp_id)?.to_view())
    }

    pub fn camp_count(&self) -> usize {
        self.camps.len()
    }

    pub fn submit_score(
        &self,
        camp_id: &CampId,
        submission: ScoreSubmission,
    ) -> Result<UpsertOutcome, CampError> {
        let camp = self.camp(camp_id)?;
        self.ingest(&camp, submission, Utc::now())
    }

    /// Imports a CSV score sheet row by row. Invalid rows are reported and
    /// skipped; a malformed file or an archived camp aborts the import.
    pub fn import_scores<R: Read>(
        &self,
        camp_id: &CampId,
        reader: R,
    ) -> Result<ScoreImportReport, CampError> {
        let camp = self.camp(camp_id)?;
        let sheet = ScoreSheet::from_reader(reader)?;
        let received_at = Utc::now();

        let mut report = ScoreImportReport::default();
        for row in sheet.submissions(&camp.roster) {
            let submission = match row.submission {
                Ok(submission) => submission,
                Err(reason) => {
                    report.reject(row.line, reason);
                    continue;
                }
            };

            match self.ingest(&camp, submission, received_at) {
                Ok(UpsertOutcome::Inserted) => report.accepted += 1,
                Ok(UpsertOutcome::Replaced) => {
                    report.accepted += 1;
                    report.replaced += 1;
                }
                Ok(UpsertOutcome::Stale) => report.stale += 1,
                Err(CampError::Validation(error)) => report.reject(row.line, error.to_string()),
                Err(other) => return Err(other),
            }
        }

        info!(
            camp_id = %camp_id,
            accepted = report.accepted,
            stale = report.stale,
            rejected = report.rejected.len(),
            "score sheet imported"
        );
        Ok(report)
    }

    pub fn get_player_summary(
        &self,
        camp_id: &CampId,
        event_id: &EventId,
        player_id: &PlayerId,
    ) -> Result<PlayerSummary, CampError> {
        let camp = self.camp(camp_id)?;
        if camp.roster.player(player_id).is_none() {
            return Err(CampError::PlayerNotFound(player_id.clone()));
        }

        self.summaries(&camp, event_id)?
            .into_iter()
            .find(|summary| &summary.player_id == player_id)
            .ok_or_else(|| CampError::NotEvaluated {
                player_id: player_id.clone(),
                event_id: event_id.clone(),
            })
    }

    pub fn get_camp_summaries(
        &self,
        camp_id: &CampId,
        event_id: &EventId,
    ) -> Result<Vec<PlayerSummary>, CampError> {
        let camp = self.camp(camp_id)?;
        self.summaries(&camp, event_id)
    }

    pub async fn run_closure_step(
        &self,
        camp_id: &CampId,
        step: StepKey,
        cancel: CancelSignal,
    ) -> Result<StepResult, CampError> {
        let camp = self.camp(camp_id)?;
        let mut workflow = camp.closure.lock().await;
        let result = workflow.execute(step, &self.context(&camp, &cancel)).await?;
        Ok(result)
    }

    pub async fn run_all_closure_steps(
        &self,
        camp_id: &CampId,
        cancel: CancelSignal,
    ) -> Result<ClosureRun, CampError> {
        let camp = self.camp(camp_id)?;
        let mut workflow = camp.closure.lock().await;
        let run = workflow.execute_all(&self.context(&camp, &cancel)).await?;
        if let Some(step) = run.halted_on {
            warn!(camp_id = %camp_id, step = %step, "closure halted on required step");
        }
        Ok(run)
    }

    pub async fn get_closure_progress(&self, camp_id: &CampId) -> Result<ClosureProgress, CampError> {
        let camp = self.camp(camp_id)?;
        let mut workflow = camp.closure.lock().await;
        workflow.refresh(camp.scores.revision());
        Ok(workflow.progress())
    }

    fn camp(&self, camp_id: &CampId) -> Result<Arc<Camp>, CampError> {
        self.camps
            .get(camp_id)
            .map(|camp| Arc::clone(camp.value()))
            .ok_or_else(|| CampError::CampNotFound(camp_id.clone()))
    }

    fn ingest(
        &self,
        camp: &Camp,
        submission: ScoreSubmission,
        received_at: DateTime<Utc>,
    ) -> Result<UpsertOutcome, CampError> {
        if camp.is_archived() {
            return Err(CampError::Archived(camp.id.clone()));
        }

        let record = self.guard.admit(&camp.roster, submission, received_at)?;
        let key = record.key();
        let outcome = camp.scores.upsert(record).map_err(|error| match error {
            StoreError::Sealed => CampError::Archived(camp.id.clone()),
            StoreError::Sealing => CampError::Archiving(camp.id.clone()),
        })?;
        debug!(
            camp_id = %camp.id,
            player_id = %key.player_id,
            criterion_id = %key.criterion_id,
            ?outcome,
            "score ingested"
        );
        Ok(outcome)
    }

    fn summaries(&self, camp: &Camp, event_id: &EventId) -> Result<Vec<PlayerSummary>, CampError> {
        summarize_event(&camp.scores.snapshot(), &camp.roster, event_id, &self.classifier)
            .ok_or_else(|| CampError::EventNotFound(event_id.clone()))
    }

    fn context<'a>(&'a self, camp: &'a Camp, cancel: &'a CancelSignal) -> ClosureContext<'a> {
        ClosureContext {
            camp_id: &camp.id,
            roster: &camp.roster,
            scores: &camp.scores,
            classifier: &self.classifier,
            collaborators: &self.collaborators,
            settings: &self.reports,
            cancel,
        }
    }
}

/// Error raised by the camp service.
#[derive(Debug, thiserror::Error)]
pub enum CampError {
    #[error("camp {0} not found")]
    CampNotFound(CampId),
    #[error("camp {0} already exists")]
    Conflict(CampId),
    #[error("invalid camp setup: {0}")]
    InvalidSetup(String),
    #[error("event {0} not found")]
    EventNotFound(EventId),
    #[error("player {0} not found")]
    PlayerNotFound(PlayerId),
    #[error("player {player_id} has no evaluations for event {event_id}")]
    NotEvaluated { player_id: PlayerId, event_id: EventId },
    #[error("camp {0} is archived")]
    Archived(CampId),
    #[error("camp {0} is being archived")]
    Archiving(CampId),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Closure(#[from] ClosureError),
    #[error(transparent)]
    Import(#[from] ScoreImportError),
}

impl CampError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            CampError::CampNotFound(_)
            | CampError::EventNotFound(_)
            | CampError::PlayerNotFound(_)
            | CampError::NotEvaluated { .. }
            | CampError::Closure(ClosureError::UnknownStep(_)) => StatusCode::NOT_FOUND,
            CampError::Conflict(_)
            | CampError::Archived(_)
            | CampError::Archiving(_)
            | CampError::Closure(ClosureError::StepNotReady { .. })
            | CampError::Closure(ClosureError::Archived(_)) => StatusCode::CONFLICT,
            CampError::InvalidSetup(_)
            | CampError::Validation(_)
            | CampError::Import(ScoreImportError::Csv(_)) => StatusCode::UNPROCESSABLE_ENTITY,
            CampError::Import(ScoreImportError::Io(_)) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
