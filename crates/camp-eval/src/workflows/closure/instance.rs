use std::collections::BTreeMap;

use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};

use super::blueprint::ClosureBlueprint;
use super::domain::{ClosureError, StepKey, StepResult, StepStatus, StepTemplate};
use super::reports::{CancelSignal, ReportArtifact, ReportFailure, ReportSettings};
use super::repository::{ArchiveRecord, ClosureCollaborators};
use super::statistics::CampStatistics;
use super::steps;
use crate::workflows::evaluation::{CampId, ClassificationEngine, PlayerId, Roster, ScoreStore};

/// Everything a step may read or write outside the workflow itself.
pub struct ClosureContext<'a> {
    pub camp_id: &'a CampId,
    pub roster: &'a Roster,
    pub scores: &'a ScoreStore,
    pub classifier: &'a ClassificationEngine,
    pub collaborators: &'a ClosureCollaborators,
    pub settings: &'a ReportSettings,
    pub cancel: &'a CancelSignal,
}

/// Outputs accumulated by the steps; later steps and the archive read them.
#[derive(Debug, Clone, Default)]
pub struct ClosureArtifacts {
    pub reports: BTreeMap<PlayerId, ReportArtifact>,
    pub report_failures: Vec<ReportFailure>,
    pub statistics: Option<CampStatistics>,
    pub validation_warnings: Vec<String>,
    pub archive: Option<ArchiveRecord>,
}

#[derive(Debug, Clone)]
struct StepState {
    template: StepTemplate,
    status: StepStatus,
    attempts: u32,
    last_result: Option<StepResult>,
    /// Score revision the last run read.
    revision: Option<u64>,
    /// Position of the last run in the workflow's execution order.
    sequence: u64,
}

impl StepState {
    fn to_view(&self) -> StepView {
        StepView {
            key: self.template.key,
            name: self.template.name,
            required: self.template.required,
            depends_on: self.template.depends_on.clone(),
            description: self.template.description,
            status: self.status,
            status_label: self.status.label(),
            attempts: self.attempts,
            score_revision: self.revision,
            last_result: self.last_result.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StepView {
    pub key: StepKey,
    pub name: &'static str,
    pub required: bool,
    pub depends_on: Vec<StepKey>,
    pub description: &'static str,
    pub status: StepStatus,
    pub status_label: &'static str,
    pub attempts: u32,
    pub score_revision: Option<u64>,
    pub last_result: Option<StepResult>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClosureProgress {
    /// Steps that finished as `completed` or `warning`.
    pub completed: usize,
    pub total: usize,
    pub can_archive: bool,
    pub archived: bool,
    pub steps: Vec<StepView>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ClosureRun {
    pub results: Vec<StepResult>,
    /// Required step whose `error` stopped the run.
    pub halted_on: Option<StepKey>,
}

/// Per-camp closure state machine instantiated from a blueprint.
#[derive(Debug)]
pub struct ClosureWorkflow {
    steps: Vec<StepState>,
    artifacts: ClosureArtifacts,
    executions: u64,
}

impl ClosureWorkflow {
    pub fn new(blueprint: &ClosureBlueprint) -> Self {
        let steps = blueprint
            .steps()
            .iter()
            .cloned()
            .map(|template| StepState {
                template,
                status: StepStatus::Pending,
                attempts: 0,
                last_result: None,
                revision: None,
                sequence: 0,
            })
            .collect();

        Self {
            steps,
            artifacts: ClosureArtifacts::default(),
            executions: 0,
        }
    }

    pub fn status(&self, key: StepKey) -> Option<StepStatus> {
        self.steps
            .iter()
            .find(|state| state.template.key == key)
            .map(|state| state.status)
    }

    pub fn artifacts(&self) -> &ClosureArtifacts {
        &self.artifacts
    }

    pub fn is_archived(&self) -> bool {
        self.artifacts.archive.is_some()
    }

    /// Every required step other than the terminal one is completed or warning.
    pub fn can_proceed_to_archive(&self) -> bool {
        self.steps
            .iter()
            .filter(|state| state.template.required && !state.template.terminal)
            .all(|state| state.status.is_resolved())
    }

    /// Steps that still block `key`.
    pub fn waiting_on(&self, key: StepKey) -> Result<Vec<StepKey>, ClosureError> {
        let index = self.position(key)?;
        Ok(self.blockers(index))
    }

    /// Returns settled steps to `pending` when they read an older score
    /// revision than `revision`, or ran before one of their dependencies last
    /// ran. Their outputs are dropped so the archive never mixes revisions.
    pub fn refresh(&mut self, revision: u64) -> Vec<StepKey> {
        if self.is_archived() {
            return Vec::new();
        }

        let mut stale: Vec<StepKey> = Vec::new();
        for state in &self.steps {
            if state.template.terminal || !state.status.is_settled() {
                continue;
            }
            let upstream_reran = state.template.depends_on.iter().any(|dependency| {
                stale.contains(dependency) || self.sequence_of(*dependency) > state.sequence
            });
            if state.revision != Some(revision) || upstream_reran {
                stale.push(state.template.key);
            }
        }

        for key in &stale {
            self.invalidate(*key);
        }
        if !stale.is_empty() {
            info!(revision, steps = ?stale, "closure steps invalidated");
        }
        stale
    }

    pub async fn execute(
        &mut self,
        key: StepKey,
        ctx: &ClosureContext<'_>,
    ) -> Result<StepResult, ClosureError> {
        let index = self.position(key)?;

        if self.is_archived() {
            return self.steps[index]
                .last_result
                .as_ref()
                .map(StepResult::replayed)
                .ok_or(ClosureError::Archived(key));
        }

        let snapshot = ctx.scores.snapshot();
        self.refresh(snapshot.revision());

        let state = &self.steps[index];
        if state.status == StepStatus::Completed {
            if let Some(result) = &state.last_result {
                return Ok(result.replayed());
            }
        }

        let waiting_on = self.blockers(index);
        if !waiting_on.is_empty() {
            return Err(ClosureError::StepNotReady {
                step: key,
                waiting_on,
            });
        }

        let attempt = {
            let state = &mut self.steps[index];
            state.status = StepStatus::InProgress;
            state.attempts += 1;
            state.attempts
        };
        let started_at = Utc::now();
        info!(camp_id = %ctx.camp_id, step = %key, attempt, "closure step started");

        let outcome = match key {
            StepKey::Validation => steps::validate(ctx, &snapshot, &mut self.artifacts),
            StepKey::AiReports => {
                steps::generate_player_reports(ctx, &snapshot, &mut self.artifacts).await
            }
            StepKey::StatsCompilation => {
                steps::compile_statistics(ctx, &snapshot, &mut self.artifacts)
            }
            StepKey::ExportData => steps::export_data(ctx, &snapshot, &self.artifacts),
            StepKey::PlayerHistory => steps::record_history(ctx, &snapshot),
            StepKey::FinalArchive => {
                let results = self.latest_results();
                steps::archive(ctx, snapshot.revision(), &mut self.artifacts, results)
            }
        };

        let result = StepResult {
            step: key,
            status: outcome.status,
            details: outcome.details,
            attempt,
            started_at,
            finished_at: Utc::now(),
            cached: false,
        };

        match result.status {
            StepStatus::Error => {
                warn!(camp_id = %ctx.camp_id, step = %key, attempt, details = ?result.details, "closure step failed")
            }
            status => {
                info!(camp_id = %ctx.camp_id, step = %key, attempt, status = status.label(), "closure step finished")
            }
        }

        self.executions += 1;
        let state = &mut self.steps[index];
        state.status = result.status;
        state.last_result = Some(result.clone());
        state.revision = Some(snapshot.revision());
        state.sequence = self.executions;
        self.refresh(snapshot.revision());
        Ok(result)
    }

    /// Runs every non-terminal step in declared order. Stops at the first
    /// required step that ends in `error`; optional failures do not halt.
    pub async fn execute_all(
        &mut self,
        ctx: &ClosureContext<'_>,
    ) -> Result<ClosureRun, ClosureError> {
        let plan: Vec<(StepKey, bool)> = self
            .steps
            .iter()
            .filter(|state| !state.template.terminal)
            .map(|state| (state.template.key, state.template.required))
            .collect();

        let mut run = ClosureRun::default();
        for (key, required) in plan {
            match self.execute(key, ctx).await {
                Ok(result) => {
                    let halted = required && result.status == StepStatus::Error;
                    run.results.push(result);
                    if halted {
                        run.halted_on = Some(key);
                        break;
                    }
                }
                Err(ClosureError::Archived(_)) => continue,
                Err(error) => return Err(error),
            }
        }

        Ok(run)
    }

    pub fn progress(&self) -> ClosureProgress {
        ClosureProgress {
            completed: self
                .steps
                .iter()
                .filter(|state| state.status.is_resolved())
                .count(),
            total: self.steps.len(),
            can_archive: self.can_proceed_to_archive(),
            archived: self.is_archived(),
            steps: self.steps.iter().map(StepState::to_view).collect(),
        }
    }

    fn position(&self, key: StepKey) -> Result<usize, ClosureError> {
        self.steps
            .iter()
            .position(|state| state.template.key == key)
            .ok_or_else(|| ClosureError::UnknownStep(key.as_str().to_string()))
    }

    fn blockers(&self, index: usize) -> Vec<StepKey> {
        let template = &self.steps[index].template;
        if template.terminal {
            return self
                .steps
                .iter()
                .filter(|state| state.template.required && !state.template.terminal)
                .filter(|state| !state.status.is_resolved())
                .map(|state| state.template.key)
                .collect();
        }

        template
            .depends_on
            .iter()
            .copied()
            .filter(|dependency| {
                !self
                    .steps
                    .iter()
                    .any(|state| state.template.key == *dependency && state.status.is_settled())
            })
            .collect()
    }

    fn latest_results(&self) -> Vec<StepResult> {
        self.steps
            .iter()
            .filter(|state| !state.template.terminal && state.status.is_settled())
            .filter_map(|state| state.last_result.clone())
            .collect()
    }

    fn sequence_of(&self, key: StepKey) -> u64 {
        self.steps
            .iter()
            .find(|state| state.template.key == key)
            .map_or(0, |state| state.sequence)
    }

    fn invalidate(&mut self, key: StepKey) {
        if let Some(state) = self.steps.iter_mut().find(|state| state.template.key == key) {
            state.status = StepStatus::Pending;
            state.last_result = None;
        }
        match key {
            StepKey::Validation => self.artifacts.validation_warnings.clear(),
            StepKey::AiReports => {
                self.artifacts.reports.clear();
                self.artifacts.report_failures.clear();
            }
            StepKey::StatsCompilation => self.artifacts.statistics = None,
            StepKey::ExportData | StepKey::PlayerHistory | StepKey::FinalArchive => {}
        }
    }

    #[cfg(test)]
    pub(crate) fn force_status(&mut self, key: StepKey, status: StepStatus) {
        if let Some(state) = self.steps.iter_mut().find(|state| state.template.key == key) {
            state.status = status;
        }
    }
}
