//! Gated, idempotent closure of a camp: validation through archival.

mod blueprint;
mod domain;
mod instance;
mod reports;
mod repository;
mod statistics;
mod steps;

#[cfg(test)]
mod tests;

pub use blueprint::ClosureBlueprint;
pub use domain::{ClosureError, StepKey, StepResult, StepStatus, StepTemplate};
pub use instance::{
    ClosureArtifacts, ClosureContext, ClosureProgress, ClosureRun, ClosureWorkflow, StepView,
};
pub use reports::{
    cancel_pair, CancelHandle, CancelSignal, ReportArtifact, ReportError,
    ReportFailure, ReportGenerator, ReportRequest, ReportSettings,
};
pub use repository::{
    ArchiveRecord, ArchiveStore, ClosureCollaborators, ExportBundle, ExportSink, HistoryStore,
    PlayerHistoryEntry, SinkError,
};
pub use statistics::{CampStatistics, CriterionStatistics, EvaluatorParticipation};
