use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKey {
    Validation,
    AiReports,
    StatsCompilation,
    ExportData,
    PlayerHistory,
    FinalArchive,
}

impl StepKey {
    pub const fn ordered() -> [Self; 6] {
        [
            Self::Validation,
            Self::AiReports,
            Self::StatsCompilation,
            Self::ExportData,
            Self::PlayerHistory,
            Self::FinalArchive,
        ]
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::AiReports => "ai_reports",
            Self::StatsCompilation => "stats_compilation",
            Self::ExportData => "export_data",
            Self::PlayerHistory => "player_history",
            Self::FinalArchive => "final_archive",
        }
    }
}

impl fmt::Display for StepKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StepKey {
    type Err = ClosureError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase().replace('-', "_");
        Self::ordered()
            .into_iter()
            .find(|key| key.as_str() == normalized)
            .ok_or_else(|| ClosureError::UnknownStep(value.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Pending,
    InProgress,
    Completed,
    Warning,
    Error,
}

impl StepStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::InProgress => "In Progress",
            Self::Completed => "Completed",
            Self::Warning => "Completed with warnings",
            Self::Error => "Error",
        }
    }

    /// The step ran to an outcome, good or bad. Dependents may start.
    pub const fn is_settled(self) -> bool {
        matches!(self, Self::Completed | Self::Warning | Self::Error)
    }

    /// The outcome is acceptable for archival.
    pub const fn is_resolved(self) -> bool {
        matches!(self, Self::Completed | Self::Warning)
    }
}

#[derive(Debug, Clone)]
pub struct StepTemplate {
    pub key: StepKey,
    pub name: &'static str,
    pub required: bool,
    /// Gated by every other required step instead of `depends_on`.
    pub terminal: bool,
    pub depends_on: Vec<StepKey>,
    pub description: &'static str,
}

/// Outcome of one step execution. Cached replays carry `cached = true`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepResult {
    pub step: StepKey,
    pub status: StepStatus,
    pub details: Vec<String>,
    pub attempt: u32,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub cached: bool,
}

impl StepResult {
    pub(crate) fn replayed(&self) -> Self {
        Self {
            cached: true,
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClosureError {
    #[error("unknown closure step '{0}'")]
    UnknownStep(String),
    #[error("step {step} is waiting on {}", join_keys(.waiting_on))]
    StepNotReady {
        step: StepKey,
        waiting_on: Vec<StepKey>,
    },
    #[error("camp is archived; step {0} can no longer run")]
    Archived(StepKey),
}

fn join_keys(keys: &[StepKey]) -> String {
    keys.iter()
        .map(|key| key.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}
