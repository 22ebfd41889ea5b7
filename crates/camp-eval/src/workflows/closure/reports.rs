//! Report generator contract and the bounded fan-out used by `ai_reports`.
//!
//! Each player gets one call. Calls share a semaphore sized by
//! [`ReportSettings::max_concurrency`], each is wrapped in
//! [`ReportSettings::timeout`], and all of them observe the caller's
//! [`CancelSignal`]. Failures are collected per player; one player's failure
//! never aborts the others.

use std::future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{watch, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::workflows::evaluation::{CampId, EventId, Player, PlayerId, PlayerSummary, ScoreRecord};

/// Produces a narrative report for one player. Implementations must return
/// promptly once `cancel` fires.
#[async_trait]
pub trait ReportGenerator: Send + Sync {
    async fn generate(
        &self,
        request: ReportRequest,
        cancel: CancelSignal,
    ) -> Result<ReportArtifact, ReportError>;
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportRequest {
    pub camp_id: CampId,
    pub event_id: EventId,
    pub player: Player,
    pub summary: PlayerSummary,
    pub scores: Vec<ScoreRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportArtifact {
    pub player_id: PlayerId,
    pub title: String,
    pub body: String,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReportError {
    #[error("report generation failed: {0}")]
    Failed(String),
    #[error("report generation timed out after {}ms", .0.as_millis())]
    TimedOut(Duration),
    #[error("report generation was cancelled")]
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportFailure {
    pub player_id: PlayerId,
    pub error: String,
}

#[derive(Debug, Clone)]
pub struct ReportSettings {
    pub timeout: Duration,
    pub max_concurrency: usize,
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_concurrency: 4,
        }
    }
}

/// Receiving half of a cancellation flag. Cloning is cheap.
#[derive(Debug, Clone)]
pub struct CancelSignal {
    rx: watch::Receiver<bool>,
}

impl CancelSignal {
    /// A signal that never fires.
    pub fn never() -> Self {
        let (_tx, rx) = watch::channel(false);
        Self { rx }
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once cancellation is requested. Pends forever if the handle
    /// was dropped without cancelling.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        loop {
            if *rx.borrow_and_update() {
                return;
            }
            if rx.changed().await.is_err() {
                future::pending::<()>().await;
            }
        }
    }
}

impl Default for CancelSignal {
    fn default() -> Self {
        Self::never()
    }
}

#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }
}

pub fn cancel_pair() -> (CancelHandle, CancelSignal) {
    let (tx, rx) = watch::channel(false);
    (CancelHandle { tx }, CancelSignal { rx })
}

#[derive(Debug, Default)]
pub struct ReportBatch {
    pub artifacts: Vec<ReportArtifact>,
    pub failures: Vec<ReportFailure>,
}

pub(crate) async fn generate_reports(
    generator: Arc<dyn ReportGenerator>,
    requests: Vec<ReportRequest>,
    settings: &ReportSettings,
    cancel: &CancelSignal,
) -> ReportBatch {
    let semaphore = Arc::new(Semaphore::new(settings.max_concurrency.max(1)));
    let player_ids: Vec<PlayerId> = requests
        .iter()
        .map(|request| request.player.id.clone())
        .collect();

    let mut join_set = JoinSet::new();
    for (index, request) in requests.into_iter().enumerate() {
        let generator = Arc::clone(&generator);
        let semaphore = Arc::clone(&semaphore);
        let signal = cancel.clone();
        let limit = settings.timeout;

        join_set.spawn(async move {
            let _permit = tokio::select! {
                biased;
                _ = signal.cancelled() => return (index, Err(ReportError::Cancelled)),
                permit = semaphore.acquire_owned() => permit,
            };

            let outcome = tokio::select! {
                biased;
                _ = signal.cancelled() => Err(ReportError::Cancelled),
                result = tokio::time::timeout(limit, generator.generate(request, signal.clone())) => {
                    result.unwrap_or(Err(ReportError::TimedOut(limit)))
                }
            };
            (index, outcome)
        });
    }

    let mut slots: Vec<Option<Result<ReportArtifact, ReportError>>> =
        player_ids.iter().map(|_| None).collect();
    while let Some(joined) = join_set.join_next().await {
        match joined {
            Ok((index, outcome)) => slots[index] = Some(outcome),
            Err(error) => warn!(%error, "report task join error"),
        }
    }

    let mut batch = ReportBatch::default();
    for (player_id, slot) in player_ids.into_iter().zip(slots) {
        let outcome =
            slot.unwrap_or_else(|| Err(ReportError::Failed("report task aborted".to_string())));
        match outcome {
            Ok(mut artifact) => {
                if artifact.player_id != player_id {
                    warn!(
                        requested = %player_id,
                        returned = %artifact.player_id,
                        "report returned for another player; keyed to the request"
                    );
                    artifact.player_id = player_id.clone();
                }
                debug!(player_id = %player_id, "report generated");
                batch.artifacts.push(artifact);
            }
            Err(error) => {
                warn!(player_id = %player_id, %error, "report generation failed");
                batch.failures.push(ReportFailure {
                    player_id,
                    error: error.to_string(),
                });
            }
        }
    }

    batch
}
