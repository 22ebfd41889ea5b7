use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};

use crate::workflows::closure::{
    ArchiveRecord, ArchiveStore, CancelSignal, ClosureBlueprint, ClosureCollaborators,
    ClosureContext, ClosureWorkflow, ExportBundle, ExportSink, HistoryStore, PlayerHistoryEntry,
    ReportArtifact, ReportError, ReportGenerator, ReportRequest, ReportSettings, SinkError,
};
use crate::workflows::evaluation::{
    CampId, ClassificationEngine, Criterion, CriterionId, EvaluationEvent, Evaluator,
    EvaluatorId, EventId, Player, PlayerId, Roster, ScoreRecord, ScoreStore,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Behavior {
    Succeed,
    Fail,
    Hang,
    /// Succeeds but stamps the artifact with `p1`'s id.
    ClaimsFirstPlayer,
}

/// Generator whose per-player behavior can be changed between attempts.
#[derive(Default)]
pub(super) struct ScriptedGenerator {
    behaviors: Mutex<HashMap<PlayerId, Behavior>>,
    calls: Mutex<HashMap<PlayerId, usize>>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl ScriptedGenerator {
    pub(super) fn set(&self, player: &str, behavior: Behavior) {
        self.behaviors
            .lock()
            .expect("behaviors lock")
            .insert(PlayerId::new(player), behavior);
    }

    pub(super) fn calls(&self, player: &str) -> usize {
        self.calls
            .lock()
            .expect("calls lock")
            .get(&PlayerId::new(player))
            .copied()
            .unwrap_or(0)
    }

    pub(super) fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ReportGenerator for ScriptedGenerator {
    async fn generate(
        &self,
        request: ReportRequest,
        cancel: CancelSignal,
    ) -> Result<ReportArtifact, ReportError> {
        let player_id = request.player.id.clone();
        *self
            .calls
            .lock()
            .expect("calls lock")
            .entry(player_id.clone())
            .or_default() += 1;
        let behavior = self
            .behaviors
            .lock()
            .expect("behaviors lock")
            .get(&player_id)
            .copied()
            .unwrap_or(Behavior::Succeed);

        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(current, Ordering::SeqCst);

        let outcome = match behavior {
            Behavior::ClaimsFirstPlayer => Ok(ReportArtifact {
                player_id: PlayerId::new("p1"),
                title: format!("{} camp report", request.player.name),
                body: "misfiled".to_string(),
                generated_at: Utc::now(),
            }),
            Behavior::Succeed => {
                tokio::time::sleep(Duration::from_millis(10)).await;
                Ok(ReportArtifact {
                    player_id: player_id.clone(),
                    title: format!("{} camp report", request.player.name),
                    body: format!(
                        "Overall {:.1}, tagged {}",
                        request.summary.overall_score, request.summary.tag
                    ),
                    generated_at: Utc::now(),
                })
            }
            Behavior::Fail => Err(ReportError::Failed("model unavailable".to_string())),
            Behavior::Hang => {
                tokio::select! {
                    _ = cancel.cancelled() => Err(ReportError::Cancelled),
                    _ = tokio::time::sleep(Duration::from_secs(30)) => {
                        Err(ReportError::Failed("hung generator finished".to_string()))
                    }
                }
            }
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        outcome
    }
}

#[derive(Default)]
pub(super) struct RecordingExports {
    pub(super) bundles: Mutex<Vec<ExportBundle>>,
    pub(super) fail: AtomicBool,
}

impl ExportSink for RecordingExports {
    fn export(&self, bundle: ExportBundle) -> Result<(), SinkError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(SinkError::Unavailable("export bucket offline".to_string()));
        }
        self.bundles.lock().expect("exports lock").push(bundle);
        Ok(())
    }
}

#[derive(Default)]
pub(super) struct RecordingHistory {
    pub(super) entries: Mutex<Vec<PlayerHistoryEntry>>,
}

impl HistoryStore for RecordingHistory {
    fn append(&self, entries: Vec<PlayerHistoryEntry>) -> Result<(), SinkError> {
        self.entries.lock().expect("history lock").extend(entries);
        Ok(())
    }
}

#[derive(Default)]
pub(super) struct RecordingArchive {
    pub(super) records: Mutex<Vec<ArchiveRecord>>,
    pub(super) fail: AtomicBool,
}

impl ArchiveStore for RecordingArchive {
    fn store(&self, record: &ArchiveRecord) -> Result<(), SinkError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(SinkError::Rejected("archive quota exceeded".to_string()));
        }
        self.records.lock().expect("archive lock").push(record.clone());
        Ok(())
    }
}

pub(super) struct Harness {
    pub(super) camp_id: CampId,
    pub(super) roster: Roster,
    pub(super) scores: ScoreStore,
    pub(super) classifier: ClassificationEngine,
    pub(super) settings: ReportSettings,
    pub(super) generator: Arc<ScriptedGenerator>,
    pub(super) exports: Arc<RecordingExports>,
    pub(super) history: Arc<RecordingHistory>,
    pub(super) archive: Arc<RecordingArchive>,
    pub(super) collaborators: ClosureCollaborators,
}

impl Harness {
    /// `players` rostered (p1..pN) on a single event with two criteria.
    pub(super) fn with_players(players: usize) -> Self {
        let generator = Arc::new(ScriptedGenerator::default());
        let exports = Arc::new(RecordingExports::default());
        let history = Arc::new(RecordingHistory::default());
        let archive = Arc::new(RecordingArchive::default());
        let collaborators = ClosureCollaborators {
            reports: generator.clone(),
            exports: exports.clone(),
            history: history.clone(),
            archive: archive.clone(),
        };

        let roster = Roster {
            players: (1..=players)
                .map(|index| Player {
                    id: PlayerId::new(format!("p{index}")),
                    name: format!("Skater {index}"),
                })
                .collect(),
            evaluators: vec![
                Evaluator {
                    id: EvaluatorId::new("e1"),
                    name: "Head Coach".to_string(),
                },
                Evaluator {
                    id: EvaluatorId::new("e2"),
                    name: "Assistant".to_string(),
                },
            ],
            events: vec![EvaluationEvent {
                id: EventId::new("summer"),
                name: "Summer Camp".to_string(),
                criteria: vec![
                    Criterion {
                        id: CriterionId::new("shooting"),
                        name: "Shooting".to_string(),
                    },
                    Criterion {
                        id: CriterionId::new("skating"),
                        name: "Skating".to_string(),
                    },
                ],
            }],
        };

        Self {
            camp_id: CampId::new("camp-2025"),
            roster,
            scores: ScoreStore::new(),
            classifier: ClassificationEngine::default(),
            settings: ReportSettings {
                timeout: Duration::from_secs(2),
                max_concurrency: 2,
            },
            generator,
            exports,
            history,
            archive,
            collaborators,
        }
    }

    /// Scores both criteria for `player` from both evaluators.
    pub(super) fn score(&self, player: &str, value: f64) {
        self.score_at(player, value, 0);
    }

    /// Like [`Harness::score`], submitted `minutes` after the first round.
    pub(super) fn score_at(&self, player: &str, value: f64, minutes: i64) {
        for evaluator in ["e1", "e2"] {
            for criterion in ["shooting", "skating"] {
                self.scores
                    .upsert(ScoreRecord {
                        player_id: PlayerId::new(player),
                        evaluator_id: EvaluatorId::new(evaluator),
                        criterion_id: CriterionId::new(criterion),
                        event_id: EventId::new("summer"),
                        value,
                        submitted_at: Utc
                            .with_ymd_and_hms(2025, 7, 1, 10, 0, 0)
                            .single()
                            .expect("valid timestamp")
                            + chrono::Duration::minutes(minutes),
                    })
                    .expect("store open");
            }
        }
    }

    pub(super) fn ctx<'a>(&'a self, cancel: &'a CancelSignal) -> ClosureContext<'a> {
        ClosureContext {
            camp_id: &self.camp_id,
            roster: &self.roster,
            scores: &self.scores,
            classifier: &self.classifier,
            collaborators: &self.collaborators,
            settings: &self.settings,
            cancel,
        }
    }

    pub(super) fn workflow(&self) -> ClosureWorkflow {
        ClosureWorkflow::new(&ClosureBlueprint::standard())
    }
}
