use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::response::Response;
use chrono::Utc;

use crate::config::EngineConfig;
use crate::workflows::camp::{CampService, CampSetup};
use crate::workflows::closure::{
    ArchiveRecord, ArchiveStore, CancelSignal, ClosureCollaborators, ExportBundle, ExportSink,
    HistoryStore, PlayerHistoryEntry, ReportArtifact, ReportError, ReportGenerator,
    ReportRequest, SinkError,
};
use crate::workflows::evaluation::{
    CampId, Criterion, CriterionId, EvaluationEvent, Evaluator, EvaluatorId, EventId, Player,
    PlayerId, ScoreSubmission,
};

pub(super) const CAMP: &str = "spring-2025";

#[derive(Default)]
pub(super) struct EchoGenerator {
    pub(super) calls: AtomicUsize,
}

#[async_trait]
impl ReportGenerator for EchoGenerator {
    async fn generate(
        &self,
        request: ReportRequest,
        _cancel: CancelSignal,
    ) -> Result<ReportArtifact, ReportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(ReportArtifact {
            player_id: request.player.id.clone(),
            title: format!("{} evaluation", request.player.name),
            body: format!("tag: {}", request.summary.tag),
            generated_at: Utc::now(),
        })
    }
}

#[derive(Default)]
pub(super) struct MemorySinks {
    pub(super) bundles: Mutex<Vec<ExportBundle>>,
    pub(super) history: Mutex<Vec<PlayerHistoryEntry>>,
    pub(super) archives: Mutex<Vec<ArchiveRecord>>,
}

impl ExportSink for MemorySinks {
    fn export(&self, bundle: ExportBundle) -> Result<(), SinkError> {
        self.bundles.lock().expect("bundles lock").push(bundle);
        Ok(())
    }
}

impl HistoryStore for MemorySinks {
    fn append(&self, entries: Vec<PlayerHistoryEntry>) -> Result<(), SinkError> {
        self.history.lock().expect("history lock").extend(entries);
        Ok(())
    }
}

impl ArchiveStore for MemorySinks {
    fn store(&self, record: &ArchiveRecord) -> Result<(), SinkError> {
        self.archives.lock().expect("archive lock").push(record.clone());
        Ok(())
    }
}

pub(super) struct Fixture {
    pub(super) service: Arc<CampService>,
    pub(super) generator: Arc<EchoGenerator>,
    pub(super) sinks: Arc<MemorySinks>,
}

pub(super) fn fixture() -> Fixture {
    let generator = Arc::new(EchoGenerator::default());
    let sinks = Arc::new(MemorySinks::default());
    let collaborators = ClosureCollaborators {
        reports: generator.clone(),
        exports: sinks.clone(),
        history: sinks.clone(),
        archive: sinks.clone(),
    };
    let service = Arc::new(CampService::new(&EngineConfig::default(), collaborators));
    Fixture {
        service,
        generator,
        sinks,
    }
}

fn criteria() -> Vec<Criterion> {
    vec![
        Criterion {
            id: CriterionId::new("shooting"),
            name: "Shooting".to_string(),
        },
        Criterion {
            id: CriterionId::new("skating"),
            name: "Skating".to_string(),
        },
    ]
}

/// Three players, three evaluators, two events (`day-1` then `day-2`).
pub(super) fn setup() -> CampSetup {
    CampSetup {
        id: CampId::new(CAMP),
        name: "Spring Select Camp".to_string(),
        players: ["Ava Chen", "Ben Ortiz", "Cole Park"]
            .iter()
            .enumerate()
            .map(|(index, name)| Player {
                id: PlayerId::new(format!("p{}", index + 1)),
                name: name.to_string(),
            })
            .collect(),
        evaluators: (1..=3)
            .map(|index| Evaluator {
                id: EvaluatorId::new(format!("e{index}")),
                name: format!("Coach {index}"),
            })
            .collect(),
        events: vec![
            EvaluationEvent {
                id: EventId::new("day-1"),
                name: "Day 1".to_string(),
                criteria: criteria(),
            },
            EvaluationEvent {
                id: EventId::new("day-2"),
                name: "Day 2".to_string(),
                criteria: criteria(),
            },
        ],
    }
}

pub(super) fn submission(
    event: &str,
    player: &str,
    evaluator: &str,
    criterion: &str,
    value: f64,
) -> ScoreSubmission {
    ScoreSubmission {
        event_id: EventId::new(event),
        player_id: PlayerId::new(player),
        evaluator_id: EvaluatorId::new(evaluator),
        criterion_id: CriterionId::new(criterion),
        value,
        submitted_at: None,
    }
}

/// Scores every criterion of `event` for `player` from evaluator `e1`.
pub(super) fn score_all(service: &CampService, event: &str, player: &str, value: f64) {
    let camp_id = CampId::new(CAMP);
    for criterion in ["shooting", "skating"] {
        service
            .submit_score(&camp_id, submission(event, player, "e1", criterion, value))
            .expect("score accepted");
    }
}

pub(super) async fn read_json_body(response: Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body bytes");
    serde_json::from_slice(&bytes).expect("json body")
}

pub(super) fn json_body(value: &serde_json::Value) -> Body {
    Body::from(serde_json::to_vec(value).expect("serializable payload"))
}
