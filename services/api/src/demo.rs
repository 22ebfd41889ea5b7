use crate::infra::{in_memory_collaborators, InMemoryCampStorage};
use camp_eval::config::{AppConfig, EngineConfig};
use camp_eval::error::AppError;
use camp_eval::workflows::camp::{CampError, CampService, CampSetup};
use camp_eval::workflows::closure::{CancelSignal, StepKey, StepResult};
use camp_eval::workflows::evaluation::{
    round_one_decimal, CampId, Criterion, CriterionId, EvaluationEvent, Evaluator, EvaluatorId,
    EventId, Player, PlayerId, PlayerSummary, Roster, ScoreSubmission,
};
use camp_eval::workflows::import::{ScoreImportReport, ScoreSheet};
use clap::Args;
use std::io::Cursor;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args, Debug)]
pub(crate) struct CampReportArgs {
    /// CSV score sheet (Event,Player,Evaluator,Criterion,Score[,Submitted At])
    #[arg(long)]
    pub(crate) scores: PathBuf,
    /// Event id or name to summarize. Defaults to the last event in the sheet.
    #[arg(long)]
    pub(crate) event: Option<String>,
    /// Print the summaries as JSON instead of the text listing
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Optional CSV score sheet for the demo roster instead of the scripted scores.
    #[arg(long)]
    pub(crate) scores: Option<PathBuf>,
    /// Stop after the player summaries; do not run the closure workflow.
    #[arg(long)]
    pub(crate) skip_closure: bool,
}

const SHEET_CAMP: &str = "score-sheet";
const DEMO_CAMP: &str = "summer-select-2025";

pub(crate) fn run_camp_report(args: CampReportArgs) -> Result<(), AppError> {
    let CampReportArgs {
        scores,
        event,
        json,
    } = args;

    let engine = AppConfig::load()?.engine;
    let contents = std::fs::read_to_string(&scores)?;
    let roster = ScoreSheet::from_reader(Cursor::new(contents.as_bytes()))?.infer_roster();

    let event_id = match event {
        Some(wanted) => resolve_event(&roster, &wanted)
            .ok_or_else(|| CampError::EventNotFound(EventId::new(wanted)))?,
        None => roster
            .current_event()
            .map(|event| event.id.clone())
            .ok_or_else(|| CampError::InvalidSetup("score sheet has no rows".to_string()))?,
    };

    let storage = InMemoryCampStorage::default();
    let service = CampService::new(&engine, in_memory_collaborators(&storage));
    let camp_id = CampId::new(SHEET_CAMP);
    service.create_camp(CampSetup {
        id: camp_id.clone(),
        name: scores.display().to_string(),
        players: roster.players.clone(),
        evaluators: roster.evaluators.clone(),
        events: roster.events.clone(),
    })?;

    let report = service.import_scores(&camp_id, Cursor::new(contents.as_bytes()))?;
    let summaries = service.get_camp_summaries(&camp_id, &event_id)?;

    if json {
        match serde_json::to_string_pretty(&summaries) {
            Ok(payload) => println!("{payload}"),
            Err(err) => println!("Summary payload unavailable: {}", err),
        }
        return Ok(());
    }

    println!("Score sheet report: {}", scores.display());
    render_import_report(&report);
    render_summaries(&roster, &event_id, &summaries);
    Ok(())
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        scores,
        skip_closure,
    } = args;

    let engine = AppConfig::load().map(|config| config.engine)?;
    let storage = InMemoryCampStorage::default();
    let service = Arc::new(CampService::new(&engine, in_memory_collaborators(&storage)));

    println!("Camp evaluation demo");
    let setup = demo_camp_setup();
    let roster = setup.roster();
    let view = service.create_camp(setup)?;
    println!(
        "- Registered {} ({} players, {} evaluators, {} events)",
        view.name,
        view.players.len(),
        view.evaluators.len(),
        view.events.len()
    );

    let camp_id = view.id.clone();
    match scores {
        Some(path) => {
            let file = std::fs::File::open(&path)?;
            let report = service.import_scores(&camp_id, file)?;
            println!("- Imported {}", path.display());
            render_import_report(&report);
        }
        None => {
            let submissions = scripted_scores(&engine);
            let total = submissions.len();
            for submission in submissions {
                service.submit_score(&camp_id, submission)?;
            }
            println!("- Recorded {total} scripted scores");
        }
    }

    let Some(current) = view.current_event else {
        return Ok(());
    };
    let summaries = service.get_camp_summaries(&camp_id, &current)?;
    render_summaries(&roster, &current, &summaries);

    if skip_closure {
        return Ok(());
    }

    println!("\nClosure workflow");
    let run = service
        .run_all_closure_steps(&camp_id, CancelSignal::never())
        .await?;
    for result in &run.results {
        render_step(result);
    }
    if let Some(step) = run.halted_on {
        println!("  Closure halted on required step {step}; fix the cause and re-run.");
        return Ok(());
    }

    match service
        .run_closure_step(&camp_id, StepKey::FinalArchive, CancelSignal::never())
        .await
    {
        Ok(result) => render_step(&result),
        Err(err) => {
            println!("  Archive unavailable: {}", err);
            return Ok(());
        }
    }

    let progress = service.get_closure_progress(&camp_id).await?;
    println!(
        "- {} of {} steps resolved | archived: {}",
        progress.completed, progress.total, progress.archived
    );

    for bundle in storage.exports() {
        let rows = bundle.summaries_csv.lines().count().saturating_sub(1);
        println!("  Export bundle for {}: {} player rows", bundle.event_id, rows);
    }
    println!("  History entries written: {}", storage.history().len());
    for record in storage.archives() {
        println!(
            "  Archive record: {} summaries, {} reports, {} warnings",
            record.summaries.len(),
            record.reports.len(),
            record.warnings.len()
        );
        if let Some(report) = record.reports.first() {
            println!("  Sample report \"{}\":", report.title);
            for line in report.body.lines() {
                println!("    {line}");
            }
        }
    }

    let late = ScoreSubmission {
        event_id: current,
        player_id: PlayerId::new("p1"),
        evaluator_id: EvaluatorId::new("coach-lee"),
        criterion_id: CriterionId::new("skating"),
        value: engine.scale.max,
        submitted_at: None,
    };
    match service.submit_score(&camp_id, late) {
        Ok(outcome) => println!("  Late score unexpectedly accepted ({outcome:?})"),
        Err(err) => println!("  Late score rejected: {}", err),
    }

    Ok(())
}

fn resolve_event(roster: &Roster, wanted: &str) -> Option<EventId> {
    let wanted = wanted.trim();
    roster
        .events
        .iter()
        .find(|event| {
            event.id.as_str().eq_ignore_ascii_case(wanted) || event.name.eq_ignore_ascii_case(wanted)
        })
        .map(|event| event.id.clone())
}

fn render_import_report(report: &ScoreImportReport) {
    println!(
        "- {} scores accepted ({} replacing earlier values) | {} stale | {} rejected",
        report.accepted,
        report.replaced,
        report.stale,
        report.rejected.len()
    );
    for rejected in &report.rejected {
        println!("  - line {}: {}", rejected.line, rejected.reason);
    }
}

fn render_summaries(roster: &Roster, event_id: &EventId, summaries: &[PlayerSummary]) {
    let event_name = roster
        .event(event_id)
        .map(|event| event.name.as_str())
        .unwrap_or(event_id.as_str());
    println!(
        "\n{} ({} of {} players evaluated)",
        event_name,
        summaries.len(),
        roster.players.len()
    );

    for summary in summaries {
        let name = roster
            .player(&summary.player_id)
            .map(|player| player.name.as_str())
            .unwrap_or(summary.player_id.as_str());
        let previous = summary
            .previous_overall_score
            .map(|score| format!(" (was {:.1})", round_one_decimal(score)))
            .unwrap_or_default();
        println!(
            "- {}: overall {:.1} | max spread {:.1} | tag {} | trend {}{}",
            name,
            round_one_decimal(summary.overall_score),
            round_one_decimal(summary.max_criterion_spread),
            summary.tag,
            summary.trend,
            previous
        );
        for criterion in &summary.per_criterion {
            println!(
                "    - {}: {:.1} (spread {:.1}, {} samples)",
                criterion.criterion_id,
                round_one_decimal(criterion.mean),
                round_one_decimal(criterion.spread),
                criterion.sample_count
            );
        }
    }
}

fn render_step(result: &StepResult) {
    let cached = if result.cached { " [cached]" } else { "" };
    println!(
        "- {} -> {} (attempt {}){}",
        result.step,
        result.status.label(),
        result.attempt,
        cached
    );
    for detail in &result.details {
        println!("    {detail}");
    }
}

fn demo_camp_setup() -> CampSetup {
    let criteria = vec![
        Criterion {
            id: CriterionId::new("shooting"),
            name: "Shooting".to_string(),
        },
        Criterion {
            id: CriterionId::new("skating"),
            name: "Skating".to_string(),
        },
        Criterion {
            id: CriterionId::new("hockey_iq"),
            name: "Hockey IQ".to_string(),
        },
    ];

    CampSetup {
        id: CampId::new(DEMO_CAMP),
        name: "Summer Select Camp 2025".to_string(),
        players: [
            ("p1", "Ava Chen"),
            ("p2", "Ben Ortiz"),
            ("p3", "Cole Park"),
            ("p4", "Dev Shah"),
        ]
        .into_iter()
        .map(|(id, name)| Player {
            id: PlayerId::new(id),
            name: name.to_string(),
        })
        .collect(),
        evaluators: [
            ("coach-lee", "Coach Lee"),
            ("coach-ruiz", "Coach Ruiz"),
            ("scout-kim", "Scout Kim"),
        ]
        .into_iter()
        .map(|(id, name)| Evaluator {
            id: EvaluatorId::new(id),
            name: name.to_string(),
        })
        .collect(),
        events: vec![
            EvaluationEvent {
                id: EventId::new("week-1"),
                name: "Week 1".to_string(),
                criteria: criteria.clone(),
            },
            EvaluationEvent {
                id: EventId::new("week-2"),
                name: "Week 2".to_string(),
                criteria,
            },
        ],
    }
}

/// Scores authored on the 1-5 reference scale and mapped onto the configured
/// scale so the demo tags come out the same on a 1-10 deployment.
fn scripted_scores(engine: &EngineConfig) -> Vec<ScoreSubmission> {
    // (player, event, reference score); Ben's week-2 shooting is split below.
    let plan = [
        ("p1", "week-1", 3.5),
        ("p1", "week-2", 4.5),
        ("p2", "week-1", 4.0),
        ("p2", "week-2", 4.0),
        ("p3", "week-1", 3.0),
        ("p3", "week-2", 3.0),
        ("p4", "week-2", 3.8),
    ];
    let evaluators = ["coach-lee", "coach-ruiz", "scout-kim"];
    let criteria = ["shooting", "skating", "hockey_iq"];

    let mut submissions = Vec::new();
    for (player, event, reference) in plan {
        for (index, evaluator) in evaluators.iter().enumerate() {
            for criterion in criteria {
                let reference = match (player, event, criterion) {
                    ("p2", "week-2", "shooting") => [5.0, 5.0, 1.0][index],
                    _ => reference,
                };
                submissions.push(ScoreSubmission {
                    event_id: EventId::new(event),
                    player_id: PlayerId::new(player),
                    evaluator_id: EvaluatorId::new(*evaluator),
                    criterion_id: CriterionId::new(criterion),
                    value: engine.scale.rescale_level(reference),
                    submitted_at: None,
                });
            }
        }
    }
    submissions
}
