use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use super::domain::{StepResult, StepStatus};
use super::instance::{ClosureArtifacts, ClosureContext};
use super::reports::{generate_reports, ReportRequest};
use super::repository::{ArchiveRecord, ExportBundle, PlayerHistoryEntry};
use super::statistics::CampStatistics;
use crate::workflows::evaluation::{
    summarize_event, EvaluationEvent, PlayerId, PlayerSummary, ScoreSnapshot, SealError,
};

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct StepOutcome {
    pub status: StepStatus,
    pub details: Vec<String>,
}

impl StepOutcome {
    fn completed(details: Vec<String>) -> Self {
        Self {
            status: StepStatus::Completed,
            details,
        }
    }

    fn warning(details: Vec<String>) -> Self {
        Self {
            status: StepStatus::Warning,
            details,
        }
    }

    fn error(detail: impl Into<String>) -> Self {
        Self {
            status: StepStatus::Error,
            details: vec![detail.into()],
        }
    }
}

fn current_summaries<'a>(
    ctx: &ClosureContext<'a>,
    snapshot: &ScoreSnapshot,
) -> Result<(&'a EvaluationEvent, Vec<PlayerSummary>), String> {
    let event = ctx
        .roster
        .current_event()
        .ok_or_else(|| "camp declares no evaluation events".to_string())?;
    let summaries = summarize_event(snapshot, ctx.roster, &event.id, ctx.classifier)
        .ok_or_else(|| format!("event {} is not declared by the camp", event.id))?;
    Ok((event, summaries))
}

fn player_name(ctx: &ClosureContext<'_>, player_id: &PlayerId) -> String {
    ctx.roster
        .player(player_id)
        .map(|player| player.name.clone())
        .unwrap_or_else(|| player_id.to_string())
}

pub(crate) fn validate(
    ctx: &ClosureContext<'_>,
    snapshot: &ScoreSnapshot,
    artifacts: &mut ClosureArtifacts,
) -> StepOutcome {
    let Some(event) = ctx.roster.current_event() else {
        return StepOutcome::error("camp declares no evaluation events");
    };

    let scored: HashSet<&PlayerId> = snapshot
        .for_event(&event.id)
        .map(|record| &record.player_id)
        .collect();

    let missing: Vec<String> = ctx
        .roster
        .players
        .iter()
        .filter(|player| !scored.contains(&player.id))
        .map(|player| {
            format!(
                "{} ({}) has no evaluations for {}",
                player.name, player.id, event.name
            )
        })
        .collect();

    artifacts.validation_warnings = missing.clone();
    if missing.is_empty() {
        StepOutcome::completed(vec![format!(
            "all {} players evaluated for {}",
            ctx.roster.players.len(),
            event.name
        )])
    } else {
        warn!(camp_id = %ctx.camp_id, unevaluated = missing.len(), "players missing evaluations");
        StepOutcome::warning(missing)
    }
}

pub(crate) async fn generate_player_reports(
    ctx: &ClosureContext<'_>,
    snapshot: &ScoreSnapshot,
    artifacts: &mut ClosureArtifacts,
) -> StepOutcome {
    let (event, summaries) = match current_summaries(ctx, snapshot) {
        Ok(current) => current,
        Err(detail) => return StepOutcome::error(detail),
    };

    if summaries.is_empty() {
        return StepOutcome::warning(vec![format!(
            "no evaluated players in {}; no reports requested",
            event.name
        )]);
    }

    let eligible = summaries.len();
    let requests: Vec<ReportRequest> = summaries
        .into_iter()
        .filter(|summary| !artifacts.reports.contains_key(&summary.player_id))
        .filter_map(|summary| {
            let player = ctx.roster.player(&summary.player_id)?.clone();
            let scores = snapshot
                .for_event(&event.id)
                .filter(|record| record.player_id == summary.player_id)
                .cloned()
                .collect();
            Some(ReportRequest {
                camp_id: ctx.camp_id.clone(),
                event_id: event.id.clone(),
                player,
                summary,
                scores,
            })
        })
        .collect();
    let requested = requests.len();

    let batch = generate_reports(
        Arc::clone(&ctx.collaborators.reports),
        requests,
        ctx.settings,
        ctx.cancel,
    )
    .await;

    for artifact in batch.artifacts {
        artifacts
            .reports
            .insert(artifact.player_id.clone(), artifact);
    }
    let available = artifacts.reports.len();

    let mut details = vec![format!(
        "{available} of {eligible} player reports available ({requested} requested this attempt)"
    )];
    details.extend(
        batch
            .failures
            .iter()
            .map(|failure| format!("report for {} failed: {}", failure.player_id, failure.error)),
    );
    let failed = batch.failures.len();
    artifacts.report_failures = batch.failures;

    info!(camp_id = %ctx.camp_id, requested, failed, available, "player reports attempted");
    if failed == 0 {
        StepOutcome::completed(details)
    } else if available > 0 {
        StepOutcome::warning(details)
    } else {
        StepOutcome {
            status: StepStatus::Error,
            details,
        }
    }
}

pub(crate) fn compile_statistics(
    ctx: &ClosureContext<'_>,
    snapshot: &ScoreSnapshot,
    artifacts: &mut ClosureArtifacts,
) -> StepOutcome {
    let (event, summaries) = match current_summaries(ctx, snapshot) {
        Ok(current) => current,
        Err(detail) => return StepOutcome::error(detail),
    };

    if summaries.is_empty() {
        artifacts.statistics = None;
        return StepOutcome::error(format!("no evaluated players in {}", event.name));
    }

    let statistics = CampStatistics::compile(ctx.roster, event, &summaries, snapshot);
    let mut details = vec![format!(
        "{} players evaluated, {} pending",
        statistics.evaluated_players, statistics.pending_players
    )];
    if let Some(average) = statistics.average_overall {
        details.push(format!("camp average {average:.1}"));
    }
    artifacts.statistics = Some(statistics);
    StepOutcome::completed(details)
}

pub(crate) fn export_data(
    ctx: &ClosureContext<'_>,
    snapshot: &ScoreSnapshot,
    artifacts: &ClosureArtifacts,
) -> StepOutcome {
    let Some(statistics) = artifacts.statistics.as_ref() else {
        return StepOutcome::error("statistics unavailable; stats_compilation has not completed");
    };

    let (event, summaries) = match current_summaries(ctx, snapshot) {
        Ok(current) => current,
        Err(detail) => return StepOutcome::error(detail),
    };

    let summaries_csv = match render_summaries_csv(ctx, event, &summaries) {
        Ok(csv) => csv,
        Err(detail) => return StepOutcome::error(detail),
    };
    let statistics_json = match serde_json::to_string_pretty(statistics) {
        Ok(json) => json,
        Err(error) => return StepOutcome::error(format!("statistics serialization failed: {error}")),
    };

    let bundle = ExportBundle {
        camp_id: ctx.camp_id.clone(),
        event_id: event.id.clone(),
        summaries_csv,
        statistics_json,
        generated_at: Utc::now(),
    };

    match ctx.collaborators.exports.export(bundle) {
        Ok(()) => StepOutcome::completed(vec![format!(
            "exported {} player summaries for {}",
            summaries.len(),
            event.name
        )]),
        Err(error) => {
            warn!(camp_id = %ctx.camp_id, %error, "export sink failed");
            StepOutcome::error(format!("export failed: {error}"))
        }
    }
}

fn render_summaries_csv(
    ctx: &ClosureContext<'_>,
    event: &EvaluationEvent,
    summaries: &[PlayerSummary],
) -> Result<String, String> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    let mut header = vec![
        "player_id".to_string(),
        "player_name".to_string(),
        "overall_score".to_string(),
        "max_criterion_spread".to_string(),
        "tag".to_string(),
        "trend".to_string(),
        "previous_overall_score".to_string(),
    ];
    header.extend(event.criteria.iter().map(|criterion| criterion.name.clone()));
    writer
        .write_record(&header)
        .map_err(|error| format!("csv encoding failed: {error}"))?;

    for summary in summaries {
        let mut row = vec![
            summary.player_id.to_string(),
            player_name(ctx, &summary.player_id),
            format!("{:.1}", summary.overall_score),
            format!("{:.1}", summary.max_criterion_spread),
            summary.tag.label().to_string(),
            summary.trend.label().to_string(),
            summary
                .previous_overall_score
                .map(|score| format!("{score:.1}"))
                .unwrap_or_default(),
        ];
        row.extend(event.criteria.iter().map(|criterion| {
            summary
                .per_criterion
                .iter()
                .find(|aggregate| aggregate.criterion_id == criterion.id)
                .map(|aggregate| format!("{:.1}", aggregate.mean))
                .unwrap_or_default()
        }));
        writer
            .write_record(&row)
            .map_err(|error| format!("csv encoding failed: {error}"))?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|error| format!("csv encoding failed: {error}"))?;
    String::from_utf8(bytes).map_err(|error| format!("csv encoding failed: {error}"))
}

pub(crate) fn record_history(ctx: &ClosureContext<'_>, snapshot: &ScoreSnapshot) -> StepOutcome {
    let (event, summaries) = match current_summaries(ctx, snapshot) {
        Ok(current) => current,
        Err(detail) => return StepOutcome::error(detail),
    };

    let recorded_at = Utc::now();
    let entries: Vec<PlayerHistoryEntry> = summaries
        .iter()
        .map(|summary| PlayerHistoryEntry {
            camp_id: ctx.camp_id.clone(),
            event_id: event.id.clone(),
            player_id: summary.player_id.clone(),
            player_name: player_name(ctx, &summary.player_id),
            overall_score: summary.overall_score,
            tag: summary.tag,
            trend: summary.trend,
            recorded_at,
        })
        .collect();
    let count = entries.len();

    match ctx.collaborators.history.append(entries) {
        Ok(()) => StepOutcome::completed(vec![format!("recorded history for {count} players")]),
        Err(error) => {
            warn!(camp_id = %ctx.camp_id, %error, "history store failed");
            StepOutcome::error(format!("history update failed: {error}"))
        }
    }
}

/// Seals the camp against the revision every other step ran on.
pub(crate) fn archive(
    ctx: &ClosureContext<'_>,
    revision: u64,
    artifacts: &mut ClosureArtifacts,
    step_results: Vec<StepResult>,
) -> StepOutcome {
    let Some(event) = ctx.roster.current_event() else {
        return StepOutcome::error("camp declares no evaluation events");
    };

    let warnings: Vec<String> = step_results
        .iter()
        .filter(|result| result.status == StepStatus::Warning)
        .flat_map(|result| {
            result
                .details
                .iter()
                .map(move |detail| format!("{}: {detail}", result.step))
        })
        .collect();

    let statistics = artifacts.statistics.clone();
    let reports = artifacts.reports.values().cloned().collect();
    let sealed = ctx.scores.seal_with(revision, |snapshot| {
        let record = ArchiveRecord {
            camp_id: ctx.camp_id.clone(),
            event_id: event.id.clone(),
            archived_at: Utc::now(),
            summaries: summarize_event(&snapshot, ctx.roster, &event.id, ctx.classifier)
                .unwrap_or_default(),
            statistics,
            step_results,
            warnings,
            reports,
        };
        ctx.collaborators.archive.store(&record).map(|()| record)
    });

    match sealed {
        Ok(record) => {
            let details = vec![format!(
                "archived {} player summaries with {} warnings",
                record.summaries.len(),
                record.warnings.len()
            )];
            info!(camp_id = %ctx.camp_id, "camp archived");
            artifacts.archive = Some(record);
            StepOutcome::completed(details)
        }
        Err(SealError::Aborted(error)) => {
            warn!(camp_id = %ctx.camp_id, %error, "archive write failed; camp stays open");
            StepOutcome::error(format!("archive write failed: {error}"))
        }
        Err(error @ SealError::Moved { .. }) => {
            warn!(camp_id = %ctx.camp_id, %error, "scores changed before the archive was sealed");
            StepOutcome::error(format!("archive not written: {error}"))
        }
        Err(SealError::InProgress) => StepOutcome::error("archive already in progress"),
        Err(SealError::AlreadySealed) => StepOutcome::error("score store is already sealed"),
    }
}
