use std::io::Cursor;

use axum::http::StatusCode;
use chrono::{TimeZone, Utc};

use super::common::{fixture, score_all, setup, submission, CAMP};
use crate::workflows::camp::CampError;
use crate::workflows::closure::{CancelSignal, ClosureError, StepKey, StepStatus};
use crate::workflows::evaluation::{
    CampId, CriterionId, EventId, PlayerId, Tag, Trend, UpsertOutcome, ValidationError,
};

fn camp_id() -> CampId {
    CampId::new(CAMP)
}

#[test]
fn create_camp_rejects_duplicates_and_unscorable_setups() {
    let fixture = fixture();
    let view = fixture.service.create_camp(setup()).expect("camp created");
    assert_eq!(view.current_event, Some(EventId::new("day-2")));
    assert_eq!(view.scores_recorded, 0);
    assert!(!view.is_archived);

    let duplicate = fixture.service.create_camp(setup()).expect_err("duplicate id");
    assert!(matches!(duplicate, CampError::Conflict(_)));
    assert_eq!(duplicate.status_code(), StatusCode::CONFLICT);

    let mut no_events = setup();
    no_events.id = CampId::new("empty");
    no_events.events.clear();
    let invalid = fixture.service.create_camp(no_events).expect_err("no events");
    assert!(matches!(invalid, CampError::InvalidSetup(_)));
    assert_eq!(invalid.status_code(), StatusCode::UNPROCESSABLE_ENTITY);

    let mut doubled = setup();
    doubled.id = CampId::new("doubled");
    let first = doubled.players[0].clone();
    doubled.players.push(first);
    match fixture.service.create_camp(doubled) {
        Err(CampError::InvalidSetup(reason)) => assert_eq!(reason, "duplicate player id 'p1'"),
        other => panic!("expected invalid setup, got {other:?}"),
    }

    assert_eq!(fixture.service.camp_count(), 1);
}

#[test]
fn summary_matches_worked_example() {
    let fixture = fixture();
    fixture.service.create_camp(setup()).expect("camp created");

    for evaluator in ["e1", "e2", "e3"] {
        fixture
            .service
            .submit_score(
                &camp_id(),
                submission("day-2", "p1", evaluator, "shooting", 4.0),
            )
            .expect("shooting accepted");
    }
    fixture
        .service
        .submit_score(&camp_id(), submission("day-2", "p1", "e1", "skating", 5.0))
        .expect("skating accepted");

    let summary = fixture
        .service
        .get_player_summary(&camp_id(), &EventId::new("day-2"), &PlayerId::new("p1"))
        .expect("summary available");

    assert_eq!(summary.overall_score, 4.5);
    assert_eq!(summary.max_criterion_spread, 0.0);
    assert_eq!(summary.tag, Tag::Cemented);
    assert_eq!(summary.trend, Trend::Unknown);
    assert_eq!(summary.sample_count(), 4);

    let view = fixture.service.camp_view(&camp_id()).expect("camp view");
    assert_eq!(view.scores_recorded, 4);
}

#[test]
fn trend_compares_against_the_prior_event() {
    let fixture = fixture();
    fixture.service.create_camp(setup()).expect("camp created");
    score_all(&fixture.service, "day-1", "p1", 3.0);
    score_all(&fixture.service, "day-2", "p1", 4.0);
    score_all(&fixture.service, "day-1", "p2", 4.0);
    score_all(&fixture.service, "day-2", "p2", 4.0);

    let summaries = fixture
        .service
        .get_camp_summaries(&camp_id(), &EventId::new("day-2"))
        .expect("summaries");
    assert_eq!(summaries.len(), 2);

    let p1 = &summaries[0];
    assert_eq!(p1.player_id, PlayerId::new("p1"));
    assert_eq!(p1.trend, Trend::Up);
    assert_eq!(p1.previous_overall_score, Some(3.0));

    let p2 = &summaries[1];
    assert_eq!(p2.trend, Trend::Stable);
}

#[test]
fn resubmission_keeps_one_sample_with_the_later_value() {
    let fixture = fixture();
    fixture.service.create_camp(setup()).expect("camp created");

    let mut first = submission("day-2", "p1", "e1", "shooting", 2.0);
    first.submitted_at = Utc.with_ymd_and_hms(2025, 4, 12, 9, 0, 0).single();
    let mut second = submission("day-2", "p1", "e1", "shooting", 5.0);
    second.submitted_at = Utc.with_ymd_and_hms(2025, 4, 12, 9, 5, 0).single();
    let mut late = submission("day-2", "p1", "e1", "shooting", 1.0);
    late.submitted_at = Utc.with_ymd_and_hms(2025, 4, 12, 8, 0, 0).single();

    let service = &fixture.service;
    assert!(matches!(
        service.submit_score(&camp_id(), first),
        Ok(UpsertOutcome::Inserted)
    ));
    assert!(matches!(
        service.submit_score(&camp_id(), second),
        Ok(UpsertOutcome::Replaced)
    ));
    assert!(matches!(
        service.submit_score(&camp_id(), late),
        Ok(UpsertOutcome::Stale)
    ));

    let summary = service
        .get_player_summary(&camp_id(), &EventId::new("day-2"), &PlayerId::new("p1"))
        .expect("summary");
    let shooting = summary
        .per_criterion
        .iter()
        .find(|criterion| criterion.criterion_id == CriterionId::new("shooting"))
        .expect("shooting aggregate");
    assert_eq!(shooting.sample_count, 1);
    assert_eq!(shooting.mean, 5.0);
}

#[test]
fn ingestion_rejects_out_of_range_and_unknown_references() {
    let fixture = fixture();
    fixture.service.create_camp(setup()).expect("camp created");

    let error = fixture
        .service
        .submit_score(&camp_id(), submission("day-2", "p1", "e1", "shooting", 5.5))
        .expect_err("out of range");
    assert!(matches!(
        error,
        CampError::Validation(ValidationError::OutOfRange { .. })
    ));
    assert_eq!(error.status_code(), StatusCode::UNPROCESSABLE_ENTITY);

    let error = fixture
        .service
        .submit_score(&camp_id(), submission("day-2", "p9", "e1", "shooting", 3.0))
        .expect_err("unknown player");
    assert_eq!(error.to_string(), "unknown player reference 'p9'");

    let error = fixture
        .service
        .submit_score(&camp_id(), submission("day-2", "p1", "e1", "passing", 3.0))
        .expect_err("criterion not declared for event");
    assert_eq!(error.to_string(), "unknown criterion reference 'passing'");

    let missing = fixture
        .service
        .submit_score(
            &CampId::new("fall-2025"),
            submission("day-2", "p1", "e1", "shooting", 3.0),
        )
        .expect_err("unknown camp");
    assert!(matches!(missing, CampError::CampNotFound(_)));
    assert_eq!(missing.status_code(), StatusCode::NOT_FOUND);
}

#[test]
fn summary_lookups_distinguish_missing_player_event_and_scores() {
    let fixture = fixture();
    fixture.service.create_camp(setup()).expect("camp created");
    score_all(&fixture.service, "day-2", "p1", 4.0);

    let day_2 = EventId::new("day-2");
    assert!(matches!(
        fixture
            .service
            .get_player_summary(&camp_id(), &day_2, &PlayerId::new("p2")),
        Err(CampError::NotEvaluated { .. })
    ));
    assert!(matches!(
        fixture
            .service
            .get_player_summary(&camp_id(), &day_2, &PlayerId::new("p7")),
        Err(CampError::PlayerNotFound(_))
    ));
    assert!(matches!(
        fixture
            .service
            .get_camp_summaries(&camp_id(), &EventId::new("day-9")),
        Err(CampError::EventNotFound(_))
    ));
}

#[test]
fn import_reports_rejected_rows_without_aborting() {
    let fixture = fixture();
    fixture.service.create_camp(setup()).expect("camp created");

    let sheet = "Event,Player,Evaluator,Criterion,Score,Submitted At\n\
Day 2,Ava Chen,Coach 1,Shooting,4,2025-04-12T09:00:00Z\n\
day-2,p1,e2,skating,5,\n\
day-2,Zed Quinn,e1,shooting,3,\n\
day-2,p2,e1,shooting,7,\n\
day-2,Ava Chen,Coach 1,Shooting,3,2025-04-12T08:00:00Z\n";

    let report = fixture
        .service
        .import_scores(&camp_id(), Cursor::new(sheet))
        .expect("sheet imported");

    assert_eq!(report.accepted, 2);
    assert_eq!(report.stale, 1);
    assert_eq!(report.rejected.len(), 2);
    assert_eq!(report.rejected[0].line, 4);
    assert_eq!(report.rejected[0].reason, "unknown player reference 'Zed Quinn'");
    assert_eq!(report.rejected[1].line, 5);

    let summary = fixture
        .service
        .get_player_summary(&camp_id(), &EventId::new("day-2"), &PlayerId::new("p1"))
        .expect("summary");
    assert_eq!(summary.overall_score, 4.5);
}

#[test]
fn import_aborts_on_malformed_csv() {
    let fixture = fixture();
    fixture.service.create_camp(setup()).expect("camp created");

    let error = fixture
        .service
        .import_scores(
            &camp_id(),
            Cursor::new("Event,Player,Evaluator,Criterion,Score\nday-2,p1\n"),
        )
        .expect_err("ragged sheet");
    assert!(matches!(error, CampError::Import(_)));
    assert_eq!(error.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(
        fixture.service.camp_view(&camp_id()).expect("view").scores_recorded,
        0
    );
}

#[tokio::test]
async fn archive_requires_every_required_step() {
    let fixture = fixture();
    fixture.service.create_camp(setup()).expect("camp created");

    let error = fixture
        .service
        .run_closure_step(&camp_id(), StepKey::FinalArchive, CancelSignal::never())
        .await
        .expect_err("archive gated");
    match &error {
        CampError::Closure(ClosureError::StepNotReady { step, waiting_on }) => {
            assert_eq!(*step, StepKey::FinalArchive);
            assert_eq!(
                waiting_on,
                &vec![
                    StepKey::Validation,
                    StepKey::StatsCompilation,
                    StepKey::ExportData,
                    StepKey::PlayerHistory,
                ]
            );
        }
        other => panic!("expected step not ready, got {other:?}"),
    }
    assert_eq!(error.status_code(), StatusCode::CONFLICT);

    let progress = fixture
        .service
        .get_closure_progress(&camp_id())
        .await
        .expect("progress");
    assert_eq!(progress.completed, 0);
    assert_eq!(progress.total, 6);
    assert!(!progress.can_archive);
}

#[tokio::test]
async fn full_closure_archives_and_latches_the_camp() {
    let fixture = fixture();
    fixture.service.create_camp(setup()).expect("camp created");
    score_all(&fixture.service, "day-1", "p1", 3.0);
    for (player, value) in [("p1", 4.5), ("p2", 3.0), ("p3", 4.0)] {
        score_all(&fixture.service, "day-2", player, value);
    }

    let run = fixture
        .service
        .run_all_closure_steps(&camp_id(), CancelSignal::never())
        .await
        .expect("closure runs");
    assert_eq!(run.halted_on, None);
    assert_eq!(run.results.len(), 5);
    assert!(run
        .results
        .iter()
        .all(|result| result.status == StepStatus::Completed));
    assert_eq!(
        fixture
            .generator
            .calls
            .load(std::sync::atomic::Ordering::SeqCst),
        3
    );

    let progress = fixture
        .service
        .get_closure_progress(&camp_id())
        .await
        .expect("progress");
    assert!(progress.can_archive);
    assert_eq!(progress.completed, 5);

    let archived = fixture
        .service
        .run_closure_step(&camp_id(), StepKey::FinalArchive, CancelSignal::never())
        .await
        .expect("archive runs");
    assert_eq!(archived.status, StepStatus::Completed);

    let records = fixture.sinks.archives.lock().expect("archive lock").clone();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].summaries.len(), 3);
    assert_eq!(records[0].reports.len(), 3);
    assert_eq!(fixture.sinks.bundles.lock().expect("bundles lock").len(), 1);
    assert_eq!(fixture.sinks.history.lock().expect("history lock").len(), 3);

    let rejected = fixture
        .service
        .submit_score(&camp_id(), submission("day-2", "p2", "e2", "shooting", 5.0))
        .expect_err("archived camp is read-only");
    assert!(matches!(rejected, CampError::Archived(_)));

    let import = fixture.service.import_scores(
        &camp_id(),
        Cursor::new("Event,Player,Evaluator,Criterion,Score\nday-2,p2,e2,shooting,5\n"),
    );
    assert!(matches!(import, Err(CampError::Archived(_))));

    let replay = fixture
        .service
        .run_closure_step(&camp_id(), StepKey::Validation, CancelSignal::never())
        .await
        .expect("cached result");
    assert!(replay.cached);
    assert_eq!(replay.status, StepStatus::Completed);

    let view = fixture.service.camp_view(&camp_id()).expect("view");
    assert!(view.is_archived);
    let summaries = fixture
        .service
        .get_camp_summaries(&camp_id(), &EventId::new("day-2"))
        .expect("reads still served");
    assert_eq!(summaries[0].tag, Tag::Cemented);
    assert_eq!(summaries[1].tag, Tag::Overvalued);
}
