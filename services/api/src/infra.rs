use async_trait::async_trait;
use camp_eval::workflows::closure::{
    ArchiveRecord, ArchiveStore, CancelSignal, ClosureCollaborators, ExportBundle, ExportSink,
    HistoryStore, PlayerHistoryEntry, ReportArtifact, ReportError, ReportGenerator,
    ReportRequest, SinkError,
};
use camp_eval::workflows::evaluation::round_one_decimal;
use chrono::Utc;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Process-local stand-in for the export bucket, history table, and archive.
#[derive(Default, Clone)]
pub(crate) struct InMemoryCampStorage {
    exports: Arc<Mutex<Vec<ExportBundle>>>,
    history: Arc<Mutex<Vec<PlayerHistoryEntry>>>,
    archives: Arc<Mutex<Vec<ArchiveRecord>>>,
}

fn lock<'a, T>(mutex: &'a Mutex<T>, name: &str) -> Result<MutexGuard<'a, T>, SinkError> {
    mutex
        .lock()
        .map_err(|_| SinkError::Unavailable(format!("{name} mutex poisoned")))
}

impl ExportSink for InMemoryCampStorage {
    fn export(&self, bundle: ExportBundle) -> Result<(), SinkError> {
        lock(&self.exports, "export")?.push(bundle);
        Ok(())
    }
}

impl HistoryStore for InMemoryCampStorage {
    fn append(&self, entries: Vec<PlayerHistoryEntry>) -> Result<(), SinkError> {
        lock(&self.history, "history")?.extend(entries);
        Ok(())
    }
}

impl ArchiveStore for InMemoryCampStorage {
    fn store(&self, record: &ArchiveRecord) -> Result<(), SinkError> {
        let mut guard = lock(&self.archives, "archive")?;
        if guard
            .iter()
            .any(|existing| existing.camp_id == record.camp_id)
        {
            return Err(SinkError::Rejected(format!(
                "camp {} is already archived",
                record.camp_id
            )));
        }
        guard.push(record.clone());
        Ok(())
    }
}

impl InMemoryCampStorage {
    pub(crate) fn exports(&self) -> Vec<ExportBundle> {
        lock(&self.exports, "export")
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    pub(crate) fn history(&self) -> Vec<PlayerHistoryEntry> {
        lock(&self.history, "history")
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    pub(crate) fn archives(&self) -> Vec<ArchiveRecord> {
        lock(&self.archives, "archive")
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }
}

/// Deterministic narrative built from the player summary; no model calls.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct TemplateReportGenerator;

#[async_trait]
impl ReportGenerator for TemplateReportGenerator {
    async fn generate(
        &self,
        request: ReportRequest,
        cancel: CancelSignal,
    ) -> Result<ReportArtifact, ReportError> {
        if cancel.is_cancelled() {
            return Err(ReportError::Cancelled);
        }

        let summary = &request.summary;
        let mut body = format!(
            "{} finished {} with an overall score of {:.1} ({} evaluator samples).\n",
            request.player.name,
            request.event_id,
            round_one_decimal(summary.overall_score),
            summary.sample_count()
        );
        for criterion in &summary.per_criterion {
            body.push_str(&format!(
                "- {}: {:.1} (spread {:.1}, {} samples)\n",
                criterion.criterion_id,
                round_one_decimal(criterion.mean),
                round_one_decimal(criterion.spread),
                criterion.sample_count
            ));
        }
        body.push_str(&format!(
            "Classification: {}. Trend since previous evaluation: {}.",
            summary.tag, summary.trend
        ));

        Ok(ReportArtifact {
            player_id: request.player.id.clone(),
            title: format!("{} - {}", request.player.name, request.event_id),
            body,
            generated_at: Utc::now(),
        })
    }
}

pub(crate) fn in_memory_collaborators(storage: &InMemoryCampStorage) -> ClosureCollaborators {
    let storage = Arc::new(storage.clone());
    ClosureCollaborators {
        reports: Arc::new(TemplateReportGenerator),
        exports: storage.clone(),
        history: storage.clone(),
        archive: storage,
    }
}
