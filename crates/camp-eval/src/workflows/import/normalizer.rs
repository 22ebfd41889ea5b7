use crate::workflows::evaluation::{CriterionId, EvaluationEvent};

/// Lower-cased, whitespace-collapsed form used to compare spreadsheet cells.
pub(crate) fn normalize_name(value: &str) -> String {
    let cleaned = value.replace(['\u{feff}', '\u{200b}'], "");
    let collapsed = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed.to_ascii_lowercase()
}

/// Criterion cells may carry the id or the display name.
pub(crate) fn resolve_criterion(event: &EvaluationEvent, cell: &str) -> Option<CriterionId> {
    let trimmed = cell.trim();
    if let Some(criterion) = event.criteria.iter().find(|criterion| criterion.id.as_str() == trimmed) {
        return Some(criterion.id.clone());
    }

    let normalized = normalize_name(trimmed);
    event
        .criteria
        .iter()
        .find(|criterion| {
            normalize_name(&criterion.name) == normalized
                || normalize_name(criterion.id.as_str()) == normalized
        })
        .map(|criterion| criterion.id.clone())
}

/// Stable id derived from a display name ("Puck Handling" -> "puck_handling").
pub(crate) fn slug(value: &str) -> String {
    normalize_name(value).replace(' ', "_")
}
