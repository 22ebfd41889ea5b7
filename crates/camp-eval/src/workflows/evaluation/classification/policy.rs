use super::config::ClassificationThresholds;
use super::Tag;

/// First matching rule wins. Evaluator disagreement outranks a high average,
/// so a disputed player is never cemented.
pub(crate) fn decide_tag(
    overall_score: f64,
    max_spread: f64,
    thresholds: &ClassificationThresholds,
) -> Tag {
    if max_spread > thresholds.high_spread {
        return Tag::Watch;
    }

    if overall_score >= thresholds.high_score {
        return Tag::Cemented;
    }

    if overall_score < thresholds.low_score {
        return Tag::Overvalued;
    }

    Tag::None
}
