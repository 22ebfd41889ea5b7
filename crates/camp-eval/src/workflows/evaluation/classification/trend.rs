use super::Trend;

/// Differences below this are summation noise, not movement.
pub const TREND_TOLERANCE: f64 = 1e-9;

pub(crate) fn compare(current: f64, previous: Option<f64>) -> Trend {
    match previous {
        None => Trend::Unknown,
        Some(previous) if (current - previous).abs() <= TREND_TOLERANCE => Trend::Stable,
        Some(previous) if current > previous => Trend::Up,
        Some(_) => Trend::Down,
    }
}
