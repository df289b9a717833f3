//! Percentage arithmetic shared by the calculator and the ranking

/// `part / whole * 100`, or `None` when `whole` is zero
pub fn percentage(part: u64, whole: u64) -> Option<f64> {
    if whole == 0 {
        return None;
    }
    Some(part as f64 * 100.0 / whole as f64)
}

/// Clamp into [0, 100]
pub fn clamp_percent(value: f64) -> f64 {
    value.clamp(0.0, 100.0)
}

/// Progress of `value` through the span `[start, end)`, clamped into [0, 100].
///
/// An empty or inverted span counts as fully reached.
pub fn span_progress(value: i64, start: i64, end: i64) -> f64 {
    let span = end - start;
    if span <= 0 {
        return 100.0;
    }
    clamp_percent((value - start) as f64 * 100.0 / span as f64)
}

/// Share of players ranked strictly below `position` (1-based); 0 with no players
pub fn percentile(position: usize, total: usize) -> f64 {
    if total == 0 || position == 0 {
        return 0.0;
    }
    percentage(total.saturating_sub(position) as u64, total as u64).unwrap_or(0.0)
}
