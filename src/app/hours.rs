//! Closest forecast hour selection

use crate::app::models::ForecastHourCandidate;

/// Pick the hour closest to `current_hour`.
///
/// Ties go to the candidate seen first, so the result depends on the order the
/// server listed its files in. Returns `None` only for an empty slice.
pub fn resolve_hour(hours: &[u32], current_hour: u32) -> Option<u32> {
    closest_index(hours.iter().copied(), current_hour).map(|index| hours[index])
}

/// Same as [`resolve_hour`] but keeps the href the hour came from
pub fn resolve_candidate(
    candidates: &[ForecastHourCandidate],
    current_hour: u32,
) -> Option<&ForecastHourCandidate> {
    closest_index(candidates.iter().map(|c| c.hour), current_hour).map(|index| &candidates[index])
}

// `Iterator::min_by_key` keeps the last of equal minima; the first one must win here.
fn closest_index(hours: impl Iterator<Item = u32>, current_hour: u32) -> Option<usize> {
    let mut best: Option<(usize, u32)> = None;
    for (index, hour) in hours.enumerate() {
        let distance = hour.abs_diff(current_hour);
        match best {
            Some((_, best_distance)) if best_distance <= distance => {}
            _ => best = Some((index, distance)),
        }
    }
    best.map(|(index, _)| index)
}
