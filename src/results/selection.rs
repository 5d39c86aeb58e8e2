use super::ParsedResult;
use chrono::NaiveDate;
use std::cmp::Reverse;

/// Newest first; equal `date_time`s keep their input order.
pub fn sort_newest_first(results: &mut [ParsedResult]) {
    results.sort_by_key(|r| Reverse(r.date_time()));
}

pub fn select_latest(results: &[ParsedResult]) -> Option<&ParsedResult> {
    // max_by_key returns the last maximum; scan manually to keep the first
    results.iter().fold(None, |best: Option<&ParsedResult>, r| match best {
        Some(b) if b.date_time() >= r.date_time() => Some(b),
        _ => Some(r),
    })
}

/// Picks the result to show for one day: `8pm`, then `6pm`, then `1pm`.
/// When none of those is present the first matching result wins.
pub fn select_for_date(results: &[ParsedResult], date: NaiveDate) -> Option<&ParsedResult> {
    let mut same_day = results.iter().filter(|r| r.date == date);
    let first = same_day.next()?;

    let best = same_day.fold(first, |best, r| {
        if r.time_slot.priority() > best.time_slot.priority() {
            r
        } else {
            best
        }
    });
    Some(best)
}
