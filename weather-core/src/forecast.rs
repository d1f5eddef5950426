//! Reduction of 3-hour interval forecasts to one record per calendar day.

use chrono::NaiveDate;

/// Number of days kept by [`reduce_daily`] in normal use.
pub const FORECAST_DAYS: usize = 5;

/// A single interval record from an upstream forecast list.
pub trait IntervalRecord {
    /// Calendar date the record belongs to, if its timestamp is usable.
    fn date(&self) -> Option<NaiveDate>;

    /// Whether the record is the 12:00:00 interval of its day.
    fn is_noon(&self) -> bool;
}

/// Picks one record per calendar date, at most `max_days` of them.
///
/// The first pass takes the first noon record of each date. If that leaves
/// free slots, a second pass takes the first record of every date still
/// missing. The result is ordered by the position where each date first
/// appears in `records`.
///
/// `records` must be ascending in time; upstream lists are.
pub fn reduce_daily<T: IntervalRecord>(records: &[T], max_days: usize) -> Vec<&T> {
    let mut first_seen: Vec<(usize, NaiveDate)> = Vec::new();
    for (idx, record) in records.iter().enumerate() {
        if let Some(date) = record.date() {
            if !first_seen.iter().any(|(_, d)| *d == date) {
                first_seen.push((idx, date));
            }
        }
    }

    let mut picked: Vec<(NaiveDate, usize)> = Vec::new();
    let is_picked = |picked: &[(NaiveDate, usize)], date: NaiveDate| {
        picked.iter().any(|(d, _)| *d == date)
    };

    for (idx, record) in records.iter().enumerate() {
        if picked.len() >= max_days {
            break;
        }
        let Some(date) = record.date() else { continue };
        if record.is_noon() && !is_picked(&picked, date) {
            picked.push((date, idx));
        }
    }

    if picked.len() < max_days {
        for (idx, record) in records.iter().enumerate() {
            if picked.len() >= max_days {
                break;
            }
            let Some(date) = record.date() else { continue };
            if !is_picked(&picked, date) {
                picked.push((date, idx));
            }
        }
    }

    picked.sort_by_key(|(date, _)| {
        first_seen
            .iter()
            .find(|(_, d)| d == date)
            .map(|(first, _)| *first)
            .unwrap_or(usize::MAX)
    });

    picked.into_iter().map(|(_, idx)| &records[idx]).collect()
}
