//! Busy intervals derived from existing appointments.
//!
//! A service's setup/teardown buffers widen every appointment window before it
//! is subtracted from free time. Buffers belong to the service being booked,
//! not to the staff member.

use chrono::Duration;

use crate::interval::TimeInterval;

/// Widen each window by `buffer_before_minutes` / `buffer_after_minutes`.
///
/// Degenerate results are dropped. Output is sorted by start.
pub fn build_busy<I>(
    windows: I,
    buffer_before_minutes: u32,
    buffer_after_minutes: u32,
) -> Vec<TimeInterval>
where
    I: IntoIterator<Item = TimeInterval>,
{
    let before = Duration::minutes(i64::from(buffer_before_minutes));
    let after = Duration::minutes(i64::from(buffer_after_minutes));

    let mut busy: Vec<TimeInterval> = windows
        .into_iter()
        .map(|w| TimeInterval::new(w.start - before, w.end + after))
        .filter(TimeInterval::is_valid)
        .collect();

    busy.sort();
    busy
}
