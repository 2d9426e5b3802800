//! Resolution of local wall-clock times across DST transitions.

use chrono::{DateTime, Duration, LocalResult, NaiveDateTime, Offset, TimeZone, Utc};
use chrono_tz::Tz;

/// Policy for wall-clock times that do not exist on a given date
/// (e.g. 02:30 on a spring-forward day).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DstPolicy {
    /// Drop the time entirely.
    Skip,
    /// Move forward by the length of the gap (02:30 becomes 03:30).
    #[default]
    ShiftForward,
}

/// Resolve a naive local datetime in `tz` to an absolute instant.
///
/// Ambiguous times (fall-back fold) resolve to the earlier instant. Times in a
/// spring-forward gap are handled according to `policy`.
pub fn resolve_local(naive: NaiveDateTime, tz: Tz, policy: DstPolicy) -> Option<DateTime<Utc>> {
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) => Some(dt.with_timezone(&Utc)),
        LocalResult::Ambiguous(earliest, _) => Some(earliest.with_timezone(&Utc)),
        LocalResult::None => match policy {
            DstPolicy::Skip => None,
            DstPolicy::ShiftForward => shift_past_gap(naive, tz),
        },
    }
}

/// Apply the UTC offset in force just before the gap, which lands the instant
/// exactly `gap` later on the wall clock.
fn shift_past_gap(naive: NaiveDateTime, tz: Tz) -> Option<DateTime<Utc>> {
    // Gaps never exceed a few hours, so 6h earlier is before the transition.
    let before = tz
        .from_local_datetime(&(naive - Duration::hours(6)))
        .earliest()?;
    let offset_secs = i64::from(before.offset().fix().local_minus_utc());
    let utc_naive = naive - Duration::seconds(offset_secs);
    Some(Utc.from_utc_datetime(&utc_naive))
}
