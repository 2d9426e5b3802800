//! Weekly rule expansion -- turns recurring availability rules into concrete,
//! timezone-anchored intervals for one calendar day.
//!
//! Time-of-day fields are resolved in the named timezone for the specific
//! calendar date, so a 09:00 rule is 09:00 on the wall clock on both sides of a
//! DST transition. Nothing here consults the host's locale or default zone.

use chrono::{Datelike, Days, NaiveDate, NaiveTime};
use chrono_tz::Tz;

use crate::dst::{resolve_local, DstPolicy};
use crate::interval::TimeInterval;
use crate::model::AvailabilityRule;

/// The half-open window `[local midnight of date, local midnight of date + 1)`.
///
/// On DST transition days the window is 23 or 25 hours long.
pub fn day_window(date: NaiveDate, tz: Tz) -> TimeInterval {
    let start_of = |d: NaiveDate| {
        resolve_local(d.and_time(NaiveTime::MIN), tz, DstPolicy::ShiftForward)
            .unwrap_or_else(|| d.and_time(NaiveTime::MIN).and_utc())
    };
    let next = date.checked_add_days(Days::new(1)).unwrap_or(date);
    TimeInterval::new(start_of(date), start_of(next))
}

/// Weekday number with 0 = Sunday through 6 = Saturday.
pub fn weekday_index(date: NaiveDate) -> u8 {
    date.weekday().num_days_from_sunday() as u8
}

/// Expand `rules` into absolute intervals for the day covered by `day`.
///
/// Only active rules whose weekday matches `day.start` (as seen in `tz`) are
/// used. Each rule's times are projected onto that local date; rules whose end
/// does not follow their start are dropped, and the results are clipped to
/// `day`. Output is sorted by start.
pub fn expand_rules(rules: &[AvailabilityRule], day: &TimeInterval, tz: Tz) -> Vec<TimeInterval> {
    expand_rules_with_policy(rules, day, tz, DstPolicy::default())
}

/// Identical to [`expand_rules`] with an explicit policy for rule boundaries
/// that fall inside a spring-forward gap.
pub fn expand_rules_with_policy(
    rules: &[AvailabilityRule],
    day: &TimeInterval,
    tz: Tz,
    policy: DstPolicy,
) -> Vec<TimeInterval> {
    let local_date = day.start.with_timezone(&tz).date_naive();
    let weekday = weekday_index(local_date);

    let mut intervals: Vec<TimeInterval> = rules
        .iter()
        .filter(|rule| rule.active && rule.weekday == weekday)
        .filter_map(|rule| {
            let start = resolve_local(local_date.and_time(rule.start_time), tz, policy)?;
            let end = resolve_local(local_date.and_time(rule.end_time), tz, policy)?;
            Some(TimeInterval::new(start, end))
        })
        .filter(TimeInterval::is_valid)
        .filter_map(|interval| interval.clip(day))
        .collect();

    intervals.sort();
    intervals
}
