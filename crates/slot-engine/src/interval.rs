//! Set operations over half-open `[start, end)` time intervals.
//!
//! Intervals whose end does not strictly follow their start are degenerate and
//! are discarded by every operation in this module.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// A half-open time interval between two absolute instants.
///
/// Ordering is by `start`, then by `end`, which makes the type usable as a
/// sorted map key for de-duplicating identical windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TimeInterval {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeInterval {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// `true` when `end` strictly follows `start`.
    pub fn is_valid(&self) -> bool {
        self.end > self.start
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// Two intervals overlap iff `a.start < b.end && b.start < a.end`.
    /// Adjacent intervals (one ends exactly when the other starts) do not overlap.
    pub fn overlaps(&self, other: &TimeInterval) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// `true` when `other` lies entirely within `self`.
    pub fn contains(&self, other: &TimeInterval) -> bool {
        other.start >= self.start && other.end <= self.end
    }

    /// Truncate to the portion inside `window`, or `None` if nothing remains.
    pub fn clip(&self, window: &TimeInterval) -> Option<TimeInterval> {
        let clipped = TimeInterval {
            start: self.start.max(window.start),
            end: self.end.min(window.end),
        };
        clipped.is_valid().then_some(clipped)
    }
}

fn sorted_valid(intervals: &[TimeInterval]) -> Vec<TimeInterval> {
    let mut out: Vec<TimeInterval> = intervals
        .iter()
        .copied()
        .filter(TimeInterval::is_valid)
        .collect();
    out.sort();
    out
}

/// Remove every portion of `base` covered by any interval in `blocks`.
///
/// Both inputs are filtered of degenerate intervals and sorted by start. Each
/// block is applied in turn, splitting every surviving base interval into at
/// most two pieces: the part before the block and the part after it.
///
/// The result is sorted; it is non-overlapping whenever `base` is. Runs in
/// O(|base| × |blocks|). Subtracting the same blocks twice is a no-op.
pub fn subtract(base: &[TimeInterval], blocks: &[TimeInterval]) -> Vec<TimeInterval> {
    let mut result = sorted_valid(base);

    for block in sorted_valid(blocks) {
        let mut next = Vec::with_capacity(result.len() + 1);

        for interval in result {
            if !block.overlaps(&interval) {
                next.push(interval);
                continue;
            }
            if block.start > interval.start {
                next.push(TimeInterval::new(interval.start, block.start));
            }
            if block.end < interval.end {
                next.push(TimeInterval::new(block.end, interval.end));
            }
        }

        result = next;
    }

    // Overlapping base intervals can leave pieces out of order after splitting.
    result.sort();
    result
}

/// Union of the given intervals: a sorted, non-overlapping list where
/// overlapping or adjacent inputs are coalesced.
pub fn merge(intervals: &[TimeInterval]) -> Vec<TimeInterval> {
    let mut merged: Vec<TimeInterval> = Vec::new();

    for interval in sorted_valid(intervals) {
        if let Some(last) = merged.last_mut() {
            if interval.start <= last.end {
                last.end = last.end.max(interval.end);
                continue;
            }
        }
        merged.push(interval);
    }

    merged
}
