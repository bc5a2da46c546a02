// Running segment count and program time, carried across playlist refreshes.

use chrono::{DateTime, TimeDelta, Utc};
use tracing::warn;

/// Cumulative position in the live stream.
///
/// A live playlist only shows a sliding window, so this state is created once
/// per mirror and handed to every parse call. It moves forward with each
/// `#EXTINF` and is reset only by `#EXT-X-MEDIA-SEQUENCE` (counter) or
/// `#EXT-X-PROGRAM-DATE-TIME` (clock).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimelineState {
    segment_counter: u64,
    current_timestamp: DateTime<Utc>,
}

impl Default for TimelineState {
    fn default() -> Self {
        Self::new()
    }
}

impl TimelineState {
    pub fn new() -> Self {
        Self::starting_at(0, DateTime::<Utc>::UNIX_EPOCH)
    }

    pub fn starting_at(segment_counter: u64, current_timestamp: DateTime<Utc>) -> Self {
        Self {
            segment_counter,
            current_timestamp,
        }
    }

    pub fn segment_counter(&self) -> u64 {
        self.segment_counter
    }

    pub fn current_timestamp(&self) -> DateTime<Utc> {
        self.current_timestamp
    }

    /// Counter and program time as one value, as stamped onto a segment.
    pub fn snapshot(&self) -> (u64, DateTime<Utc>) {
        (self.segment_counter, self.current_timestamp)
    }

    /// Resync the counter to the sequence number the server reports.
    pub fn set_media_sequence(&mut self, sequence: u64) {
        self.segment_counter = sequence;
    }

    /// Resync the clock to an absolute program date-time.
    pub fn set_program_time(&mut self, timestamp: DateTime<Utc>) {
        self.current_timestamp = timestamp;
    }

    /// Account for one more segment of the given duration.
    pub fn advance(&mut self, duration: TimeDelta) {
        self.segment_counter = self.segment_counter.saturating_add(1);
        match self.current_timestamp.checked_add_signed(duration) {
            Some(ts) => self.current_timestamp = ts,
            None => warn!(
                timestamp = %self.current_timestamp,
                "Program time overflow, keeping previous timestamp"
            ),
        }
    }
}

/// Convert an `#EXTINF` duration in seconds to a `TimeDelta`.
///
/// Returns `None` for negative or non-finite values.
pub fn segment_duration(seconds: f64) -> Option<TimeDelta> {
    if !seconds.is_finite() || seconds < 0.0 {
        return None;
    }
    let nanos = (seconds * 1_000_000_000.0).round();
    if nanos > i64::MAX as f64 {
        return None;
    }
    Some(TimeDelta::nanoseconds(nanos as i64))
}
