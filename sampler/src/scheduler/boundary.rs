use chrono::{DateTime, Duration, Utc};

const NANOS_PER_SEC: i64 = 1_000_000_000;
const HOUR_NANOS: i64 = 3_600 * NANOS_PER_SEC;

/// Smallest instant `>= now` that sits a whole multiple of `interval_minutes`
/// past the top of an hour.
///
/// Intervals that do not divide the hour restart at the next top of the hour,
/// e.g. with 25 minutes the marks are :00, :25, :50, then :00 again.
pub fn next_boundary(now: DateTime<Utc>, interval_minutes: u32) -> DateTime<Utc> {
    let step = i64::from(interval_minutes.clamp(1, 60)) * 60 * NANOS_PER_SEC;

    let secs_into_hour = now.timestamp().rem_euclid(3_600);
    let into_hour = secs_into_hour * NANOS_PER_SEC + i64::from(now.timestamp_subsec_nanos());
    let hour_start = now - Duration::nanoseconds(into_hour);

    let marks = (into_hour + step - 1) / step;
    let offset = (marks * step).min(HOUR_NANOS);

    hour_start + Duration::nanoseconds(offset)
}

/// The scheduler's only mutable state: the spacing and the last boundary it fired on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleState {
    pub interval_minutes: u32,
    pub last_fire: Option<DateTime<Utc>>,
}

impl ScheduleState {
    pub fn new(interval_minutes: u32) -> Self {
        Self {
            interval_minutes,
            last_fire: None,
        }
    }

    /// Next boundary computed from the current wall clock.
    ///
    /// Never returns a boundary at or before the last one fired, so a tick
    /// that finishes on (or, with a stepped clock, before) its own mark does
    /// not fire twice. Boundaries missed during an overrun are dropped.
    pub fn next_fire(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let next = next_boundary(now, self.interval_minutes);
        match self.last_fire {
            Some(last) if next <= last => {
                next_boundary(last + Duration::nanoseconds(1), self.interval_minutes)
            }
            _ => next,
        }
    }

    pub fn record_fire(&mut self, fire_at: DateTime<Utc>) {
        self.last_fire = Some(fire_at);
    }
}
