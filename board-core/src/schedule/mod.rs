//! Time-of-day action scheduling.
//!
//! The board runs a small set of background jobs at fixed local times every
//! day (update checks, night-mode transitions) alongside purely periodic work
//! (traffic-data refresh, brightness sampling). This module holds the schedule
//! table and the wraparound next-deadline computation; the firmware's action
//! worker owns the timers and dispatch.

/// Seconds in one wall-clock day.
pub const SECONDS_PER_DAY: u32 = 86_400;

/// Seconds between periodic traffic-data refreshes.
pub const UPDATE_DATA_PERIOD_SECS: u32 = 20 * 60;

/// Seconds between ambient-brightness samples.
pub const UPDATE_BRIGHTNESS_PERIOD_SECS: u32 = 2;

const fn hours(h: u32) -> u32 {
    h * 60 * 60
}

/// Background jobs the action worker can dispatch.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ActionKind {
    /// Refresh traffic data from the upstream source.
    UpdateData,
    /// Re-sample ambient light and adjust global LED current.
    UpdateBrightness,
    /// Ask the update collaborator whether new firmware is available.
    QueryUpdate,
    /// Engage the night-mode refresh lock.
    EnterNightMode,
    /// Release the night-mode refresh lock.
    ExitNightMode,
    /// Sentinel reported for an empty schedule; never dispatched.
    NoneScheduled,
}

impl ActionKind {
    /// Short name used in log lines.
    pub const fn label(self) -> &'static str {
        match self {
            ActionKind::UpdateData => "update-data",
            ActionKind::UpdateBrightness => "update-brightness",
            ActionKind::QueryUpdate => "query-update",
            ActionKind::EnterNightMode => "enter-night-mode",
            ActionKind::ExitNightMode => "exit-night-mode",
            ActionKind::NoneScheduled => "none-scheduled",
        }
    }
}

/// An action plus the local times of day it is scheduled to run.
///
/// Tables are immutable and defined at startup. Every entry of `times` must be
/// in `[0, SECONDS_PER_DAY)`.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ScheduledAction {
    pub kind: ActionKind,
    pub times: &'static [u32],
}

impl ScheduledAction {
    pub const fn new(kind: ActionKind, times: &'static [u32]) -> Self {
        Self { kind, times }
    }
}

/// Update-availability checks run at midnight, late morning, and late
/// afternoon so a pending release is caught within hours.
pub const QUERY_UPDATE_TIMES: [u32; 3] = [hours(0), hours(11), hours(17)];

/// Night mode runs 21:00 to 05:00 local time.
pub const ENTER_NIGHT_MODE_TIMES: [u32; 1] = [hours(21)];
pub const EXIT_NIGHT_MODE_TIMES: [u32; 1] = [hours(5)];

/// The daily schedule table used by the firmware action worker.
///
/// Actions are armed one at a time; two entries scheduled close together may
/// cause the later one to be skipped for the day.
pub const DAILY_SCHEDULE: [ScheduledAction; 3] = [
    ScheduledAction::new(ActionKind::QueryUpdate, &QUERY_UPDATE_TIMES),
    ScheduledAction::new(ActionKind::EnterNightMode, &ENTER_NIGHT_MODE_TIMES),
    ScheduledAction::new(ActionKind::ExitNightMode, &EXIT_NIGHT_MODE_TIMES),
];

/// A local wall-clock time of day.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct TimeOfDay {
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

impl TimeOfDay {
    pub const fn new(hour: u8, minute: u8, second: u8) -> Self {
        Self {
            hour,
            minute,
            second,
        }
    }

    /// Seconds elapsed since local midnight.
    pub const fn day_seconds(self) -> u32 {
        self.hour as u32 * 60 * 60 + self.minute as u32 * 60 + self.second as u32
    }
}

/// Source of synchronized local wall-clock time.
///
/// A failed read surfaces as `Err` before any deadline math runs, so a clock
/// fault can never be confused with "zero seconds until the next action".
pub trait WallClock {
    type Error;

    fn time_of_day(&mut self) -> Result<TimeOfDay, Self::Error>;
}

/// Result of a next-deadline computation.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct NextAction {
    /// Seconds until the action is due. Zero only when `kind` is
    /// [`ActionKind::NoneScheduled`]; callers must not arm a timer then.
    pub delay_secs: u32,
    pub kind: ActionKind,
}

/// Computes the next scheduled action after `now`, wrapping across midnight.
///
/// Every `(kind, time)` pair in the table is considered. The earliest entry
/// strictly after `now` wins; when nothing remains later today, the earliest
/// entry of the day is scheduled for tomorrow. An empty table yields the
/// [`ActionKind::NoneScheduled`] sentinel with a zero delay.
pub fn next_action(table: &[ScheduledAction], now: TimeOfDay) -> NextAction {
    let now = now.day_seconds();
    let mut earliest_of_day: Option<(u32, ActionKind)> = None;
    let mut earliest_after: Option<(u32, ActionKind)> = None;

    for entry in table {
        for &time in entry.times {
            if earliest_of_day.is_none_or(|(best, _)| time < best) {
                earliest_of_day = Some((time, entry.kind));
            }
            if time > now && earliest_after.is_none_or(|(best, _)| time < best) {
                earliest_after = Some((time, entry.kind));
            }
        }
    }

    match (earliest_after, earliest_of_day) {
        (Some((time, kind)), _) => NextAction {
            delay_secs: time - now,
            kind,
        },
        (None, Some((time, kind))) => NextAction {
            delay_secs: SECONDS_PER_DAY - (now - time),
            kind,
        },
        (None, None) => NextAction {
            delay_secs: 0,
            kind: ActionKind::NoneScheduled,
        },
    }
}
