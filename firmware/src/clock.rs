#![cfg_attr(not(target_os = "none"), allow(dead_code))]

//! Wall-clock time derived from a synchronized epoch.
//!
//! The time-sync collaborator (out of scope here) resolves local time once at
//! boot and periodically thereafter, then records it via [`sync`]. Between
//! syncs the monotonic clock carries the time forward. Reading before the
//! first sync is an error, never a bogus midnight.

use board_core::schedule::{SECONDS_PER_DAY, TimeOfDay, WallClock};
use embassy_time::Instant;
use portable_atomic::{AtomicU64, Ordering};

/// Local seconds-since-midnight at the moment of the last sync, packed with
/// the monotonic microsecond timestamp it was taken at. Zero means unsynced.
static SYNC_POINT: AtomicU64 = AtomicU64::new(0);

const SECS_BITS: u32 = 17; // covers 0..86_400

/// Records a freshly resolved local time of day.
pub fn sync(local: TimeOfDay) {
    let monotonic_secs = Instant::now().as_secs();
    let packed = (monotonic_secs << SECS_BITS) | u64::from(local.day_seconds()) | SYNCED_FLAG;
    SYNC_POINT.store(packed, Ordering::Relaxed);
}

const SYNCED_FLAG: u64 = 1 << 63;

/// The clock has not been synchronized yet.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct NotSynced;

/// [`WallClock`] over the synced epoch and the monotonic clock.
#[derive(Copy, Clone, Debug, Default)]
pub struct SystemClock;

impl WallClock for SystemClock {
    type Error = NotSynced;

    fn time_of_day(&mut self) -> Result<TimeOfDay, Self::Error> {
        let packed = SYNC_POINT.load(Ordering::Relaxed);
        if packed & SYNCED_FLAG == 0 {
            return Err(NotSynced);
        }
        let synced_day_secs = packed & ((1 << SECS_BITS) - 1);
        let synced_monotonic = (packed & !SYNCED_FLAG) >> SECS_BITS;
        let elapsed = Instant::now().as_secs().saturating_sub(synced_monotonic);
        let day_secs = ((synced_day_secs + elapsed) % u64::from(SECONDS_PER_DAY)) as u32;
        Ok(TimeOfDay::new(
            (day_secs / 3600) as u8,
            ((day_secs / 60) % 60) as u8,
            (day_secs % 60) as u8,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synced_clock_reports_the_synced_time() {
        sync(TimeOfDay::new(13, 45, 10));
        let mut clock = SystemClock;
        let now = clock.time_of_day().expect("clock synced");
        // the test runs in well under a minute of monotonic time
        assert_eq!((now.hour, now.minute), (13, 45));
    }
}
