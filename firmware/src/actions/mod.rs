#![cfg_attr(not(target_os = "none"), allow(dead_code))]

//! Scheduled-action worker.
//!
//! Runs the low-priority daily jobs: traffic-data updates, brightness
//! sampling, update checks, and the night-mode transitions. Scheduled entries
//! are armed one deadline at a time from the wall clock; the periodic ticks
//! arrive over the same queue from their own timer task, so everything is
//! dispatched from one place at one priority.

use board_core::refresh::{DisplayDriver, write_with_retries};
use board_core::schedule::{
    ActionKind, NextAction, ScheduledAction, TimeOfDay, WallClock, next_action,
};
use board_core::traffic::{Category, Direction, TrafficSample};
use embassy_futures::select::{Either, select};
#[cfg(not(target_os = "none"))]
use embassy_sync::blocking_mutex::raw::NoopRawMutex;
#[cfg(target_os = "none")]
use embassy_sync::blocking_mutex::raw::ThreadModeRawMutex;
use embassy_sync::channel::{Channel, Receiver};
use embassy_time::{Duration, Instant, Timer};

use crate::collab::{AmbientSensor, Indicators, SettingsStore, TrafficSource, UpdateCheck};
use crate::display::SharedDisplay;
use crate::status;
use crate::traffic_store::TrafficStore;

#[cfg(target_os = "none")]
type ActionMutex = ThreadModeRawMutex;
#[cfg(not(target_os = "none"))]
type ActionMutex = NoopRawMutex;

/// Depth of the action queue shared between the timers and the worker.
pub const ACTION_QUEUE_DEPTH: usize = 10;

/// Queue carrying due actions to the worker.
pub type ActionQueue = Channel<ActionMutex, ActionKind, ACTION_QUEUE_DEPTH>;

/// Convenience receiver type alias for the action queue.
pub type ActionReceiver<'a> = Receiver<'a, ActionMutex, ActionKind, ACTION_QUEUE_DEPTH>;

/// Holdoff before re-reading a wall clock that just failed.
pub const CLOCK_RETRY_HOLDOFF: Duration = Duration::from_secs(10);

/// Attempts per global-current write before the sample is dropped.
pub const BRIGHTNESS_RETRY_LIMIT: usize = 5;

#[cfg(target_os = "none")]
fn log_dispatch(action: ActionKind) {
    defmt::info!("actions: performing {}", action.label());
}

#[cfg(not(target_os = "none"))]
fn log_dispatch(action: ActionKind) {
    println!("actions: performing {}", action.label());
}

#[cfg(target_os = "none")]
fn log_armed(delay_secs: u32, action: ActionKind) {
    defmt::info!(
        "actions: {} armed for {} seconds from now",
        action.label(),
        delay_secs
    );
}

#[cfg(not(target_os = "none"))]
fn log_armed(delay_secs: u32, action: ActionKind) {
    println!(
        "actions: {} armed for {delay_secs} seconds from now",
        action.label()
    );
}

#[cfg(target_os = "none")]
fn log_no_jobs() {
    defmt::warn!("actions: no scheduled jobs");
}

#[cfg(not(target_os = "none"))]
fn log_no_jobs() {
    println!("actions: no scheduled jobs");
}

#[cfg(target_os = "none")]
fn log_clock_error() {
    defmt::error!("actions: failed to read wall clock");
}

#[cfg(not(target_os = "none"))]
fn log_clock_error() {
    println!("actions: failed to read wall clock");
}

#[cfg(target_os = "none")]
fn log_fetch_failed(dir: Direction, category: Category) {
    defmt::warn!(
        "actions: {} {} fetch failed, falling back to stored data",
        dir.label(),
        category.label()
    );
}

#[cfg(not(target_os = "none"))]
fn log_fetch_failed(dir: Direction, category: Category) {
    println!(
        "actions: {} {} fetch failed, falling back to stored data",
        dir.label(),
        category.label()
    );
}

#[cfg(target_os = "none")]
fn log_fallback_failed(dir: Direction, category: Category) {
    defmt::warn!(
        "actions: no stored {} {} data available",
        dir.label(),
        category.label()
    );
}

#[cfg(not(target_os = "none"))]
fn log_fallback_failed(dir: Direction, category: Category) {
    println!(
        "actions: no stored {} {} data available",
        dir.label(),
        category.label()
    );
}

#[cfg(target_os = "none")]
fn log_collab_failed(what: &str) {
    defmt::warn!("actions: {} failed", what);
}

#[cfg(not(target_os = "none"))]
fn log_collab_failed(what: &str) {
    println!("actions: {what} failed");
}

/// External collaborators the action handlers drive.
pub struct Collaborators<S, P, I, U, A> {
    pub source: S,
    pub settings: P,
    pub indicators: I,
    pub updates: U,
    pub ambient: A,
}

enum Armed {
    At(Instant, ActionKind),
    Nothing,
    ClockError,
}

/// The action worker: arms one scheduled deadline at a time and dispatches
/// everything that arrives over the action queue.
pub struct ActionWorker<'a, D, C, S, P, I, U, A, const N: usize>
where
    D: DisplayDriver,
    C: WallClock,
    S: TrafficSource,
    P: SettingsStore,
    I: Indicators,
    U: UpdateCheck,
    A: AmbientSensor,
{
    actions: ActionReceiver<'a>,
    clock: C,
    schedule: &'static [ScheduledAction],
    store: &'a TrafficStore<N>,
    display: &'a SharedDisplay<D>,
    collab: Collaborators<S, P, I, U, A>,
}

impl<'a, D, C, S, P, I, U, A, const N: usize> ActionWorker<'a, D, C, S, P, I, U, A, N>
where
    D: DisplayDriver,
    C: WallClock,
    S: TrafficSource,
    P: SettingsStore,
    I: Indicators,
    U: UpdateCheck,
    A: AmbientSensor,
{
    pub fn new(
        actions: ActionReceiver<'a>,
        clock: C,
        schedule: &'static [ScheduledAction],
        store: &'a TrafficStore<N>,
        display: &'a SharedDisplay<D>,
        collab: Collaborators<S, P, I, U, A>,
    ) -> Self {
        Self {
            actions,
            clock,
            schedule,
            store,
            display,
            collab,
        }
    }

    /// Populates both categories of traffic data at startup, before any
    /// refresh pass runs.
    pub async fn seed(&mut self) {
        self.refresh_category(Category::Typical).await;
        self.refresh_category(Category::Live).await;
    }

    /// Runs the worker forever.
    ///
    /// Every loop iteration re-derives the next scheduled deadline from the
    /// wall clock, which re-arms it after each dispatched action; the periodic
    /// data tick arrives over the queue without disturbing that deadline. An
    /// empty schedule arms nothing; a clock failure backs off and retries
    /// rather than ever being treated as an immediately-due action.
    pub async fn run(mut self) -> ! {
        loop {
            match self.arm() {
                Armed::At(at, kind) => {
                    let due = select(self.actions.receive(), Timer::at(at)).await;
                    match due {
                        Either::First(action) => self.dispatch(action).await,
                        Either::Second(()) => self.dispatch(kind).await,
                    }
                }
                Armed::Nothing => {
                    let action = self.actions.receive().await;
                    self.dispatch(action).await;
                }
                Armed::ClockError => {
                    let due =
                        select(self.actions.receive(), Timer::after(CLOCK_RETRY_HOLDOFF)).await;
                    if let Either::First(action) = due {
                        self.dispatch(action).await;
                    }
                }
            }
        }
    }

    fn arm(&mut self) -> Armed {
        let now: TimeOfDay = match self.clock.time_of_day() {
            Ok(now) => now,
            Err(_) => {
                log_clock_error();
                return Armed::ClockError;
            }
        };
        let NextAction { delay_secs, kind } = next_action(self.schedule, now);
        if kind == ActionKind::NoneScheduled {
            log_no_jobs();
            return Armed::Nothing;
        }
        log_armed(delay_secs, kind);
        Armed::At(
            Instant::now() + Duration::from_secs(u64::from(delay_secs)),
            kind,
        )
    }

    async fn dispatch(&mut self, action: ActionKind) {
        log_dispatch(action);
        match action {
            ActionKind::UpdateData => self.refresh_category(Category::Live).await,
            ActionKind::UpdateBrightness => self.update_brightness().await,
            ActionKind::QueryUpdate => self.query_update(),
            ActionKind::EnterNightMode => status::lock_refresh(),
            ActionKind::ExitNightMode => status::unlock_refresh(),
            ActionKind::NoneScheduled => log_collab_failed("dispatch of sentinel action"),
        }
    }

    /// Fetches both directions of one category and commits them under a
    /// single borrow, so readers never see one direction newer than the
    /// other.
    async fn refresh_category(&mut self, category: Category) {
        let mut north = [TrafficSample::NO_DATA; N];
        let mut south = [TrafficSample::NO_DATA; N];
        let got_north = self.fetch_with_fallback(Direction::North, category, &mut north);
        let got_south = self.fetch_with_fallback(Direction::South, category, &mut south);
        if !got_north && !got_south {
            return;
        }

        let mut guard = self.store.borrow(category).await;
        if got_north && guard.update(Direction::North, &north).is_err() {
            log_collab_failed("north table update");
        }
        if got_south && guard.update(Direction::South, &south).is_err() {
            log_collab_failed("south table update");
        }
    }

    /// Fills `out` from the upstream source, falling back to persisted
    /// samples on failure. Raises or resolves the connectivity indicator as a
    /// side effect; returns whether `out` holds usable data.
    fn fetch_with_fallback(
        &mut self,
        dir: Direction,
        category: Category,
        out: &mut [TrafficSample],
    ) -> bool {
        match self.collab.source.fetch(dir, category, out) {
            Ok(()) => {
                self.collab.indicators.resolve_connectivity();
                if self.collab.settings.store(dir, category, out).is_err() {
                    log_collab_failed("sample persistence");
                }
                true
            }
            Err(_) => {
                log_fetch_failed(dir, category);
                self.collab.indicators.raise_connectivity();
                match self.collab.settings.load(dir, category, out) {
                    Ok(()) => true,
                    Err(_) => {
                        log_fallback_failed(dir, category);
                        false
                    }
                }
            }
        }
    }

    async fn update_brightness(&mut self) {
        let level = match self.collab.ambient.ambient_level() {
            Ok(level) => level,
            Err(_) => {
                log_collab_failed("ambient light sample");
                return;
            }
        };
        let mut display = self.display.lock().await;
        if write_with_retries(BRIGHTNESS_RETRY_LIMIT, || display.set_global_current(level))
            .is_err()
        {
            log_collab_failed("global current write");
        }
    }

    fn query_update(&mut self) {
        match self.collab.updates.update_available() {
            Ok(true) => self.collab.indicators.indicate_update_available(),
            Ok(false) => {}
            // a broken check must not block updates, so only log it
            Err(_) => log_collab_failed("update availability query"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use board_core::refresh::NoopDisplayDriver;
    use board_core::schedule::DAILY_SCHEDULE;
    use embassy_futures::block_on;
    use std::cell::RefCell;
    use std::rc::Rc;

    struct FixedClock(TimeOfDay);

    impl WallClock for FixedClock {
        type Error = ();

        fn time_of_day(&mut self) -> Result<TimeOfDay, Self::Error> {
            Ok(self.0)
        }
    }

    #[derive(Clone, Default)]
    struct IndicatorLog {
        raised: Rc<RefCell<u32>>,
        resolved: Rc<RefCell<u32>>,
    }

    impl Indicators for IndicatorLog {
        fn raise_connectivity(&mut self) {
            *self.raised.borrow_mut() += 1;
        }

        fn resolve_connectivity(&mut self) {
            *self.resolved.borrow_mut() += 1;
        }

        fn indicate_update_available(&mut self) {}
    }

    struct ScriptedSource {
        fail: bool,
    }

    impl TrafficSource for ScriptedSource {
        type Error = ();

        fn fetch(
            &mut self,
            _: Direction,
            _: Category,
            out: &mut [TrafficSample],
        ) -> Result<(), Self::Error> {
            if self.fail {
                return Err(());
            }
            for (index, slot) in out.iter_mut().enumerate() {
                *slot = TrafficSample::new((index as u16) + 1, 60);
            }
            Ok(())
        }
    }

    struct MemorySettings {
        stored: Option<std::vec::Vec<TrafficSample>>,
    }

    impl SettingsStore for MemorySettings {
        type Error = ();

        fn load(
            &mut self,
            _: Direction,
            _: Category,
            out: &mut [TrafficSample],
        ) -> Result<(), Self::Error> {
            match &self.stored {
                Some(data) => {
                    out.copy_from_slice(data);
                    Ok(())
                }
                None => Err(()),
            }
        }

        fn store(
            &mut self,
            _: Direction,
            _: Category,
            data: &[TrafficSample],
        ) -> Result<(), Self::Error> {
            self.stored = Some(data.to_vec());
            Ok(())
        }
    }

    type TestWorker<'a> = ActionWorker<
        'a,
        NoopDisplayDriver,
        FixedClock,
        ScriptedSource,
        MemorySettings,
        IndicatorLog,
        crate::collab::NoopUpdateCheck,
        crate::collab::NoopAmbientSensor,
        3,
    >;

    fn worker<'a>(
        actions: ActionReceiver<'a>,
        store: &'a TrafficStore<3>,
        display: &'a SharedDisplay<NoopDisplayDriver>,
        source_fails: bool,
        indicators: IndicatorLog,
    ) -> TestWorker<'a> {
        ActionWorker::new(
            actions,
            FixedClock(TimeOfDay::new(12, 0, 0)),
            &DAILY_SCHEDULE,
            store,
            display,
            Collaborators {
                source: ScriptedSource { fail: source_fails },
                settings: MemorySettings { stored: None },
                indicators,
                updates: crate::collab::NoopUpdateCheck,
                ambient: crate::collab::NoopAmbientSensor,
            },
        )
    }

    #[test]
    fn successful_fetch_commits_both_directions_and_resolves_connectivity() {
        let queue = ActionQueue::new();
        let store: TrafficStore<3> = TrafficStore::new();
        let display = SharedDisplay::new(NoopDisplayDriver::new());
        let indicators = IndicatorLog::default();
        let mut worker = worker(queue.receiver(), &store, &display, false, indicators.clone());

        block_on(worker.dispatch(ActionKind::UpdateData));

        let guard = block_on(store.borrow(Category::Live));
        assert_eq!(
            guard.sample(Direction::North, 2),
            Some(TrafficSample::new(2, 60))
        );
        assert_eq!(
            guard.sample(Direction::South, 3),
            Some(TrafficSample::new(3, 60))
        );
        assert_eq!(*indicators.resolved.borrow(), 2);
        assert_eq!(*indicators.raised.borrow(), 0);
    }

    #[test]
    fn failed_fetch_raises_connectivity_and_leaves_tables_untouched() {
        let queue = ActionQueue::new();
        let store: TrafficStore<3> = TrafficStore::new();
        let display = SharedDisplay::new(NoopDisplayDriver::new());
        let indicators = IndicatorLog::default();
        let mut worker = worker(queue.receiver(), &store, &display, true, indicators.clone());

        block_on(worker.dispatch(ActionKind::UpdateData));

        // nothing persisted, so the fallback failed too and the tables still
        // report no data
        let guard = block_on(store.borrow(Category::Live));
        assert_eq!(
            guard.sample(Direction::North, 1),
            Some(TrafficSample::NO_DATA)
        );
        assert_eq!(*indicators.raised.borrow(), 2);
        assert_eq!(*indicators.resolved.borrow(), 0);
    }

    #[test]
    fn seed_populates_typical_and_live() {
        let queue = ActionQueue::new();
        let store: TrafficStore<3> = TrafficStore::new();
        let display = SharedDisplay::new(NoopDisplayDriver::new());
        let mut worker = worker(
            queue.receiver(),
            &store,
            &display,
            false,
            IndicatorLog::default(),
        );

        block_on(worker.seed());

        for category in [Category::Typical, Category::Live] {
            let guard = block_on(store.borrow(category));
            assert_eq!(
                guard.sample(Direction::North, 1),
                Some(TrafficSample::new(1, 60))
            );
        }
    }
}
