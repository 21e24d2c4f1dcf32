#![cfg_attr(not(target_os = "none"), allow(dead_code))]

//! Board refresh orchestration.
//!
//! A refresh pass walks the draw order writing each LED's display state from
//! the latest traffic snapshots, registering strobe animations for closed
//! roads as one pause-gated batch. Clear passes walk the reverse order writing
//! the off state. Both poll the cooperative abort signal between LEDs and pace
//! themselves with absolute deadlines.

use board_core::geometry::{self, LedCoord, OrderingError, Sweep};
use board_core::refresh::{
    BoardProfile, DisplayDriver, DisplayError, LedPlan, Rgb, SkipReason, plan_led,
    write_with_retries,
};
use board_core::traffic::{Category, Direction, TableSizeError, TrafficSample};
use embassy_time::{Duration, Instant, Timer};

use crate::display::SharedDisplay;
use crate::layout::clear_sweep;
use crate::status;
use crate::strobe::{PauseTimeout, StrobeHandle};
use crate::traffic_store::{BorrowTimeout, TrafficStore};

/// Delay between consecutive LED updates during a refresh pass.
pub const LED_UPDATE_PERIOD: Duration = Duration::from_millis(50);

/// Delay between consecutive LED writes during an animated clear.
pub const LED_CLEAR_PERIOD: Duration = Duration::from_millis(25);

/// Attempts per display write before the failure is surfaced.
pub const DISPLAY_RETRY_LIMIT: usize = 15;

/// Wait budget for a traffic-data borrow during a refresh.
pub const BORROW_WAIT: Duration = Duration::from_secs(5);

/// Wait budget for the strobe pause gate.
pub const PAUSE_WAIT: Duration = Duration::from_secs(2);

/// How a refresh or clear pass ended.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum RefreshOutcome {
    Completed,
    /// The night-mode lock was engaged; nothing was touched.
    SkippedNight,
    /// The abort signal was raised mid-pass; the caller must clear the board.
    Aborted,
    /// The abort signal was already raised before any hardware was touched.
    AbortedNoClear,
}

/// Failures that end a pass early.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum BoardError {
    Ordering(OrderingError),
    Borrow(BorrowTimeout),
    Pause(PauseTimeout),
    Table(TableSizeError),
    Display(DisplayError),
}

#[cfg(target_os = "none")]
fn log_night_skip() {
    defmt::info!("board: refresh locked for night mode, skipping pass");
}

#[cfg(not(target_os = "none"))]
fn log_night_skip() {
    println!("board: refresh locked for night mode, skipping pass");
}

#[cfg(target_os = "none")]
fn log_skip(led: u16, reason: SkipReason) {
    defmt::warn!("board: skipping LED {}: {}", led, reason.label());
}

#[cfg(not(target_os = "none"))]
fn log_skip(led: u16, reason: SkipReason) {
    println!("board: skipping LED {led}: {}", reason.label());
}

#[cfg(target_os = "none")]
fn log_skip_out_of_range(led: u16) {
    defmt::warn!("board: skipping out of range LED {}", led);
}

#[cfg(not(target_os = "none"))]
fn log_skip_out_of_range(led: u16) {
    println!("board: skipping out of range LED {led}");
}

#[cfg(target_os = "none")]
fn log_paint_failed(led: u16) {
    defmt::warn!("board: display write failed for LED {}", led);
}

#[cfg(not(target_os = "none"))]
fn log_paint_failed(led: u16) {
    println!("board: display write failed for LED {led}");
}

#[cfg(target_os = "none")]
fn log_clearing(dir: Direction) {
    defmt::info!("board: clearing {}...", dir.label());
}

#[cfg(not(target_os = "none"))]
fn log_clearing(dir: Direction) {
    println!("board: clearing {}...", dir.label());
}

#[cfg(target_os = "none")]
fn log_skip_clear(led: u16) {
    defmt::warn!("board: skipping clear of indicator LED {}", led);
}

#[cfg(not(target_os = "none"))]
fn log_skip_clear(led: u16) {
    println!("board: skipping clear of indicator LED {led}");
}

#[cfg(target_os = "none")]
fn log_quick_clearing() {
    defmt::info!("board: quick clearing matrices");
}

#[cfg(not(target_os = "none"))]
fn log_quick_clearing() {
    println!("board: quick clearing matrices");
}

/// Coordinates full-board refresh and clear passes.
pub struct Board<'a, D: DisplayDriver, const N: usize> {
    display: &'a SharedDisplay<D>,
    store: &'a TrafficStore<N>,
    strobe: StrobeHandle<'a>,
    profile: &'a BoardProfile,
    coords: &'a [LedCoord; N],
}

impl<'a, D: DisplayDriver, const N: usize> Board<'a, D, N> {
    pub fn new(
        display: &'a SharedDisplay<D>,
        store: &'a TrafficStore<N>,
        strobe: StrobeHandle<'a>,
        profile: &'a BoardProfile,
        coords: &'a [LedCoord; N],
    ) -> Self {
        Self {
            display,
            store,
            strobe,
            profile,
            coords,
        }
    }

    /// Refreshes the whole board for one direction using the given sweep.
    ///
    /// Closed-road LEDs are painted then strobe-registered under the pause
    /// gate, so the entire batch begins animating on the same engine tick.
    pub async fn refresh(
        &self,
        dir: Direction,
        sweep: Sweep,
    ) -> Result<RefreshOutcome, BoardError> {
        if status::refresh_locked() {
            log_night_skip();
            return Ok(RefreshOutcome::SkippedNight);
        }
        if status::abort_requested() {
            return Ok(RefreshOutcome::AbortedNoClear);
        }

        let mut order = [0u16; N];
        geometry::order_leds(&mut order, sweep, self.coords).map_err(BoardError::Ordering)?;

        let mut typical = [TrafficSample::NO_DATA; N];
        {
            let guard = self
                .store
                .borrow_with_timeout(Category::Typical, BORROW_WAIT)
                .await
                .map_err(BoardError::Borrow)?;
            guard.copy_into(dir, &mut typical).map_err(BoardError::Table)?;
        }

        let mut live = [TrafficSample::NO_DATA; N];
        {
            let guard = self
                .store
                .borrow_with_timeout(Category::Live, BORROW_WAIT)
                .await
                .map_err(BoardError::Borrow)?;
            guard.copy_into(dir, &mut live).map_err(BoardError::Table)?;
        }

        // hold the gate for the whole pass so newly registered closed-road
        // LEDs cannot begin strobing out of phase with the rest of the batch
        let pause = self.strobe.pause(PAUSE_WAIT).await.map_err(BoardError::Pause)?;

        let mut next_deadline = Instant::now();
        for &led in &order {
            if !self.profile.in_range(led) {
                log_skip_out_of_range(led);
                continue;
            }
            let index = usize::from(led - 1);

            match plan_led(led, &live[index], &typical[index], self.profile) {
                LedPlan::Skip(reason) => log_skip(led, reason),
                LedPlan::Closed => {
                    // paint the resting appearance now; the strobe engine
                    // takes over the scaling once the batch resumes
                    self.paint(led, self.profile.closed_color).await;
                    self.strobe.register(self.profile.strobe_params(led)).await;
                }
                LedPlan::Flow(color) => self.paint(led, color).await,
            }

            if status::abort_requested() {
                // the pause gate releases on return; the caller's clear pass
                // removes whatever this batch already registered
                return Ok(RefreshOutcome::Aborted);
            }
            next_deadline += LED_UPDATE_PERIOD;
            Timer::at(next_deadline).await;
        }

        drop(pause);
        Ok(RefreshOutcome::Completed)
    }

    /// Clears the board away from `dir`, unregistering this worker's strobe
    /// batch first so no stale animation survives on a dark board.
    pub async fn clear(&self, dir: Direction, quick: bool) -> Result<RefreshOutcome, BoardError> {
        self.strobe.unregister_all().await;
        log_clearing(dir);

        let mut order = [0u16; N];
        geometry::order_leds(&mut order, clear_sweep(dir), self.coords)
            .map_err(BoardError::Ordering)?;

        let mut next_deadline = Instant::now();
        for &led in &order {
            if self.profile.is_excluded(led) {
                log_skip_clear(led);
                continue;
            }
            {
                let mut display = self.display.lock().await;
                write_with_retries(DISPLAY_RETRY_LIMIT, || display.set_color(led, Rgb::OFF))
                    .map_err(BoardError::Display)?;
            }
            // a quick clear is the emergency path: no pacing, no abort polls
            if !quick {
                if status::abort_requested() {
                    return Ok(RefreshOutcome::Aborted);
                }
                next_deadline += LED_CLEAR_PERIOD;
                Timer::at(next_deadline).await;
            }
        }
        Ok(RefreshOutcome::Completed)
    }

    /// Immediately darkens the board, via bulk hardware reset when the
    /// hardware class allows it.
    pub async fn quick_clear(&self, dir: Direction) -> Result<RefreshOutcome, BoardError> {
        if !self.profile.bulk_reset_clear {
            return self.clear(dir, true).await;
        }

        self.strobe.unregister_all().await;
        log_quick_clearing();

        let mut display = self.display.lock().await;
        write_with_retries(DISPLAY_RETRY_LIMIT, || display.reset())
            .map_err(BoardError::Display)?;
        write_with_retries(DISPLAY_RETRY_LIMIT, || {
            display.set_global_current(self.profile.global_current)
        })
        .map_err(BoardError::Display)?;
        Ok(RefreshOutcome::Completed)
    }

    /// Best-effort color + default-scaling write for one LED; failures are
    /// logged and the pass moves on, never failing the whole board.
    async fn paint(&self, led: u16, color: Rgb) {
        let mut display = self.display.lock().await;
        if write_with_retries(DISPLAY_RETRY_LIMIT, || display.set_color(led, color)).is_err() {
            log_paint_failed(led);
            return;
        }
        let scale = Rgb::splat(self.profile.default_scale);
        if write_with_retries(DISPLAY_RETRY_LIMIT, || display.set_scaling(led, scale)).is_err() {
            log_paint_failed(led);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strobe::{StrobeGate, StrobeQueue};
    use board_core::refresh::Palette;
    use board_core::strobe::{OwnerId, StrobeOp};
    use embassy_futures::block_on;

    const TEST_COORDS: [LedCoord; 4] = [
        LedCoord::new(0, 0),
        LedCoord::new(100, 0),
        LedCoord::new(200, 0),
        LedCoord::new(300, 0),
    ];

    const TEST_PROFILE: BoardProfile = BoardProfile {
        led_count: 4,
        slow_cutoff_percent: 40,
        medium_cutoff_percent: 75,
        palette: Palette {
            slow: Rgb::new(0xFF, 0x00, 0x00),
            medium: Rgb::new(0x25, 0x09, 0x00),
            fast: Rgb::new(0x00, 0x10, 0x00),
        },
        closed_color: Rgb::new(0xFF, 0x00, 0x00),
        default_scale: 0xFF,
        strobe_low_scale: 0x20,
        strobe_step_high: 10,
        strobe_step_low: 10,
        strobe_step_cutoff: 0x80,
        excluded_leds: &[],
        bulk_reset_clear: false,
        global_current: 0xA0,
    };

    #[derive(Default)]
    struct RecordingDisplay {
        colors: std::vec::Vec<(u16, Rgb)>,
        scalings: std::vec::Vec<(u16, Rgb)>,
    }

    impl DisplayDriver for RecordingDisplay {
        fn set_color(&mut self, led: u16, color: Rgb) -> Result<(), DisplayError> {
            self.colors.push((led, color));
            Ok(())
        }

        fn set_scaling(&mut self, led: u16, scale: Rgb) -> Result<(), DisplayError> {
            self.scalings.push((led, scale));
            Ok(())
        }

        fn set_global_current(&mut self, _: u8) -> Result<(), DisplayError> {
            Ok(())
        }

        fn reset(&mut self) -> Result<(), DisplayError> {
            Ok(())
        }
    }

    fn seed_store(store: &TrafficStore<4>) {
        // LED 1: medium flow, LED 2: closed, LED 3: no live data, LED 4: fast
        let live = [
            TrafficSample::new(1, 50),
            TrafficSample::new(2, 0),
            TrafficSample::new(3, -1),
            TrafficSample::new(4, 90),
        ];
        let typical = [
            TrafficSample::new(1, 100),
            TrafficSample::new(2, 80),
            TrafficSample::new(3, 70),
            TrafficSample::new(4, 100),
        ];
        block_on(async {
            store
                .borrow(Category::Live)
                .await
                .update(Direction::North, &live)
                .expect("seed live");
            store
                .borrow(Category::Typical)
                .await
                .update(Direction::North, &typical)
                .expect("seed typical");
        });
    }

    // exercises the pass end to end, including the night lock and the
    // pre-pass abort check; one test body so the global flags are not
    // touched concurrently
    #[test]
    fn refresh_paints_plans_and_honors_the_flags() {
        let display: SharedDisplay<RecordingDisplay> =
            SharedDisplay::new(RecordingDisplay::default());
        let store: TrafficStore<4> = TrafficStore::new();
        let queue = StrobeQueue::new();
        let gate = StrobeGate::new(());
        seed_store(&store);

        let board = Board::new(
            &display,
            &store,
            StrobeHandle::new(&queue, &gate, OwnerId::new(11)),
            &TEST_PROFILE,
            &TEST_COORDS,
        );

        let outcome = block_on(board.refresh(Direction::North, Sweep::DiagLine));
        assert_eq!(outcome, Ok(RefreshOutcome::Completed));

        {
            let recorder = display.try_lock().expect("display free after pass");
            // draw order for a horizontal row under the diagonal sweep is
            // simply 1..=4; LED 3 was skipped for missing live data
            assert_eq!(
                recorder.colors,
                std::vec![
                    (1, TEST_PROFILE.palette.medium),
                    (2, TEST_PROFILE.closed_color),
                    (4, TEST_PROFILE.palette.fast),
                ]
            );
            // every painted LED also got the default scaling
            assert_eq!(
                recorder.scalings,
                std::vec![
                    (1, Rgb::splat(0xFF)),
                    (2, Rgb::splat(0xFF)),
                    (4, Rgb::splat(0xFF)),
                ]
            );
        }

        // exactly one strobe registration: the closed LED 2, stamped with
        // this board's owner identity
        let receiver = queue.receiver();
        let command = receiver.try_receive().expect("strobe command queued");
        assert_eq!(command.owner, OwnerId::new(11));
        match command.op {
            StrobeOp::Register(params) => {
                assert_eq!(params.led, 2);
                assert_eq!(params.max_level, 0xFF);
                assert_eq!(params.min_level, 0x20);
                assert!(!params.rising);
            }
            other => panic!("expected register command, got {other:?}"),
        }
        assert!(receiver.try_receive().is_err());

        // night mode turns the pass into a no-op success
        crate::status::lock_refresh();
        let outcome = block_on(board.refresh(Direction::North, Sweep::DiagLine));
        assert_eq!(outcome, Ok(RefreshOutcome::SkippedNight));
        crate::status::unlock_refresh();

        // a pre-raised abort signal returns before touching hardware and is
        // not consumed by the poll
        let painted = display.try_lock().expect("display free").colors.len();
        crate::status::request_abort();
        let outcome = block_on(board.refresh(Direction::North, Sweep::DiagLine));
        assert_eq!(outcome, Ok(RefreshOutcome::AbortedNoClear));
        assert!(crate::status::abort_requested());
        assert!(crate::status::take_abort());
        assert_eq!(
            display.try_lock().expect("display free").colors.len(),
            painted
        );
    }

    #[test]
    fn clear_unregisters_before_writing_off_states() {
        let display: SharedDisplay<RecordingDisplay> =
            SharedDisplay::new(RecordingDisplay::default());
        let store: TrafficStore<4> = TrafficStore::new();
        let queue = StrobeQueue::new();
        let gate = StrobeGate::new(());

        let board = Board::new(
            &display,
            &store,
            StrobeHandle::new(&queue, &gate, OwnerId::new(5)),
            &TEST_PROFILE,
            &TEST_COORDS,
        );

        let outcome = block_on(board.clear(Direction::North, true));
        assert_eq!(outcome, Ok(RefreshOutcome::Completed));

        let command = queue.receiver().try_receive().expect("command queued");
        assert_eq!(command.op, StrobeOp::UnregisterAll);
        assert_eq!(command.owner, OwnerId::new(5));

        let recorder = display.try_lock().expect("display free");
        assert_eq!(recorder.colors.len(), 4);
        assert!(recorder.colors.iter().all(|&(_, color)| color == Rgb::OFF));
    }
}
