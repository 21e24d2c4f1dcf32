//! Main display loop: periodic full refreshes plus direction-toggle handling.

use board_core::strobe::OwnerId;
use board_core::traffic::Direction;
use embassy_futures::select::select;
use embassy_time::{Duration, Timer};

use super::{REFRESH_WAKE, STROBE_GATE, STROBE_QUEUE, TRAFFIC};
use crate::board::{Board, RefreshOutcome};
use crate::display::{MatrixDriver, SharedDisplay};
use crate::layout::{LED_COORDS, PROFILE, refresh_sweep};
use crate::status;
use crate::strobe::StrobeHandle;

/// Interval between unprompted full refreshes.
const REFRESH_PERIOD: Duration = Duration::from_secs(5 * 60);

/// Backoff after a failed pass before trying again.
const RETRY_DELAY: Duration = Duration::from_secs(5);

/// Identity this task registers strobe animations under.
const REFRESH_OWNER: OwnerId = OwnerId::new(1);

#[embassy_executor::task]
pub async fn run(display: &'static SharedDisplay<MatrixDriver<'static>>) -> ! {
    let board = Board::new(
        display,
        &TRAFFIC,
        StrobeHandle::new(&STROBE_QUEUE, &STROBE_GATE, REFRESH_OWNER),
        &PROFILE,
        &LED_COORDS,
    );
    let mut dir = Direction::North;

    loop {
        match board.refresh(dir, refresh_sweep(dir)).await {
            Ok(RefreshOutcome::Completed | RefreshOutcome::SkippedNight) => {
                // sleep until the next period, or until the toggle wakes us
                select(Timer::after(REFRESH_PERIOD), REFRESH_WAKE.wait()).await;
            }
            Ok(RefreshOutcome::Aborted | RefreshOutcome::AbortedNoClear) => {
                // act on the signal: consume it, flip direction, darken the
                // board, and fall through to an immediate repaint
                if status::take_abort() {
                    dir = dir.opposite();
                }
                if let Err(err) = board.quick_clear(dir).await {
                    defmt::error!("refresh: quick clear failed: {}", defmt::Debug2Format(&err));
                }
            }
            Err(err) => {
                defmt::error!("refresh: pass failed: {}", defmt::Debug2Format(&err));
                Timer::after(RETRY_DELAY).await;
            }
        }
    }
}
