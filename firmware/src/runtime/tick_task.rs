//! Fixed-period action ticks, independent of the daily schedule.

use board_core::schedule::{ActionKind, UPDATE_BRIGHTNESS_PERIOD_SECS, UPDATE_DATA_PERIOD_SECS};
use embassy_futures::select::{Either, select};
use embassy_time::{Duration, Ticker};

use super::ACTION_QUEUE;

#[embassy_executor::task]
pub async fn run() -> ! {
    let mut data = Ticker::every(Duration::from_secs(u64::from(UPDATE_DATA_PERIOD_SECS)));
    let mut brightness = Ticker::every(Duration::from_secs(u64::from(
        UPDATE_BRIGHTNESS_PERIOD_SECS,
    )));
    loop {
        match select(data.next(), brightness.next()).await {
            Either::First(()) => ACTION_QUEUE.send(ActionKind::UpdateData).await,
            Either::Second(()) => ACTION_QUEUE.send(ActionKind::UpdateBrightness).await,
        }
    }
}
