//! Direction-toggle button input.
//!
//! A press raises the cooperative abort signal (left for the refresh loop to
//! consume) and wakes the loop if it is sleeping between passes.

use embassy_stm32::exti::ExtiInput;
use embassy_stm32::gpio::Pull;
use embassy_stm32::peripherals::{EXTI0, PA0};
use embassy_time::{Duration, Timer};

use super::REFRESH_WAKE;
use crate::status;

const DEBOUNCE: Duration = Duration::from_millis(50);

#[embassy_executor::task]
pub async fn run(pin: PA0, exti: EXTI0) -> ! {
    let mut button = ExtiInput::new(pin, exti, Pull::Up);
    loop {
        button.wait_for_falling_edge().await;
        defmt::info!("input: direction toggle pressed");
        status::request_abort();
        REFRESH_WAKE.signal(());
        Timer::after(DEBOUNCE).await;
    }
}
