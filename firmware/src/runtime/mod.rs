use cortex_m::interrupt;
use cortex_m::register::primask;
use critical_section::{self, RawRestoreState};
use defmt_rtt as _;
use embassy_executor::Spawner;
use embassy_stm32 as hal;
use embassy_stm32::i2c::I2c;
use embassy_stm32::time::Hertz;
use embassy_sync::blocking_mutex::raw::ThreadModeRawMutex;
use embassy_sync::channel::Channel;
use embassy_sync::signal::Signal;
use static_cell::StaticCell;

use crate::actions::ActionQueue;
use crate::display::{MatrixDriver, SharedDisplay};
use crate::layout::LED_COUNT;
use crate::strobe::{StrobeGate, StrobeQueue};
use crate::traffic_store::TrafficStore;

mod action_task;
mod input_task;
mod refresh_task;
mod strobe_task;
mod tick_task;

critical_section::set_impl!(InterruptCriticalSection);

struct InterruptCriticalSection;

unsafe impl critical_section::Impl for InterruptCriticalSection {
    unsafe fn acquire() -> RawRestoreState {
        let primask = primask::read();
        interrupt::disable();
        primask.is_active()
    }

    unsafe fn release(restore_state: RawRestoreState) {
        if restore_state {
            unsafe {
                interrupt::enable();
            }
        }
    }
}

pub(super) static STROBE_QUEUE: StrobeQueue = Channel::new();
pub(super) static STROBE_GATE: StrobeGate = StrobeGate::new(());
pub(super) static ACTION_QUEUE: ActionQueue = Channel::new();
pub(super) static TRAFFIC: TrafficStore<LED_COUNT> = TrafficStore::new();
/// Woken by the toggle input so an idle refresh loop repaints immediately.
pub(super) static REFRESH_WAKE: Signal<ThreadModeRawMutex, ()> = Signal::new();

static DISPLAY: StaticCell<SharedDisplay<MatrixDriver<'static>>> = StaticCell::new();

#[embassy_executor::main]
pub async fn main(spawner: Spawner) {
    let config = hal::Config::default();
    let hal::Peripherals {
        I2C1,
        PB6,
        PB7,
        PA0,
        EXTI0,
        ..
    } = hal::init(config);

    let i2c = I2c::new_blocking(I2C1, PB6, PB7, Hertz::khz(400), Default::default());
    let display = DISPLAY.init(SharedDisplay::new(MatrixDriver::new(i2c)));

    // The time-sync collaborator records local time via `clock::sync` once
    // the network is up; scheduled actions hold off until then.

    spawner
        .spawn(strobe_task::run(display))
        .expect("failed to spawn strobe engine task");
    spawner
        .spawn(refresh_task::run(display))
        .expect("failed to spawn refresh task");
    spawner
        .spawn(action_task::run(display))
        .expect("failed to spawn action task");
    spawner
        .spawn(tick_task::run())
        .expect("failed to spawn tick task");
    spawner
        .spawn(input_task::run(PA0, EXTI0))
        .expect("failed to spawn input task");

    core::future::pending::<()>().await;
}
