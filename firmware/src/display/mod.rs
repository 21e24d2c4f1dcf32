#![cfg_attr(not(target_os = "none"), allow(dead_code))]

//! Display sharing and the on-target LED matrix driver.
//!
//! The strobe engine and the refresh orchestrator both write to the matrix,
//! so the driver lives behind an async mutex and each write sequence locks it
//! briefly. Hardware access itself is implemented against the
//! [`DisplayDriver`] seam from `board-core`; host builds and tests substitute
//! [`board_core::refresh::NoopDisplayDriver`] or their own recorder.

use board_core::refresh::DisplayDriver;
#[cfg(not(target_os = "none"))]
use embassy_sync::blocking_mutex::raw::NoopRawMutex;
#[cfg(target_os = "none")]
use embassy_sync::blocking_mutex::raw::ThreadModeRawMutex;
use embassy_sync::mutex::Mutex;

#[cfg(target_os = "none")]
type DisplayMutex = ThreadModeRawMutex;
#[cfg(not(target_os = "none"))]
type DisplayMutex = NoopRawMutex;

/// A display driver shared between the strobe engine and the orchestrator.
pub type SharedDisplay<D> = Mutex<DisplayMutex, D>;

#[cfg(target_os = "none")]
pub use matrix::MatrixDriver;

#[cfg(target_os = "none")]
mod matrix {
    use board_core::refresh::{DisplayDriver, DisplayError, Rgb};
    use embassy_stm32::i2c::I2c;
    use embassy_stm32::mode::Blocking;

    /// Register used to switch the active page on a matrix controller.
    const PAGE_SELECT: u8 = 0xFD;
    const PAGE_PWM: u8 = 0x00;
    const PAGE_SCALING: u8 = 0x01;
    const PAGE_FUNCTION: u8 = 0x03;

    const REG_CONFIGURATION: u8 = 0x00;
    const REG_GLOBAL_CURRENT: u8 = 0x01;
    const REG_RESET: u8 = 0x3F;

    const NORMAL_OPERATION: u8 = 0x01;
    const RESET_KEY: u8 = 0xAE;

    /// RGB channels per controller; LED numbers map onto controllers in
    /// ascending order.
    const LEDS_PER_CONTROLLER: u16 = 24;

    /// Bus addresses of the matrix controllers, in LED-number order.
    const CONTROLLER_ADDRS: [u8; 2] = [0x30, 0x33];

    /// Blocking-I2C driver for the chained LED matrix controllers.
    ///
    /// Every operation is a plain register write, so retrying a failed
    /// transaction is safe.
    pub struct MatrixDriver<'d> {
        i2c: I2c<'d, Blocking>,
    }

    impl<'d> MatrixDriver<'d> {
        pub fn new(i2c: I2c<'d, Blocking>) -> Self {
            Self { i2c }
        }

        fn locate(led: u16) -> Result<(u8, u8), DisplayError> {
            let index = led.checked_sub(1).ok_or(DisplayError::InvalidLed(led))?;
            let controller = (index / LEDS_PER_CONTROLLER) as usize;
            let addr = *CONTROLLER_ADDRS
                .get(controller)
                .ok_or(DisplayError::InvalidLed(led))?;
            let base = (index % LEDS_PER_CONTROLLER) as u8 * 3;
            Ok((addr, base))
        }

        fn write(&mut self, addr: u8, bytes: &[u8]) -> Result<(), DisplayError> {
            self.i2c
                .blocking_write(addr, bytes)
                .map_err(|_| DisplayError::Bus)
        }

        fn select_page(&mut self, addr: u8, page: u8) -> Result<(), DisplayError> {
            self.write(addr, &[PAGE_SELECT, page])
        }

        fn write_channels(
            &mut self,
            addr: u8,
            page: u8,
            base: u8,
            value: Rgb,
        ) -> Result<(), DisplayError> {
            self.select_page(addr, page)?;
            self.write(addr, &[base, value.r, value.g, value.b])
        }
    }

    impl DisplayDriver for MatrixDriver<'_> {
        fn set_color(&mut self, led: u16, color: Rgb) -> Result<(), DisplayError> {
            let (addr, base) = Self::locate(led)?;
            self.write_channels(addr, PAGE_PWM, base, color)
        }

        fn set_scaling(&mut self, led: u16, scale: Rgb) -> Result<(), DisplayError> {
            let (addr, base) = Self::locate(led)?;
            self.write_channels(addr, PAGE_SCALING, base, scale)
        }

        fn set_global_current(&mut self, level: u8) -> Result<(), DisplayError> {
            for addr in CONTROLLER_ADDRS {
                self.select_page(addr, PAGE_FUNCTION)?;
                self.write(addr, &[REG_GLOBAL_CURRENT, level])?;
            }
            Ok(())
        }

        fn reset(&mut self) -> Result<(), DisplayError> {
            for addr in CONTROLLER_ADDRS {
                self.select_page(addr, PAGE_FUNCTION)?;
                self.write(addr, &[REG_RESET, RESET_KEY])?;
                self.write(addr, &[REG_CONFIGURATION, NORMAL_OPERATION])?;
            }
            Ok(())
        }
    }
}
