//! Terminal rendering of the simulated board.

use std::io::{self, Write};

use board_core::geometry::LedCoord;
use board_core::refresh::{DisplayDriver, DisplayError, Rgb};
use crossterm::cursor::MoveTo;
use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};
use crossterm::QueueableCommand;

/// Demo corridor: 22 traffic segments running southwest to northeast.
pub const LED_COUNT: usize = 22;

pub static LED_COORDS: [LedCoord; LED_COUNT] = [
    LedCoord::new(30, 40),
    LedCoord::new(55, 62),
    LedCoord::new(82, 82),
    LedCoord::new(110, 100),
    LedCoord::new(138, 118),
    LedCoord::new(165, 138),
    LedCoord::new(190, 160),
    LedCoord::new(213, 184),
    LedCoord::new(234, 210),
    LedCoord::new(254, 237),
    LedCoord::new(274, 263),
    LedCoord::new(295, 288),
    LedCoord::new(318, 311),
    LedCoord::new(343, 332),
    LedCoord::new(370, 351),
    LedCoord::new(398, 369),
    LedCoord::new(426, 387),
    LedCoord::new(453, 407),
    LedCoord::new(478, 429),
    LedCoord::new(501, 453),
    LedCoord::new(522, 479),
    LedCoord::new(542, 506),
];

/// Display driver that renders into a terminal grid instead of an LED matrix.
pub struct SimDisplay {
    colors: [Rgb; LED_COUNT],
    scalings: [Rgb; LED_COUNT],
}

impl SimDisplay {
    pub fn new() -> Self {
        Self {
            colors: [Rgb::OFF; LED_COUNT],
            scalings: [Rgb::splat(0xFF); LED_COUNT],
        }
    }

    fn slot(&self, led: u16) -> Result<usize, DisplayError> {
        let index = usize::from(led.checked_sub(1).ok_or(DisplayError::InvalidLed(led))?);
        if index >= LED_COUNT {
            return Err(DisplayError::InvalidLed(led));
        }
        Ok(index)
    }

    fn apparent_color(&self, index: usize) -> Color {
        let color = self.colors[index];
        let scale = self.scalings[index];
        Color::Rgb {
            r: ((u16::from(color.r) * u16::from(scale.r)) / 255) as u8,
            g: ((u16::from(color.g) * u16::from(scale.g)) / 255) as u8,
            b: ((u16::from(color.b) * u16::from(scale.b)) / 255) as u8,
        }
    }

    /// Draws every LED at its board position, scaled into the terminal.
    pub fn render(&self, out: &mut impl Write, status: &str) -> io::Result<()> {
        for (index, coord) in LED_COORDS.iter().enumerate() {
            let col = (coord.x / 9) as u16;
            let row = ((600 - coord.y) / 22) as u16;
            out.queue(MoveTo(col, row))?
                .queue(SetForegroundColor(self.apparent_color(index)))?
                .queue(Print("●"))?;
        }
        out.queue(ResetColor)?
            .queue(MoveTo(0, 29))?
            .queue(Print(format!("{status:<70}")))?;
        out.flush()
    }
}

impl DisplayDriver for SimDisplay {
    fn set_color(&mut self, led: u16, color: Rgb) -> Result<(), DisplayError> {
        let index = self.slot(led)?;
        self.colors[index] = color;
        Ok(())
    }

    fn set_scaling(&mut self, led: u16, scale: Rgb) -> Result<(), DisplayError> {
        let index = self.slot(led)?;
        self.scalings[index] = scale;
        Ok(())
    }

    fn set_global_current(&mut self, _: u8) -> Result<(), DisplayError> {
        Ok(())
    }

    fn reset(&mut self) -> Result<(), DisplayError> {
        self.colors = [Rgb::OFF; LED_COUNT];
        self.scalings = [Rgb::splat(0xFF); LED_COUNT];
        Ok(())
    }
}
