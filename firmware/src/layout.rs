#![cfg_attr(not(target_os = "none"), allow(dead_code))]

//! Physical board description: LED coordinates, indicator assignments, and
//! the capability profile handed to the orchestrator at startup.

use board_core::geometry::{LedCoord, Sweep};
use board_core::refresh::{BoardProfile, Palette, Rgb};
use board_core::traffic::Direction;

/// Number of addressable LEDs on the board. LED numbers are `1..=LED_COUNT`;
/// zero is not an LED.
pub const LED_COUNT: usize = 46;

/// Status and legend indicators, driven by the indicator collaborator and
/// left untouched by refresh and clear passes.
pub const WIFI_LED: u16 = 37;
pub const ERROR_LED: u16 = 38;
pub const UPDATE_LED: u16 = 39;
pub const NORTH_LED: u16 = 40;
pub const SOUTH_LED: u16 = 41;
pub const EAST_LED: u16 = 42;
pub const WEST_LED: u16 = 43;
pub const LEGEND_LIGHT_LED: u16 = 44;
pub const LEGEND_MEDIUM_LED: u16 = 45;
pub const LEGEND_HEAVY_LED: u16 = 46;

const INDICATOR_LEDS: [u16; 10] = [
    WIFI_LED,
    ERROR_LED,
    UPDATE_LED,
    NORTH_LED,
    SOUTH_LED,
    EAST_LED,
    WEST_LED,
    LEGEND_LIGHT_LED,
    LEGEND_MEDIUM_LED,
    LEGEND_HEAVY_LED,
];

/// Board positions of every LED, generated from the corridor survey data;
/// index `i` corresponds to LED number `i + 1`. Segments 1..=36 trace the
/// freeway corridor southwest to northeast, 37..=46 sit in the legend block.
pub static LED_COORDS: [LedCoord; LED_COUNT] = [
    LedCoord::new(28, 36),
    LedCoord::new(44, 52),
    LedCoord::new(61, 66),
    LedCoord::new(79, 78),
    LedCoord::new(98, 88),
    LedCoord::new(117, 99),
    LedCoord::new(135, 112),
    LedCoord::new(152, 127),
    LedCoord::new(168, 143),
    LedCoord::new(183, 160),
    LedCoord::new(197, 178),
    LedCoord::new(210, 197),
    LedCoord::new(222, 217),
    LedCoord::new(234, 237),
    LedCoord::new(247, 256),
    LedCoord::new(261, 274),
    LedCoord::new(276, 291),
    LedCoord::new(292, 307),
    LedCoord::new(309, 322),
    LedCoord::new(327, 336),
    LedCoord::new(346, 349),
    LedCoord::new(365, 361),
    LedCoord::new(384, 373),
    LedCoord::new(403, 385),
    LedCoord::new(421, 398),
    LedCoord::new(438, 412),
    LedCoord::new(454, 428),
    LedCoord::new(469, 445),
    LedCoord::new(483, 463),
    LedCoord::new(496, 482),
    LedCoord::new(508, 501),
    LedCoord::new(520, 520),
    LedCoord::new(533, 538),
    LedCoord::new(547, 555),
    LedCoord::new(562, 571),
    LedCoord::new(578, 586),
    LedCoord::new(40, 560),
    LedCoord::new(60, 560),
    LedCoord::new(80, 560),
    LedCoord::new(40, 540),
    LedCoord::new(60, 540),
    LedCoord::new(80, 540),
    LedCoord::new(100, 540),
    LedCoord::new(40, 520),
    LedCoord::new(60, 520),
    LedCoord::new(80, 520),
];

/// Capability descriptor for the production hardware class.
pub static PROFILE: BoardProfile = BoardProfile {
    led_count: LED_COUNT as u16,
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
    excluded_leds: &INDICATOR_LEDS,
    bulk_reset_clear: false,
    global_current: 0xA0,
};

/// Sweep used when refreshing toward the given direction.
pub const fn refresh_sweep(dir: Direction) -> Sweep {
    match dir {
        Direction::North => Sweep::DiagLineReverse,
        Direction::South => Sweep::DiagLine,
    }
}

/// Sweep used when clearing away from the given direction.
pub const fn clear_sweep(dir: Direction) -> Sweep {
    match dir {
        Direction::North => Sweep::CurvedNorthReverse,
        Direction::South => Sweep::CurvedSouthReverse,
    }
}
