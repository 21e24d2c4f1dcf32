//! Host simulator for the traffic board.
//!
//! Runs the portable board logic against a terminal display so refresh
//! sweeps, closed-road strobing, and the daily schedule can be watched
//! without hardware. `t` toggles the displayed direction (the equivalent of
//! the board's physical button), `q` quits.

mod board;

use std::io::{self, Write};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use board_core::geometry::{Sweep, order_leds};
use board_core::refresh::{
    BoardProfile, DisplayDriver, LedPlan, Palette, Rgb, plan_led, write_with_retries,
};
use board_core::schedule::{DAILY_SCHEDULE, TimeOfDay, WallClock, next_action};
use board_core::strobe::{OwnerId, StrobeCommand, StrobeRegistry};
use board_core::traffic::{Direction, TrafficSample};
use crossterm::cursor::{Hide, Show};
use crossterm::event::{self, Event, KeyCode};
use crossterm::terminal::{self, Clear, ClearType};
use crossterm::ExecutableCommand;

use board::{LED_COORDS, LED_COUNT, SimDisplay};

const PROFILE: BoardProfile = BoardProfile {
    led_count: LED_COUNT as u16,
    slow_cutoff_percent: 40,
    medium_cutoff_percent: 75,
    palette: Palette {
        slow: Rgb::new(0xFF, 0x00, 0x00),
        medium: Rgb::new(0xFF, 0x60, 0x00),
        fast: Rgb::new(0x00, 0xD0, 0x40),
    },
    closed_color: Rgb::new(0xFF, 0x00, 0x00),
    default_scale: 0xFF,
    strobe_low_scale: 0x20,
    strobe_step_high: 10,
    strobe_step_low: 10,
    strobe_step_cutoff: 0x80,
    excluded_leds: &[],
    bulk_reset_clear: true,
    global_current: 0xA0,
};

const STROBE_PERIOD: Duration = Duration::from_millis(100);
const LED_UPDATE_PERIOD: Duration = Duration::from_millis(50);
const RETRY_LIMIT: usize = 5;

const SIM_OWNER: OwnerId = OwnerId::new(1);

/// Wall clock backed by the host's UTC time.
struct HostClock;

impl WallClock for HostClock {
    type Error = io::Error;

    fn time_of_day(&mut self) -> Result<TimeOfDay, Self::Error> {
        let since_epoch = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|err| io::Error::other(err))?;
        let day_secs = (since_epoch.as_secs() % 86_400) as u32;
        Ok(TimeOfDay::new(
            (day_secs / 3600) as u8,
            ((day_secs / 60) % 60) as u8,
            (day_secs % 60) as u8,
        ))
    }
}

/// Synthetic samples: a slow knot in the middle, one closure, two gaps.
fn live_speeds(dir: Direction) -> [TrafficSample; LED_COUNT] {
    let mut data = [TrafficSample::NO_DATA; LED_COUNT];
    for (index, slot) in data.iter_mut().enumerate() {
        let led = (index as u16) + 1;
        let speed = match (dir, led) {
            (_, 8) => 0,                   // closed ramp
            (_, 5) | (_, 17) => -1,        // sensor gaps
            (Direction::North, 9..=13) => 18,
            (Direction::South, 14..=18) => 25,
            (_, 1..=4) => 62,
            _ => 55,
        };
        *slot = TrafficSample::new(led, speed);
    }
    data
}

fn typical_speeds() -> [TrafficSample; LED_COUNT] {
    let mut data = [TrafficSample::NO_DATA; LED_COUNT];
    for (index, slot) in data.iter_mut().enumerate() {
        *slot = TrafficSample::new((index as u16) + 1, 60);
    }
    data
}

fn refresh_sweep(dir: Direction) -> Sweep {
    match dir {
        Direction::North => Sweep::DiagLineReverse,
        Direction::South => Sweep::DiagLine,
    }
}

/// Paints one full pass and registers closed roads for strobing.
fn refresh(
    out: &mut impl Write,
    display: &mut SimDisplay,
    registry: &mut StrobeRegistry<LED_COUNT>,
    dir: Direction,
    status: &str,
) -> io::Result<()> {
    let mut order = [0u16; LED_COUNT];
    order_leds(&mut order, refresh_sweep(dir), &LED_COORDS).expect("demo board tables agree");

    let typical = typical_speeds();
    let live = live_speeds(dir);

    for &led in &order {
        let index = usize::from(led - 1);
        match plan_led(led, &live[index], &typical[index], &PROFILE) {
            LedPlan::Skip(_) => {}
            LedPlan::Closed => {
                let _ = write_with_retries(RETRY_LIMIT, || {
                    display.set_color(led, PROFILE.closed_color)
                });
                registry
                    .apply(StrobeCommand::register(SIM_OWNER, PROFILE.strobe_params(led)))
                    .expect("demo registry sized for the whole board");
            }
            LedPlan::Flow(color) => {
                let _ = write_with_retries(RETRY_LIMIT, || display.set_color(led, color));
                let _ = display.set_scaling(led, Rgb::splat(PROFILE.default_scale));
            }
        }
        display.render(out, status)?;
        std::thread::sleep(LED_UPDATE_PERIOD);
    }
    Ok(())
}

/// Clears the board with a bulk reset, dropping this worker's strobe batch.
fn clear(registry: &mut StrobeRegistry<LED_COUNT>, display: &mut SimDisplay) {
    registry
        .apply(StrobeCommand::unregister_all(SIM_OWNER))
        .expect("unregister-all cannot overflow");
    let _ = display.reset();
}

fn status_line(dir: Direction) -> String {
    let schedule = match HostClock.time_of_day() {
        Ok(now) => {
            let next = next_action(&DAILY_SCHEDULE, now);
            format!("next action: {} in {}s", next.kind.label(), next.delay_secs)
        }
        Err(_) => String::from("clock unavailable"),
    };
    format!(
        "direction: {}   {}   [t] toggle direction  [q] quit",
        dir.label(),
        schedule
    )
}

fn main() -> io::Result<()> {
    let mut stdout = io::stdout();
    terminal::enable_raw_mode()?;
    stdout.execute(Clear(ClearType::All))?.execute(Hide)?;

    let mut display = SimDisplay::new();
    let mut registry: StrobeRegistry<LED_COUNT> = StrobeRegistry::new();
    let mut dir = Direction::North;

    let result = (|| -> io::Result<()> {
        refresh(&mut stdout, &mut display, &mut registry, dir, &status_line(dir))?;

        loop {
            // one strobe tick over every registered LED
            for entry in registry.iter_mut() {
                let step = entry.advance();
                let led = entry.led();
                let _ = write_with_retries(RETRY_LIMIT, || {
                    display.set_scaling(led, Rgb::splat(step.level))
                });
            }
            display.render(&mut stdout, &status_line(dir))?;

            if event::poll(STROBE_PERIOD)? {
                if let Event::Key(key) = event::read()? {
                    match key.code {
                        KeyCode::Char('q') => return Ok(()),
                        KeyCode::Char('t') => {
                            dir = dir.opposite();
                            clear(&mut registry, &mut display);
                            stdout.execute(Clear(ClearType::All))?;
                            refresh(
                                &mut stdout,
                                &mut display,
                                &mut registry,
                                dir,
                                &status_line(dir),
                            )?;
                        }
                        _ => {}
                    }
                }
            }
        }
    })();

    terminal::disable_raw_mode()?;
    stdout.execute(Show)?;
    result
}
