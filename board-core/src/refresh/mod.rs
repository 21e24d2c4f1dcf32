//! Display planning: the hardware seam, flow-color buckets, and the per-LED
//! refresh decision.
//!
//! The [`DisplayDriver`] trait is the only way the core talks to LED hardware;
//! firmware and the host simulator provide implementations. Planning itself is
//! pure so the skip/closed/color decision can be tested without a display.

use crate::strobe::StrobeParams;
use crate::traffic::TrafficSample;

/// An 8-bit-per-channel color triple, also used for per-channel scaling.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const OFF: Self = Self::new(0x00, 0x00, 0x00);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// All three channels set to the same value; used for scaling writes.
    pub const fn splat(level: u8) -> Self {
        Self::new(level, level, level)
    }
}

/// Failure reported by a display write.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum DisplayError {
    /// The transaction did not reach the hardware.
    Bus,
    /// The LED number does not map to a driver output.
    InvalidLed(u16),
}

/// Hardware seam for the LED matrix.
///
/// Every operation must be safely retriable: repeating a write after a
/// reported failure may not corrupt display state.
pub trait DisplayDriver {
    /// Sets the color of one LED.
    fn set_color(&mut self, led: u16, color: Rgb) -> Result<(), DisplayError>;

    /// Sets the per-channel brightness scaling of one LED.
    fn set_scaling(&mut self, led: u16, scale: Rgb) -> Result<(), DisplayError>;

    /// Sets the board-wide current limit (global brightness).
    fn set_global_current(&mut self, level: u8) -> Result<(), DisplayError>;

    /// Resets the matrix hardware, turning every LED off.
    fn reset(&mut self) -> Result<(), DisplayError>;
}

/// Display driver that performs no hardware interaction.
#[derive(Copy, Clone, Debug, Default)]
pub struct NoopDisplayDriver;

impl NoopDisplayDriver {
    pub const fn new() -> Self {
        Self
    }
}

impl DisplayDriver for NoopDisplayDriver {
    fn set_color(&mut self, _: u16, _: Rgb) -> Result<(), DisplayError> {
        Ok(())
    }

    fn set_scaling(&mut self, _: u16, _: Rgb) -> Result<(), DisplayError> {
        Ok(())
    }

    fn set_global_current(&mut self, _: u8) -> Result<(), DisplayError> {
        Ok(())
    }

    fn reset(&mut self) -> Result<(), DisplayError> {
        Ok(())
    }
}

/// Runs `op` up to `attempts` times, stopping at the first success.
///
/// Returns the final error when every attempt fails. `attempts` must be
/// nonzero.
pub fn write_with_retries<F>(attempts: usize, mut op: F) -> Result<(), DisplayError>
where
    F: FnMut() -> Result<(), DisplayError>,
{
    debug_assert!(attempts > 0);
    let mut result = op();
    for _ in 1..attempts {
        if result.is_ok() {
            break;
        }
        result = op();
    }
    result
}

/// Traffic-flow severity buckets.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum FlowBucket {
    Slow,
    Medium,
    Fast,
}

/// Colors displayed for each flow bucket.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Palette {
    pub slow: Rgb,
    pub medium: Rgb,
    pub fast: Rgb,
}

/// Capability descriptor for one hardware class, selected once at startup and
/// passed wherever display decisions are made.
#[derive(Clone, Debug)]
pub struct BoardProfile {
    /// Number of addressable LEDs; valid LED numbers are `1..=led_count`.
    pub led_count: u16,
    /// Percent-flow below which a segment displays as slow.
    pub slow_cutoff_percent: u32,
    /// Percent-flow below which a segment displays as medium.
    pub medium_cutoff_percent: u32,
    pub palette: Palette,
    /// Appearance of a closed road before its strobe animation starts.
    pub closed_color: Rgb,
    /// Scaling applied to a freshly painted LED.
    pub default_scale: u8,
    /// Lower strobe bound for closed-road animations.
    pub strobe_low_scale: u8,
    pub strobe_step_high: u8,
    pub strobe_step_low: u8,
    pub strobe_step_cutoff: u8,
    /// Indicator LEDs that refresh and clear passes must leave alone.
    pub excluded_leds: &'static [u16],
    /// Whether a bulk hardware reset may stand in for a per-LED quick clear.
    pub bulk_reset_clear: bool,
    /// Global current restored after a bulk reset.
    pub global_current: u8,
}

impl BoardProfile {
    pub fn in_range(&self, led: u16) -> bool {
        led >= 1 && led <= self.led_count
    }

    pub fn is_excluded(&self, led: u16) -> bool {
        self.excluded_leds.contains(&led)
    }

    /// Strobe parameters for a closed-road LED: full brightness fading toward
    /// the low bound so a whole batch starts in phase at its peak.
    pub fn strobe_params(&self, led: u16) -> StrobeParams {
        StrobeParams {
            led,
            max_level: self.default_scale,
            min_level: self.strobe_low_scale,
            initial_level: self.default_scale,
            step_high: self.strobe_step_high,
            step_low: self.strobe_step_low,
            cutoff: self.strobe_step_cutoff,
            rising: false,
        }
    }
}

/// Percentage of typical flow the live sample represents.
///
/// Callers must have established `live >= 0` and `typical > 0`.
pub fn percent_flow(live: i16, typical: i16) -> u32 {
    debug_assert!(live >= 0 && typical > 0);
    (100 * live as u32) / typical as u32
}

/// Buckets a percent-flow value against the profile's cutoffs.
pub fn flow_bucket(percent: u32, profile: &BoardProfile) -> FlowBucket {
    if percent < profile.slow_cutoff_percent {
        FlowBucket::Slow
    } else if percent < profile.medium_cutoff_percent {
        FlowBucket::Medium
    } else {
        FlowBucket::Fast
    }
}

/// Maps a percent-flow value to its display color.
pub fn flow_color(percent: u32, profile: &BoardProfile) -> Rgb {
    match flow_bucket(percent, profile) {
        FlowBucket::Slow => profile.palette.slow,
        FlowBucket::Medium => profile.palette.medium,
        FlowBucket::Fast => profile.palette.fast,
    }
}

/// Why a refresh pass left an LED untouched.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SkipReason {
    /// The LED is an indicator and never carries traffic data.
    Excluded,
    /// No typical-speed baseline exists for the segment.
    NoTypical,
    /// The live sample's stored LED number disagrees with the index.
    LiveMismatch,
    /// The typical sample's stored LED number disagrees with the index.
    TypicalMismatch,
    /// The live sample reports no data.
    NoData,
}

impl SkipReason {
    pub const fn label(self) -> &'static str {
        match self {
            SkipReason::Excluded => "indicator LED",
            SkipReason::NoTypical => "no typical speed",
            SkipReason::LiveMismatch => "live sample index mismatch",
            SkipReason::TypicalMismatch => "typical sample index mismatch",
            SkipReason::NoData => "no live data",
        }
    }
}

/// What a refresh pass should do with one LED.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum LedPlan {
    Skip(SkipReason),
    /// Paint the closed appearance and register a strobe animation.
    Closed,
    /// Paint the bucketed flow color.
    Flow(Rgb),
}

/// Decides how a refresh pass treats `led` given its two snapshots.
///
/// The LED-number consistency checks defend against upstream data corruption:
/// a sample that claims a different LED than its table position is dropped
/// rather than displayed somewhere it does not belong.
pub fn plan_led(
    led: u16,
    live: &TrafficSample,
    typical: &TrafficSample,
    profile: &BoardProfile,
) -> LedPlan {
    if profile.is_excluded(led) {
        return LedPlan::Skip(SkipReason::Excluded);
    }
    if typical.speed <= 0 {
        return LedPlan::Skip(SkipReason::NoTypical);
    }
    if live.led != led {
        return LedPlan::Skip(SkipReason::LiveMismatch);
    }
    if typical.led != led {
        return LedPlan::Skip(SkipReason::TypicalMismatch);
    }
    if live.speed < 0 {
        return LedPlan::Skip(SkipReason::NoData);
    }
    if live.speed == 0 {
        return LedPlan::Closed;
    }
    LedPlan::Flow(flow_color(percent_flow(live.speed, typical.speed), profile))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROFILE: BoardProfile = BoardProfile {
        led_count: 46,
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
        excluded_leds: &[44, 45, 46],
        bulk_reset_clear: false,
        global_current: 0xA0,
    };

    #[test]
    fn half_typical_flow_lands_in_the_medium_bucket() {
        assert_eq!(percent_flow(50, 100), 50);
        assert_eq!(flow_bucket(50, &PROFILE), FlowBucket::Medium);
        assert_eq!(
            plan_led(
                1,
                &TrafficSample::new(1, 50),
                &TrafficSample::new(1, 100),
                &PROFILE
            ),
            LedPlan::Flow(PROFILE.palette.medium)
        );
    }

    #[test]
    fn bucket_boundaries_follow_the_cutoffs() {
        assert_eq!(flow_bucket(0, &PROFILE), FlowBucket::Slow);
        assert_eq!(flow_bucket(39, &PROFILE), FlowBucket::Slow);
        assert_eq!(flow_bucket(40, &PROFILE), FlowBucket::Medium);
        assert_eq!(flow_bucket(74, &PROFILE), FlowBucket::Medium);
        assert_eq!(flow_bucket(75, &PROFILE), FlowBucket::Fast);
        assert_eq!(flow_bucket(130, &PROFILE), FlowBucket::Fast);
    }

    #[test]
    fn closed_road_is_never_color_bucketed() {
        assert_eq!(
            plan_led(
                3,
                &TrafficSample::new(3, 0),
                &TrafficSample::new(3, 80),
                &PROFILE
            ),
            LedPlan::Closed
        );
    }

    #[test]
    fn defensive_skips() {
        // missing typical baseline
        assert_eq!(
            plan_led(
                2,
                &TrafficSample::new(2, 30),
                &TrafficSample::new(2, 0),
                &PROFILE
            ),
            LedPlan::Skip(SkipReason::NoTypical)
        );
        // live sample claims a different LED
        assert_eq!(
            plan_led(
                2,
                &TrafficSample::new(9, 30),
                &TrafficSample::new(2, 60),
                &PROFILE
            ),
            LedPlan::Skip(SkipReason::LiveMismatch)
        );
        // typical sample claims a different LED
        assert_eq!(
            plan_led(
                2,
                &TrafficSample::new(2, 30),
                &TrafficSample::new(9, 60),
                &PROFILE
            ),
            LedPlan::Skip(SkipReason::TypicalMismatch)
        );
        // live sample has no data
        assert_eq!(
            plan_led(
                2,
                &TrafficSample::new(2, -1),
                &TrafficSample::new(2, 60),
                &PROFILE
            ),
            LedPlan::Skip(SkipReason::NoData)
        );
        // indicator LEDs are untouchable regardless of data
        assert_eq!(
            plan_led(
                44,
                &TrafficSample::new(44, 30),
                &TrafficSample::new(44, 60),
                &PROFILE
            ),
            LedPlan::Skip(SkipReason::Excluded)
        );
    }

    #[test]
    fn retries_stop_at_first_success() {
        let mut calls = 0;
        let result = write_with_retries(5, || {
            calls += 1;
            if calls < 3 {
                Err(DisplayError::Bus)
            } else {
                Ok(())
            }
        });
        assert_eq!(result, Ok(()));
        assert_eq!(calls, 3);
    }

    #[test]
    fn retries_surface_the_final_error() {
        let mut calls = 0;
        let result = write_with_retries(4, || {
            calls += 1;
            Err(DisplayError::Bus)
        });
        assert_eq!(result, Err(DisplayError::Bus));
        assert_eq!(calls, 4);
    }
}
