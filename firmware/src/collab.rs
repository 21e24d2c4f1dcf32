#![cfg_attr(not(target_os = "none"), allow(dead_code))]

//! Narrow contracts for the board's external collaborators.
//!
//! Transport, persistence, and indicator hardware are owned elsewhere; this
//! firmware core only depends on the seams below. The `Noop*` implementations
//! stand in wherever a deployment has not wired the real collaborator yet —
//! the board then runs on persisted/absent data exactly as it would during a
//! network outage.

use board_core::traffic::{Category, Direction, TrafficSample};

/// Upstream per-LED speed samples for one (direction, category) pair.
pub trait TrafficSource {
    type Error;

    /// Fills `out` with fresh samples. On failure the caller falls back to
    /// the persisted samples in the [`SettingsStore`].
    fn fetch(
        &mut self,
        dir: Direction,
        category: Category,
        out: &mut [TrafficSample],
    ) -> Result<(), Self::Error>;
}

/// Persistent key-value storage for traffic samples, used as the fallback
/// source when a fetch fails.
pub trait SettingsStore {
    type Error;

    fn load(
        &mut self,
        dir: Direction,
        category: Category,
        out: &mut [TrafficSample],
    ) -> Result<(), Self::Error>;

    fn store(
        &mut self,
        dir: Direction,
        category: Category,
        data: &[TrafficSample],
    ) -> Result<(), Self::Error>;
}

/// User-visible indicator LEDs (connectivity, update availability).
pub trait Indicators {
    /// Raises the no-connectivity indicator; cleared by the next success.
    fn raise_connectivity(&mut self);

    fn resolve_connectivity(&mut self);

    fn indicate_update_available(&mut self);
}

/// Queries whether a firmware update is waiting upstream.
pub trait UpdateCheck {
    type Error;

    fn update_available(&mut self) -> Result<bool, Self::Error>;
}

/// Ambient light level used to derive the global LED current.
pub trait AmbientSensor {
    type Error;

    /// Returns the target global-current level for the current ambient light.
    fn ambient_level(&mut self) -> Result<u8, Self::Error>;
}

/// Traffic source that always reports the link as unavailable.
#[derive(Copy, Clone, Debug, Default)]
pub struct NoopTrafficSource;

/// Error reported by [`NoopTrafficSource`].
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct SourceUnavailable;

impl TrafficSource for NoopTrafficSource {
    type Error = SourceUnavailable;

    fn fetch(
        &mut self,
        _: Direction,
        _: Category,
        _: &mut [TrafficSample],
    ) -> Result<(), Self::Error> {
        Err(SourceUnavailable)
    }
}

/// Settings store with nothing persisted; loads report every segment as
/// having no data.
#[derive(Copy, Clone, Debug, Default)]
pub struct NoopSettingsStore;

impl SettingsStore for NoopSettingsStore {
    type Error = core::convert::Infallible;

    fn load(
        &mut self,
        _: Direction,
        _: Category,
        out: &mut [TrafficSample],
    ) -> Result<(), Self::Error> {
        out.fill(TrafficSample::NO_DATA);
        Ok(())
    }

    fn store(
        &mut self,
        _: Direction,
        _: Category,
        _: &[TrafficSample],
    ) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// Indicator sink that drops every signal.
#[derive(Copy, Clone, Debug, Default)]
pub struct NoopIndicators;

impl Indicators for NoopIndicators {
    fn raise_connectivity(&mut self) {}

    fn resolve_connectivity(&mut self) {}

    fn indicate_update_available(&mut self) {}
}

/// Update check that never finds anything.
#[derive(Copy, Clone, Debug, Default)]
pub struct NoopUpdateCheck;

impl UpdateCheck for NoopUpdateCheck {
    type Error = core::convert::Infallible;

    fn update_available(&mut self) -> Result<bool, Self::Error> {
        Ok(false)
    }
}

/// Ambient sensor pinned to a mid-range level.
#[derive(Copy, Clone, Debug, Default)]
pub struct NoopAmbientSensor;

impl AmbientSensor for NoopAmbientSensor {
    type Error = core::convert::Infallible;

    fn ambient_level(&mut self) -> Result<u8, Self::Error> {
        Ok(0x80)
    }
}
