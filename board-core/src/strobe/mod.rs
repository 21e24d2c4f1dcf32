//! Strobe registration state machines and the bounded registry.
//!
//! The registry is owned by exactly one task (the firmware's strobe engine)
//! and is mutated only through [`StrobeCommand`]s received over that task's
//! command channel, so no locking is needed around the entries themselves.
//! This module holds the portable pieces: the per-LED level state machine and
//! the command interpreter.

use heapless::Vec;

/// Opaque identity token for a strobe-registering worker.
///
/// Issued once per worker at startup and compared by value; a worker can only
/// unregister LEDs it registered itself.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct OwnerId(u32);

impl OwnerId {
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u32 {
        self.0
    }
}

/// Parameters describing how a newly registered LED should strobe.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct StrobeParams {
    pub led: u16,
    pub max_level: u8,
    pub min_level: u8,
    /// Level the animation starts from. Clamped into `[min_level, max_level]`;
    /// starting at or beyond a bound also forces the direction away from it.
    pub initial_level: u8,
    /// Step size applied while the level is above `cutoff`. This controls the
    /// strobe speed; if a faster strobe quantizes visibly, shorten the engine
    /// period instead.
    pub step_high: u8,
    /// Step size applied while the level is below `cutoff`.
    pub step_low: u8,
    pub cutoff: u8,
    /// Whether the level initially moves toward `max_level`.
    pub rising: bool,
}

/// Operations a worker can request from the strobe engine.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum StrobeOp {
    Register(StrobeParams),
    Unregister(u16),
    UnregisterAll,
}

/// A strobe request plus the identity of the worker that sent it.
///
/// This is the only channel through which the registry is mutated.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct StrobeCommand {
    pub owner: OwnerId,
    pub op: StrobeOp,
}

impl StrobeCommand {
    pub const fn register(owner: OwnerId, params: StrobeParams) -> Self {
        Self {
            owner,
            op: StrobeOp::Register(params),
        }
    }

    pub const fn unregister(owner: OwnerId, led: u16) -> Self {
        Self {
            owner,
            op: StrobeOp::Unregister(led),
        }
    }

    pub const fn unregister_all(owner: OwnerId) -> Self {
        Self {
            owner,
            op: StrobeOp::UnregisterAll,
        }
    }
}

/// Bound contacted by a level step.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Edge {
    Max,
    Min,
}

/// Outcome of advancing a registration by one tick.
///
/// `edge` reports bound contact so the engine can react on its own thread;
/// any follow-up registry change still goes back through the command channel.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct StrobeStep {
    pub level: u8,
    pub edge: Option<Edge>,
}

/// One actively strobing LED.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct StrobeLed {
    owner: OwnerId,
    led: u16,
    max_level: u8,
    min_level: u8,
    level: u8,
    step_high: u8,
    step_low: u8,
    cutoff: u8,
    rising: bool,
}

impl StrobeLed {
    fn from_params(owner: OwnerId, params: StrobeParams) -> Self {
        let (level, rising) = if params.initial_level >= params.max_level {
            (params.max_level, false)
        } else if params.initial_level <= params.min_level {
            (params.min_level, true)
        } else {
            (params.initial_level, params.rising)
        };

        Self {
            owner,
            led: params.led,
            max_level: params.max_level,
            min_level: params.min_level,
            level,
            step_high: params.step_high,
            step_low: params.step_low,
            cutoff: params.cutoff,
            rising,
        }
    }

    pub const fn owner(&self) -> OwnerId {
        self.owner
    }

    pub const fn led(&self) -> u16 {
        self.led
    }

    pub const fn level(&self) -> u8 {
        self.level
    }

    /// Moves the level one step toward the current bound.
    ///
    /// A step that would reach, cross, or numerically wrap a bound clamps
    /// exactly to that bound and flips the direction.
    pub fn advance(&mut self) -> StrobeStep {
        let step = if self.level > self.cutoff {
            self.step_high
        } else if self.level < self.cutoff {
            self.step_low
        } else if self.rising {
            // exactly at the cutoff: follow the direction of travel
            self.step_high
        } else {
            self.step_low
        };

        let mut edge = None;
        if self.rising {
            match self.level.checked_add(step) {
                Some(next) if next < self.max_level => self.level = next,
                _ => {
                    self.level = self.max_level;
                    self.rising = false;
                    edge = Some(Edge::Max);
                }
            }
        } else {
            match self.level.checked_sub(step) {
                Some(next) if next > self.min_level => self.level = next,
                _ => {
                    self.level = self.min_level;
                    self.rising = true;
                    edge = Some(Edge::Min);
                }
            }
        }

        StrobeStep {
            level: self.level,
            edge,
        }
    }
}

/// Why a command was ignored rather than applied.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum IgnoreReason {
    /// The LED is already strobing; the existing registration is untouched.
    AlreadyRegistered,
    /// The LED is not currently strobing.
    NotRegistered,
    /// The LED was registered by a different worker.
    ForeignOwner,
}

impl IgnoreReason {
    pub const fn label(self) -> &'static str {
        match self {
            IgnoreReason::AlreadyRegistered => "LED is already being strobed",
            IgnoreReason::NotRegistered => "LED is not currently strobed",
            IgnoreReason::ForeignOwner => "LED is strobed by another worker",
        }
    }
}

/// What applying a command did to the registry.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum CommandEffect {
    Registered(u16),
    Unregistered(u16),
    UnregisteredAll { owner: OwnerId, removed: usize },
    Ignored { led: u16, reason: IgnoreReason },
}

/// Errors that may occur while applying a command.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum StrobeRegistryError {
    /// Registering would exceed the registry capacity. The board cannot
    /// animate what it was asked to; callers treat this as fatal.
    RegistryFull,
}

/// Bounded pool of actively strobing LEDs, owned by the strobe engine task.
pub struct StrobeRegistry<const N: usize> {
    entries: Vec<StrobeLed, N>,
}

impl<const N: usize> StrobeRegistry<N> {
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, led: u16) -> bool {
        self.find(led).is_some()
    }

    fn find(&self, led: u16) -> Option<usize> {
        self.entries.iter().position(|entry| entry.led() == led)
    }

    /// Interprets a command and mutates the registry accordingly.
    ///
    /// Duplicate registers and unregisters of unknown or foreign LEDs are
    /// reported as [`CommandEffect::Ignored`] with the registry untouched.
    pub fn apply(&mut self, command: StrobeCommand) -> Result<CommandEffect, StrobeRegistryError> {
        match command.op {
            StrobeOp::Register(params) => {
                if self.find(params.led).is_some() {
                    return Ok(CommandEffect::Ignored {
                        led: params.led,
                        reason: IgnoreReason::AlreadyRegistered,
                    });
                }
                self.entries
                    .push(StrobeLed::from_params(command.owner, params))
                    .map_err(|_| StrobeRegistryError::RegistryFull)?;
                Ok(CommandEffect::Registered(params.led))
            }
            StrobeOp::Unregister(led) => match self.find(led) {
                None => Ok(CommandEffect::Ignored {
                    led,
                    reason: IgnoreReason::NotRegistered,
                }),
                Some(index) if self.entries[index].owner() != command.owner => {
                    Ok(CommandEffect::Ignored {
                        led,
                        reason: IgnoreReason::ForeignOwner,
                    })
                }
                Some(index) => {
                    self.entries.swap_remove(index);
                    Ok(CommandEffect::Unregistered(led))
                }
            },
            StrobeOp::UnregisterAll => {
                let mut removed = 0;
                let mut index = 0;
                while index < self.entries.len() {
                    if self.entries[index].owner() == command.owner {
                        // swap-with-last; re-check the same slot
                        self.entries.swap_remove(index);
                        removed += 1;
                    } else {
                        index += 1;
                    }
                }
                Ok(CommandEffect::UnregisteredAll {
                    owner: command.owner,
                    removed,
                })
            }
        }
    }

    /// Iterates the registrations for a per-tick advance.
    pub fn iter_mut(&mut self) -> core::slice::IterMut<'_, StrobeLed> {
        self.entries.iter_mut()
    }

    pub fn iter(&self) -> core::slice::Iter<'_, StrobeLed> {
        self.entries.iter()
    }
}

impl<const N: usize> Default for StrobeRegistry<N> {
    fn default() -> Self {
        Self::new()
    }
}
