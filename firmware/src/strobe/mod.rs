#![cfg_attr(not(target_os = "none"), allow(dead_code))]

//! Strobe engine: command channel, pause gate, and the periodic engine task.
//!
//! The engine owns the only [`StrobeRegistry`] and is the single place it is
//! mutated. Other tasks talk to it through a bounded command channel via a
//! [`StrobeHandle`], and coordinate batch registrations with the pause gate:
//! while a refresh pass holds the gate, the engine will not drain the channel,
//! so every LED the pass registers starts strobing on the same tick.

use board_core::refresh::{DisplayDriver, Rgb, write_with_retries};
use board_core::strobe::{
    CommandEffect, OwnerId, StrobeCommand, StrobeParams, StrobeRegistry, StrobeRegistryError,
};
#[cfg(not(target_os = "none"))]
use embassy_sync::blocking_mutex::raw::NoopRawMutex;
#[cfg(target_os = "none")]
use embassy_sync::blocking_mutex::raw::ThreadModeRawMutex;
use embassy_sync::channel::{Channel, Receiver, Sender};
use embassy_sync::mutex::{Mutex, MutexGuard};
use embassy_time::{Duration, Instant, Timer, with_timeout};

use crate::display::SharedDisplay;
use crate::layout::LED_COUNT;

#[cfg(target_os = "none")]
type StrobeMutex = ThreadModeRawMutex;
#[cfg(not(target_os = "none"))]
type StrobeMutex = NoopRawMutex;

/// Maximum number of LEDs the engine can animate simultaneously.
pub const MAX_STROBE_LEDS: usize = LED_COUNT;

/// Depth of the command channel. Sized so one refresh pass can register every
/// LED on the board without a send ever blocking mid-batch.
pub const STROBE_QUEUE_DEPTH: usize = MAX_STROBE_LEDS;

/// Period of one strobe tick. Lengthening this (with larger steps) coarsens
/// the animation at the same apparent speed while relaxing the deadline.
pub const STROBE_PERIOD: Duration = Duration::from_millis(100);

/// Attempts per scaling write before the LED is skipped for this tick.
pub const SCALING_RETRY_LIMIT: usize = 5;

/// Command channel feeding the strobe engine.
pub type StrobeQueue = Channel<StrobeMutex, StrobeCommand, STROBE_QUEUE_DEPTH>;

/// Convenience sender type alias for the strobe command channel.
pub type StrobeSender<'a> = Sender<'a, StrobeMutex, StrobeCommand, STROBE_QUEUE_DEPTH>;

/// Convenience receiver type alias for the strobe command channel.
pub type StrobeReceiver<'a> = Receiver<'a, StrobeMutex, StrobeCommand, STROBE_QUEUE_DEPTH>;

/// Gate pausing the engine's command intake during a batch registration.
pub type StrobeGate = Mutex<StrobeMutex, ()>;

/// Held while a batch registration is in flight; dropping it resumes intake.
pub type PauseGuard<'a> = MutexGuard<'a, StrobeMutex, ()>;

/// The pause gate could not be taken within the caller's wait budget.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct PauseTimeout;

/// Caller-side handle to the strobe engine.
///
/// Carries the caller's [`OwnerId`] so every command is stamped with the
/// identity the registry checks on unregister.
pub struct StrobeHandle<'a> {
    sender: StrobeSender<'a>,
    gate: &'a StrobeGate,
    owner: OwnerId,
}

impl<'a> StrobeHandle<'a> {
    pub fn new(queue: &'a StrobeQueue, gate: &'a StrobeGate, owner: OwnerId) -> Self {
        Self {
            sender: queue.sender(),
            gate,
            owner,
        }
    }

    pub const fn owner(&self) -> OwnerId {
        self.owner
    }

    /// Requests strobing for one LED.
    ///
    /// The engine ignores the request if the LED is already strobing, which
    /// also makes a later unregister for it a no-op.
    pub async fn register(&self, params: StrobeParams) {
        self.sender
            .send(StrobeCommand::register(self.owner, params))
            .await;
    }

    /// Requests that one of this handle's LEDs stop strobing.
    pub async fn unregister(&self, led: u16) {
        self.sender
            .send(StrobeCommand::unregister(self.owner, led))
            .await;
    }

    /// Requests that every LED registered through this handle stop strobing.
    pub async fn unregister_all(&self) {
        self.sender
            .send(StrobeCommand::unregister_all(self.owner))
            .await;
    }

    /// Pauses the engine's command intake for the lifetime of the guard.
    ///
    /// This affects registration globally, so the gate must not be held for
    /// long intervals — only across one batch of sends.
    pub async fn pause(&self, max_wait: Duration) -> Result<PauseGuard<'a>, PauseTimeout> {
        with_timeout(max_wait, self.gate.lock())
            .await
            .map_err(|_| PauseTimeout)
    }
}

#[cfg(target_os = "none")]
fn log_effect(effect: &CommandEffect) {
    match *effect {
        CommandEffect::Registered(led) => defmt::info!("strobe: registered LED {}", led),
        CommandEffect::Unregistered(led) => defmt::info!("strobe: unregistered LED {}", led),
        CommandEffect::UnregisteredAll { owner, removed } => defmt::info!(
            "strobe: unregistered {} LEDs for worker {}",
            removed,
            owner.raw()
        ),
        CommandEffect::Ignored { led, reason } => defmt::warn!(
            "strobe: ignoring command for LED {}: {}",
            led,
            reason.label()
        ),
    }
}

#[cfg(not(target_os = "none"))]
fn log_effect(effect: &CommandEffect) {
    match *effect {
        CommandEffect::Registered(led) => println!("strobe: registered LED {led}"),
        CommandEffect::Unregistered(led) => println!("strobe: unregistered LED {led}"),
        CommandEffect::UnregisteredAll { owner, removed } => println!(
            "strobe: unregistered {removed} LEDs for worker {}",
            owner.raw()
        ),
        CommandEffect::Ignored { led, reason } => {
            println!("strobe: ignoring command for LED {led}: {}", reason.label());
        }
    }
}

#[cfg(target_os = "none")]
fn log_scaling_failed(led: u16) {
    defmt::warn!("strobe: scaling write failed for LED {}", led);
}

#[cfg(not(target_os = "none"))]
fn log_scaling_failed(led: u16) {
    println!("strobe: scaling write failed for LED {led}");
}

#[cfg(target_os = "none")]
fn log_missed_deadline() {
    defmt::warn!("strobe: missed tick deadline");
}

#[cfg(not(target_os = "none"))]
fn log_missed_deadline() {
    println!("strobe: missed tick deadline");
}

/// The strobe engine: a periodic worker animating every registered LED.
pub struct StrobeEngine<'a, D: DisplayDriver> {
    registry: StrobeRegistry<MAX_STROBE_LEDS>,
    commands: StrobeReceiver<'a>,
    gate: &'a StrobeGate,
    display: &'a SharedDisplay<D>,
}

impl<'a, D: DisplayDriver> StrobeEngine<'a, D> {
    pub fn new(
        commands: StrobeReceiver<'a>,
        gate: &'a StrobeGate,
        display: &'a SharedDisplay<D>,
    ) -> Self {
        Self {
            registry: StrobeRegistry::new(),
            commands,
            gate,
            display,
        }
    }

    /// Runs the engine forever.
    ///
    /// All pending commands are applied before any tick, so a registration
    /// always takes effect on the very next tick after the batch resumes.
    /// Ticks are paced with absolute deadlines so jitter in one iteration does
    /// not accumulate into the following ones.
    pub async fn run(mut self) -> ! {
        let mut next_tick = Instant::now();
        loop {
            if self.registry.is_empty() {
                // nothing to animate: idle on the channel instead of polling
                let command = self.commands.receive().await;
                self.apply(command);
                {
                    // a refresh pass may be mid-batch; wait it out so the
                    // whole batch lands before the first tick
                    let _gate = self.gate.lock().await;
                    self.drain();
                }
                next_tick = Instant::now();
            } else if let Ok(_gate) = self.gate.try_lock() {
                self.drain();
            }

            self.tick().await;

            next_tick += STROBE_PERIOD;
            if Instant::now() > next_tick {
                log_missed_deadline();
            }
            Timer::at(next_tick).await;
        }
    }

    fn drain(&mut self) {
        while let Ok(command) = self.commands.try_receive() {
            self.apply(command);
        }
    }

    fn apply(&mut self, command: StrobeCommand) {
        match self.registry.apply(command) {
            Ok(effect) => log_effect(&effect),
            Err(StrobeRegistryError::RegistryFull) => {
                // the board was asked to animate more LEDs than exist;
                // state is corrupt and a restart is the only recovery
                panic!("strobe registry overflow");
            }
        }
    }

    async fn tick(&mut self) {
        if self.registry.is_empty() {
            return;
        }
        let mut display = self.display.lock().await;
        for entry in self.registry.iter_mut() {
            let step = entry.advance();
            let led = entry.led();
            let scale = Rgb::splat(step.level);
            if write_with_retries(SCALING_RETRY_LIMIT, || display.set_scaling(led, scale)).is_err()
            {
                log_scaling_failed(led);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embassy_futures::block_on;

    fn params(led: u16) -> StrobeParams {
        StrobeParams {
            led,
            max_level: 0xFF,
            min_level: 0x20,
            initial_level: 0xFF,
            step_high: 10,
            step_low: 10,
            cutoff: 0x80,
            rising: false,
        }
    }

    #[test]
    fn handle_stamps_commands_with_its_owner() {
        let queue = StrobeQueue::new();
        let gate = StrobeGate::new(());
        let handle = StrobeHandle::new(&queue, &gate, OwnerId::new(3));

        block_on(handle.register(params(5)));
        block_on(handle.unregister(5));
        block_on(handle.unregister_all());

        let receiver = queue.receiver();
        for _ in 0..3 {
            let command = receiver.try_receive().expect("command queued");
            assert_eq!(command.owner, OwnerId::new(3));
        }
        assert!(receiver.try_receive().is_err());
    }

    #[test]
    fn pause_guard_blocks_intake_until_dropped() {
        let queue = StrobeQueue::new();
        let gate = StrobeGate::new(());
        let handle = StrobeHandle::new(&queue, &gate, OwnerId::new(1));

        let guard = block_on(handle.pause(Duration::from_millis(100))).expect("gate free");
        assert!(gate.try_lock().is_err());
        drop(guard);
        assert!(gate.try_lock().is_ok());
    }

    #[test]
    fn second_pause_times_out_while_held() {
        let queue = StrobeQueue::new();
        let gate = StrobeGate::new(());
        let first = StrobeHandle::new(&queue, &gate, OwnerId::new(1));
        let second = StrobeHandle::new(&queue, &gate, OwnerId::new(2));

        let _guard = block_on(first.pause(Duration::from_millis(100))).expect("gate free");
        assert!(block_on(second.pause(Duration::from_millis(10))).is_err());
    }
}
