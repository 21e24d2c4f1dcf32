use board_core::refresh::{BoardProfile, Palette, Rgb};
use board_core::strobe::{CommandEffect, OwnerId, StrobeCommand, StrobeRegistry};

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
    excluded_leds: &[],
    bulk_reset_clear: false,
    global_current: 0xA0,
};

const REFRESH_WORKER: OwnerId = OwnerId::new(7);

/// A batch of closed-road LEDs registered together must animate in phase:
/// because every registration starts from the same profile parameters and all
/// commands are applied before any tick, every entry reports the same level on
/// every subsequent tick.
#[test]
fn batch_registrations_strobe_in_phase() {
    let mut registry: StrobeRegistry<46> = StrobeRegistry::new();

    for led in [3u16, 11, 24, 37] {
        let effect = registry
            .apply(StrobeCommand::register(
                REFRESH_WORKER,
                PROFILE.strobe_params(led),
            ))
            .expect("batch register should fit");
        assert_eq!(effect, CommandEffect::Registered(led));
    }

    for _ in 0..200 {
        let levels: Vec<u8> = registry.iter_mut().map(|led| led.advance().level).collect();
        assert!(
            levels.windows(2).all(|pair| pair[0] == pair[1]),
            "batch drifted out of phase: {levels:?}"
        );
        let level = levels[0];
        assert!(level >= PROFILE.strobe_low_scale && level <= PROFILE.default_scale);
    }
}

/// A clear pass issues unregister-all under its own identity; registrations
/// made by other workers keep animating.
#[test]
fn clear_only_removes_the_clearing_workers_batch() {
    let other_worker = OwnerId::new(9);
    let mut registry: StrobeRegistry<46> = StrobeRegistry::new();

    for led in [3u16, 11, 24] {
        registry
            .apply(StrobeCommand::register(
                REFRESH_WORKER,
                PROFILE.strobe_params(led),
            ))
            .expect("register should fit");
    }
    registry
        .apply(StrobeCommand::register(
            other_worker,
            PROFILE.strobe_params(40),
        ))
        .expect("register should fit");

    let effect = registry
        .apply(StrobeCommand::unregister_all(REFRESH_WORKER))
        .expect("unregister-all should succeed");
    assert_eq!(
        effect,
        CommandEffect::UnregisteredAll {
            owner: REFRESH_WORKER,
            removed: 3
        }
    );

    assert_eq!(registry.len(), 1);
    assert!(registry.contains(40));
}
