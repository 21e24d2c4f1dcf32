#![cfg_attr(not(target_os = "none"), allow(dead_code))]

//! Shared status flags for the firmware target.
//!
//! Lightweight atomics carry the night-mode refresh lock and the cooperative
//! abort signal between tasks. Both are single-writer/multi-reader booleans;
//! a torn read at worst skips one pass, so no stronger ordering is needed.

use portable_atomic::{AtomicBool, Ordering};

/// While set, board refreshes are no-ops (night mode).
static NIGHT_LOCK: AtomicBool = AtomicBool::new(false);

/// Set by the direction-toggle input; polled by in-flight refresh passes.
static ABORT_REQUESTED: AtomicBool = AtomicBool::new(false);

/// Engages the night-mode refresh lock.
pub fn lock_refresh() {
    NIGHT_LOCK.store(true, Ordering::Relaxed);
}

/// Releases the night-mode refresh lock.
pub fn unlock_refresh() {
    NIGHT_LOCK.store(false, Ordering::Relaxed);
}

/// Returns `true` while refreshes are locked out.
pub fn refresh_locked() -> bool {
    NIGHT_LOCK.load(Ordering::Relaxed)
}

/// Raises the abort signal for any in-flight refresh or clear pass.
pub fn request_abort() {
    ABORT_REQUESTED.store(true, Ordering::Relaxed);
}

/// Polls the abort signal without consuming it, so the same raised signal is
/// still visible to the next scheduling decision.
pub fn abort_requested() -> bool {
    ABORT_REQUESTED.load(Ordering::Relaxed)
}

/// Consumes the abort signal; only the caller acting on it does this.
pub fn take_abort() -> bool {
    ABORT_REQUESTED.swap(false, Ordering::Relaxed)
}
