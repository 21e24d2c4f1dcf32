#![cfg_attr(not(target_os = "none"), allow(dead_code))]

//! Exclusive, double-buffered storage for traffic data.
//!
//! Each category (LIVE, TYPICAL) holds both directions' tables behind its own
//! async mutex, so the two categories can be borrowed independently while the
//! directions within a category always move together. Holding the borrow is
//! the only way to reach the tables: [`TrafficGuard`] derefs to the category's
//! [`CategoryTables`] and releases the lock on scope exit, so update/copy
//! outside a borrow is unrepresentable rather than merely forbidden.

use core::ops::{Deref, DerefMut};

use board_core::traffic::{Category, CategoryTables};
#[cfg(not(target_os = "none"))]
use embassy_sync::blocking_mutex::raw::NoopRawMutex;
#[cfg(target_os = "none")]
use embassy_sync::blocking_mutex::raw::ThreadModeRawMutex;
use embassy_sync::mutex::{Mutex, MutexGuard};
use embassy_time::{Duration, with_timeout};

#[cfg(target_os = "none")]
type TrafficMutex = ThreadModeRawMutex;
#[cfg(not(target_os = "none"))]
type TrafficMutex = NoopRawMutex;

/// A category borrow did not become available within the wait budget.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct BorrowTimeout {
    pub category: Category,
}

/// Double-buffered traffic tables with per-category exclusive ownership.
pub struct TrafficStore<const N: usize> {
    live: Mutex<TrafficMutex, CategoryTables<N>>,
    typical: Mutex<TrafficMutex, CategoryTables<N>>,
}

impl<const N: usize> TrafficStore<N> {
    pub const fn new() -> Self {
        Self {
            live: Mutex::new(CategoryTables::new()),
            typical: Mutex::new(CategoryTables::new()),
        }
    }

    fn slot(&self, category: Category) -> &Mutex<TrafficMutex, CategoryTables<N>> {
        match category {
            Category::Live => &self.live,
            Category::Typical => &self.typical,
        }
    }

    /// Takes exclusive ownership of one category, waiting as long as needed.
    pub async fn borrow(&self, category: Category) -> TrafficGuard<'_, N> {
        TrafficGuard {
            category,
            tables: self.slot(category).lock().await,
        }
    }

    /// Takes exclusive ownership of one category, waiting at most `max_wait`.
    pub async fn borrow_with_timeout(
        &self,
        category: Category,
        max_wait: Duration,
    ) -> Result<TrafficGuard<'_, N>, BorrowTimeout> {
        match with_timeout(max_wait, self.slot(category).lock()).await {
            Ok(tables) => Ok(TrafficGuard { category, tables }),
            Err(_) => Err(BorrowTimeout { category }),
        }
    }
}

impl<const N: usize> Default for TrafficStore<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// Exclusive ownership of one category's tables for the guard's lifetime.
pub struct TrafficGuard<'a, const N: usize> {
    category: Category,
    tables: MutexGuard<'a, TrafficMutex, CategoryTables<N>>,
}

impl<const N: usize> TrafficGuard<'_, N> {
    pub fn category(&self) -> Category {
        self.category
    }
}

impl<const N: usize> Deref for TrafficGuard<'_, N> {
    type Target = CategoryTables<N>;

    fn deref(&self) -> &Self::Target {
        &self.tables
    }
}

impl<const N: usize> DerefMut for TrafficGuard<'_, N> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.tables
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use board_core::traffic::{Direction, TrafficSample};
    use embassy_futures::block_on;

    #[test]
    fn second_borrow_times_out_until_first_releases() {
        let store: TrafficStore<4> = TrafficStore::new();

        let guard = block_on(store.borrow(Category::Live));
        let blocked = block_on(store.borrow_with_timeout(Category::Live, Duration::from_millis(10)));
        assert_eq!(
            blocked.err().map(|e| e.category),
            Some(Category::Live),
            "second borrow must not succeed while the first is held"
        );

        drop(guard);
        let reacquired =
            block_on(store.borrow_with_timeout(Category::Live, Duration::from_millis(10)));
        assert!(reacquired.is_ok());
    }

    #[test]
    fn categories_are_independently_holdable() {
        let store: TrafficStore<4> = TrafficStore::new();

        let _live = block_on(store.borrow(Category::Live));
        let typical =
            block_on(store.borrow_with_timeout(Category::Typical, Duration::from_millis(10)));
        assert!(typical.is_ok());
    }

    #[test]
    fn both_directions_update_under_one_borrow() {
        let store: TrafficStore<2> = TrafficStore::new();
        let north = [TrafficSample::new(1, 60), TrafficSample::new(2, 55)];
        let south = [TrafficSample::new(1, 48), TrafficSample::new(2, 0)];

        {
            let mut guard = block_on(store.borrow(Category::Typical));
            guard
                .update(Direction::North, &north)
                .expect("update should succeed");
            guard
                .update(Direction::South, &south)
                .expect("update should succeed");
        }

        let guard = block_on(store.borrow(Category::Typical));
        assert_eq!(
            guard.sample(Direction::North, 2),
            Some(TrafficSample::new(2, 55))
        );
        assert_eq!(
            guard.sample(Direction::South, 2),
            Some(TrafficSample::new(2, 0))
        );
    }
}
