//! Traffic sample types and the per-category direction tables.
//!
//! Exclusive ownership of a category (LIVE or TYPICAL) is granted by the
//! firmware's traffic store; the tables themselves are plain data so they can
//! be exercised on the host without an executor.

/// Flow direction a data set describes.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Direction {
    North,
    South,
}

impl Direction {
    pub const fn opposite(self) -> Self {
        match self {
            Direction::North => Direction::South,
            Direction::South => Direction::North,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Direction::North => "north",
            Direction::South => "south",
        }
    }
}

/// Whether a data set holds current or historical-baseline speeds.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Category {
    Live,
    Typical,
}

impl Category {
    pub const fn label(self) -> &'static str {
        match self {
            Category::Live => "live",
            Category::Typical => "typical",
        }
    }
}

/// One road segment's speed sample, tagged with the LED that displays it.
///
/// A negative speed means no data is available; zero means the road is
/// closed or blocked; positive values are normalized flow.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct TrafficSample {
    pub led: u16,
    pub speed: i16,
}

impl TrafficSample {
    /// Placeholder for a segment the upstream source said nothing about.
    pub const NO_DATA: Self = Self { led: 0, speed: -1 };

    pub const fn new(led: u16, speed: i16) -> Self {
        Self { led, speed }
    }

    pub const fn has_data(self) -> bool {
        self.speed >= 0
    }

    pub const fn is_closed(self) -> bool {
        self.speed == 0
    }
}

/// Size mismatch reported by table update and copy operations.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct TableSizeError {
    pub expected: usize,
    pub provided: usize,
}

/// Both directions' sample tables for a single category.
///
/// A writer that updates both directions while holding one category borrow is
/// atomic from any reader's perspective; readers never observe one direction
/// updated and the other stale.
#[derive(Clone, Debug)]
pub struct CategoryTables<const N: usize> {
    north: [TrafficSample; N],
    south: [TrafficSample; N],
}

impl<const N: usize> CategoryTables<N> {
    pub const fn new() -> Self {
        Self {
            north: [TrafficSample::NO_DATA; N],
            south: [TrafficSample::NO_DATA; N],
        }
    }

    fn table(&self, dir: Direction) -> &[TrafficSample; N] {
        match dir {
            Direction::North => &self.north,
            Direction::South => &self.south,
        }
    }

    fn table_mut(&mut self, dir: Direction) -> &mut [TrafficSample; N] {
        match dir {
            Direction::North => &mut self.north,
            Direction::South => &mut self.south,
        }
    }

    /// Replaces one direction's table with the first `N` entries of `data`.
    pub fn update(&mut self, dir: Direction, data: &[TrafficSample]) -> Result<(), TableSizeError> {
        if data.len() < N {
            return Err(TableSizeError {
                expected: N,
                provided: data.len(),
            });
        }
        self.table_mut(dir).copy_from_slice(&data[..N]);
        Ok(())
    }

    /// Copies one direction's table into the first `N` entries of `out`.
    pub fn copy_into(
        &self,
        dir: Direction,
        out: &mut [TrafficSample],
    ) -> Result<(), TableSizeError> {
        if out.len() < N {
            return Err(TableSizeError {
                expected: N,
                provided: out.len(),
            });
        }
        out[..N].copy_from_slice(self.table(dir));
        Ok(())
    }

    /// Returns the sample for `led` in `dir`, if the LED number is in range.
    pub fn sample(&self, dir: Direction, led: u16) -> Option<TrafficSample> {
        let index = (led as usize).checked_sub(1)?;
        self.table(dir).get(index).copied()
    }
}

impl<const N: usize> Default for CategoryTables<N> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn samples<const N: usize>(base: i16) -> [TrafficSample; N] {
        let mut data = [TrafficSample::NO_DATA; N];
        for (index, slot) in data.iter_mut().enumerate() {
            *slot = TrafficSample::new((index as u16) + 1, base + index as i16);
        }
        data
    }

    #[test]
    fn update_and_copy_round_trip_one_direction() {
        let mut tables: CategoryTables<4> = CategoryTables::new();
        tables
            .update(Direction::North, &samples::<4>(10))
            .expect("update should succeed");

        let mut out = [TrafficSample::NO_DATA; 4];
        tables
            .copy_into(Direction::North, &mut out)
            .expect("copy should succeed");
        assert_eq!(out, samples::<4>(10));

        // the other direction is untouched
        tables
            .copy_into(Direction::South, &mut out)
            .expect("copy should succeed");
        assert_eq!(out, [TrafficSample::NO_DATA; 4]);
    }

    #[test]
    fn short_buffers_are_rejected() {
        let mut tables: CategoryTables<4> = CategoryTables::new();
        let short = [TrafficSample::NO_DATA; 3];
        assert_eq!(
            tables.update(Direction::North, &short),
            Err(TableSizeError {
                expected: 4,
                provided: 3
            })
        );

        let mut out = [TrafficSample::NO_DATA; 3];
        assert_eq!(
            tables.copy_into(Direction::North, &mut out),
            Err(TableSizeError {
                expected: 4,
                provided: 3
            })
        );
    }

    #[test]
    fn sample_lookup_is_one_based() {
        let mut tables: CategoryTables<4> = CategoryTables::new();
        tables
            .update(Direction::South, &samples::<4>(40))
            .expect("update should succeed");

        assert_eq!(
            tables.sample(Direction::South, 1),
            Some(TrafficSample::new(1, 40))
        );
        assert_eq!(tables.sample(Direction::South, 0), None);
        assert_eq!(tables.sample(Direction::South, 5), None);
    }

    #[test]
    fn speed_classification_helpers() {
        assert!(!TrafficSample::new(1, -3).has_data());
        assert!(TrafficSample::new(1, 0).has_data());
        assert!(TrafficSample::new(1, 0).is_closed());
        assert!(TrafficSample::new(1, 55).has_data());
        assert!(!TrafficSample::new(1, 55).is_closed());
    }
}
