//! Fixed-size map keyed by [`Direction`].
//!
//! Junctions and stations store one value per direction. The direction set
//! is closed, so a struct with one slot per variant replaces a general
//! dictionary and makes every lookup explicit.

use railsim_types::Direction;

/// One optional value per [`Direction`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirectionMap<T> {
    northbound: Option<T>,
    southbound: Option<T>,
    depot_in: Option<T>,
    depot_out: Option<T>,
}

impl<T> Default for DirectionMap<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> DirectionMap<T> {
    /// Create an empty map.
    pub const fn new() -> Self {
        Self {
            northbound: None,
            southbound: None,
            depot_in: None,
            depot_out: None,
        }
    }

    const fn slot(&self, direction: Direction) -> &Option<T> {
        match direction {
            Direction::Northbound => &self.northbound,
            Direction::Southbound => &self.southbound,
            Direction::DepotIn => &self.depot_in,
            Direction::DepotOut => &self.depot_out,
        }
    }

    fn slot_mut(&mut self, direction: Direction) -> &mut Option<T> {
        match direction {
            Direction::Northbound => &mut self.northbound,
            Direction::Southbound => &mut self.southbound,
            Direction::DepotIn => &mut self.depot_in,
            Direction::DepotOut => &mut self.depot_out,
        }
    }

    /// Borrow the value filed under `direction`.
    pub const fn get_ref(&self, direction: Direction) -> Option<&T> {
        self.slot(direction).as_ref()
    }

    /// File `value` under `direction`, returning the previous value.
    pub fn insert(&mut self, direction: Direction, value: T) -> Option<T> {
        self.slot_mut(direction).replace(value)
    }

    /// Whether a value is filed under `direction`.
    pub const fn contains(&self, direction: Direction) -> bool {
        self.slot(direction).is_some()
    }

    /// Iterate over the filled slots in [`Direction::ALL`] order.
    pub fn iter(&self) -> impl Iterator<Item = (Direction, &T)> + '_ {
        Direction::ALL
            .into_iter()
            .filter_map(|d| self.get_ref(d).map(|v| (d, v)))
    }

    /// Number of filled slots.
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    /// Whether no slot is filled.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: Copy> DirectionMap<T> {
    /// Copy out the value filed under `direction`.
    pub const fn get(&self, direction: Direction) -> Option<T> {
        *self.slot(direction)
    }

    /// The filled mainline (northbound/southbound) slots.
    pub fn mainline(&self) -> impl Iterator<Item = (Direction, T)> + '_ {
        [Direction::Northbound, Direction::Southbound]
            .into_iter()
            .filter_map(|d| self.get(d).map(|v| (d, v)))
    }
}
