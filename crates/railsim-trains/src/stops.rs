//! Station stop lists and the ordered queue of upcoming stops.
//!
//! A train is assigned an unordered set of stations to serve. For each
//! journey along the line that set is laid out in travel order as a
//! [`StopQueue`]; the train pops stops as it serves them and, once the
//! queue runs dry, lays it out again for the opposite direction.

use std::collections::VecDeque;

use railsim_network::{Network, NetworkError};
use railsim_types::{Direction, StationId};

/// Resolve configured station names into identifiers.
///
/// `None` selects every station on the line.
///
/// # Errors
///
/// Returns [`NetworkError::UnknownStation`] for a name the line lacks.
pub fn resolve_stops(
    network: &Network,
    names: Option<&[String]>,
) -> Result<Vec<StationId>, NetworkError> {
    match names {
        None => Ok(network.stations().iter().map(|s| s.id).collect()),
        Some(names) => names
            .iter()
            .map(|name| network.station_by_name(name).map(|s| s.id))
            .collect(),
    }
}

/// Upcoming station stops in travel order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StopQueue {
    queue: VecDeque<StationId>,
}

impl StopQueue {
    /// An empty queue.
    pub const fn new() -> Self {
        Self {
            queue: VecDeque::new(),
        }
    }

    /// Lay out `stops` in the order a train travelling `direction` reaches
    /// them.
    pub fn generate(network: &Network, stops: &[StationId], direction: Direction) -> Self {
        let queue = network
            .stations_in_order(direction)
            .into_iter()
            .filter(|id| stops.contains(id))
            .collect();
        Self { queue }
    }

    /// The next station to stop at.
    pub fn next(&self) -> Option<StationId> {
        self.queue.front().copied()
    }

    /// Drop the stop just served.
    pub fn pop(&mut self) -> Option<StationId> {
        self.queue.pop_front()
    }

    /// Forget every remaining stop.
    pub fn clear(&mut self) {
        self.queue.clear();
    }

    /// Whether no stops remain.
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Number of stops remaining.
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Iterate over the remaining stops in order.
    pub fn iter(&self) -> impl Iterator<Item = &StationId> {
        self.queue.iter()
    }
}
