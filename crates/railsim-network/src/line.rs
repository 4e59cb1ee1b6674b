//! Declarative line layouts.
//!
//! A [`LineLayout`] describes a double-track line the way an operator
//! would: stations in order with the distance from the previous one, the
//! lengths of the two reversal loops, and which terminal the depot hangs
//! off. [`build_line`] turns it into a validated [`Network`].

use railsim_types::Direction;
use serde::Deserialize;
use tracing::info;

use crate::builder::NetworkBuilder;
use crate::error::NetworkError;
use crate::network::Network;

/// Default platform length in meters.
const fn default_platform_length() -> u32 {
    106
}

/// Default depot platform length in meters.
const fn default_depot_platform_length() -> u32 {
    100
}

const fn default_loop_length() -> u32 {
    300
}

const fn default_spur_length() -> u32 {
    200
}

/// Which end of the line a feature is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Terminal {
    /// The station with the highest sequence number.
    #[default]
    North,
    /// The station with the lowest sequence number.
    South,
}

/// One station of a line layout.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StationLayout {
    /// Display name.
    pub name: String,
    /// Position along the line; must increase from one entry to the next.
    pub sequence: u32,
    /// Distance order from the depot.
    #[serde(default)]
    pub depot_sequence: u32,
    /// Meters of mainline from the previous station. Ignored for the
    /// first station.
    #[serde(default)]
    pub distance_to_previous: u32,
}

/// Where and how the depot joins the line.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DepotLayout {
    /// Terminal station the depot spurs attach to.
    #[serde(default)]
    pub terminal: Terminal,
    /// Length of the depot platform; trains must fit on it.
    #[serde(default = "default_depot_platform_length")]
    pub platform_length: u32,
    /// Length of each spur.
    #[serde(default = "default_spur_length")]
    pub spur_length: u32,
}

impl Default for DepotLayout {
    fn default() -> Self {
        Self {
            terminal: Terminal::default(),
            platform_length: default_depot_platform_length(),
            spur_length: default_spur_length(),
        }
    }
}

/// A complete double-track line.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LineLayout {
    /// Display name of the line.
    pub name: String,
    /// Length of every station platform.
    #[serde(default = "default_platform_length")]
    pub platform_length: u32,
    /// Length of each segment of the north reversal loop.
    #[serde(default = "default_loop_length")]
    pub north_loop_length: u32,
    /// Length of each segment of the south reversal loop.
    #[serde(default = "default_loop_length")]
    pub south_loop_length: u32,
    /// Stations, south to north.
    pub stations: Vec<StationLayout>,
    /// Depot placement.
    #[serde(default)]
    pub depot: DepotLayout,
}

/// Build the network described by `layout`.
///
/// Stations are chained in the order given, both ends are closed with
/// reversal loops, and the depot is spliced onto its terminal: the spur in
/// leaves the platform exit facing away from the line and the spur out
/// arrives at the entry of the platform facing back into it.
///
/// # Errors
///
/// Returns [`NetworkError::TooFewStations`] for fewer than two stations,
/// [`NetworkError::StationsOutOfSequence`] if sequence numbers do not
/// increase, or any error raised while validating the result.
pub fn build_line(layout: &LineLayout) -> Result<Network, NetworkError> {
    if layout.stations.len() < 2 {
        return Err(NetworkError::TooFewStations {
            count: layout.stations.len(),
        });
    }

    let mut builder = NetworkBuilder::new(layout.name.clone());
    let mut ids = Vec::with_capacity(layout.stations.len());
    for station in &layout.stations {
        let id = builder.add_station(
            station.name.clone(),
            station.sequence,
            station.depot_sequence,
            layout.platform_length,
        )?;
        if let Some(&previous) = ids.last() {
            builder.connect_stations(previous, id, station.distance_to_previous)?;
        }
        ids.push(id);
    }

    let (Some(&south), Some(&north)) = (ids.first(), ids.last()) else {
        return Err(NetworkError::TooFewStations { count: ids.len() });
    };
    builder.form_loop(north, layout.north_loop_length)?;
    builder.form_loop(south, layout.south_loop_length)?;

    let (terminal, away, back) = match layout.depot.terminal {
        Terminal::North => (north, Direction::Northbound, Direction::Southbound),
        Terminal::South => (south, Direction::Southbound, Direction::Northbound),
    };
    let station = builder.station(terminal)?.clone();
    let out_junction = station
        .platform(away)
        .ok_or(NetworkError::StationNotFound(terminal))?
        .exit;
    let in_junction = station
        .platform(back)
        .ok_or(NetworkError::StationNotFound(terminal))?
        .entry;
    let hub = builder.add_depot(layout.depot.platform_length)?;
    builder.connect_depot(hub, in_junction, out_junction, layout.depot.spur_length)?;

    let network = builder.build()?;
    info!(
        line = network.name(),
        stations = network.stations().len(),
        segments = network.segment_count(),
        junctions = network.junction_count(),
        "Line built"
    );
    Ok(network)
}
