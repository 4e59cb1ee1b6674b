//! Incremental construction of the track graph.
//!
//! [`NetworkBuilder`] is the only way to create a [`Network`]. It hands out
//! identifiers as elements are added, wires segments into junction direction
//! maps, and validates the finished topology in [`NetworkBuilder::build`] so
//! that a misconfigured line is rejected before any train moves.

use railsim_types::{Direction, JunctionId, SegmentId, SegmentKind, StationId};
use tracing::debug;

use crate::direction_map::DirectionMap;
use crate::error::NetworkError;
use crate::junction::Junction;
use crate::network::Network;
use crate::segment::{Segment, SegmentSpec};
use crate::station::{Depot, DepotHub, Platform, Station};

#[derive(Debug)]
struct PendingJunction {
    name: String,
    is_end: bool,
    outgoing: DirectionMap<SegmentId>,
}

#[derive(Debug)]
struct PendingSegment {
    spec: SegmentSpec,
    direction: Direction,
    from: JunctionId,
    to: JunctionId,
}

/// Builder for a [`Network`].
#[derive(Debug)]
pub struct NetworkBuilder {
    name: String,
    junctions: Vec<PendingJunction>,
    segments: Vec<PendingSegment>,
    stations: Vec<Station>,
    depot: Option<Depot>,
}

impl NetworkBuilder {
    /// Start an empty network called `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            junctions: Vec::new(),
            segments: Vec::new(),
            stations: Vec::new(),
            depot: None,
        }
    }

    // -------------------------------------------------------------------
    // Primitive operations
    // -------------------------------------------------------------------

    /// Add an ordinary junction.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::CapacityExceeded`] if identifiers run out.
    pub fn add_junction(&mut self, name: impl Into<String>) -> Result<JunctionId, NetworkError> {
        self.push_junction(name.into(), false)
    }

    /// Add a reversal junction at the far end of a loop.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::CapacityExceeded`] if identifiers run out.
    pub fn add_end_junction(
        &mut self,
        name: impl Into<String>,
    ) -> Result<JunctionId, NetworkError> {
        self.push_junction(name.into(), true)
    }

    fn push_junction(&mut self, name: String, is_end: bool) -> Result<JunctionId, NetworkError> {
        let id = JunctionId::from_index(self.junctions.len()).ok_or(NetworkError::CapacityExceeded)?;
        self.junctions.push(PendingJunction {
            name,
            is_end,
            outgoing: DirectionMap::new(),
        });
        Ok(id)
    }

    /// Lay a segment from `from` to `to`, filed under `direction` in the
    /// `from` junction.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::ZeroLength`] for an empty segment,
    /// [`NetworkError::JunctionNotFound`] for an unknown endpoint, or
    /// [`NetworkError::DirectionTaken`] if `from` already has a segment in
    /// that direction.
    pub fn connect(
        &mut self,
        from: JunctionId,
        spec: SegmentSpec,
        direction: Direction,
        to: JunctionId,
    ) -> Result<SegmentId, NetworkError> {
        if spec.length == 0 {
            return Err(NetworkError::ZeroLength { name: spec.name });
        }
        if self.junctions.get(to.index()).is_none() {
            return Err(NetworkError::JunctionNotFound(to));
        }
        let id = SegmentId::from_index(self.segments.len()).ok_or(NetworkError::CapacityExceeded)?;
        let junction = self
            .junctions
            .get_mut(from.index())
            .ok_or(NetworkError::JunctionNotFound(from))?;
        if junction.outgoing.contains(direction) {
            return Err(NetworkError::DirectionTaken {
                junction: from,
                direction,
            });
        }
        junction.outgoing.insert(direction, id);

        debug!(segment = %id, name = spec.name, %from, %to, ?direction, "Segment connected");
        self.segments.push(PendingSegment {
            spec,
            direction,
            from,
            to,
        });
        Ok(id)
    }

    // -------------------------------------------------------------------
    // Stations
    // -------------------------------------------------------------------

    /// Add a station with a northbound and a southbound platform.
    ///
    /// Stations must be added in strictly increasing `sequence` order.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::StationsOutOfSequence`] if `sequence` does not
    /// follow the previous station's.
    pub fn add_station(
        &mut self,
        name: impl Into<String>,
        sequence: u32,
        depot_sequence: u32,
        platform_length: u32,
    ) -> Result<StationId, NetworkError> {
        let name = name.into();
        if let Some(previous) = self.stations.last()
            && sequence <= previous.sequence
        {
            return Err(NetworkError::StationsOutOfSequence {
                name,
                sequence,
                previous: previous.sequence,
            });
        }
        let id = StationId::from_index(self.stations.len()).ok_or(NetworkError::CapacityExceeded)?;

        let mut platforms = DirectionMap::new();
        for direction in [Direction::Northbound, Direction::Southbound] {
            let short = direction_code(direction);
            let entry = self.add_junction(format!("{name} {short} entry"))?;
            let exit = self.add_junction(format!("{name} {short} exit"))?;
            let spec = SegmentSpec::new(
                format!("{name} {short} platform"),
                SegmentKind::Platform,
                platform_length,
            )
            .at_station(id);
            let segment = self.connect(entry, spec, direction, exit)?;
            platforms.insert(
                direction,
                Platform {
                    segment,
                    entry,
                    exit,
                },
            );
        }

        self.stations.push(Station {
            id,
            name,
            sequence,
            depot_sequence,
            platforms,
        });
        Ok(id)
    }

    /// Link two consecutive stations with one mainline segment per
    /// direction, each `distance` meters long.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::StationsOutOfSequence`] if `next` does not
    /// come after `previous`, or any error from [`connect`](Self::connect).
    pub fn connect_stations(
        &mut self,
        previous: StationId,
        next: StationId,
        distance: u32,
    ) -> Result<(SegmentId, SegmentId), NetworkError> {
        let prev = self.station(previous)?.clone();
        let nxt = self.station(next)?.clone();
        if nxt.sequence <= prev.sequence {
            return Err(NetworkError::StationsOutOfSequence {
                name: nxt.name,
                sequence: nxt.sequence,
                previous: prev.sequence,
            });
        }

        let (prev_nb, next_nb) = (
            platform_of(&prev, Direction::Northbound)?,
            platform_of(&nxt, Direction::Northbound)?,
        );
        let northbound = self.connect(
            prev_nb.exit,
            SegmentSpec::new(
                format!("{} to {}", prev.name, nxt.name),
                SegmentKind::Mainline,
                distance,
            )
            .leaving(previous),
            Direction::Northbound,
            next_nb.entry,
        )?;

        let (prev_sb, next_sb) = (
            platform_of(&prev, Direction::Southbound)?,
            platform_of(&nxt, Direction::Southbound)?,
        );
        let southbound = self.connect(
            next_sb.exit,
            SegmentSpec::new(
                format!("{} to {}", nxt.name, prev.name),
                SegmentKind::Mainline,
                distance,
            )
            .leaving(next),
            Direction::Southbound,
            prev_sb.entry,
        )?;

        Ok((northbound, southbound))
    }

    /// Close one end of the line with a reversal loop.
    ///
    /// The end is taken from the station's position: the highest sequence
    /// gets the north loop, the lowest the south loop. Two loop segments of
    /// `loop_length` meters meet at a new `is_end` junction.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::TooFewStations`] if the line has a single
    /// station, or [`NetworkError::NotATerminal`] for an inner station.
    pub fn form_loop(
        &mut self,
        station: StationId,
        loop_length: u32,
    ) -> Result<JunctionId, NetworkError> {
        if self.stations.len() < 2 {
            return Err(NetworkError::TooFewStations {
                count: self.stations.len(),
            });
        }
        let terminal = self.station(station)?.clone();
        let is_north = self.stations.last().is_some_and(|s| s.id == station);
        let is_south = self.stations.first().is_some_and(|s| s.id == station);

        let (outbound, inbound) = match (is_north, is_south) {
            (true, _) => (Direction::Northbound, Direction::Southbound),
            (_, true) => (Direction::Southbound, Direction::Northbound),
            _ => return Err(NetworkError::NotATerminal(station)),
        };

        let leaving = platform_of(&terminal, outbound)?;
        let returning = platform_of(&terminal, inbound)?;
        let end_name = if is_north { "north end" } else { "south end" };
        let end = self.add_end_junction(format!("{} {end_name}", terminal.name))?;

        self.connect(
            leaving.exit,
            SegmentSpec::new(
                format!("{} {end_name} loop {}", terminal.name, direction_code(outbound)),
                SegmentKind::Loop,
                loop_length,
            ),
            outbound,
            end,
        )?;
        self.connect(
            end,
            SegmentSpec::new(
                format!("{} {end_name} loop {}", terminal.name, direction_code(inbound)),
                SegmentKind::Loop,
                loop_length,
            ),
            inbound,
            returning.entry,
        )?;
        Ok(end)
    }

    // -------------------------------------------------------------------
    // Depot
    // -------------------------------------------------------------------

    /// Lay the depot platform between its own entry and exit junctions.
    ///
    /// # Errors
    ///
    /// Returns any error from [`connect`](Self::connect).
    pub fn add_depot(&mut self, platform_length: u32) -> Result<DepotHub, NetworkError> {
        let entry = self.add_junction("depot entry")?;
        let exit = self.add_junction("depot exit")?;
        let platform = self.connect(
            entry,
            SegmentSpec::new("depot", SegmentKind::DepotPlatform, platform_length),
            Direction::DepotIn,
            exit,
        )?;
        Ok(DepotHub {
            platform,
            entry,
            exit,
        })
    }

    /// Splice the depot onto the mainline.
    ///
    /// A depot-in spur leaves `out_junction` for the depot platform; a
    /// depot-out spur leaves the depot platform and arrives at
    /// `in_junction`.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::DepotAlreadyConnected`] if a depot exists, or
    /// any error from [`connect`](Self::connect).
    pub fn connect_depot(
        &mut self,
        hub: DepotHub,
        in_junction: JunctionId,
        out_junction: JunctionId,
        spur_length: u32,
    ) -> Result<Depot, NetworkError> {
        if self.depot.is_some() {
            return Err(NetworkError::DepotAlreadyConnected);
        }
        let spur_in = self.connect(
            out_junction,
            SegmentSpec::new("depot spur in", SegmentKind::DepotSpurIn, spur_length),
            Direction::DepotIn,
            hub.entry,
        )?;
        let spur_out = self.connect(
            hub.exit,
            SegmentSpec::new("depot spur out", SegmentKind::DepotSpurOut, spur_length),
            Direction::DepotOut,
            in_junction,
        )?;
        let depot = Depot {
            platform: hub.platform,
            entry: hub.entry,
            exit: hub.exit,
            spur_in,
            spur_out,
        };
        self.depot = Some(depot);
        Ok(depot)
    }

    // -------------------------------------------------------------------
    // Queries and finishing
    // -------------------------------------------------------------------

    /// Look up a station added so far.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::StationNotFound`] for an unknown identifier.
    pub fn station(&self, id: StationId) -> Result<&Station, NetworkError> {
        self.stations
            .get(id.index())
            .ok_or(NetworkError::StationNotFound(id))
    }

    /// Validate the topology and freeze it into a [`Network`].
    ///
    /// Every segment must lead somewhere a train can continue: a mainline
    /// segment needs an onward segment in its own direction (or a reversal
    /// junction), a spur needs the depot or mainline on the other side, and
    /// every reversal junction must send trains back the opposite way.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::MissingRoute`] or
    /// [`NetworkError::InvalidReversal`] for a dead end.
    pub fn build(self) -> Result<Network, NetworkError> {
        for (index, pending) in self.segments.iter().enumerate() {
            let to = pending.to;
            let junction = self
                .junctions
                .get(to.index())
                .ok_or(NetworkError::JunctionNotFound(to))?;
            check_onward(index, pending, to, junction)?;
        }

        let junctions = self
            .junctions
            .into_iter()
            .enumerate()
            .map(|(index, j)| {
                let id = JunctionId::from_index(index).ok_or(NetworkError::CapacityExceeded)?;
                Ok(Junction::new(id, j.name, j.is_end, j.outgoing))
            })
            .collect::<Result<Vec<_>, NetworkError>>()?;
        let segments = self
            .segments
            .into_iter()
            .enumerate()
            .map(|(index, s)| {
                let id = SegmentId::from_index(index).ok_or(NetworkError::CapacityExceeded)?;
                Ok(Segment::new(id, s.spec, s.direction, s.from, s.to))
            })
            .collect::<Result<Vec<_>, NetworkError>>()?;

        Ok(Network::from_parts(
            self.name,
            segments,
            junctions,
            self.stations,
            self.depot,
        ))
    }
}

fn check_onward(
    index: usize,
    pending: &PendingSegment,
    to: JunctionId,
    junction: &PendingJunction,
) -> Result<(), NetworkError> {
    if junction.is_end {
        let mut mainline = junction.outgoing.mainline();
        let departing = mainline.next();
        if mainline.next().is_some() || junction.outgoing.len() != 1 {
            return Err(NetworkError::InvalidReversal {
                junction: to,
                reason: String::from("a reversal junction must have exactly one departing segment"),
            });
        }
        return match departing {
            Some((direction, _)) if direction == pending.direction.opposite() => Ok(()),
            _ => Err(NetworkError::InvalidReversal {
                junction: to,
                reason: format!(
                    "segment {index} arrives {} but does not leave in the opposite direction",
                    pending.direction
                ),
            }),
        };
    }

    let onward = match pending.direction {
        Direction::Northbound | Direction::Southbound => {
            junction.outgoing.contains(pending.direction)
        }
        Direction::DepotIn => {
            junction.outgoing.contains(Direction::DepotIn)
                || junction.outgoing.contains(Direction::DepotOut)
        }
        Direction::DepotOut => junction.outgoing.mainline().next().is_some(),
    };
    if onward {
        Ok(())
    } else {
        Err(NetworkError::MissingRoute {
            junction: to,
            direction: pending.direction,
        })
    }
}

fn platform_of(station: &Station, direction: Direction) -> Result<Platform, NetworkError> {
    station
        .platform(direction)
        .ok_or(NetworkError::StationNotFound(station.id))
}

const fn direction_code(direction: Direction) -> &'static str {
    match direction {
        Direction::Northbound => "NB",
        Direction::Southbound => "SB",
        Direction::DepotIn => "in",
        Direction::DepotOut => "out",
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn two_station_builder() -> (NetworkBuilder, StationId, StationId) {
        let mut builder = NetworkBuilder::new("test line");
        let south = builder.add_station("Alpha", 1, 1, 106).unwrap();
        let north = builder.add_station("Bravo", 2, 0, 106).unwrap();
        builder.connect_stations(south, north, 1200).unwrap();
        (builder, south, north)
    }

    #[test]
    fn rejects_zero_length_segment() {
        let mut builder = NetworkBuilder::new("t");
        let a = builder.add_junction("a").unwrap();
        let b = builder.add_junction("b").unwrap();
        let err = builder
            .connect(a, SegmentSpec::new("empty", SegmentKind::Generic, 0), Direction::Northbound, b)
            .unwrap_err();
        assert!(matches!(err, NetworkError::ZeroLength { .. }));
    }

    #[test]
    fn rejects_duplicate_direction() {
        let mut builder = NetworkBuilder::new("t");
        let a = builder.add_junction("a").unwrap();
        let b = builder.add_junction("b").unwrap();
        builder
            .connect(a, SegmentSpec::new("one", SegmentKind::Generic, 10), Direction::Northbound, b)
            .unwrap();
        let err = builder
            .connect(a, SegmentSpec::new("two", SegmentKind::Generic, 10), Direction::Northbound, b)
            .unwrap_err();
        assert!(matches!(err, NetworkError::DirectionTaken { .. }));
    }

    #[test]
    fn stations_must_increase_in_sequence() {
        let mut builder = NetworkBuilder::new("t");
        builder.add_station("Alpha", 5, 0, 106).unwrap();
        let err = builder.add_station("Bravo", 5, 1, 106).unwrap_err();
        assert!(matches!(
            err,
            NetworkError::StationsOutOfSequence {
                sequence: 5,
                previous: 5,
                ..
            }
        ));
    }

    #[test]
    fn open_line_is_rejected_at_build() {
        let (builder, _, _) = two_station_builder();
        let err = builder.build().unwrap_err();
        assert!(matches!(err, NetworkError::MissingRoute { .. }));
    }

    #[test]
    fn loops_close_the_line() {
        let (mut builder, south, north) = two_station_builder();
        let north_end = builder.form_loop(north, 300).unwrap();
        let south_end = builder.form_loop(south, 300).unwrap();
        let network = builder.build().unwrap();

        assert!(network.junction(north_end).unwrap().is_end());
        assert!(network.junction(south_end).unwrap().is_end());
        assert_eq!(
            network.junction(north_end).unwrap().outgoing_map().len(),
            1
        );
        // 4 platforms, 2 mainline segments, 4 loop segments.
        assert_eq!(network.segment_count(), 10);
    }

    #[test]
    fn loop_needs_a_terminal() {
        let mut builder = NetworkBuilder::new("t");
        let a = builder.add_station("Alpha", 1, 2, 106).unwrap();
        let b = builder.add_station("Bravo", 2, 1, 106).unwrap();
        let c = builder.add_station("Charlie", 3, 0, 106).unwrap();
        builder.connect_stations(a, b, 900).unwrap();
        builder.connect_stations(b, c, 900).unwrap();
        assert!(matches!(
            builder.form_loop(b, 300).unwrap_err(),
            NetworkError::NotATerminal(_)
        ));
    }

    #[test]
    fn depot_spurs_join_the_mainline() {
        let (mut builder, south, north) = two_station_builder();
        builder.form_loop(north, 300).unwrap();
        builder.form_loop(south, 300).unwrap();

        let terminal = builder.station(north).unwrap().clone();
        let in_junction = terminal.platform(Direction::Southbound).unwrap().entry;
        let out_junction = terminal.platform(Direction::Northbound).unwrap().exit;
        let hub = builder.add_depot(100).unwrap();
        let depot = builder
            .connect_depot(hub, in_junction, out_junction, 150)
            .unwrap();
        assert!(builder.connect_depot(hub, in_junction, out_junction, 150).is_err());

        let network = builder.build().unwrap();
        assert_eq!(network.depot().unwrap(), &depot);
        let branch = network.junction(out_junction).unwrap();
        assert_eq!(branch.outgoing(Direction::DepotIn), Some(depot.spur_in));
        assert!(branch.outgoing(Direction::Northbound).is_some());
        assert_eq!(
            network.departure_direction().unwrap(),
            Direction::Southbound
        );
    }
}
