//! The frozen track graph and its routing rule.
//!
//! A [`Network`] owns every segment, junction, and station in dense arenas
//! indexed by the identifiers from `railsim-types`. Topology is read-only
//! once built; the only interior mutability is in the occupancy queues and
//! block signals, so a network is shared between train tasks behind an
//! `Arc` without any outer lock.

use railsim_types::{
    Direction, JunctionId, SegmentId, SegmentSnapshot, SignalSnapshot, StationId, TrainId,
};

use crate::error::NetworkError;
use crate::junction::Junction;
use crate::segment::Segment;
use crate::signal::BlockSignal;
use crate::station::{Depot, Station};

/// Where a train intends to go, used to pick an outgoing segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Heading {
    /// Current mainline direction of travel.
    pub direction: Direction,
    /// Whether the train is returning to the depot.
    pub homebound: bool,
}

impl Heading {
    /// A heading for an in-service train.
    pub const fn new(direction: Direction) -> Self {
        Self {
            direction,
            homebound: false,
        }
    }

    /// The same heading, bound for the depot.
    #[must_use]
    pub const fn homebound(self) -> Self {
        Self {
            direction: self.direction,
            homebound: true,
        }
    }
}

/// An immutable track graph with live occupancy and signal state.
#[derive(Debug)]
pub struct Network {
    name: String,
    segments: Vec<Segment>,
    junctions: Vec<Junction>,
    stations: Vec<Station>,
    depot: Option<Depot>,
}

impl Network {
    pub(crate) const fn from_parts(
        name: String,
        segments: Vec<Segment>,
        junctions: Vec<Junction>,
        stations: Vec<Station>,
        depot: Option<Depot>,
    ) -> Self {
        Self {
            name,
            segments,
            junctions,
            stations,
            depot,
        }
    }

    /// Display name of the line.
    pub fn name(&self) -> &str {
        &self.name
    }

    // -------------------------------------------------------------------
    // Lookups
    // -------------------------------------------------------------------

    /// Look up a segment.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::SegmentNotFound`] for a foreign identifier.
    pub fn segment(&self, id: SegmentId) -> Result<&Segment, NetworkError> {
        self.segments
            .get(id.index())
            .ok_or(NetworkError::SegmentNotFound(id))
    }

    /// Look up a junction.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::JunctionNotFound`] for a foreign identifier.
    pub fn junction(&self, id: JunctionId) -> Result<&Junction, NetworkError> {
        self.junctions
            .get(id.index())
            .ok_or(NetworkError::JunctionNotFound(id))
    }

    /// Look up a station.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::StationNotFound`] for a foreign identifier.
    pub fn station(&self, id: StationId) -> Result<&Station, NetworkError> {
        self.stations
            .get(id.index())
            .ok_or(NetworkError::StationNotFound(id))
    }

    /// Find a station by name, ignoring ASCII case.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::UnknownStation`] if no station matches.
    pub fn station_by_name(&self, name: &str) -> Result<&Station, NetworkError> {
        self.stations
            .iter()
            .find(|s| s.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| NetworkError::UnknownStation(name.to_owned()))
    }

    /// The block signal guarding the segments that leave `junction`.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::JunctionNotFound`] for a foreign identifier.
    pub fn signal(&self, junction: JunctionId) -> Result<&BlockSignal, NetworkError> {
        self.junction(junction).map(Junction::signal)
    }

    /// The station whose platform `segment` is, if any.
    pub fn station_at(&self, segment: &Segment) -> Option<&Station> {
        segment.station().and_then(|id| self.stations.get(id.index()))
    }

    /// The depot.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::NoDepot`] if none was connected.
    pub fn depot(&self) -> Result<&Depot, NetworkError> {
        self.depot.as_ref().ok_or(NetworkError::NoDepot)
    }

    /// Stations in line order (increasing sequence).
    pub fn stations(&self) -> &[Station] {
        &self.stations
    }

    /// All segments in identifier order.
    pub fn segments(&self) -> impl Iterator<Item = &Segment> {
        self.segments.iter()
    }

    /// All junctions in identifier order.
    pub fn junctions(&self) -> impl Iterator<Item = &Junction> {
        self.junctions.iter()
    }

    /// Number of segments.
    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    /// Number of junctions.
    pub fn junction_count(&self) -> usize {
        self.junctions.len()
    }

    // -------------------------------------------------------------------
    // Routing
    // -------------------------------------------------------------------

    /// Pick the segment a train leaves `junction` on.
    ///
    /// A reversal junction always sends the train down its single loop
    /// segment. Elsewhere a homebound train turns into the depot when it
    /// can, then the train keeps its direction of travel, and finally a
    /// train on the depot platform takes the spur out. `None` means the
    /// track ends here.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::JunctionNotFound`] for a foreign identifier.
    pub fn route_from(
        &self,
        junction: JunctionId,
        heading: Heading,
    ) -> Result<Option<SegmentId>, NetworkError> {
        let junction = self.junction(junction)?;
        let outgoing = junction.outgoing_map();

        if junction.is_end() {
            return Ok(outgoing.mainline().next().map(|(_, segment)| segment));
        }
        if heading.homebound
            && let Some(segment) = outgoing.get(Direction::DepotIn)
        {
            return Ok(Some(segment));
        }
        Ok(outgoing
            .get(heading.direction)
            .or_else(|| outgoing.get(Direction::DepotOut)))
    }

    /// The segment following `segment` for a train with `heading`.
    ///
    /// # Errors
    ///
    /// Returns a lookup error for a foreign identifier.
    pub fn next_segment(
        &self,
        segment: SegmentId,
        heading: Heading,
    ) -> Result<Option<SegmentId>, NetworkError> {
        let to = self.segment(segment)?.to();
        self.route_from(to, heading)
    }

    /// The mainline direction a train faces when it leaves the depot.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::NoDepot`] without a depot,
    /// [`NetworkError::MissingRoute`] if the depot-out spur joins no
    /// mainline, or [`NetworkError::AmbiguousDeparture`] if it joins both.
    pub fn departure_direction(&self) -> Result<Direction, NetworkError> {
        let depot = self.depot()?;
        let joins = self.segment(depot.spur_out)?.to();
        let mut mainline = self.junction(joins)?.outgoing_map().mainline();
        match (mainline.next(), mainline.next()) {
            (Some((direction, _)), None) => Ok(direction),
            (Some(_), Some(_)) => Err(NetworkError::AmbiguousDeparture { junction: joins }),
            (None, _) => Err(NetworkError::MissingRoute {
                junction: joins,
                direction: Direction::DepotOut,
            }),
        }
    }

    /// Station identifiers in the order a train travelling `direction`
    /// reaches them.
    pub fn stations_in_order(&self, direction: Direction) -> Vec<StationId> {
        let ids = self.stations.iter().map(|s| s.id);
        match direction {
            Direction::Southbound => ids.rev().collect(),
            _ => ids.collect(),
        }
    }

    // -------------------------------------------------------------------
    // Inspection
    // -------------------------------------------------------------------

    /// Occupancy of every segment, in segment order.
    pub fn segment_snapshots(&self) -> Vec<SegmentSnapshot> {
        self.segments.iter().map(Segment::snapshot).collect()
    }

    /// State of every block signal, in junction order.
    pub fn signal_snapshots(&self) -> Vec<SignalSnapshot> {
        self.junctions.iter().map(|j| j.signal().snapshot()).collect()
    }

    /// Junctions whose signal `train` holds.
    pub fn signals_held_by(&self, train: TrainId) -> Vec<JunctionId> {
        self.junctions
            .iter()
            .filter(|j| j.signal().holder() == Some(train))
            .map(Junction::id)
            .collect()
    }

    /// Segments whose queue contains a carriage of `train`.
    pub fn segments_occupied_by(&self, train: TrainId) -> Vec<SegmentId> {
        self.segments
            .iter()
            .filter(|s| s.occupancy().contains_train(train))
            .map(Segment::id)
            .collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use railsim_types::SegmentKind;

    use super::*;
    use crate::builder::NetworkBuilder;
    use crate::segment::SegmentSpec;

    /// Two stations, both loops, depot at the north terminal.
    fn small_line() -> Network {
        let mut builder = NetworkBuilder::new("small");
        let south = builder.add_station("Alpha", 1, 1, 106).unwrap();
        let north = builder.add_station("Bravo", 2, 0, 106).unwrap();
        builder.connect_stations(south, north, 1000).unwrap();
        builder.form_loop(north, 250).unwrap();
        builder.form_loop(south, 250).unwrap();
        let terminal = builder.station(north).unwrap().clone();
        let hub = builder.add_depot(100).unwrap();
        builder
            .connect_depot(
                hub,
                terminal.platform(Direction::Southbound).unwrap().entry,
                terminal.platform(Direction::Northbound).unwrap().exit,
                150,
            )
            .unwrap();
        builder.build().unwrap()
    }

    fn segment_named<'a>(network: &'a Network, name: &str) -> &'a Segment {
        network.segments().find(|s| s.name() == name).unwrap()
    }

    #[test]
    fn end_junction_reverses_regardless_of_heading() {
        let network = small_line();
        let loop_in = segment_named(&network, "Bravo north end loop NB");
        let loop_out = segment_named(&network, "Bravo north end loop SB");

        let next = network
            .next_segment(loop_in.id(), Heading::new(Direction::Northbound))
            .unwrap();
        assert_eq!(next, Some(loop_out.id()));
        assert_eq!(loop_out.direction(), Direction::Southbound);
    }

    #[test]
    fn homebound_trains_take_the_depot_spur() {
        let network = small_line();
        let depot = *network.depot().unwrap();
        let platform = network.station_by_name("bravo").unwrap();
        let nb = platform.platform(Direction::Northbound).unwrap();

        let heading = Heading::new(Direction::Northbound);
        let in_service = network.route_from(nb.exit, heading).unwrap();
        assert_ne!(in_service, Some(depot.spur_in));
        let retiring = network.route_from(nb.exit, heading.homebound()).unwrap();
        assert_eq!(retiring, Some(depot.spur_in));

        // Spur in leads to the depot platform, which leads out again.
        let next = network.next_segment(depot.spur_in, heading.homebound()).unwrap();
        assert_eq!(next, Some(depot.platform));
        let out = network
            .next_segment(depot.platform, Heading::new(Direction::Southbound))
            .unwrap();
        assert_eq!(out, Some(depot.spur_out));
    }

    #[test]
    fn departure_faces_the_joined_mainline() {
        let network = small_line();
        assert_eq!(network.departure_direction().unwrap(), Direction::Southbound);
        let depot = network.depot().unwrap();
        let onto = network
            .next_segment(depot.spur_out, Heading::new(Direction::Southbound))
            .unwrap()
            .unwrap();
        assert_eq!(network.segment(onto).unwrap().kind(), SegmentKind::Platform);
    }

    #[test]
    fn station_order_follows_direction() {
        let network = small_line();
        let north = network.stations_in_order(Direction::Northbound);
        let south = network.stations_in_order(Direction::Southbound);
        assert_eq!(north, vec![StationId(0), StationId(1)]);
        assert_eq!(south, vec![StationId(1), StationId(0)]);
    }

    #[test]
    fn open_track_routes_to_nothing() {
        let mut builder = NetworkBuilder::new("loop");
        let a = builder.add_junction("a").unwrap();
        let b = builder.add_junction("b").unwrap();
        builder
            .connect(a, SegmentSpec::new("ab", SegmentKind::Generic, 10), Direction::Northbound, b)
            .unwrap();
        builder
            .connect(b, SegmentSpec::new("ba", SegmentKind::Generic, 10), Direction::Northbound, a)
            .unwrap();
        let network = builder.build().unwrap();
        assert!(network.depot().is_err());
        assert_eq!(
            network
                .route_from(a, Heading::new(Direction::Southbound))
                .unwrap(),
            None
        );
    }

    #[test]
    fn fresh_network_is_empty_and_open() {
        let network = small_line();
        assert!(network.segment_snapshots().iter().all(|s| s.occupants.is_empty()));
        assert!(network.signal_snapshots().iter().all(SignalSnapshot::is_free));
        let nobody = TrainId::new();
        assert!(network.signals_held_by(nobody).is_empty());
        assert!(network.segments_occupied_by(nobody).is_empty());
    }
}
