//! Segments: directed stretches of track between two junctions.

use std::sync::{Mutex, MutexGuard, PoisonError};

use railsim_types::{Direction, JunctionId, SegmentId, SegmentKind, SegmentSnapshot, StationId};

use crate::occupancy::OccupancyQueue;

/// Everything needed to lay a segment, before it is wired into the graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentSpec {
    /// Display name.
    pub name: String,
    /// What the segment represents.
    pub kind: SegmentKind,
    /// Length in meters; must be positive.
    pub length: u32,
    /// Owning station, for platform segments.
    pub station: Option<StationId>,
    /// Station the segment leaves from, for mainline segments.
    pub origin: Option<StationId>,
}

impl SegmentSpec {
    /// A plain segment with no station.
    pub fn new(name: impl Into<String>, kind: SegmentKind, length: u32) -> Self {
        Self {
            name: name.into(),
            kind,
            length,
            station: None,
            origin: None,
        }
    }

    /// Mark the segment as a platform of `station`.
    #[must_use]
    pub const fn at_station(mut self, station: StationId) -> Self {
        self.station = Some(station);
        self
    }

    /// Mark the segment as leaving `station`.
    #[must_use]
    pub const fn leaving(mut self, station: StationId) -> Self {
        self.origin = Some(station);
        self
    }
}

/// A directed length of track.
///
/// Topology fields never change after the network is built; only the
/// occupancy queue mutates while the simulation runs.
#[derive(Debug)]
pub struct Segment {
    id: SegmentId,
    name: String,
    kind: SegmentKind,
    length: u32,
    /// The key this segment is filed under in its `from` junction.
    direction: Direction,
    station: Option<StationId>,
    origin: Option<StationId>,
    from: JunctionId,
    to: JunctionId,
    occupancy: Mutex<OccupancyQueue>,
}

impl Segment {
    pub(crate) fn new(
        id: SegmentId,
        spec: SegmentSpec,
        direction: Direction,
        from: JunctionId,
        to: JunctionId,
    ) -> Self {
        Self {
            id,
            name: spec.name,
            kind: spec.kind,
            length: spec.length,
            direction,
            station: spec.station,
            origin: spec.origin,
            from,
            to,
            occupancy: Mutex::new(OccupancyQueue::new(id)),
        }
    }

    /// Segment identifier.
    pub const fn id(&self) -> SegmentId {
        self.id
    }

    /// Display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// What the segment represents.
    pub const fn kind(&self) -> SegmentKind {
        self.kind
    }

    /// Length in meters.
    pub const fn length(&self) -> u32 {
        self.length
    }

    /// Length in meters, for clearance arithmetic.
    pub fn length_m(&self) -> f64 {
        f64::from(self.length)
    }

    /// Direction of travel along this segment.
    pub const fn direction(&self) -> Direction {
        self.direction
    }

    /// Owning station, if this is a platform.
    pub const fn station(&self) -> Option<StationId> {
        self.station
    }

    /// The station this segment leaves from, if it is mainline track.
    pub const fn origin(&self) -> Option<StationId> {
        self.origin
    }

    /// Whether the segment belongs to the depot.
    pub const fn is_depot(&self) -> bool {
        self.kind.is_depot()
    }

    /// Upstream junction.
    pub const fn from(&self) -> JunctionId {
        self.from
    }

    /// Downstream junction.
    pub const fn to(&self) -> JunctionId {
        self.to
    }

    /// Lock the occupancy queue.
    ///
    /// Queue locks are never held across an await point. A poisoned lock
    /// is recovered: the queue itself validates every mutation.
    pub fn occupancy(&self) -> MutexGuard<'_, OccupancyQueue> {
        self.occupancy.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Capture the segment for the renderer.
    pub fn snapshot(&self) -> SegmentSnapshot {
        SegmentSnapshot {
            segment: self.id,
            name: self.name.clone(),
            kind: self.kind,
            length: self.length,
            occupants: self.occupancy().snapshot(),
        }
    }
}
