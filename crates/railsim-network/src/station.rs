//! Stations, their platforms, and the depot.

use railsim_types::{Direction, JunctionId, SegmentId, StationId};

use crate::direction_map::DirectionMap;

/// One platform: a short segment between an entry and an exit junction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Platform {
    /// The platform segment.
    pub segment: SegmentId,
    /// Junction trains pass to reach the platform.
    pub entry: JunctionId,
    /// Junction trains pass to leave the platform.
    pub exit: JunctionId,
}

/// A passenger station with one platform per mainline direction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Station {
    /// Station identifier.
    pub id: StationId,
    /// Display name.
    pub name: String,
    /// Position along the line; increases northbound.
    pub sequence: u32,
    /// Distance order from the depot (0 = closest).
    pub depot_sequence: u32,
    /// Platforms keyed by direction of travel.
    pub platforms: DirectionMap<Platform>,
}

impl Station {
    /// The platform serving `direction`.
    pub const fn platform(&self, direction: Direction) -> Option<Platform> {
        self.platforms.get(direction)
    }
}

/// The depot: a platform where trains spawn and despawn, plus the two
/// spurs joining it to the mainline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Depot {
    /// The depot platform, where carriages are placed on deployment.
    pub platform: SegmentId,
    /// Junction at the start of the depot platform.
    pub entry: JunctionId,
    /// Junction at the end of the depot platform.
    pub exit: JunctionId,
    /// Spur from the mainline into the depot.
    pub spur_in: SegmentId,
    /// Spur from the depot onto the mainline.
    pub spur_out: SegmentId,
}

/// A depot platform that has not been connected to the mainline yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepotHub {
    /// The depot platform.
    pub platform: SegmentId,
    /// Junction at the start of the depot platform.
    pub entry: JunctionId,
    /// Junction at the end of the depot platform.
    pub exit: JunctionId,
}
