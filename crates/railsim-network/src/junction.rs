//! Junctions: graph nodes, each guarded by a block signal.

use railsim_types::{Direction, JunctionId, SegmentId};

use crate::direction_map::DirectionMap;
use crate::signal::BlockSignal;

/// A node joining the segments that arrive at it to the segments that
/// leave it.
#[derive(Debug)]
pub struct Junction {
    id: JunctionId,
    name: String,
    /// Reversal point at the far end of a loop.
    is_end: bool,
    outgoing: DirectionMap<SegmentId>,
    signal: BlockSignal,
}

impl Junction {
    pub(crate) fn new(
        id: JunctionId,
        name: String,
        is_end: bool,
        outgoing: DirectionMap<SegmentId>,
    ) -> Self {
        Self {
            id,
            name,
            is_end,
            outgoing,
            signal: BlockSignal::new(id),
        }
    }

    /// Junction identifier.
    pub const fn id(&self) -> JunctionId {
        self.id
    }

    /// Display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether trains reverse here.
    pub const fn is_end(&self) -> bool {
        self.is_end
    }

    /// The outgoing segment filed under `direction`.
    pub const fn outgoing(&self, direction: Direction) -> Option<SegmentId> {
        self.outgoing.get(direction)
    }

    /// All outgoing segments by direction.
    pub const fn outgoing_map(&self) -> &DirectionMap<SegmentId> {
        &self.outgoing
    }

    /// The block signal guarding every segment leaving this junction.
    pub const fn signal(&self) -> &BlockSignal {
        &self.signal
    }
}
