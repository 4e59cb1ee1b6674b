//! Error types for the `railsim-network` crate.
//!
//! Construction errors (everything raised by the builder and the line
//! layout) are fatal at setup. The occupancy and signal variants are raised
//! while the simulation runs and indicate a broken invariant: a train found
//! where the interlocking says it cannot be.

use railsim_types::{CarriageRef, Direction, JunctionId, SegmentId, StationId, TrainId};

/// Errors that can occur while building or operating the track network.
#[derive(Debug, thiserror::Error)]
pub enum NetworkError {
    /// A segment identifier does not belong to this network.
    #[error("segment not found: {0}")]
    SegmentNotFound(SegmentId),

    /// A junction identifier does not belong to this network.
    #[error("junction not found: {0}")]
    JunctionNotFound(JunctionId),

    /// A station identifier does not belong to this network.
    #[error("station not found: {0}")]
    StationNotFound(StationId),

    /// No station carries the given name.
    #[error("no station named {0:?}")]
    UnknownStation(String),

    /// A segment was given a length of zero.
    #[error("segment {name:?} has zero length")]
    ZeroLength {
        /// Name of the offending segment.
        name: String,
    },

    /// A junction already files an outgoing segment under this direction.
    #[error("junction {junction} already has an outgoing {direction} segment")]
    DirectionTaken {
        /// The junction.
        junction: JunctionId,
        /// The contested direction.
        direction: Direction,
    },

    /// Stations were supplied out of line order.
    #[error("station {name:?} (sequence {sequence}) does not follow sequence {previous}")]
    StationsOutOfSequence {
        /// The station that broke the order.
        name: String,
        /// Its sequence number.
        sequence: u32,
        /// Sequence number of the station before it.
        previous: u32,
    },

    /// A line needs at least two stations to form both reversal loops.
    #[error("a line needs at least 2 stations, got {count}")]
    TooFewStations {
        /// Number of stations supplied.
        count: usize,
    },

    /// A loop was requested at a station that is not at either end of the line.
    #[error("station {0} is not a terminal station")]
    NotATerminal(StationId),

    /// A junction has no outgoing segment for the direction a train needs.
    #[error("junction {junction} has no outgoing segment for {direction} travel")]
    MissingRoute {
        /// The dead-end junction.
        junction: JunctionId,
        /// The direction that could not be followed.
        direction: Direction,
    },

    /// An end-of-line junction is not wired as a reversal point.
    #[error("junction {junction} is not a valid reversal point: {reason}")]
    InvalidReversal {
        /// The junction.
        junction: JunctionId,
        /// What is wrong with it.
        reason: String,
    },

    /// The depot exit leads onto more than one mainline direction, so a
    /// freshly deployed train cannot tell which way it is heading.
    #[error("depot exit at {junction} joins more than one mainline direction")]
    AmbiguousDeparture {
        /// The junction the depot-out spur arrives at.
        junction: JunctionId,
    },

    /// The network has no depot, so trains cannot be deployed.
    #[error("network has no depot")]
    NoDepot,

    /// A second depot was connected.
    #[error("network already has a depot")]
    DepotAlreadyConnected,

    /// The network grew past the identifier space.
    #[error("too many track elements for 32-bit identifiers")]
    CapacityExceeded,

    /// A block signal's semaphore was closed underneath a waiting train.
    #[error("block signal at {junction} was closed: {source}")]
    SignalClosed {
        /// The junction whose signal closed.
        junction: JunctionId,
        /// The underlying acquire error.
        source: tokio::sync::AcquireError,
    },

    /// A train released a block signal it does not hold.
    #[error("train {train} released signal {junction} held by {holder:?}")]
    SignalNotHeld {
        /// The junction.
        junction: JunctionId,
        /// The releasing train.
        train: TrainId,
        /// Whoever actually holds it.
        holder: Option<TrainId>,
    },

    /// A carriage would break the clearance ordering of a queue.
    #[error("carriage {carriage} at {clearance:.2} m breaks ordering on {segment} (neighbour at {neighbour:.2} m)")]
    NonMonotonicQueue {
        /// The segment whose queue was affected.
        segment: SegmentId,
        /// The carriage being placed.
        carriage: CarriageRef,
        /// Its clearance.
        clearance: f64,
        /// Clearance of the neighbouring entry it collides with.
        neighbour: f64,
    },

    /// The carriage leaving a segment was not at the front of its queue.
    #[error("expected {expected} at the front of {segment}, found {found:?}")]
    UnexpectedFront {
        /// The segment.
        segment: SegmentId,
        /// The carriage that tried to leave.
        expected: CarriageRef,
        /// The carriage actually at the front.
        found: Option<CarriageRef>,
    },

    /// A carriage was not found in the queue it should be in.
    #[error("carriage {carriage} is not queued on {segment}")]
    NotQueued {
        /// The segment.
        segment: SegmentId,
        /// The missing carriage.
        carriage: CarriageRef,
    },
}

impl NetworkError {
    /// Whether the error signals a broken runtime invariant rather than a
    /// setup or lookup problem.
    pub const fn is_invariant_violation(&self) -> bool {
        matches!(
            self,
            Self::SignalNotHeld { .. }
                | Self::NonMonotonicQueue { .. }
                | Self::UnexpectedFront { .. }
                | Self::NotQueued { .. }
        )
    }
}
