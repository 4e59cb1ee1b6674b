//! Enumeration types shared across the railsim workspace.
//!
//! The direction set is closed: every junction keys its outgoing segments by
//! one of the four [`Direction`] variants, so lookups never fall back to a
//! positional default.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

// ---------------------------------------------------------------------------
// Directions
// ---------------------------------------------------------------------------

/// A travel direction, and the key a junction files an outgoing segment
/// under.
///
/// Northbound means travelling toward stations with a higher sequence
/// number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Mainline, toward higher station sequence numbers.
    Northbound,
    /// Mainline, toward lower station sequence numbers.
    Southbound,
    /// Spur from the mainline into the depot.
    DepotIn,
    /// Spur from the depot back onto the mainline.
    DepotOut,
}

impl Direction {
    /// All directions, in junction map order.
    pub const ALL: [Self; 4] = [
        Self::Northbound,
        Self::Southbound,
        Self::DepotIn,
        Self::DepotOut,
    ];

    /// The reverse mainline direction.
    ///
    /// Depot directions are their own reverse: a spur has a single sense of
    /// travel.
    pub const fn opposite(self) -> Self {
        match self {
            Self::Northbound => Self::Southbound,
            Self::Southbound => Self::Northbound,
            Self::DepotIn => Self::DepotIn,
            Self::DepotOut => Self::DepotOut,
        }
    }

    /// Whether this is one of the two mainline directions.
    pub const fn is_mainline(self) -> bool {
        matches!(self, Self::Northbound | Self::Southbound)
    }

    /// Human-readable label used in status text.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Northbound => "northbound",
            Self::Southbound => "southbound",
            Self::DepotIn => "into depot",
            Self::DepotOut => "out of depot",
        }
    }
}

impl core::fmt::Display for Direction {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// Movement decisions
// ---------------------------------------------------------------------------

/// The per-tick decision the movement engine makes for a train.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TrainAction {
    /// Advance every carriage by the current velocity.
    Proceed,
    /// Hold because the train ahead is within the headway distance.
    HeadwayStop,
    /// Hold at the end of a loop before reversing.
    EndStop,
    /// Hold at a station platform.
    StationStop,
    /// Hold because the next junction's block signal is taken.
    SignalStop,
    /// Arrived at the depot while retiring; despawn.
    DepotStop,
}

impl TrainAction {
    /// Whether the action leaves the train stationary.
    pub const fn is_stop(self) -> bool {
        !matches!(self, Self::Proceed)
    }
}

// ---------------------------------------------------------------------------
// Track classification
// ---------------------------------------------------------------------------

/// What a segment represents on the line.
///
/// The kind drives the status text a train shows while its head carriage is
/// on the segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "snake_case")]
pub enum SegmentKind {
    /// Track between two consecutive stations.
    Mainline,
    /// A station platform.
    Platform,
    /// Reversal loop track beyond a terminal station.
    Loop,
    /// The depot's own platform, where trains spawn and despawn.
    DepotPlatform,
    /// Spur leading from the mainline into the depot.
    DepotSpurIn,
    /// Spur leading from the depot onto the mainline.
    DepotSpurOut,
    /// Free-standing track built directly through the network builder.
    Generic,
}

impl SegmentKind {
    /// Whether the segment belongs to the depot (its platform or spurs).
    pub const fn is_depot(self) -> bool {
        matches!(
            self,
            Self::DepotPlatform | Self::DepotSpurIn | Self::DepotSpurOut
        )
    }
}

// ---------------------------------------------------------------------------
// Train lifecycle
// ---------------------------------------------------------------------------

/// Where a train is in its control loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "snake_case")]
pub enum TrainPhase {
    /// In the inactive pool, or waiting to be placed on the depot platform.
    AtDepot,
    /// Running the decide/act loop.
    Moving,
    /// Dwelling at a station platform.
    StationDwell,
    /// Dwelling at a loop terminus before reversing.
    EndDwell,
    /// Parked after an invariant violation; makes no further moves.
    Disabled,
}
