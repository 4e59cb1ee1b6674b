//! Type-safe identifier wrappers.
//!
//! Trains carry a [`Uuid`] identity (UUID v7, time-ordered) so that a
//! train keeps the same identity across deployments. Track elements are
//! arena-indexed: the network stores segments, junctions, and stations in
//! dense vectors and hands out index newtypes that are only meaningful for
//! the network that created them.

use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

/// Generates a newtype wrapper around [`Uuid`] with standard derives.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
        #[ts(export, export_to = "bindings/")]
        pub struct $name(pub Uuid);

        impl $name {
            /// Create a new identifier using UUID v7 (time-ordered).
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            /// Return the inner [`Uuid`] value.
            pub const fn into_inner(self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

/// Generates a dense index newtype for arena-allocated track elements.
macro_rules! define_index {
    (
        $(#[$meta:meta])*
        $name:ident, $prefix:literal
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
        #[ts(export, export_to = "bindings/")]
        pub struct $name(pub u32);

        impl $name {
            /// Return the arena slot this identifier points at.
            pub fn index(self) -> usize {
                usize::try_from(self.0).unwrap_or(usize::MAX)
            }

            /// Build an identifier from an arena slot.
            ///
            /// Returns `None` if the slot does not fit in a `u32`.
            pub fn from_index(index: usize) -> Option<Self> {
                u32::try_from(index).ok().map(Self)
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, concat!($prefix, "{}"), self.0)
            }
        }
    };
}

define_id! {
    /// Unique identifier for a train.
    TrainId
}

define_index! {
    /// Index of a segment (directed stretch of track) in the network.
    SegmentId, "S"
}

define_index! {
    /// Index of a junction (graph node guarded by a block signal).
    JunctionId, "J"
}

define_index! {
    /// Index of a station in line order.
    StationId, "ST"
}

/// Reference to one carriage of one train.
///
/// Occupancy queues store these instead of the carriages themselves; the
/// carriage data stays owned by its train.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct CarriageRef {
    /// The train the carriage is coupled to.
    pub train: TrainId,
    /// Position in the train, 0 being the head.
    pub index: u16,
}

impl CarriageRef {
    /// Create a reference to carriage `index` of `train`.
    pub const fn new(train: TrainId, index: u16) -> Self {
        Self { train, index }
    }
}

impl core::fmt::Display for CarriageRef {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}#{}", self.train, self.index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn train_ids_are_unique() {
        assert_ne!(TrainId::new(), TrainId::new());
    }

    #[test]
    fn index_round_trips_through_usize() {
        let id = SegmentId::from_index(17);
        assert_eq!(id, Some(SegmentId(17)));
        assert_eq!(SegmentId(17).index(), 17);
    }

    #[test]
    fn index_display_uses_prefix() {
        assert_eq!(JunctionId(4).to_string(), "J4");
        assert_eq!(StationId(0).to_string(), "ST0");
    }

    #[test]
    fn carriage_refs_order_by_train_then_index() {
        let train = TrainId::new();
        assert!(CarriageRef::new(train, 0) < CarriageRef::new(train, 1));
    }
}
