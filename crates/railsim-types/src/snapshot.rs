//! Read-only views of the running simulation.
//!
//! The renderer never touches live track state. It receives these plain
//! values, captured under the movement lock so that every queue, signal,
//! and train summary in one [`NetworkSnapshot`] describes the same instant.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::{SegmentKind, TrainAction, TrainPhase};
use crate::ids::{CarriageRef, JunctionId, SegmentId, TrainId};

/// One entry of a segment's occupancy queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct OccupantSnapshot {
    /// The carriage on the segment.
    pub carriage: CarriageRef,
    /// Meters travelled into the segment.
    pub clearance: f64,
}

/// Occupancy of one segment, front (furthest along) first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct SegmentSnapshot {
    /// The segment.
    pub segment: SegmentId,
    /// Display name of the segment.
    pub name: String,
    /// What the segment represents.
    pub kind: SegmentKind,
    /// Length in meters.
    pub length: u32,
    /// Ordered occupants.
    pub occupants: Vec<OccupantSnapshot>,
}

/// State of one junction's block signal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct SignalSnapshot {
    /// The junction the signal guards.
    pub junction: JunctionId,
    /// The train currently holding the signal, if any.
    pub held_by: Option<TrainId>,
}

impl SignalSnapshot {
    /// Whether the signal is currently free.
    pub const fn is_free(&self) -> bool {
        self.held_by.is_none()
    }
}

/// Per-train summary shown next to the track diagram.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct TrainSummary {
    /// Train identity.
    pub train: TrainId,
    /// Fleet number shown to operators.
    pub number: u16,
    /// Status text derived from the head carriage's segment.
    pub status: String,
    /// Control-loop phase.
    pub phase: TrainPhase,
    /// Current velocity in km/h.
    pub velocity_kmh: f64,
    /// Number of carriages.
    pub carriage_count: u16,
    /// Carriage class name.
    pub class_name: String,
    /// Total passenger capacity of all carriages.
    pub total_capacity: u32,
    /// The last action the movement engine produced.
    pub last_action: Option<TrainAction>,
    /// Whether the train is in service (not retiring).
    pub active: bool,
}

/// A consistent picture of the whole network at one tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct NetworkSnapshot {
    /// Tick at which the snapshot was taken.
    pub tick: u64,
    /// Simulated time of day, `HH:MM:SS`.
    pub time: String,
    /// Occupancy per segment, in segment order.
    pub segments: Vec<SegmentSnapshot>,
    /// Signal state per junction, in junction order.
    pub signals: Vec<SignalSnapshot>,
    /// Summaries of active trains.
    pub trains: Vec<TrainSummary>,
}

impl NetworkSnapshot {
    /// Segments currently holding at least one carriage of `train`.
    pub fn segments_occupied_by(&self, train: TrainId) -> Vec<SegmentId> {
        self.segments
            .iter()
            .filter(|s| s.occupants.iter().any(|o| o.carriage.train == train))
            .map(|s| s.segment)
            .collect()
    }

    /// Junctions whose signal is held by `train`.
    pub fn signals_held_by(&self, train: TrainId) -> Vec<JunctionId> {
        self.signals
            .iter()
            .filter(|s| s.held_by == Some(train))
            .map(|s| s.junction)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn occupied_and_held_filters() {
        let a = TrainId::new();
        let b = TrainId::new();
        let snapshot = NetworkSnapshot {
            tick: 3,
            time: String::from("05:00:03"),
            segments: vec![
                SegmentSnapshot {
                    segment: SegmentId(0),
                    name: String::from("north loop"),
                    kind: SegmentKind::Loop,
                    length: 500,
                    occupants: vec![OccupantSnapshot {
                        carriage: CarriageRef::new(a, 0),
                        clearance: 12.5,
                    }],
                },
                SegmentSnapshot {
                    segment: SegmentId(1),
                    name: String::from("mainline"),
                    kind: SegmentKind::Mainline,
                    length: 1000,
                    occupants: Vec::new(),
                },
            ],
            signals: vec![
                SignalSnapshot {
                    junction: JunctionId(0),
                    held_by: Some(a),
                },
                SignalSnapshot {
                    junction: JunctionId(1),
                    held_by: None,
                },
            ],
            trains: Vec::new(),
        };

        assert_eq!(snapshot.segments_occupied_by(a), vec![SegmentId(0)]);
        assert!(snapshot.segments_occupied_by(b).is_empty());
        assert_eq!(snapshot.signals_held_by(a), vec![JunctionId(0)]);
        assert!(snapshot.signals.get(1).is_some_and(SignalSnapshot::is_free));
    }
}
