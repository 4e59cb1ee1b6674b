//! Fire-and-forget notifications for whoever draws the simulation.
//!
//! Events are broadcast through the [`SimulationContext`]; a slow or absent
//! listener never holds up a train.
//!
//! [`SimulationContext`]: crate::context::SimulationContext

use railsim_types::{StationId, TrainAction, TrainId};
use serde::{Deserialize, Serialize};

/// Something changed that a renderer may want to redraw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum FleetEvent {
    /// A train made its per-tick decision.
    Moved {
        /// The train.
        train: TrainId,
        /// Tick the decision was made in.
        tick: u64,
        /// The decision.
        action: TrainAction,
    },
    /// A train left the inactive pool and was placed on the depot platform.
    Deployed {
        /// The train.
        train: TrainId,
        /// Its fleet number.
        number: u16,
    },
    /// A train was pulled off the track and returned to the inactive pool.
    Despawned {
        /// The train.
        train: TrainId,
        /// Its fleet number.
        number: u16,
    },
    /// A freshly deployed train reached its first station platform.
    FirstStationPassed {
        /// The train.
        train: TrainId,
        /// The station.
        station: StationId,
    },
}

impl FleetEvent {
    /// The train the event is about.
    pub const fn train(&self) -> TrainId {
        match self {
            Self::Moved { train, .. }
            | Self::Deployed { train, .. }
            | Self::Despawned { train, .. }
            | Self::FirstStationPassed { train, .. } => *train,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_event_tag() {
        let train = TrainId::new();
        let json = serde_json::to_value(FleetEvent::Deployed { train, number: 4 }).unwrap();
        assert_eq!(json["event"], "deployed");
        assert_eq!(json["number"], 4);

        let moved = FleetEvent::Moved {
            train,
            tick: 9,
            action: TrainAction::SignalStop,
        };
        let json = serde_json::to_value(moved).unwrap();
        assert_eq!(json["action"], "SIGNAL_STOP");
        assert_eq!(moved.train(), train);
    }
}
