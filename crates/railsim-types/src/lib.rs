//! Shared type definitions for the railsim train simulator.
//!
//! Every crate in the workspace speaks in these identifiers, enums, and
//! snapshot structs. Snapshot types flow to the track renderer as JSON, and
//! their `TypeScript` shapes are generated via `ts-rs`.
//!
//! # Modules
//!
//! - [`ids`] -- Train identities and arena indexes for track elements
//! - [`enums`] -- Directions, movement actions, segment kinds, train phases
//! - [`snapshot`] -- Read-only views of occupancy, signals, and trains

pub mod enums;
pub mod ids;
pub mod snapshot;

pub use enums::{Direction, SegmentKind, TrainAction, TrainPhase};
pub use ids::{CarriageRef, JunctionId, SegmentId, StationId, TrainId};
pub use snapshot::{
    NetworkSnapshot, OccupantSnapshot, SegmentSnapshot, SignalSnapshot, TrainSummary,
};

#[cfg(test)]
mod tests {
    //! Binding generation for the renderer.

    #[test]
    fn export_bindings() {
        // ts-rs writes the `.ts` files under `bindings/` relative to the
        // crate root when `export_all` is invoked.
        use ts_rs::TS;

        let _ = crate::ids::TrainId::export_all();
        let _ = crate::ids::SegmentId::export_all();
        let _ = crate::ids::JunctionId::export_all();
        let _ = crate::ids::StationId::export_all();
        let _ = crate::ids::CarriageRef::export_all();

        let _ = crate::enums::Direction::export_all();
        let _ = crate::enums::TrainAction::export_all();
        let _ = crate::enums::SegmentKind::export_all();
        let _ = crate::enums::TrainPhase::export_all();

        let _ = crate::snapshot::NetworkSnapshot::export_all();
        let _ = crate::snapshot::TrainSummary::export_all();
    }
}
