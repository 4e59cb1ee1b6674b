//! Error types for the railsim-trains crate.
//!
//! Composition errors are raised while building a train from its
//! configuration and are fatal at setup. Placement errors are raised when a
//! train is put onto the depot platform.

use railsim_network::NetworkError;
use railsim_types::{SegmentId, TrainId};

/// Errors that can occur while composing, placing, or resetting a train.
#[derive(Debug, thiserror::Error)]
pub enum TrainError {
    /// The train configuration lists no carriages.
    #[error("train {number} has no carriages")]
    NoCarriages {
        /// Fleet number of the train.
        number: u16,
    },

    /// A carriage group has a non-positive or non-finite length.
    #[error("carriage class {class_name:?} has invalid length {length}")]
    InvalidCarriageLength {
        /// The carriage class.
        class_name: String,
        /// The configured length in meters.
        length: f64,
    },

    /// A train has more carriages than carriage indexes can address.
    #[error("train {number} has too many carriages")]
    TooManyCarriages {
        /// Fleet number of the train.
        number: u16,
    },

    /// The configured maximum velocity is not a positive speed.
    #[error("train {number} has invalid maximum velocity {velocity_kmh} km/h")]
    InvalidVelocity {
        /// Fleet number of the train.
        number: u16,
        /// The configured velocity.
        velocity_kmh: f64,
    },

    /// The train would hang off the start of the segment it is placed on.
    #[error("train {train} ({length:.1} m) does not fit on {segment} ({available:.1} m)")]
    DoesNotFit {
        /// The train being placed.
        train: TrainId,
        /// Distance from the head's front to the tail's front.
        length: f64,
        /// The segment it was placed on.
        segment: SegmentId,
        /// Head clearance the train was placed at.
        available: f64,
    },

    /// A stop list names a station the line does not have.
    #[error("network error: {source}")]
    Network {
        /// The underlying network error.
        #[from]
        source: NetworkError,
    },
}
