//! Trains, carriages, and per-train movement state for the railsim
//! train simulator.
//!
//! Everything here is owned by a single train's task. Shared track state
//! (queues and signals) lives in `railsim-network`; the per-tick movement
//! engine that ties the two together lives in `railsim-core`.
//!
//! # Modules
//!
//! - [`carriage`] -- Carriages and their track locations
//! - [`config`] -- Train composition and service parameters ([`TrainConfig`])
//! - [`error`] -- Composition and placement errors ([`TrainError`])
//! - [`movement`] -- Movement state and station stop rules ([`TrainMovement`])
//! - [`status`] -- Status text derived from the head carriage's segment
//! - [`stops`] -- Stop lists and the ordered stop queue ([`StopQueue`])
//! - [`train`] -- The train itself ([`Train`])

pub mod carriage;
pub mod config;
pub mod error;
pub mod movement;
pub mod status;
pub mod stops;
pub mod train;

pub use carriage::{Carriage, CarriageLocation};
pub use config::{CarriageGroup, TrainConfig};
pub use error::TrainError;
pub use movement::{StationVisit, TrainMovement, perturbed_dwell};
pub use status::status_text;
pub use stops::{StopQueue, resolve_stops};
pub use train::{CARRIAGE_GAP, Train};
