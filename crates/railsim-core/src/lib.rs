//! Simulation clock, movement engine, and train orchestration for the
//! railsim train simulator.
//!
//! The runner publishes one tick per simulated second. Every deployed train
//! runs its own agent task that waits for the tick, takes the movement
//! lock, decides and moves, and dwells at stations and line ends. The fleet
//! hands trains between the depot and their tasks.
//!
//! # Modules
//!
//! - [`agent`] -- Per-train control loop ([`TrainAgent`]) and its shared
//!   [`TrainControl`] handle.
//! - [`clock`] -- Time-of-day clock with an inclusive end time.
//! - [`config`] -- Configuration loading from `railsim-config.yaml` into
//!   strongly-typed structs.
//! - [`context`] -- [`SimulationContext`]: pause gate, ticks, `done` flag,
//!   headway, and the movement lock.
//! - [`engine`] -- The per-tick decision, the move, placement and pull-out.
//! - [`events`] -- [`FleetEvent`] redraw notifications.
//! - [`fleet`] -- [`Fleet`]: inactive and active pools, deploy, retire,
//!   stop edits, snapshots.
//! - [`runner`] -- [`run_simulation`] and its callbacks.
//!
//! [`TrainAgent`]: agent::TrainAgent
//! [`TrainControl`]: agent::TrainControl
//! [`SimulationContext`]: context::SimulationContext
//! [`FleetEvent`]: events::FleetEvent
//! [`Fleet`]: fleet::Fleet
//! [`run_simulation`]: runner::run_simulation

pub mod agent;
pub mod clock;
pub mod config;
pub mod context;
pub mod engine;
pub mod events;
pub mod fleet;
pub mod runner;
