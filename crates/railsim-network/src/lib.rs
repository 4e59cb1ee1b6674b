//! Track network for the railsim train simulator.
//!
//! The network is a directed graph: segments are edges with a length and an
//! occupancy queue, junctions are nodes that file their outgoing segments
//! by [`Direction`](railsim_types::Direction) and own a block signal. It is
//! assembled once through [`NetworkBuilder`] (or [`build_line`] from a
//! YAML layout) and then shared read-only between train tasks.
//!
//! # Modules
//!
//! - [`builder`] -- Incremental construction and topology validation
//! - [`direction_map`] -- Per-direction slots for junctions and stations
//! - [`error`] -- Error types for construction and runtime invariants
//! - [`junction`] -- Graph nodes and their block signals
//! - [`line`] -- Declarative double-track line layouts
//! - [`network`] -- The frozen graph, routing, and inspection
//! - [`occupancy`] -- Ordered per-segment carriage queues
//! - [`segment`] -- Directed lengths of track
//! - [`signal`] -- Fair binary block signals with holder tracking
//! - [`station`] -- Stations, platforms, and the depot

pub mod builder;
pub mod direction_map;
pub mod error;
pub mod junction;
pub mod line;
pub mod network;
pub mod occupancy;
pub mod segment;
pub mod signal;
pub mod station;

pub use builder::NetworkBuilder;
pub use direction_map::DirectionMap;
pub use error::NetworkError;
pub use junction::Junction;
pub use line::{DepotLayout, LineLayout, StationLayout, Terminal, build_line};
pub use network::{Heading, Network};
pub use occupancy::{OccupancyQueue, Occupant};
pub use segment::{Segment, SegmentSpec};
pub use signal::BlockSignal;
pub use station::{Depot, DepotHub, Platform, Station};
