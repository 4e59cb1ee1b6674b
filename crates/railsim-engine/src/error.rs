//! Error types for the simulation binary.
//!
//! [`EngineError`] is the top-level error type that wraps all possible
//! failure modes during startup and the simulation run.

/// Top-level error for the simulation binary.
///
/// Each variant wraps a specific subsystem error, providing a single
/// error type that `main` can propagate with `?`.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: railsim_core::config::ConfigError,
    },

    /// The line layout does not describe a valid network.
    #[error("network error: {source}")]
    Network {
        /// The underlying network error.
        #[from]
        source: railsim_network::NetworkError,
    },

    /// Clock initialization failed.
    #[error("clock error: {source}")]
    Clock {
        /// The underlying clock error.
        #[from]
        source: railsim_core::clock::ClockError,
    },

    /// The fleet could not be assembled.
    #[error("fleet error: {source}")]
    Fleet {
        /// The underlying fleet error.
        #[from]
        source: railsim_core::fleet::FleetError,
    },

    /// Simulation runner failed.
    #[error("runner error: {source}")]
    Runner {
        /// The underlying runner error.
        #[from]
        source: railsim_core::runner::RunnerError,
    },
}
