//! Simulation binary for railsim.
//!
//! Wires the line, the fleet, and the deployment timetable to the tick
//! loop, then runs one service day.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `railsim-config.yaml` (or the path given as
//!    the first argument)
//! 2. Initialize structured logging (tracing)
//! 3. Build the line
//! 4. Create the simulation context and clock
//! 5. Park the fleet in the depot
//! 6. Start the event listener and the Ctrl-C handler
//! 7. Run the simulation loop with the deployment schedule
//! 8. Log the result

mod error;
mod schedule;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use railsim_core::clock::SimulationClock;
use railsim_core::config::{LoggingConfig, SimulationConfig};
use railsim_core::context::SimulationContext;
use railsim_core::fleet::Fleet;
use railsim_core::runner;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use crate::error::EngineError;
use crate::schedule::DeploymentSchedule;

const DEFAULT_CONFIG_PATH: &str = "railsim-config.yaml";

/// Application entry point.
///
/// # Errors
///
/// Returns an error if any initialization step or the simulation itself fails.
#[tokio::main]
async fn main() -> Result<(), EngineError> {
    // 1. Load configuration.
    let config_path = std::env::args_os()
        .nth(1)
        .map_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from);
    let (config, from_file) = load_config(&config_path)?;

    // 2. Initialize structured logging.
    init_logging(&config.logging);
    info!("railsim-engine starting");
    if from_file {
        info!(path = %config_path.display(), "Configuration loaded");
    } else {
        info!(path = %config_path.display(), "Config file not found, using defaults");
    }

    // 3. Build the line.
    let network = Arc::new(railsim_network::build_line(&config.line)?);
    info!(
        line = network.name(),
        stations = network.stations().len(),
        "Line ready"
    );

    // 4. Create context and clock.
    let ctx = Arc::new(SimulationContext::new(&config.clock));
    let mut clock = SimulationClock::new(&config.clock)?;
    info!(
        start = %clock.start_time(),
        end = %clock.end_time(),
        ticks = clock.remaining_ticks(),
        "Clock initialized"
    );

    // 5. Park the fleet.
    let fleet = Fleet::new(
        Arc::clone(&ctx),
        Arc::clone(&network),
        &config.trains,
        config.clock.seed,
    )?;
    let mut schedule = DeploymentSchedule::from_trains(&config.trains);
    info!(
        trains = fleet.inactive_count(),
        scheduled = schedule.pending(),
        first_departure = ?schedule.next_departure(),
        "Fleet parked"
    );

    // 6. Listen for fleet events and operator interrupts.
    spawn_event_listener(&ctx);
    {
        let ctx = Arc::clone(&ctx);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Interrupt received, stopping");
                ctx.request_stop();
            }
        });
    }

    // 7. Run the simulation.
    let result = runner::run_simulation(
        &mut clock,
        &ctx,
        &fleet,
        config.clock.wind_down_ticks,
        &mut schedule,
    )
    .await?;

    // 8. Log results.
    runner::log_simulation_end(&result);
    info!(
        end_reason = ?result.end_reason,
        total_ticks = result.total_ticks,
        "railsim-engine shutdown complete"
    );

    Ok(())
}

/// Load the simulation configuration, falling back to the defaults when
/// the file does not exist. The flag reports whether the file was read.
fn load_config(path: &Path) -> Result<(SimulationConfig, bool), EngineError> {
    if path.exists() {
        Ok((SimulationConfig::from_file(path)?, true))
    } else {
        Ok((SimulationConfig::default(), false))
    }
}

/// `RUST_LOG` wins over the configured level.
fn init_logging(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(logging.level.as_str()));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);
    if logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Log fleet events at debug level until the run ends.
fn spawn_event_listener(ctx: &SimulationContext) {
    let mut events = ctx.subscribe_events();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => debug!(?event, "Fleet event"),
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "Event listener lagging"),
                Err(RecvError::Closed) => break,
            }
        }
    });
}
