//! Simulation loop runner with operator controls.
//!
//! This module provides [`run_simulation`], the top-level async function
//! that drives the clock with support for:
//!
//! - **Pause/resume**: the operator can halt and continue the tick loop
//! - **Variable tick speed**: tick interval adjustable at runtime
//! - **End of service**: at the end time every train is told to retire
//! - **Wind-down**: optionally keep ticking until the depot has every train
//!   back, within a tick budget
//! - **Clean shutdown**: the `done` flag unwinds every train task, and the
//!   runner waits for them to return their trains to the depot
//!
//! Trains move on their own tasks; the runner only publishes ticks.

use std::sync::Arc;

use chrono::NaiveTime;
use tracing::{error, info, warn};

use crate::clock::{ClockError, SimulationClock};
use crate::context::{SimulationContext, SimulationEndReason};
use crate::fleet::{Fleet, InvariantViolation};

/// Errors that can occur during the simulation run.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    /// The clock could not advance.
    #[error("clock error: {source}")]
    Clock {
        /// The underlying clock error.
        #[from]
        source: ClockError,
    },

    /// A train broke a movement invariant and the run was stopped.
    #[error("train {} broke a movement invariant: {}", .0.number, .0.message)]
    InvariantViolation(InvariantViolation),
}

/// What the runner saw at one tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickSummary {
    /// The tick just published.
    pub tick: u64,
    /// Simulated time of day.
    pub time: NaiveTime,
    /// Trains on the line.
    pub active_trains: usize,
    /// Trains in the depot.
    pub inactive_trains: usize,
    /// Whether the run is past its end time.
    pub winding_down: bool,
}

/// Result of the simulation run.
#[derive(Debug)]
pub struct SimulationResult {
    /// The reason the simulation ended.
    pub end_reason: SimulationEndReason,
    /// The last tick summary, if any tick was published.
    pub final_summary: Option<TickSummary>,
    /// Total number of ticks published.
    pub total_ticks: u64,
}

/// Callback invoked after each tick is published.
///
/// Implementations can deploy trains on a schedule, log progress, etc.
pub trait TickCallback: Send {
    /// Called after a tick is published.
    fn on_tick(&mut self, summary: &TickSummary, fleet: &Arc<Fleet>);
}

/// A no-op tick callback for testing.
pub struct NoOpCallback;

impl TickCallback for NoOpCallback {
    fn on_tick(&mut self, _summary: &TickSummary, _fleet: &Arc<Fleet>) {}
}

/// Run the simulation until the end time (plus any wind-down) or an
/// operator stop.
///
/// Each loop iteration publishes the clock's tick to the trains, notifies
/// `callback`, sleeps for the current tick interval, and advances the
/// clock. Once the clock passes the end time every train is told to
/// retire. With `wind_down_ticks` at zero the run ends there; otherwise
/// ticks keep coming until the active pool is empty or the budget is
/// spent.
///
/// Before returning, the `done` flag is set and every train task is
/// awaited, so all trains are back in the depot. A broken movement
/// invariant in a debug build requests a stop and fails the run.
///
/// # Errors
///
/// Returns [`RunnerError::Clock`] if the clock overflows, or
/// [`RunnerError::InvariantViolation`] once every train is back in the
/// depot if a train broke a movement invariant (debug builds only).
pub async fn run_simulation(
    clock: &mut SimulationClock,
    ctx: &Arc<SimulationContext>,
    fleet: &Arc<Fleet>,
    wind_down_ticks: u64,
    callback: &mut dyn TickCallback,
) -> Result<SimulationResult, RunnerError> {
    let mut last_summary: Option<TickSummary> = None;
    let mut total_ticks: u64 = 0;
    let mut wind_down: Option<u64> = None;

    info!(
        start = %clock.start_time(),
        end = %clock.end_time(),
        tick_interval_ms = ctx.tick_interval_ms(),
        headway_m = ctx.headway_m(),
        wind_down_ticks,
        "Simulation starting"
    );

    let end_reason = loop {
        // --- Check pause ---
        if ctx.is_paused() {
            info!("Simulation paused, waiting for resume...");
            ctx.wait_if_paused().await;
            info!("Simulation resumed");
        }

        // --- Check stop request ---
        if ctx.is_stop_requested() {
            info!("Operator stop requested");
            break SimulationEndReason::OperatorStop;
        }

        // --- Check end of service ---
        if clock.is_past_end() {
            let remaining = match wind_down {
                Some(remaining) => remaining,
                None if wind_down_ticks == 0 => {
                    info!(time = %clock.time_string(), "End time reached");
                    break SimulationEndReason::EndTimeReached;
                }
                None => {
                    info!(
                        time = %clock.time_string(),
                        active = fleet.active_count(),
                        "End time reached, winding down"
                    );
                    fleet.deactivate_all();
                    wind_down_ticks
                }
            };
            if fleet.active_count() == 0 {
                info!(tick = clock.tick(), "Every train is back in the depot");
                break SimulationEndReason::WindDownComplete;
            }
            if remaining == 0 {
                warn!(
                    active = fleet.active_count(),
                    "Wind-down budget spent with trains still out"
                );
                break SimulationEndReason::WindDownExpired;
            }
            wind_down = Some(remaining.saturating_sub(1));
        }

        // --- Publish tick ---
        ctx.publish_tick(clock.tick());
        total_ticks = total_ticks.saturating_add(1);

        let summary = TickSummary {
            tick: clock.tick(),
            time: clock.time(),
            active_trains: fleet.active_count(),
            inactive_trains: fleet.inactive_count(),
            winding_down: wind_down.is_some(),
        };

        // --- Notify callback ---
        callback.on_tick(&summary, fleet);
        last_summary = Some(summary);

        // --- Sleep for tick interval ---
        let interval_ms = ctx.tick_interval_ms();
        if interval_ms > 0 {
            tokio::time::sleep(tokio::time::Duration::from_millis(interval_ms)).await;
        } else {
            tokio::task::yield_now().await;
        }

        clock.advance()?;
    };

    fleet.deactivate_all();
    ctx.set_end_reason(end_reason).await;
    ctx.mark_done();
    fleet.join_all().await;

    if let Some(violation) = fleet.take_violation() {
        error!(
            number = violation.number,
            message = %violation.message,
            "Run stopped by a broken movement invariant"
        );
        return Err(RunnerError::InvariantViolation(violation));
    }

    Ok(SimulationResult {
        end_reason,
        final_summary: last_summary,
        total_ticks,
    })
}

/// Log the simulation end sequence.
///
/// This should be called after [`run_simulation`] returns.
pub fn log_simulation_end(result: &SimulationResult) {
    info!(
        reason = ?result.end_reason,
        total_ticks = result.total_ticks,
        final_tick = result.final_summary.as_ref().map(|s| s.tick),
        "Simulation ended"
    );

    if let Some(ref summary) = result.final_summary {
        info!(
            tick = summary.tick,
            time = %summary.time,
            active_trains = summary.active_trains,
            inactive_trains = summary.inactive_trains,
            "Final tick summary"
        );
    } else {
        warn!("Simulation ended with no ticks executed");
    }
}
