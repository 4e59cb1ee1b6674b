//! Train agents: one task per train on the line.
//!
//! An agent owns its [`Train`] from deployment until it is back in the
//! depot. Its control loop, one step per published tick:
//!
//! ```text
//! AT_DEPOT --place--> MOVING --STATION_STOP--> dwell --> MOVING
//!                       |  \---END_STOP------> dwell, reverse --> MOVING
//!                       \--DEPOT_STOP (retiring)--> AT_DEPOT
//! ```
//!
//! The fleet talks to a running agent only through its [`TrainControl`]:
//! deactivation and stop-list edits go in, the published [`TrainSummary`]
//! comes out. Requests are absorbed at the start of each tick and after
//! each dwell.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use railsim_network::Network;
use railsim_trains::{StopQueue, Train, TrainMovement};
use railsim_types::{Direction, StationId, TrainAction, TrainPhase, TrainSummary};
use rand::rngs::SmallRng;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::context::{SimulationContext, until_done};
use crate::engine::{self, MovementError};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// The shared handle between the fleet and a running train.
#[derive(Debug)]
pub struct TrainControl {
    deactivate: AtomicBool,
    stop_edit: Mutex<Option<Vec<StationId>>>,
    summary: Mutex<TrainSummary>,
}

impl TrainControl {
    /// A handle publishing `summary` until the agent first reports.
    pub fn new(summary: TrainSummary) -> Self {
        Self {
            deactivate: AtomicBool::new(false),
            stop_edit: Mutex::new(None),
            summary: Mutex::new(summary),
        }
    }

    /// Tell the train to retire.
    pub fn deactivate(&self) {
        self.deactivate.store(true, Ordering::Release);
    }

    /// Whether the train has been told to retire.
    pub fn is_deactivated(&self) -> bool {
        self.deactivate.load(Ordering::Acquire)
    }

    /// Queue a replacement stop list, replacing any earlier unabsorbed one.
    pub fn request_stop_edit(&self, stops: Vec<StationId>) {
        *lock(&self.stop_edit) = Some(stops);
    }

    fn take_stop_edit(&self) -> Option<Vec<StationId>> {
        lock(&self.stop_edit).take()
    }

    /// The latest published summary.
    pub fn summary(&self) -> TrainSummary {
        lock(&self.summary).clone()
    }

    fn publish(&self, summary: TrainSummary) {
        *lock(&self.summary) = summary;
    }
}

/// A train's control loop.
#[derive(Debug)]
pub struct TrainAgent {
    ctx: Arc<SimulationContext>,
    network: Arc<Network>,
    train: Train,
    control: Arc<TrainControl>,
    rng: SmallRng,
    ticks: watch::Receiver<u64>,
    done: watch::Receiver<bool>,
}

impl TrainAgent {
    /// Prepare an agent for a train that has been marked active and given
    /// its stop list.
    pub fn new(
        ctx: Arc<SimulationContext>,
        network: Arc<Network>,
        train: Train,
        control: Arc<TrainControl>,
        rng: SmallRng,
    ) -> Self {
        let ticks = ctx.subscribe_ticks();
        let done = ctx.subscribe_done();
        Self {
            ctx,
            network,
            train,
            control,
            rng,
            ticks,
            done,
        }
    }

    /// Run until the train is back in the depot or the simulation ends, and
    /// hand the train back off the track with fresh movement state.
    ///
    /// A broken movement invariant comes back alongside the train. Debug
    /// builds return it at once; release builds park the train where it
    /// stands until the run is over.
    pub async fn run(mut self) -> (Train, Option<MovementError>) {
        let violation = match self.drive().await {
            Ok(()) => {
                info!(number = self.train.number(), "Train arrived at depot");
                None
            }
            Err(err) if err.is_interrupted() => {
                debug!(number = self.train.number(), "Train unwound at shutdown");
                None
            }
            Err(err) if err.is_invariant_violation() => {
                error!(
                    number = self.train.number(),
                    error = %err,
                    "Movement invariant violated"
                );
                if !cfg!(debug_assertions) {
                    self.park().await;
                }
                Some(err)
            }
            Err(err) => {
                error!(number = self.train.number(), error = %err, "Train stopped");
                None
            }
        };

        engine::pull_out(&self.ctx, &self.network, &mut self.train).await;
        self.train.reset(&mut self.rng);
        self.publish();
        (self.train, violation)
    }

    async fn drive(&mut self) -> Result<(), MovementError> {
        self.deploy().await?;
        loop {
            self.wait_ticks(1).await?;
            self.absorb_control();
            let action = engine::step(&self.ctx, &self.network, &mut self.train).await?;
            self.publish();

            match action {
                TrainAction::Proceed | TrainAction::HeadwayStop | TrainAction::SignalStop => {}
                TrainAction::StationStop => self.station_dwell().await?,
                TrainAction::EndStop => self.end_dwell().await?,
                TrainAction::DepotStop => return Ok(()),
            }
        }
    }

    /// Place the train on the depot platform and lay out its first run.
    async fn deploy(&mut self) -> Result<(), MovementError> {
        let depot = *self.network.depot()?;
        let length = self.network.segment(depot.platform)?.length_m();
        engine::place(&self.ctx, &self.network, &mut self.train, depot.platform, length).await?;

        let direction = self.network.departure_direction()?;
        let movement = &mut self.train.movement;
        movement.depart(direction);
        movement.stops = StopQueue::generate(&self.network, movement.stop_list(), direction);
        movement.phase = TrainPhase::Moving;

        info!(
            number = self.train.number(),
            %direction,
            next_stop = ?self.next_stop_name(),
            "Train placed on depot platform"
        );
        self.publish();
        Ok(())
    }

    async fn station_dwell(&mut self) -> Result<(), MovementError> {
        self.train.movement.phase = TrainPhase::StationDwell;
        self.publish();
        self.wait_ticks(u64::from(self.train.movement.dwell_ticks()))
            .await?;
        self.absorb_control();

        let movement = &mut self.train.movement;
        if !movement.active {
            movement.mark_disembarked();
            movement.stops.clear();
        }
        if let Some(next) = movement.stops.next()
            && movement.previous_stopped() == Some(next)
        {
            movement.stops.pop();
        }
        if !movement.homebound && movement.stops.is_empty() {
            let direction = movement.desired_direction.opposite();
            regenerate(&self.network, movement, direction);
        }
        movement.phase = TrainPhase::Moving;

        debug!(
            number = self.train.number(),
            next_stop = ?self.next_stop_name(),
            "Station dwell complete"
        );
        self.publish();
        Ok(())
    }

    async fn end_dwell(&mut self) -> Result<(), MovementError> {
        self.train.movement.phase = TrainPhase::EndDwell;
        self.publish();
        self.wait_ticks(u64::from(self.train.movement.end_dwell_ticks()))
            .await?;
        self.absorb_control();

        let movement = &mut self.train.movement;
        if !movement.active {
            movement.stops.clear();
            movement.homebound = true;
        } else if let Some(stops) = movement.take_stop_edit() {
            movement.assign_stops(stops);
            let direction = movement.actual_direction.opposite();
            regenerate(&self.network, movement, direction);
        }
        movement.reverse();
        if !movement.homebound && movement.stops.is_empty() {
            let direction = movement.actual_direction;
            regenerate(&self.network, movement, direction);
        }
        movement.phase = TrainPhase::Moving;

        debug!(
            number = self.train.number(),
            direction = %self.train.movement.actual_direction,
            homebound = self.train.movement.homebound,
            next_stop = ?self.next_stop_name(),
            "Reversed at end of line"
        );
        self.publish();
        Ok(())
    }

    /// Stop moving for good after a broken invariant.
    async fn park(&mut self) {
        warn!(number = self.train.number(), "Train parked until shutdown");
        self.train.movement.halt();
        self.train.movement.phase = TrainPhase::Disabled;
        self.publish();
        until_done(&mut self.done).await;
    }

    /// Wait until `count` more ticks have been published.
    async fn wait_ticks(&mut self, count: u64) -> Result<(), MovementError> {
        let interrupted = MovementError::Interrupted {
            train: self.train.id(),
        };
        let target = self.ticks.borrow_and_update().saturating_add(count);
        loop {
            let current = *self.ticks.borrow_and_update();
            if current >= target {
                break;
            }
            tokio::select! {
                changed = self.ticks.changed() => {
                    if changed.is_err() {
                        return Err(interrupted);
                    }
                }
                () = until_done(&mut self.done) => return Err(interrupted),
            }
        }
        if self.ctx.is_done() {
            return Err(interrupted);
        }
        Ok(())
    }

    fn absorb_control(&mut self) {
        let movement = &mut self.train.movement;
        if movement.active && self.control.is_deactivated() {
            movement.active = false;
            info!(number = self.train.number(), "Train retiring");
        }
        if let Some(stops) = self.control.take_stop_edit() {
            self.train.movement.request_stop_edit(stops);
        }
    }

    fn next_stop_name(&self) -> Option<&str> {
        self.train
            .movement
            .stops
            .next()
            .and_then(|id| self.network.station(id).ok())
            .map(|station| station.name.as_str())
    }

    fn publish(&self) {
        self.control.publish(self.train.summary(&self.network));
    }
}

/// Lay the stop queue out for `direction` and make it the desired one.
fn regenerate(network: &Network, movement: &mut TrainMovement, direction: Direction) {
    movement.stops = StopQueue::generate(network, movement.stop_list(), direction);
    movement.desired_direction = direction;
}
