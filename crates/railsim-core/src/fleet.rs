//! The fleet: every train, in the depot or on the line.
//!
//! Trains are built once at setup and live in one of two pools. The
//! inactive pool owns the trains parked in the depot. Deploying a train
//! moves it into a [`TrainAgent`] task and files a [`TrainControl`] handle
//! for it in the active pool; when the task finishes, the train is handed
//! back to the inactive pool, ready for the next deployment.
//!
//! Trains are addressed by fleet number.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use railsim_network::{Network, NetworkError};
use railsim_trains::{Train, TrainConfig, TrainError, resolve_stops};
use railsim_types::{NetworkSnapshot, StationId, TrainId, TrainSummary};
use rand::SeedableRng;
use rand::rngs::SmallRng;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::agent::{TrainAgent, TrainControl};
use crate::context::SimulationContext;
use crate::engine::MovementError;
use crate::events::FleetEvent;

/// Errors raised by fleet operations.
#[derive(Debug, thiserror::Error)]
pub enum FleetError {
    /// No train carries this fleet number.
    #[error("no train numbered {number}")]
    UnknownTrain {
        /// The requested number.
        number: u16,
    },

    /// Two configured trains share a fleet number.
    #[error("fleet number {number} is used twice")]
    DuplicateNumber {
        /// The repeated number.
        number: u16,
    },

    /// The train is already on the line.
    #[error("train {number} is already deployed")]
    AlreadyActive {
        /// The train.
        number: u16,
    },

    /// The train is in the depot.
    #[error("train {number} is not deployed")]
    NotActive {
        /// The train.
        number: u16,
    },

    /// The train is longer than the depot platform it spawns on.
    #[error("train {number} ({length:.1} m) is longer than the depot platform ({platform} m)")]
    DoesNotFit {
        /// The train.
        number: u16,
        /// Its length including coupling gaps.
        length: f64,
        /// Length of the depot platform.
        platform: u32,
    },

    /// A track lookup failed.
    #[error("network error: {source}")]
    Network {
        /// The underlying network error.
        #[from]
        source: NetworkError,
    },

    /// A train could not be built.
    #[error("train error: {source}")]
    Train {
        /// The underlying train error.
        #[from]
        source: TrainError,
    },
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A deployed train as seen from outside its task.
#[derive(Debug)]
struct ActiveTrain {
    id: TrainId,
    control: Arc<TrainControl>,
    task: Option<JoinHandle<()>>,
}

/// A broken movement invariant, reported by the train that hit it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvariantViolation {
    /// Fleet number of the train.
    pub number: u16,
    /// What went wrong.
    pub message: String,
}

/// All trains of a simulation run.
#[derive(Debug)]
pub struct Fleet {
    ctx: Arc<SimulationContext>,
    network: Arc<Network>,
    inactive: Mutex<BTreeMap<u16, Train>>,
    active: Mutex<BTreeMap<u16, ActiveTrain>>,
    violation: Mutex<Option<InvariantViolation>>,
    rng: Mutex<SmallRng>,
}

impl Fleet {
    /// Build every configured train and park it in the depot.
    ///
    /// # Errors
    ///
    /// Returns [`FleetError::DuplicateNumber`] for a repeated fleet number,
    /// [`FleetError::DoesNotFit`] for a train longer than the depot
    /// platform, [`FleetError::Network`] if the line has no depot or a stop
    /// list names an unknown station, or [`FleetError::Train`] for an
    /// invalid composition.
    pub fn new(
        ctx: Arc<SimulationContext>,
        network: Arc<Network>,
        configs: &[TrainConfig],
        seed: u64,
    ) -> Result<Arc<Self>, FleetError> {
        let mut rng = SmallRng::seed_from_u64(seed);
        let platform = network.segment(network.depot()?.platform)?.length();

        let mut inactive = BTreeMap::new();
        for config in configs {
            let number = config.number;
            if inactive.contains_key(&number) {
                return Err(FleetError::DuplicateNumber { number });
            }
            resolve_stops(&network, config.stops.as_deref())?;

            let train = Train::from_config(config.clone(), &mut rng)?;
            let length = train.length_m();
            if length > f64::from(platform) {
                return Err(FleetError::DoesNotFit {
                    number,
                    length,
                    platform,
                });
            }
            inactive.insert(number, train);
        }

        info!(trains = inactive.len(), "Fleet parked in depot");
        Ok(Arc::new(Self {
            ctx,
            network,
            inactive: Mutex::new(inactive),
            active: Mutex::new(BTreeMap::new()),
            violation: Mutex::new(None),
            rng: Mutex::new(rng),
        }))
    }

    /// Move a train from the depot onto the line and start its task.
    ///
    /// `stops` replaces the configured stop list for this deployment.
    ///
    /// # Errors
    ///
    /// Returns [`FleetError::AlreadyActive`] or [`FleetError::UnknownTrain`]
    /// if the train is not in the depot, or [`FleetError::Network`] if the
    /// configured stop list names an unknown station.
    pub fn deploy(
        self: &Arc<Self>,
        number: u16,
        stops: Option<Vec<StationId>>,
    ) -> Result<TrainId, FleetError> {
        let mut train = {
            let mut inactive = lock(&self.inactive);
            let Some(parked) = inactive.get(&number) else {
                return Err(if lock(&self.active).contains_key(&number) {
                    FleetError::AlreadyActive { number }
                } else {
                    FleetError::UnknownTrain { number }
                });
            };
            let stops = match stops {
                Some(stops) => stops,
                None => resolve_stops(&self.network, parked.config().stops.as_deref())?,
            };
            let mut train = inactive
                .remove(&number)
                .ok_or(FleetError::UnknownTrain { number })?;
            train.movement.assign_stops(stops);
            train
        };
        train.movement.active = true;

        let id = train.id();
        let control = Arc::new(TrainControl::new(train.summary(&self.network)));
        let rng = SmallRng::from_rng(&mut *lock(&self.rng));
        let agent = TrainAgent::new(
            Arc::clone(&self.ctx),
            Arc::clone(&self.network),
            train,
            Arc::clone(&control),
            rng,
        );

        let mut active = lock(&self.active);
        let fleet = Arc::clone(self);
        let task = tokio::spawn(async move {
            let (train, violation) = agent.run().await;
            if let Some(err) = violation {
                fleet.report_violation(number, &err);
            }
            fleet.return_to_depot(train);
        });
        active.insert(
            number,
            ActiveTrain {
                id,
                control,
                task: Some(task),
            },
        );
        drop(active);

        info!(number, train = %id, "Train deployed");
        self.ctx.emit(FleetEvent::Deployed { train: id, number });
        Ok(id)
    }

    /// Tell a deployed train to retire. It makes one last station stop,
    /// heads for the depot, and returns to the inactive pool.
    ///
    /// # Errors
    ///
    /// Returns [`FleetError::NotActive`] if the train is not deployed.
    pub fn deactivate(&self, number: u16) -> Result<(), FleetError> {
        let active = lock(&self.active);
        let train = active.get(&number).ok_or(FleetError::NotActive { number })?;
        train.control.deactivate();
        info!(number, "Train told to retire");
        Ok(())
    }

    /// Tell every deployed train to retire.
    pub fn deactivate_all(&self) {
        let active = lock(&self.active);
        for train in active.values() {
            train.control.deactivate();
        }
        info!(trains = active.len(), "All trains told to retire");
    }

    /// Replace a deployed train's stop list at its next end-of-line dwell.
    ///
    /// # Errors
    ///
    /// Returns [`FleetError::Network`] for a station the line lacks, or
    /// [`FleetError::NotActive`] if the train is not deployed.
    pub fn edit_stops(&self, number: u16, stops: Vec<StationId>) -> Result<(), FleetError> {
        for &station in &stops {
            self.network.station(station)?;
        }
        let active = lock(&self.active);
        let train = active.get(&number).ok_or(FleetError::NotActive { number })?;
        train.control.request_stop_edit(stops);
        info!(number, "Stop list edit queued");
        Ok(())
    }

    fn return_to_depot(&self, train: Train) {
        let number = train.number();
        let id = train.id();
        lock(&self.active).remove(&number);
        lock(&self.inactive).insert(number, train);
        info!(number, train = %id, "Train returned to depot");
        self.ctx.emit(FleetEvent::Despawned { train: id, number });
    }

    /// Debug builds stop the run on the first broken invariant. Release
    /// builds keep running with the offending train parked.
    fn report_violation(&self, number: u16, err: &MovementError) {
        if !cfg!(debug_assertions) {
            return;
        }
        let mut violation = lock(&self.violation);
        if violation.is_none() {
            *violation = Some(InvariantViolation {
                number,
                message: err.to_string(),
            });
            self.ctx.request_stop();
        }
    }

    /// The broken invariant that stopped the run, if any.
    pub fn take_violation(&self) -> Option<InvariantViolation> {
        lock(&self.violation).take()
    }

    /// Wait for every train task that has been started to finish.
    ///
    /// Only returns promptly once the run is done or every train has been
    /// told to retire. A train task that panicked re-raises its panic here
    /// once the others are in.
    pub async fn join_all(&self) {
        let tasks: Vec<_> = lock(&self.active)
            .values_mut()
            .filter_map(|train| train.task.take())
            .collect();
        let mut panicked = None;
        for task in tasks {
            match task.await {
                Ok(()) => {}
                Err(err) if err.is_panic() => {
                    error!(error = %err, "Train task panicked");
                    panicked.get_or_insert(err.into_panic());
                }
                Err(err) => warn!(error = %err, "Train task failed"),
            }
        }
        if let Some(payload) = panicked {
            std::panic::resume_unwind(payload);
        }
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// Number of trains on the line.
    pub fn active_count(&self) -> usize {
        lock(&self.active).len()
    }

    /// Number of trains in the depot.
    pub fn inactive_count(&self) -> usize {
        lock(&self.inactive).len()
    }

    /// Whether train `number` is deployed.
    pub fn is_active(&self, number: u16) -> bool {
        lock(&self.active).contains_key(&number)
    }

    /// Fleet numbers of the trains in the depot, ascending.
    pub fn inactive_numbers(&self) -> Vec<u16> {
        lock(&self.inactive).keys().copied().collect()
    }

    /// Identity of deployed train `number`.
    pub fn train_id(&self, number: u16) -> Option<TrainId> {
        lock(&self.active).get(&number).map(|train| train.id)
    }

    /// Latest published summary of train `number`, deployed or not.
    pub fn summary(&self, number: u16) -> Option<TrainSummary> {
        if let Some(train) = lock(&self.active).get(&number) {
            return Some(train.control.summary());
        }
        lock(&self.inactive)
            .get(&number)
            .map(|train| train.summary(&self.network))
    }

    /// Summaries of the deployed trains, by fleet number.
    pub fn active_summaries(&self) -> Vec<TrainSummary> {
        lock(&self.active)
            .values()
            .map(|train| train.control.summary())
            .collect()
    }

    /// Capture occupancy, signals, and deployed trains in one consistent
    /// picture. Waits for the movement lock so no train is mid-step.
    pub async fn snapshot(&self, tick: u64, time: String) -> NetworkSnapshot {
        let _permit = self.ctx.lock_movement().await;
        NetworkSnapshot {
            tick,
            time,
            segments: self.network.segment_snapshots(),
            signals: self.network.signal_snapshots(),
            trains: self.active_summaries(),
        }
    }
}
