//! Movement engine: the per-tick decision and the move that follows it.
//!
//! A train's step runs in two phases under the movement lock:
//!
//! 1. **Decide** -- [`decide`] looks at where the head carriage is and what
//!    lies ahead and picks one [`TrainAction`]. It never mutates anything.
//! 2. **Act** -- [`step`] filters the decision through the train's stop
//!    rules and, on `PROCEED`, advances every carriage head first.
//!
//! While advancing, a head carriage that crosses into a new segment must
//! hold the block signal of the junction it crosses. If the signal is
//! taken, the train gives up the movement lock until the signal clears so
//! the train holding it can move on. The tail carriage hands back the
//! signal of every segment it leaves behind.
//!
//! The lookahead uses cruising speed: a train at rest that would overshoot
//! the end of its segment on its next move is treated as about to cross.

use railsim_network::{Network, NetworkError, Occupant, Segment};
use railsim_trains::{Carriage, CarriageLocation, Train, TrainError};
use railsim_types::{SegmentId, TrainAction, TrainId, TrainPhase};
use tracing::{debug, trace, warn};

use crate::context::{MovementPermit, SimulationContext, until_done};
use crate::events::FleetEvent;

/// Errors raised while placing or moving a train.
#[derive(Debug, thiserror::Error)]
pub enum MovementError {
    /// A track or interlocking operation failed.
    #[error("network error: {source}")]
    Network {
        /// The underlying network error.
        #[from]
        source: NetworkError,
    },

    /// The train could not be laid out.
    #[error("train error: {source}")]
    Train {
        /// The underlying train error.
        #[from]
        source: TrainError,
    },

    /// The simulation ended while the train was waiting.
    #[error("train {train} was interrupted by shutdown")]
    Interrupted {
        /// The waiting train.
        train: TrainId,
    },

    /// The train has no carriage on the track.
    #[error("train {train} is not on the track")]
    NotPlaced {
        /// The train.
        train: TrainId,
    },

    /// The train's head is past the rear of the train ahead.
    #[error("train {train} overlaps the train ahead by {overlap:.2} m")]
    NegativeSeparation {
        /// The following train.
        train: TrainId,
        /// How far the head has run past the rear ahead.
        overlap: f64,
    },

    /// The head carriage reached a junction with no way on.
    #[error("train {train} has no route beyond {segment}")]
    RouteEnds {
        /// The train.
        train: TrainId,
        /// The segment the head is leaving.
        segment: SegmentId,
    },

    /// A following carriage could not find the segment its leader took.
    #[error("carriage {index} of train {train} lost the path at {segment}")]
    PathDesync {
        /// The train.
        train: TrainId,
        /// Index of the lost carriage.
        index: u16,
        /// The segment it was leaving.
        segment: SegmentId,
    },
}

impl MovementError {
    /// Whether the error means the track state can no longer be trusted.
    pub const fn is_invariant_violation(&self) -> bool {
        match self {
            Self::Network { source } => source.is_invariant_violation(),
            Self::NegativeSeparation { .. } | Self::RouteEnds { .. } | Self::PathDesync { .. } => {
                true
            }
            Self::Train { .. } | Self::Interrupted { .. } | Self::NotPlaced { .. } => false,
        }
    }

    /// Whether the error is a shutdown interruption.
    pub const fn is_interrupted(&self) -> bool {
        matches!(self, Self::Interrupted { .. })
    }
}

// ---------------------------------------------------------------------------
// Decide
// ---------------------------------------------------------------------------

/// What lies ahead of a head carriage within the headway window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Separation {
    /// Nothing within the window.
    Clear,
    /// The track runs out before the window does.
    TrackEnds,
    /// The rear of another train is this many meters ahead.
    Train(f64),
}

impl Separation {
    /// Whether another train is at or inside `headway` meters.
    pub fn within(self, headway: f64) -> bool {
        matches!(self, Self::Train(gap) if gap <= headway)
    }
}

fn head_location(train: &Train) -> Result<CarriageLocation, MovementError> {
    train
        .head()
        .and_then(|c| c.location)
        .ok_or(MovementError::NotPlaced { train: train.id() })
}

/// Measure the distance from the head carriage to the nearest train ahead.
///
/// A train ahead on the head's own segment is measured directly. Otherwise
/// the walk follows the route the train would take, segment by segment,
/// and stops once the distance covered exceeds `headway`.
pub fn separation(
    network: &Network,
    train: &Train,
    headway: f64,
) -> Result<Separation, MovementError> {
    let head = head_location(train)?;
    let segment = network.segment(head.segment)?;

    let ahead = segment
        .occupancy()
        .ahead_of(train.carriage_ref(0))
        .copied();
    if let Some(ahead) = ahead
        && ahead.carriage.train != train.id()
    {
        return Ok(Separation::Train(ahead.clearance - head.clearance));
    }

    let mut heading = train.movement.heading();
    let mut current = segment;
    let mut covered = segment.length_m() - head.clearance;
    loop {
        if covered > headway {
            return Ok(Separation::Clear);
        }
        let Some(next) = network.route_from(current.to(), heading)? else {
            return Ok(Separation::TrackEnds);
        };
        let next = network.segment(next)?;
        let rear = next.occupancy().rearmost_other(train.id()).copied();
        if let Some(rear) = rear {
            return Ok(Separation::Train(covered + rear.clearance));
        }
        if next.direction().is_mainline() {
            heading.direction = next.direction();
        }
        covered += next.length_m();
        current = next;
    }
}

/// Pick this tick's action for `train` from the track state alone.
///
/// In priority order: a retiring train on depot track stops for good; a
/// head on a platform stops if the next move would overshoot it; a head
/// approaching the end of the line stops likewise; a train within
/// `headway` of the one ahead holds; a head about to cross into a block
/// another train holds waits at the signal. Anything else proceeds.
pub fn decide(network: &Network, train: &Train, headway: f64) -> Result<TrainAction, MovementError> {
    let head = head_location(train)?;
    let segment = network.segment(head.segment)?;
    let movement = &train.movement;
    let overshoots = head.clearance + movement.step_m() > segment.length_m();

    if segment.is_depot() && !movement.active {
        return Ok(TrainAction::DepotStop);
    }

    if segment.station().is_some() {
        return Ok(stop_or_proceed(overshoots, TrainAction::StationStop));
    }

    let to = network.junction(segment.to())?;
    if to.is_end() {
        return Ok(stop_or_proceed(overshoots, TrainAction::EndStop));
    }

    let separation = separation(network, train, headway)?;
    if let Separation::Train(gap) = separation
        && gap < 0.0
    {
        return Err(MovementError::NegativeSeparation {
            train: train.id(),
            overlap: -gap,
        });
    }
    if separation.within(headway) {
        return Ok(TrainAction::HeadwayStop);
    }

    if overshoots && to.signal().is_held_by_other(train.id()) {
        return Ok(TrainAction::SignalStop);
    }
    Ok(TrainAction::Proceed)
}

const fn stop_or_proceed(overshoots: bool, stop: TrainAction) -> TrainAction {
    if overshoots { stop } else { TrainAction::Proceed }
}

// ---------------------------------------------------------------------------
// Act
// ---------------------------------------------------------------------------

/// Run one decide-and-act step for `train` under the movement lock.
///
/// Returns the action taken. `END_STOP` and `STATION_STOP` decisions that
/// the train's stop rules turn down become `PROCEED`.
pub async fn step(
    ctx: &SimulationContext,
    network: &Network,
    train: &mut Train,
) -> Result<TrainAction, MovementError> {
    let mut permit = ctx.lock_movement().await;

    let decided = decide(network, train, ctx.headway_m())?;
    let action = match decided {
        TrainAction::EndStop => {
            if train.movement.take_end_stop() {
                TrainAction::EndStop
            } else {
                TrainAction::Proceed
            }
        }
        TrainAction::StationStop => visit_station(ctx, network, train)?,
        other => other,
    };

    if action == TrainAction::Proceed {
        advance(ctx, network, train, &mut permit).await?;
    } else {
        train.movement.halt();
    }
    train.movement.last_action = Some(action);

    let tick = ctx.current_tick();
    trace!(train = %train.id(), tick, ?decided, ?action, "Step");
    ctx.emit(FleetEvent::Moved {
        train: train.id(),
        tick,
        action,
    });
    Ok(action)
}

fn visit_station(
    ctx: &SimulationContext,
    network: &Network,
    train: &mut Train,
) -> Result<TrainAction, MovementError> {
    let head = head_location(train)?;
    let Some(station) = network.segment(head.segment)?.station() else {
        return Ok(TrainAction::Proceed);
    };

    let visit = train.movement.visit_station(station);
    if visit.first_station {
        debug!(train = %train.id(), %station, "First station reached");
        ctx.emit(FleetEvent::FirstStationPassed {
            train: train.id(),
            station,
        });
    }
    Ok(if visit.stop {
        TrainAction::StationStop
    } else {
        TrainAction::Proceed
    })
}

/// Advance every carriage by one tick at cruising speed, head first.
async fn advance(
    ctx: &SimulationContext,
    network: &Network,
    train: &mut Train,
    permit: &mut MovementPermit<'_>,
) -> Result<(), MovementError> {
    train.movement.accelerate();
    let step = train.movement.step_m();

    for index in 0..train.carriage_count() {
        let carriage = train.carriage_ref(index);
        let from = train
            .carriages()
            .get(usize::from(index))
            .and_then(|c| c.location)
            .ok_or(MovementError::NotPlaced { train: train.id() })?;

        let mut segment = network.segment(from.segment)?;
        let mut clearance = from.clearance + step;
        while clearance >= segment.length_m() {
            clearance -= segment.length_m();
            let next = if index == 0 {
                enter_next(ctx, network, train, segment, permit).await?
            } else {
                follow_path(train, index, segment.id())?
            };
            segment = network.segment(next)?;
        }

        if segment.id() == from.segment {
            segment.occupancy().advance(carriage, clearance)?;
        } else {
            // A refused move must leave the carriage queued where it was.
            let entering = Occupant::new(carriage, clearance);
            let mut queue = segment.occupancy();
            queue.check_admit(entering)?;
            network
                .segment(from.segment)?
                .occupancy()
                .depart_front(carriage)?;
            queue.admit(entering)?;
        }

        if let Some(moved) = train.carriages_mut().get_mut(usize::from(index)) {
            moved.location = Some(CarriageLocation::new(segment.id(), clearance));
        }
    }

    release_vacated(network, train)
}

/// Take the signal guarding the head's next segment and extend the path.
async fn enter_next(
    ctx: &SimulationContext,
    network: &Network,
    train: &mut Train,
    leaving: &Segment,
    permit: &mut MovementPermit<'_>,
) -> Result<SegmentId, MovementError> {
    let id = train.id();
    let next = network
        .next_segment(leaving.id(), train.movement.heading())?
        .ok_or(MovementError::RouteEnds {
            train: id,
            segment: leaving.id(),
        })?;

    let signal = network.signal(leaving.to())?;
    if !signal.try_acquire(id) {
        debug!(train = %id, junction = %leaving.to(), "Waiting for block signal");
        let mut done = ctx.subscribe_done();
        let acquired = permit
            .yield_while(async {
                tokio::select! {
                    result = signal.acquire(id) => Some(result),
                    () = until_done(&mut done) => None,
                }
            })
            .await;
        acquired.ok_or(MovementError::Interrupted { train: id })??;
    }

    train.movement.path.push_back(next);
    let entered = network.segment(next)?;
    if entered.direction().is_mainline() {
        train.movement.actual_direction = entered.direction();
    }
    Ok(next)
}

/// The segment after `current` on the path the head laid down.
fn follow_path(train: &Train, index: u16, current: SegmentId) -> Result<SegmentId, MovementError> {
    let path = &train.movement.path;
    path.iter()
        .position(|&segment| segment == current)
        .and_then(|p| p.checked_add(1))
        .and_then(|p| path.get(p))
        .copied()
        .ok_or(MovementError::PathDesync {
            train: train.id(),
            index,
            segment: current,
        })
}

/// Drop every path segment behind the tail and release its signal.
fn release_vacated(network: &Network, train: &mut Train) -> Result<(), MovementError> {
    let tail = train
        .tail()
        .and_then(Carriage::segment)
        .ok_or(MovementError::NotPlaced { train: train.id() })?;

    while let Some(&rear) = train.movement.path.front()
        && rear != tail
    {
        train.movement.path.pop_front();
        let junction = network.segment(rear)?.from();
        network.signal(junction)?.release(train.id())?;
        trace!(train = %train.id(), %junction, "Released block signal");
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Placement
// ---------------------------------------------------------------------------

/// Put `train` on `segment` with its head `head_clearance` meters in.
///
/// Waits for the signal guarding the segment first; the wait is cut short
/// if the simulation ends. The train must not already be on the track.
pub async fn place(
    ctx: &SimulationContext,
    network: &Network,
    train: &mut Train,
    segment: SegmentId,
    head_clearance: f64,
) -> Result<(), MovementError> {
    let id = train.id();
    let target = network.segment(segment)?;
    let signal = network.signal(target.from())?;

    let mut done = ctx.subscribe_done();
    tokio::select! {
        result = signal.acquire(id) => result?,
        () = until_done(&mut done) => return Err(MovementError::Interrupted { train: id }),
    }

    let _permit = ctx.lock_movement().await;
    if let Err(err) = train.lay_out(segment, head_clearance) {
        signal.release(id)?;
        return Err(err.into());
    }
    train.movement.path.push_back(segment);

    let mut queue = target.occupancy();
    for (index, carriage) in (0_u16..).zip(train.carriages()) {
        queue.admit(Occupant::new(train.carriage_ref(index), carriage.clearance()))?;
    }
    Ok(())
}

/// Take `train` off the track: clear it from every queue and hand back
/// every signal it holds.
///
/// Sweeps the whole network rather than trusting the path, so a train
/// parked after a broken invariant is cleared as well. Carriage locations
/// are left for the caller to reset.
pub async fn pull_out(ctx: &SimulationContext, network: &Network, train: &mut Train) {
    let _permit = ctx.lock_movement().await;
    let id = train.id();

    let removed: usize = network
        .segments()
        .map(|segment| segment.occupancy().remove_train(id))
        .sum();
    for junction in network.signals_held_by(id) {
        if let Err(err) = network.signal(junction).and_then(|signal| signal.release(id)) {
            warn!(train = %id, %junction, error = %err, "Failed to release block signal");
        }
    }
    train.movement.path.clear();
    train.movement.halt();
    train.movement.phase = TrainPhase::AtDepot;
    debug!(train = %id, removed, "Train pulled off the track");
}
