//! Per-train movement state and the stop rules that depend only on it.
//!
//! [`TrainMovement`] is owned by the train's task. It records where the
//! train is heading, what it has already served, and which segments it
//! currently spans. The movement engine in `railsim-core` reads and updates
//! it every tick; the stop-filtering rules live here because they need no
//! track state beyond the station being approached.

use std::collections::VecDeque;

use railsim_network::Heading;
use railsim_types::{Direction, SegmentId, StationId, TrainAction, TrainPhase};
use rand::Rng;

use crate::config::TrainConfig;
use crate::stops::StopQueue;

/// Kilometres per hour to metres per tick (one tick is one second).
const KMH_TO_MPS: f64 = 3.6;

/// Draw a station dwell: `base` shifted up or down by less than half of it.
pub fn perturbed_dwell<R: Rng + ?Sized>(base: u32, rng: &mut R) -> u32 {
    let spread = base / 2;
    if spread == 0 {
        return base;
    }
    let offset = rng.random_range(0..spread);
    if rng.random_bool(0.5) {
        base.saturating_add(offset)
    } else {
        base.saturating_sub(offset)
    }
}

/// Outcome of approaching a station platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StationVisit {
    /// Whether the train stops here.
    pub stop: bool,
    /// Whether this is the first station the train has reached since it
    /// left the depot.
    pub first_station: bool,
}

/// Mutable movement state of one train.
#[derive(Debug, Clone)]
pub struct TrainMovement {
    max_velocity_kmh: f64,
    deceleration: f64,
    velocity_kmh: f64,

    /// Direction the stop queue is laid out for.
    pub desired_direction: Direction,
    /// Direction the train is actually travelling.
    pub actual_direction: Direction,
    /// Set once a retiring train has let its passengers off, or has
    /// reached the end of the line. A homebound train takes the depot spur
    /// at the first junction that offers one.
    pub homebound: bool,
    /// Cleared when the train is told to retire.
    pub active: bool,

    stop_list: Vec<StationId>,
    /// Upcoming stops in travel order.
    pub stops: StopQueue,
    pending_stops: Option<Vec<StationId>>,

    dwell_ticks: u32,
    end_dwell_ticks: u32,

    previous_stopped: Option<StationId>,
    previous_passed: Option<StationId>,
    waited_at_end: bool,
    disembarked: bool,

    /// Segments the train spans, tail first. The train holds the signal of
    /// each segment's upstream junction.
    pub path: VecDeque<SegmentId>,
    /// Where the train is in its control loop.
    pub phase: TrainPhase,
    /// The last action the movement engine produced.
    pub last_action: Option<TrainAction>,
}

impl TrainMovement {
    /// Fresh movement state for a train in the depot.
    pub fn new<R: Rng + ?Sized>(config: &TrainConfig, rng: &mut R) -> Self {
        Self {
            max_velocity_kmh: config.max_velocity_kmh,
            deceleration: config.deceleration,
            velocity_kmh: 0.0,
            desired_direction: Direction::DepotOut,
            actual_direction: Direction::DepotOut,
            homebound: false,
            active: false,
            stop_list: Vec::new(),
            stops: StopQueue::new(),
            pending_stops: None,
            dwell_ticks: perturbed_dwell(config.dwell_ticks, rng),
            end_dwell_ticks: config.end_dwell_ticks,
            previous_stopped: None,
            previous_passed: None,
            waited_at_end: false,
            disembarked: false,
            path: VecDeque::new(),
            phase: TrainPhase::AtDepot,
            last_action: None,
        }
    }

    // -----------------------------------------------------------------------
    // Speed
    // -----------------------------------------------------------------------

    /// Cruising speed in km/h.
    pub const fn max_velocity_kmh(&self) -> f64 {
        self.max_velocity_kmh
    }

    /// Current speed in km/h.
    pub const fn velocity_kmh(&self) -> f64 {
        self.velocity_kmh
    }

    /// Configured braking rate in m/s^2.
    pub const fn deceleration(&self) -> f64 {
        self.deceleration
    }

    /// Distance covered in one tick at cruising speed.
    pub fn step_m(&self) -> f64 {
        self.max_velocity_kmh / KMH_TO_MPS
    }

    /// Snap to cruising speed.
    pub const fn accelerate(&mut self) {
        self.velocity_kmh = self.max_velocity_kmh;
    }

    /// Stop dead.
    pub const fn halt(&mut self) {
        self.velocity_kmh = 0.0;
    }

    // -----------------------------------------------------------------------
    // Routing
    // -----------------------------------------------------------------------

    /// The heading used to pick the next segment.
    pub const fn heading(&self) -> Heading {
        Heading {
            direction: self.actual_direction,
            homebound: self.homebound,
        }
    }

    /// Set both directions for a train leaving the depot.
    pub const fn depart(&mut self, direction: Direction) {
        self.desired_direction = direction;
        self.actual_direction = direction;
    }

    /// Reverse the direction of travel at the end of the line.
    pub const fn reverse(&mut self) {
        self.actual_direction = self.actual_direction.opposite();
    }

    // -----------------------------------------------------------------------
    // Stops
    // -----------------------------------------------------------------------

    /// Stations the train is assigned to serve.
    pub fn stop_list(&self) -> &[StationId] {
        &self.stop_list
    }

    /// Replace the assigned stations immediately.
    pub fn assign_stops(&mut self, stops: Vec<StationId>) {
        self.stop_list = stops;
    }

    /// Queue a stop-list edit, applied at the next end-of-line dwell.
    pub fn request_stop_edit(&mut self, stops: Vec<StationId>) {
        self.pending_stops = Some(stops);
    }

    /// Take the queued stop-list edit, if any.
    pub const fn take_stop_edit(&mut self) -> Option<Vec<StationId>> {
        self.pending_stops.take()
    }

    /// Whether a stop-list edit is waiting.
    pub const fn has_stop_edit(&self) -> bool {
        self.pending_stops.is_some()
    }

    /// Dwell at a station, in ticks.
    pub const fn dwell_ticks(&self) -> u32 {
        self.dwell_ticks
    }

    /// Dwell at the end of the line, in ticks.
    pub const fn end_dwell_ticks(&self) -> u32 {
        self.end_dwell_ticks
    }

    /// Whether the train has finished its last passenger stop while
    /// retiring.
    pub const fn disembarked(&self) -> bool {
        self.disembarked
    }

    /// Mark the retiring train's passengers as off. The train heads for
    /// the depot from here.
    pub const fn mark_disembarked(&mut self) {
        self.disembarked = true;
        self.homebound = true;
    }

    /// The last station the train stopped at.
    pub const fn previous_stopped(&self) -> Option<StationId> {
        self.previous_stopped
    }

    /// The last station the train passed or stopped at.
    pub const fn previous_passed(&self) -> Option<StationId> {
        self.previous_passed
    }

    /// Decide whether an approach to the end of the line becomes a stop.
    ///
    /// Each visit to a loop stops once; the flag is cleared again at the
    /// next station reached, stop or not.
    pub const fn take_end_stop(&mut self) -> bool {
        if self.waited_at_end {
            false
        } else {
            self.waited_at_end = true;
            true
        }
    }

    /// Apply the station rules to an approach to `station`'s platform.
    ///
    /// An active train stops at stations on its stop list. A retiring train
    /// makes one last stop at the next station it reaches, unless it has
    /// just turned round at the station it already emptied at. A station
    /// served before a reversal is served again on the opposite platform.
    pub fn visit_station(&mut self, station: StationId) -> StationVisit {
        let first_station = self.previous_passed.is_none();
        let mut stop = false;

        if self.active || (self.previous_passed != Some(station) && !self.disembarked) {
            if !self.active {
                self.mark_disembarked();
            }
            let wanted = !self.active || self.stop_list.contains(&station);
            if wanted && (self.waited_at_end || self.previous_stopped != Some(station)) {
                self.previous_stopped = Some(station);
                stop = true;
            }
        } else if !self.active {
            self.mark_disembarked();
        }

        self.previous_passed = Some(station);
        self.waited_at_end = false;
        StationVisit {
            stop,
            first_station,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    use super::*;

    fn movement(stops: &[u32]) -> TrainMovement {
        let mut rng = SmallRng::seed_from_u64(7);
        let mut movement = TrainMovement::new(&TrainConfig::new(1), &mut rng);
        movement.active = true;
        movement.assign_stops(stops.iter().map(|&i| StationId(i)).collect());
        movement
    }

    #[test]
    fn dwell_stays_within_half_of_base() {
        let mut rng = SmallRng::seed_from_u64(42);
        for _ in 0..200 {
            let dwell = perturbed_dwell(30, &mut rng);
            assert!((16..=44).contains(&dwell), "dwell {dwell} out of range");
        }
        assert_eq!(perturbed_dwell(1, &mut rng), 1);
        assert_eq!(perturbed_dwell(0, &mut rng), 0);
    }

    #[test]
    fn step_is_max_velocity_in_meters_per_second() {
        let mut movement = movement(&[]);
        movement.max_velocity_kmh = 36.0;
        assert!((movement.step_m() - 10.0).abs() < 1e-9);
        movement.accelerate();
        assert!((movement.velocity_kmh() - 36.0).abs() < 1e-9);
        movement.halt();
        assert!(movement.velocity_kmh().abs() < 1e-9);
    }

    #[test]
    fn active_train_stops_only_at_listed_stations() {
        let mut movement = movement(&[1]);
        let first = movement.visit_station(StationId(0));
        assert!(!first.stop);
        assert!(first.first_station);

        let second = movement.visit_station(StationId(1));
        assert!(second.stop);
        assert!(!second.first_station);
        assert_eq!(movement.previous_stopped(), Some(StationId(1)));
    }

    #[test]
    fn stop_does_not_retrigger_after_dwell() {
        let mut movement = movement(&[1]);
        assert!(movement.visit_station(StationId(1)).stop);
        assert!(!movement.visit_station(StationId(1)).stop);
    }

    #[test]
    fn terminal_is_served_again_after_reversal() {
        let mut movement = movement(&[1]);
        assert!(movement.visit_station(StationId(1)).stop);
        assert!(movement.take_end_stop());
        assert!(!movement.take_end_stop());
        movement.reverse();
        // Opposite platform of the same station.
        assert!(movement.visit_station(StationId(1)).stop);
        // The end flag is reset by the station stop.
        assert!(movement.take_end_stop());
    }

    #[test]
    fn passing_a_station_rearms_the_end_stop() {
        let mut movement = movement(&[]);
        assert!(movement.take_end_stop());
        movement.reverse();
        assert!(!movement.visit_station(StationId(0)).stop);
        assert!(!movement.visit_station(StationId(1)).stop);
        assert!(movement.take_end_stop());
    }

    #[test]
    fn retiring_train_stops_once_more() {
        let mut movement = movement(&[]);
        movement.visit_station(StationId(0));
        movement.active = false;

        assert!(!movement.homebound);

        let last = movement.visit_station(StationId(1));
        assert!(last.stop);
        assert!(movement.disembarked());
        assert!(movement.homebound);

        assert!(!movement.visit_station(StationId(2)).stop);
    }

    #[test]
    fn retiring_train_skips_the_station_it_just_left() {
        let mut movement = movement(&[0]);
        assert!(movement.visit_station(StationId(0)).stop);
        movement.active = false;
        // Still on the same platform after the dwell: no second stop, and
        // the passengers count as off.
        assert!(!movement.visit_station(StationId(0)).stop);
        assert!(movement.disembarked());
        assert!(movement.homebound);
        assert!(!movement.visit_station(StationId(1)).stop);
    }

    #[test]
    fn stop_edits_wait_until_taken() {
        let mut movement = movement(&[0]);
        movement.request_stop_edit(vec![StationId(3)]);
        assert!(movement.has_stop_edit());
        assert_eq!(movement.stop_list(), &[StationId(0)]);
        let edit = movement.take_stop_edit().unwrap();
        movement.assign_stops(edit);
        assert_eq!(movement.stop_list(), &[StationId(3)]);
        assert!(!movement.has_stop_edit());
    }

    #[test]
    fn heading_tracks_direction_and_homebound() {
        let mut movement = movement(&[]);
        movement.depart(Direction::Southbound);
        assert_eq!(movement.heading(), Heading::new(Direction::Southbound));
        movement.reverse();
        movement.homebound = true;
        assert_eq!(
            movement.heading(),
            Heading::new(Direction::Northbound).homebound()
        );
    }
}
