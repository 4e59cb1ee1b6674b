//! Shared simulation control state.
//!
//! Everything that is global to a run lives in one [`SimulationContext`]
//! shared by reference between the runner, the fleet, and every train task:
//!
//! - the play/pause gate and stop request the operator drives,
//! - the tick counter trains wait on,
//! - the `done` flag every wait is interruptible by,
//! - the runtime-adjustable tick sleep and headway distance,
//! - the movement lock that serializes decide-and-move across trains,
//! - the broadcast channel for [`FleetEvent`]s.
//!
//! Flags the runner reads on every tick are atomics so they never wait on a
//! lock.

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, MutexGuard, Notify, broadcast, watch};

use crate::config::ClockConfig;
use crate::events::FleetEvent;

/// Buffered events per subscriber before the oldest are dropped.
const EVENT_CAPACITY: usize = 1024;

/// Reason why the simulation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SimulationEndReason {
    /// The clock passed the configured end time.
    EndTimeReached,
    /// Every train made it back to the depot during wind-down.
    WindDownComplete,
    /// The wind-down budget ran out with trains still on the line.
    WindDownExpired,
    /// An operator issued a stop command.
    OperatorStop,
}

/// Shared control state for one simulation run.
#[derive(Debug)]
pub struct SimulationContext {
    /// Whether the simulation is currently paused.
    paused: AtomicBool,

    /// Notification used to wake the runner when resumed.
    resume_notify: Notify,

    /// Whether a stop has been requested.
    stop_requested: AtomicBool,

    /// Current tick interval in milliseconds (runtime-adjustable).
    tick_interval_ms: AtomicU64,

    /// Current headway distance in meters (runtime-adjustable).
    headway_m: AtomicU32,

    /// Latest published tick.
    ticks: watch::Sender<u64>,

    /// Set once when the run is over.
    done: watch::Sender<bool>,

    /// Serializes decide-and-move across trains. Fair: waiters are served
    /// in arrival order.
    movement: Mutex<()>,

    /// Redraw notifications.
    events: broadcast::Sender<FleetEvent>,

    /// Reason the simulation ended, if it has.
    end_reason: Mutex<Option<SimulationEndReason>>,
}

impl SimulationContext {
    /// Create a running, unpaused context from clock configuration.
    pub fn new(config: &ClockConfig) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            paused: AtomicBool::new(false),
            resume_notify: Notify::new(),
            stop_requested: AtomicBool::new(false),
            tick_interval_ms: AtomicU64::new(config.tick_interval_ms),
            headway_m: AtomicU32::new(config.headway_m),
            ticks: watch::Sender::new(0),
            done: watch::Sender::new(false),
            movement: Mutex::new(()),
            events,
            end_reason: Mutex::new(None),
        }
    }

    // -----------------------------------------------------------------------
    // Pause / Resume
    // -----------------------------------------------------------------------

    /// Check whether the simulation is paused.
    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Acquire)
    }

    /// Pause the simulation. The runner stops publishing ticks until resumed.
    pub fn pause(&self) {
        self.paused.store(true, Ordering::Release);
    }

    /// Resume the simulation and wake the runner.
    pub fn resume(&self) {
        self.paused.store(false, Ordering::Release);
        self.resume_notify.notify_one();
    }

    /// Wait until the simulation is no longer paused.
    pub async fn wait_if_paused(&self) {
        while self.paused.load(Ordering::Acquire) {
            self.resume_notify.notified().await;
        }
    }

    // -----------------------------------------------------------------------
    // Stop / Done
    // -----------------------------------------------------------------------

    /// Request a clean simulation stop.
    pub fn request_stop(&self) {
        self.stop_requested.store(true, Ordering::Release);
    }

    /// Check whether a stop has been requested.
    pub fn is_stop_requested(&self) -> bool {
        self.stop_requested.load(Ordering::Acquire)
    }

    /// Flag the run as over. Every train task unwinds at its next wait.
    pub fn mark_done(&self) {
        self.done.send_replace(true);
    }

    /// Whether the run is over.
    pub fn is_done(&self) -> bool {
        *self.done.borrow()
    }

    /// A receiver that observes the `done` flag.
    pub fn subscribe_done(&self) -> watch::Receiver<bool> {
        self.done.subscribe()
    }

    /// Record the reason the simulation ended.
    pub async fn set_end_reason(&self, reason: SimulationEndReason) {
        let mut guard = self.end_reason.lock().await;
        *guard = Some(reason);
    }

    /// Get the reason the simulation ended, if it has.
    pub async fn end_reason(&self) -> Option<SimulationEndReason> {
        *self.end_reason.lock().await
    }

    // -----------------------------------------------------------------------
    // Ticks
    // -----------------------------------------------------------------------

    /// Publish a new tick to every waiting train.
    pub fn publish_tick(&self, tick: u64) {
        self.ticks.send_replace(tick);
    }

    /// The latest published tick.
    pub fn current_tick(&self) -> u64 {
        *self.ticks.borrow()
    }

    /// A receiver that observes published ticks.
    pub fn subscribe_ticks(&self) -> watch::Receiver<u64> {
        self.ticks.subscribe()
    }

    /// Get the current tick interval in milliseconds.
    pub fn tick_interval_ms(&self) -> u64 {
        self.tick_interval_ms.load(Ordering::Acquire)
    }

    /// Set the tick interval in milliseconds, returning the previous one.
    pub fn set_tick_interval_ms(&self, ms: u64) -> u64 {
        self.tick_interval_ms.swap(ms, Ordering::AcqRel)
    }

    // -----------------------------------------------------------------------
    // Headway
    // -----------------------------------------------------------------------

    /// Current headway distance in meters.
    pub fn headway_m(&self) -> f64 {
        f64::from(self.headway_m.load(Ordering::Acquire))
    }

    /// Set the headway distance, returning the previous one.
    pub fn set_headway_m(&self, meters: u32) -> u32 {
        self.headway_m.swap(meters, Ordering::AcqRel)
    }

    // -----------------------------------------------------------------------
    // Movement lock
    // -----------------------------------------------------------------------

    /// Wait for the movement lock.
    pub async fn lock_movement(&self) -> MovementPermit<'_> {
        MovementPermit {
            lock: &self.movement,
            guard: Some(self.movement.lock().await),
        }
    }

    // -----------------------------------------------------------------------
    // Events
    // -----------------------------------------------------------------------

    /// Broadcast an event. Dropped if nobody is listening.
    pub fn emit(&self, event: FleetEvent) {
        let _ = self.events.send(event);
    }

    /// Subscribe to fleet events.
    pub fn subscribe_events(&self) -> broadcast::Receiver<FleetEvent> {
        self.events.subscribe()
    }
}

/// Resolve once the `done` flag is set, or once the context is gone.
pub async fn until_done(done: &mut watch::Receiver<bool>) {
    let _ = done.wait_for(|done| *done).await;
}

/// Exclusive right to decide and move.
///
/// Held for the whole of a train's step, except while its head carriage
/// waits on a block signal: see [`MovementPermit::yield_while`].
#[derive(Debug)]
pub struct MovementPermit<'a> {
    lock: &'a Mutex<()>,
    guard: Option<MutexGuard<'a, ()>>,
}

impl MovementPermit<'_> {
    /// Give up the lock while `wait` runs, then queue for it again.
    ///
    /// Other trains can move (and free whatever is being waited on) in the
    /// meantime.
    pub async fn yield_while<F: Future>(&mut self, wait: F) -> F::Output {
        self.guard = None;
        let output = wait.await;
        self.guard = Some(self.lock.lock().await);
        output
    }

    /// Whether the lock is currently held.
    pub const fn is_held(&self) -> bool {
        self.guard.is_some()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;

    fn context() -> SimulationContext {
        SimulationContext::new(&ClockConfig::default())
    }

    #[test]
    fn initial_state_is_running() {
        let ctx = context();
        assert!(!ctx.is_paused());
        assert!(!ctx.is_stop_requested());
        assert!(!ctx.is_done());
        assert_eq!(ctx.current_tick(), 0);
        assert!((ctx.headway_m() - 300.0).abs() < 1e-9);
    }

    #[test]
    fn pause_and_resume() {
        let ctx = context();
        ctx.pause();
        assert!(ctx.is_paused());
        ctx.resume();
        assert!(!ctx.is_paused());
    }

    #[test]
    fn runtime_settings_swap() {
        let ctx = context();
        assert_eq!(ctx.set_tick_interval_ms(250), 10);
        assert_eq!(ctx.tick_interval_ms(), 250);
        assert_eq!(ctx.set_headway_m(150), 300);
        assert!((ctx.headway_m() - 150.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn done_wakes_waiters() {
        let ctx = Arc::new(context());
        let mut done = ctx.subscribe_done();
        let waiter = tokio::spawn(async move { until_done(&mut done).await });
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!waiter.is_finished());
        ctx.mark_done();
        waiter.await.unwrap();
        assert!(ctx.is_done());
    }

    #[tokio::test]
    async fn ticks_are_observed() {
        let ctx = context();
        let mut ticks = ctx.subscribe_ticks();
        ctx.publish_tick(3);
        ticks.changed().await.unwrap();
        assert_eq!(*ticks.borrow(), 3);
    }

    #[tokio::test]
    async fn yield_while_lets_others_in() {
        let ctx = Arc::new(context());
        let mut permit = ctx.lock_movement().await;

        let other = {
            let ctx = Arc::clone(&ctx);
            async move {
                let _permit = ctx.lock_movement().await;
                7
            }
        };
        let got = permit.yield_while(other).await;
        assert_eq!(got, 7);
        assert!(permit.is_held());
    }

    #[tokio::test]
    async fn end_reason_round_trip() {
        let ctx = context();
        assert!(ctx.end_reason().await.is_none());
        ctx.set_end_reason(SimulationEndReason::OperatorStop).await;
        assert_eq!(ctx.end_reason().await, Some(SimulationEndReason::OperatorStop));
    }
}
