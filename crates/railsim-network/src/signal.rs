//! Block signals: one binary gate per junction.
//!
//! A [`BlockSignal`] guards entry into every segment leaving its junction.
//! The head carriage of a train acquires it before the train occupies the
//! segment beyond; the tail carriage releases it once the train has fully
//! vacated that segment. Acquisition and release therefore happen in
//! different ticks, by different carriages, so the permit is detached from
//! its guard on acquire and handed back explicitly on release.
//!
//! Waiters are served in FIFO order (the tokio semaphore is fair), so
//! contention at a junction resolves in request order.

use std::sync::{Mutex, MutexGuard, PoisonError};

use railsim_types::{JunctionId, SignalSnapshot, TrainId};
use tokio::sync::Semaphore;

use crate::error::NetworkError;

/// A fair binary semaphore that also records which train holds it.
#[derive(Debug)]
pub struct BlockSignal {
    /// The junction this signal belongs to.
    junction: JunctionId,
    /// One permit; taken while a train spans the guarded block.
    gate: Semaphore,
    /// The train currently holding the permit.
    holder: Mutex<Option<TrainId>>,
}

impl BlockSignal {
    /// Create an open signal for `junction`.
    pub fn new(junction: JunctionId) -> Self {
        Self {
            junction,
            gate: Semaphore::new(1),
            holder: Mutex::new(None),
        }
    }

    fn holder_slot(&self) -> MutexGuard<'_, Option<TrainId>> {
        self.holder.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Wait for the signal to clear, then take it on behalf of `train`.
    ///
    /// Cancel-safe: dropping the future before it resolves leaves the
    /// signal untouched and the caller's place in the queue is given up.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::SignalClosed`] if the semaphore was closed.
    pub async fn acquire(&self, train: TrainId) -> Result<(), NetworkError> {
        let permit = self
            .gate
            .acquire()
            .await
            .map_err(|source| NetworkError::SignalClosed {
                junction: self.junction,
                source,
            })?;
        permit.forget();
        *self.holder_slot() = Some(train);
        Ok(())
    }

    /// Take the signal for `train` only if it is free right now.
    pub fn try_acquire(&self, train: TrainId) -> bool {
        match self.gate.try_acquire() {
            Ok(permit) => {
                permit.forget();
                *self.holder_slot() = Some(train);
                true
            }
            Err(_) => false,
        }
    }

    /// Hand the signal back.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::SignalNotHeld`] if `train` is not the holder.
    /// The signal is left unchanged in that case.
    pub fn release(&self, train: TrainId) -> Result<(), NetworkError> {
        let mut holder = self.holder_slot();
        if *holder != Some(train) {
            return Err(NetworkError::SignalNotHeld {
                junction: self.junction,
                train,
                holder: *holder,
            });
        }
        *holder = None;
        drop(holder);
        self.gate.add_permits(1);
        Ok(())
    }

    /// The junction this signal guards.
    pub const fn junction(&self) -> JunctionId {
        self.junction
    }

    /// The train holding the signal, if any.
    pub fn holder(&self) -> Option<TrainId> {
        *self.holder_slot()
    }

    /// Whether a train other than `train` holds the signal.
    pub fn is_held_by_other(&self, train: TrainId) -> bool {
        self.holder().is_some_and(|holder| holder != train)
    }

    /// Number of free permits: 1 when clear, 0 when taken.
    pub fn available_permits(&self) -> usize {
        self.gate.available_permits()
    }

    /// Capture the signal state for the renderer.
    pub fn snapshot(&self) -> SignalSnapshot {
        SignalSnapshot {
            junction: self.junction,
            held_by: self.holder(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn starts_open() {
        let signal = BlockSignal::new(JunctionId(0));
        assert_eq!(signal.available_permits(), 1);
        assert!(signal.holder().is_none());
    }

    #[tokio::test]
    async fn acquire_and_release_round_trip() {
        let signal = BlockSignal::new(JunctionId(0));
        let train = TrainId::new();
        signal.acquire(train).await.unwrap();
        assert_eq!(signal.available_permits(), 0);
        assert_eq!(signal.holder(), Some(train));
        signal.release(train).unwrap();
        assert_eq!(signal.available_permits(), 1);
        assert!(signal.holder().is_none());
    }

    #[tokio::test]
    async fn release_by_non_holder_is_rejected() {
        let signal = BlockSignal::new(JunctionId(2));
        let holder = TrainId::new();
        let intruder = TrainId::new();
        signal.acquire(holder).await.unwrap();
        let err = signal.release(intruder).unwrap_err();
        assert!(err.is_invariant_violation());
        assert_eq!(signal.holder(), Some(holder));
        assert_eq!(signal.available_permits(), 0);
    }

    #[tokio::test]
    async fn double_release_never_adds_a_second_permit() {
        let signal = BlockSignal::new(JunctionId(1));
        let train = TrainId::new();
        signal.acquire(train).await.unwrap();
        signal.release(train).unwrap();
        assert!(signal.release(train).is_err());
        assert_eq!(signal.available_permits(), 1);
    }

    #[tokio::test]
    async fn second_train_waits_until_release() {
        let signal = Arc::new(BlockSignal::new(JunctionId(3)));
        let first = TrainId::new();
        let second = TrainId::new();
        signal.acquire(first).await.unwrap();
        assert!(!signal.try_acquire(second));
        assert!(signal.is_held_by_other(second));
        assert!(!signal.is_held_by_other(first));

        let waiter = {
            let signal = Arc::clone(&signal);
            tokio::spawn(async move { signal.acquire(second).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        signal.release(first).unwrap();
        waiter.await.unwrap().unwrap();
        assert_eq!(signal.holder(), Some(second));
    }

    #[tokio::test]
    async fn waiters_are_served_in_request_order() {
        let signal = Arc::new(BlockSignal::new(JunctionId(5)));
        let owner = TrainId::new();
        signal.acquire(owner).await.unwrap();

        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let mut waiters = Vec::new();
        for _ in 0..3 {
            let signal = Arc::clone(&signal);
            let tx = tx.clone();
            let train = TrainId::new();
            waiters.push(train);
            tokio::spawn(async move {
                signal.acquire(train).await.unwrap();
                tx.send(train).unwrap();
                signal.release(train).unwrap();
            });
            // Let each waiter enqueue before the next one is spawned.
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        signal.release(owner).unwrap();
        let mut served = Vec::new();
        for _ in 0..3 {
            served.push(rx.recv().await.unwrap());
        }
        assert_eq!(served, waiters);
    }
}
