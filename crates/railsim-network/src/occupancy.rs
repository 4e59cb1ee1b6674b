//! Per-segment occupancy queues.
//!
//! A queue lists the carriages on one segment, front = furthest along.
//! Carriages only ever enter a segment at its start and leave at its end,
//! so admission is a push to the back and departure a pop from the front.
//! Every mutation re-checks that clearances strictly decrease from front to
//! back; a violation means two carriages overlap and is reported rather
//! than applied.

use std::collections::VecDeque;

use railsim_types::{CarriageRef, OccupantSnapshot, SegmentId, TrainId};

use crate::error::NetworkError;

/// A carriage on a segment, with how far it has travelled into it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Occupant {
    /// The carriage.
    pub carriage: CarriageRef,
    /// Meters travelled into the segment.
    pub clearance: f64,
}

impl Occupant {
    /// Create an occupant entry.
    pub const fn new(carriage: CarriageRef, clearance: f64) -> Self {
        Self {
            carriage,
            clearance,
        }
    }
}

/// Ordered carriages on one segment.
#[derive(Debug, Clone)]
pub struct OccupancyQueue {
    segment: SegmentId,
    entries: VecDeque<Occupant>,
}

impl OccupancyQueue {
    /// Create an empty queue for `segment`.
    pub const fn new(segment: SegmentId) -> Self {
        Self {
            segment,
            entries: VecDeque::new(),
        }
    }

    /// Add a carriage behind every carriage already on the segment.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::NonMonotonicQueue`] if the carriage is not
    /// strictly behind the current rearmost carriage, or has a negative
    /// clearance.
    pub fn admit(&mut self, occupant: Occupant) -> Result<(), NetworkError> {
        self.check_admit(occupant)?;
        self.entries.push_back(occupant);
        Ok(())
    }

    /// Whether [`admit`](Self::admit) would accept `occupant`. Leaves the
    /// queue untouched.
    ///
    /// # Errors
    ///
    /// Returns the error `admit` would return.
    pub fn check_admit(&self, occupant: Occupant) -> Result<(), NetworkError> {
        if occupant.clearance < 0.0 {
            return Err(self.ordering_error(occupant, 0.0));
        }
        if let Some(back) = self.entries.back()
            && occupant.clearance >= back.clearance
        {
            return Err(self.ordering_error(occupant, back.clearance));
        }
        Ok(())
    }

    /// Remove the front carriage, which must be `carriage`.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::UnexpectedFront`] if another carriage (or
    /// nothing) is at the front.
    pub fn depart_front(&mut self, carriage: CarriageRef) -> Result<Occupant, NetworkError> {
        match self.entries.front() {
            Some(front) if front.carriage == carriage => {
                self.entries.pop_front().ok_or(NetworkError::UnexpectedFront {
                    segment: self.segment,
                    expected: carriage,
                    found: None,
                })
            }
            other => Err(NetworkError::UnexpectedFront {
                segment: self.segment,
                expected: carriage,
                found: other.map(|o| o.carriage),
            }),
        }
    }

    /// Move a queued carriage to a new clearance on the same segment.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::NotQueued`] if the carriage is absent, or
    /// [`NetworkError::NonMonotonicQueue`] if the new clearance would pass
    /// the carriage ahead or fall behind the carriage after it.
    pub fn advance(&mut self, carriage: CarriageRef, clearance: f64) -> Result<(), NetworkError> {
        let position = self
            .position(carriage)
            .ok_or(NetworkError::NotQueued {
                segment: self.segment,
                carriage,
            })?;
        let moved = Occupant::new(carriage, clearance);

        if let Some(ahead) = position
            .checked_sub(1)
            .and_then(|p| self.entries.get(p))
            && clearance >= ahead.clearance
        {
            return Err(self.ordering_error(moved, ahead.clearance));
        }
        if let Some(behind) = position
            .checked_add(1)
            .and_then(|p| self.entries.get(p))
            && clearance <= behind.clearance
        {
            return Err(self.ordering_error(moved, behind.clearance));
        }

        if let Some(entry) = self.entries.get_mut(position) {
            entry.clearance = clearance;
        }
        Ok(())
    }

    /// Remove every carriage of `train`, returning how many were removed.
    pub fn remove_train(&mut self, train: TrainId) -> usize {
        let before = self.entries.len();
        self.entries.retain(|o| o.carriage.train != train);
        before.saturating_sub(self.entries.len())
    }

    /// The carriage directly ahead of `carriage`, if any.
    pub fn ahead_of(&self, carriage: CarriageRef) -> Option<&Occupant> {
        self.position(carriage)
            .and_then(|p| p.checked_sub(1))
            .and_then(|p| self.entries.get(p))
    }

    /// The rearmost carriage that does not belong to `train`.
    pub fn rearmost_other(&self, train: TrainId) -> Option<&Occupant> {
        self.entries
            .iter()
            .rev()
            .find(|o| o.carriage.train != train)
    }

    /// Whether any carriage of `train` is on this segment.
    pub fn contains_train(&self, train: TrainId) -> bool {
        self.entries.iter().any(|o| o.carriage.train == train)
    }

    /// The carriage furthest along the segment.
    pub fn front(&self) -> Option<&Occupant> {
        self.entries.front()
    }

    /// The carriage closest to the segment start.
    pub fn back(&self) -> Option<&Occupant> {
        self.entries.back()
    }

    /// Iterate front to back.
    pub fn iter(&self) -> impl Iterator<Item = &Occupant> {
        self.entries.iter()
    }

    /// Number of carriages on the segment.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the segment is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether clearances strictly decrease from front to back.
    pub fn is_monotonic(&self) -> bool {
        self.entries
            .iter()
            .zip(self.entries.iter().skip(1))
            .all(|(ahead, behind)| ahead.clearance > behind.clearance)
    }

    /// Capture the queue for the renderer.
    pub fn snapshot(&self) -> Vec<OccupantSnapshot> {
        self.entries
            .iter()
            .map(|o| OccupantSnapshot {
                carriage: o.carriage,
                clearance: o.clearance,
            })
            .collect()
    }

    fn position(&self, carriage: CarriageRef) -> Option<usize> {
        self.entries.iter().position(|o| o.carriage == carriage)
    }

    const fn ordering_error(&self, occupant: Occupant, neighbour: f64) -> NetworkError {
        NetworkError::NonMonotonicQueue {
            segment: self.segment,
            carriage: occupant.carriage,
            clearance: occupant.clearance,
            neighbour,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn train_refs(count: u16) -> (TrainId, Vec<CarriageRef>) {
        let train = TrainId::new();
        let refs = (0..count).map(|i| CarriageRef::new(train, i)).collect();
        (train, refs)
    }

    #[test]
    fn admits_in_travel_order() {
        let (_, cars) = train_refs(3);
        let mut queue = OccupancyQueue::new(SegmentId(0));
        queue.admit(Occupant::new(cars[0], 90.0)).unwrap();
        queue.admit(Occupant::new(cars[1], 58.0)).unwrap();
        queue.admit(Occupant::new(cars[2], 26.0)).unwrap();
        assert_eq!(queue.len(), 3);
        assert!(queue.is_monotonic());
        assert_eq!(queue.front().unwrap().carriage, cars[0]);
        assert_eq!(queue.back().unwrap().carriage, cars[2]);
    }

    #[test]
    fn rejects_admission_ahead_of_back() {
        let (_, cars) = train_refs(2);
        let mut queue = OccupancyQueue::new(SegmentId(0));
        queue.admit(Occupant::new(cars[0], 10.0)).unwrap();
        let err = queue.admit(Occupant::new(cars[1], 10.0)).unwrap_err();
        assert!(err.is_invariant_violation());
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn admission_check_leaves_the_queue_alone() {
        let (_, cars) = train_refs(3);
        let mut queue = OccupancyQueue::new(SegmentId(2));
        queue.admit(Occupant::new(cars[0], 0.0)).unwrap();

        let err = queue.check_admit(Occupant::new(cars[1], 6.0)).unwrap_err();
        assert!(err.is_invariant_violation());
        assert!(queue.check_admit(Occupant::new(cars[2], -1.0)).is_err());
        assert_eq!(queue.len(), 1);

        let mut clear = OccupancyQueue::new(SegmentId(3));
        clear.check_admit(Occupant::new(cars[1], 6.0)).unwrap();
        assert!(clear.is_empty());
    }

    #[test]
    fn rejects_negative_clearance() {
        let (_, cars) = train_refs(1);
        let mut queue = OccupancyQueue::new(SegmentId(0));
        assert!(queue.admit(Occupant::new(cars[0], -0.5)).is_err());
    }

    #[test]
    fn departs_only_from_front() {
        let (_, cars) = train_refs(2);
        let mut queue = OccupancyQueue::new(SegmentId(4));
        queue.admit(Occupant::new(cars[0], 40.0)).unwrap();
        queue.admit(Occupant::new(cars[1], 8.0)).unwrap();

        assert!(queue.depart_front(cars[1]).is_err());
        let left = queue.depart_front(cars[0]).unwrap();
        assert_eq!(left.carriage, cars[0]);
        assert_eq!(queue.front().unwrap().carriage, cars[1]);
    }

    #[test]
    fn advance_keeps_order() {
        let (_, cars) = train_refs(2);
        let mut queue = OccupancyQueue::new(SegmentId(0));
        queue.admit(Occupant::new(cars[0], 50.0)).unwrap();
        queue.admit(Occupant::new(cars[1], 20.0)).unwrap();

        queue.advance(cars[0], 61.0).unwrap();
        queue.advance(cars[1], 31.0).unwrap();
        assert!(queue.is_monotonic());

        // Passing the carriage ahead is refused.
        assert!(queue.advance(cars[1], 61.0).is_err());
        assert!((queue.back().unwrap().clearance - 31.0).abs() < f64::EPSILON);
    }

    #[test]
    fn ahead_and_rearmost_other() {
        let (leader, lead_cars) = train_refs(1);
        let (follower, follow_cars) = train_refs(2);
        let mut queue = OccupancyQueue::new(SegmentId(0));
        queue.admit(Occupant::new(lead_cars[0], 800.0)).unwrap();
        queue.admit(Occupant::new(follow_cars[0], 300.0)).unwrap();
        queue.admit(Occupant::new(follow_cars[1], 268.0)).unwrap();

        let ahead = queue.ahead_of(follow_cars[0]).unwrap();
        assert_eq!(ahead.carriage.train, leader);
        assert!(queue.ahead_of(lead_cars[0]).is_none());

        let rearmost = queue.rearmost_other(follower).unwrap();
        assert_eq!(rearmost.carriage, lead_cars[0]);
        assert!(queue.contains_train(follower));
    }

    #[test]
    fn remove_train_clears_only_that_train() {
        let (leader, lead_cars) = train_refs(2);
        let (follower, follow_cars) = train_refs(1);
        let mut queue = OccupancyQueue::new(SegmentId(0));
        queue.admit(Occupant::new(lead_cars[0], 500.0)).unwrap();
        queue.admit(Occupant::new(lead_cars[1], 468.0)).unwrap();
        queue.admit(Occupant::new(follow_cars[0], 100.0)).unwrap();

        assert_eq!(queue.remove_train(leader), 2);
        assert!(!queue.contains_train(leader));
        assert!(queue.contains_train(follower));
        assert_eq!(queue.snapshot().len(), 1);
    }
}
