//! Carriages and where they are on the track.

use railsim_types::SegmentId;

/// Where a carriage is: a segment and how far into it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CarriageLocation {
    /// The segment the carriage's front is on.
    pub segment: SegmentId,
    /// Meters travelled into that segment.
    pub clearance: f64,
}

impl CarriageLocation {
    /// Create a location.
    pub const fn new(segment: SegmentId, clearance: f64) -> Self {
        Self { segment, clearance }
    }
}

/// One carriage of a train.
#[derive(Debug, Clone, PartialEq)]
pub struct Carriage {
    /// Position in the train, 0 being the head.
    pub index: u16,
    /// Carriage class name.
    pub class_name: String,
    /// Length in meters.
    pub length: f64,
    /// Passenger capacity.
    pub capacity: u32,
    /// Current location; `None` while the train is in the depot pool.
    pub location: Option<CarriageLocation>,
}

impl Carriage {
    /// Create an unplaced carriage.
    pub fn new(index: u16, class_name: impl Into<String>, length: f64, capacity: u32) -> Self {
        Self {
            index,
            class_name: class_name.into(),
            length,
            capacity,
            location: None,
        }
    }

    /// The segment the carriage is on, if placed.
    pub fn segment(&self) -> Option<SegmentId> {
        self.location.map(|l| l.segment)
    }

    /// Clearance into the current segment, or zero when unplaced.
    pub fn clearance(&self) -> f64 {
        self.location.map_or(0.0, |l| l.clearance)
    }
}
