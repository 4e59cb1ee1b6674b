//! Trains: an ordered, never-reordered list of carriages plus movement state.

use railsim_network::Network;
use railsim_types::{CarriageRef, SegmentId, TrainId, TrainSummary};
use rand::Rng;
use tracing::debug;

use crate::carriage::{Carriage, CarriageLocation};
use crate::config::TrainConfig;
use crate::error::TrainError;
use crate::movement::TrainMovement;
use crate::status::status_text;

/// Gap between coupled carriages, in meters.
pub const CARRIAGE_GAP: f64 = 1.0;

/// A train of one or more carriages.
#[derive(Debug, Clone)]
pub struct Train {
    id: TrainId,
    config: TrainConfig,
    carriages: Vec<Carriage>,
    /// Movement state, reset every time the train returns to the depot.
    pub movement: TrainMovement,
}

impl Train {
    /// Couple a train from its configuration.
    ///
    /// # Errors
    ///
    /// Returns [`TrainError::NoCarriages`] for an empty composition,
    /// [`TrainError::InvalidCarriageLength`] for a carriage of non-positive
    /// length, [`TrainError::InvalidVelocity`] for a non-positive speed, or
    /// [`TrainError::TooManyCarriages`] if indexes overflow.
    pub fn from_config<R: Rng + ?Sized>(
        config: TrainConfig,
        rng: &mut R,
    ) -> Result<Self, TrainError> {
        if !(config.max_velocity_kmh.is_finite() && config.max_velocity_kmh > 0.0) {
            return Err(TrainError::InvalidVelocity {
                number: config.number,
                velocity_kmh: config.max_velocity_kmh,
            });
        }

        let mut carriages = Vec::new();
        for group in &config.carriages {
            if !(group.length.is_finite() && group.length > 0.0) {
                return Err(TrainError::InvalidCarriageLength {
                    class_name: group.class_name.clone(),
                    length: group.length,
                });
            }
            for _ in 0..group.quantity {
                let index = u16::try_from(carriages.len())
                    .ok()
                    .ok_or(TrainError::TooManyCarriages {
                        number: config.number,
                    })?;
                carriages.push(Carriage::new(
                    index,
                    group.class_name.clone(),
                    group.length,
                    group.capacity,
                ));
            }
        }
        if carriages.is_empty() {
            return Err(TrainError::NoCarriages {
                number: config.number,
            });
        }

        let movement = TrainMovement::new(&config, rng);
        let train = Self {
            id: TrainId::new(),
            config,
            carriages,
            movement,
        };
        debug!(
            number = train.number(),
            train = %train.id,
            carriages = train.carriages.len(),
            length_m = train.length_m(),
            "Train coupled"
        );
        Ok(train)
    }

    /// Train identity.
    pub const fn id(&self) -> TrainId {
        self.id
    }

    /// Fleet number.
    pub const fn number(&self) -> u16 {
        self.config.number
    }

    /// The configuration the train was coupled from.
    pub const fn config(&self) -> &TrainConfig {
        &self.config
    }

    /// Carriages, head first.
    pub fn carriages(&self) -> &[Carriage] {
        &self.carriages
    }

    /// Mutable carriages, head first.
    pub fn carriages_mut(&mut self) -> &mut [Carriage] {
        &mut self.carriages
    }

    /// The leading carriage.
    pub fn head(&self) -> Option<&Carriage> {
        self.carriages.first()
    }

    /// The last carriage.
    pub fn tail(&self) -> Option<&Carriage> {
        self.carriages.last()
    }

    /// Queue reference for carriage `index`.
    pub const fn carriage_ref(&self, index: u16) -> CarriageRef {
        CarriageRef::new(self.id, index)
    }

    /// Number of carriages.
    pub fn carriage_count(&self) -> u16 {
        u16::try_from(self.carriages.len()).unwrap_or(u16::MAX)
    }

    /// Length from the head's front to the tail's back, gaps included.
    pub fn length_m(&self) -> f64 {
        let gaps = f64::from(self.carriage_count().saturating_sub(1)) * CARRIAGE_GAP;
        self.carriages.iter().map(|c| c.length).sum::<f64>() + gaps
    }

    /// Combined passenger capacity.
    pub fn total_capacity(&self) -> u32 {
        self.carriages
            .iter()
            .map(|c| c.capacity)
            .fold(0_u32, u32::saturating_add)
    }

    /// Class name of the head carriage.
    pub fn class_name(&self) -> &str {
        self.head().map_or("", |c| c.class_name.as_str())
    }

    /// Whether the carriages are on the track.
    pub fn is_placed(&self) -> bool {
        self.head().is_some_and(|c| c.location.is_some())
    }

    /// Lay the carriages out on `segment` with the head `head_clearance`
    /// meters into it, each following carriage one carriage length and gap
    /// behind.
    ///
    /// Only carriage locations change; queue admission is up to the caller.
    ///
    /// # Errors
    ///
    /// Returns [`TrainError::DoesNotFit`] if the tail carriage's front would
    /// fall short of the segment start.
    pub fn lay_out(&mut self, segment: SegmentId, head_clearance: f64) -> Result<(), TrainError> {
        let span = self.span_m();
        if span > head_clearance {
            return Err(TrainError::DoesNotFit {
                train: self.id,
                length: span,
                segment,
                available: head_clearance,
            });
        }

        let mut offset = 0.0;
        for carriage in &mut self.carriages {
            carriage.location = Some(CarriageLocation::new(segment, head_clearance - offset));
            offset += carriage.length + CARRIAGE_GAP;
        }
        Ok(())
    }

    /// Distance from the head's front to the tail's front.
    fn span_m(&self) -> f64 {
        self.length_m() - self.tail().map_or(0.0, |c| c.length)
    }

    /// Take the train off the track and give it fresh movement state.
    pub fn reset<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        for carriage in &mut self.carriages {
            carriage.location = None;
        }
        self.movement = TrainMovement::new(&self.config, rng);
    }

    /// Build the summary shown next to the track diagram.
    pub fn summary(&self, network: &Network) -> TrainSummary {
        TrainSummary {
            train: self.id,
            number: self.number(),
            status: status_text(network, self.head().and_then(Carriage::segment)),
            phase: self.movement.phase,
            velocity_kmh: self.movement.velocity_kmh(),
            carriage_count: self.carriage_count(),
            class_name: self.class_name().to_owned(),
            total_capacity: self.total_capacity(),
            last_action: self.movement.last_action,
            active: self.movement.active,
        }
    }
}
