//! Train composition and service parameters.
//!
//! Every train in `railsim-config.yaml` is described by a [`TrainConfig`]:
//! the carriage groups it is coupled from, its speed, its dwell times, the
//! stations it serves, and when it leaves the depot.

use chrono::NaiveTime;
use serde::Deserialize;

/// A run of identical carriages.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CarriageGroup {
    /// Carriage class shown in the train summary.
    #[serde(default = "default_class_name")]
    pub class_name: String,

    /// Length of one carriage in meters (default: 22.5).
    #[serde(default = "default_carriage_length")]
    pub length: f64,

    /// Passenger capacity of one carriage (default: 400).
    #[serde(default = "default_carriage_capacity")]
    pub capacity: u32,

    /// Number of carriages in the run (default: 4).
    #[serde(default = "default_quantity")]
    pub quantity: u16,
}

fn default_class_name() -> String {
    String::from("Standard")
}

const fn default_carriage_length() -> f64 {
    22.5
}

const fn default_carriage_capacity() -> u32 {
    400
}

const fn default_quantity() -> u16 {
    4
}

impl Default for CarriageGroup {
    fn default() -> Self {
        Self {
            class_name: default_class_name(),
            length: default_carriage_length(),
            capacity: default_carriage_capacity(),
            quantity: default_quantity(),
        }
    }
}

/// Configuration for one train of the fleet.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TrainConfig {
    /// Fleet number shown to operators.
    pub number: u16,

    /// Carriage groups, head first.
    #[serde(default = "default_carriages")]
    pub carriages: Vec<CarriageGroup>,

    /// Cruising speed in km/h (default: 60).
    #[serde(default = "default_max_velocity_kmh")]
    pub max_velocity_kmh: f64,

    /// Braking rate in m/s^2. Carried for reporting; velocity snaps between
    /// zero and maximum.
    #[serde(default = "default_deceleration")]
    pub deceleration: f64,

    /// Base station dwell in ticks (default: 30). The actual dwell varies by
    /// up to half of this either way.
    #[serde(default = "default_dwell_ticks")]
    pub dwell_ticks: u32,

    /// Dwell at each end of the line in ticks (default: 300).
    #[serde(default = "default_end_dwell_ticks")]
    pub end_dwell_ticks: u32,

    /// Names of the stations this train serves. Absent means every
    /// station; an empty list means the train runs through all of them.
    #[serde(default)]
    pub stops: Option<Vec<String>>,

    /// Time of day the train leaves the depot. `None` keeps it in the depot
    /// until deployed by hand.
    #[serde(default)]
    pub deploy_at: Option<NaiveTime>,
}

fn default_carriages() -> Vec<CarriageGroup> {
    vec![CarriageGroup::default()]
}

const fn default_max_velocity_kmh() -> f64 {
    60.0
}

const fn default_deceleration() -> f64 {
    1.0
}

const fn default_dwell_ticks() -> u32 {
    30
}

const fn default_end_dwell_ticks() -> u32 {
    300
}

impl TrainConfig {
    /// A train with default composition and timings.
    pub fn new(number: u16) -> Self {
        Self {
            number,
            carriages: default_carriages(),
            max_velocity_kmh: default_max_velocity_kmh(),
            deceleration: default_deceleration(),
            dwell_ticks: default_dwell_ticks(),
            end_dwell_ticks: default_end_dwell_ticks(),
            stops: None,
            deploy_at: None,
        }
    }

    /// Total number of carriages across all groups.
    pub fn carriage_count(&self) -> u32 {
        self.carriages
            .iter()
            .map(|g| u32::from(g.quantity))
            .fold(0_u32, u32::saturating_add)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn yaml_defaults() {
        let config: TrainConfig = serde_yml::from_str("number: 7").unwrap();
        assert_eq!(config, TrainConfig::new(7));
        assert_eq!(config.carriage_count(), 4);
        assert!(config.deploy_at.is_none());
        assert!(config.stops.is_none());
    }

    #[test]
    fn yaml_full() {
        let yaml = r#"
number: 12
carriages:
  - class_name: "1000 class"
    length: 20.0
    capacity: 350
    quantity: 2
  - class_name: "2000 class"
    quantity: 1
max_velocity_kmh: 40
dwell_ticks: 20
stops: [Recto, Cubao]
deploy_at: "05:30:00"
"#;
        let config: TrainConfig = serde_yml::from_str(yaml).unwrap();
        assert_eq!(config.carriage_count(), 3);
        assert_eq!(config.stops.unwrap(), vec!["Recto", "Cubao"]);
        assert_eq!(config.dwell_ticks, 20);
        assert_eq!(config.end_dwell_ticks, 300);
        assert_eq!(
            config.deploy_at,
            Some(NaiveTime::from_hms_opt(5, 30, 0).unwrap())
        );
    }
}
