//! Configuration loading and typed config structures for the railsim
//! simulation.
//!
//! The canonical configuration lives in `railsim-config.yaml` at the project
//! root. Every section is optional: a missing section falls back to the
//! demo line and fleet defined here, so an empty file runs a full day on a
//! thirteen-station line.

use std::path::Path;

use chrono::NaiveTime;
use railsim_network::{DepotLayout, LineLayout, StationLayout, Terminal};
use railsim_trains::TrainConfig;
use serde::Deserialize;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level simulation configuration.
///
/// Mirrors the structure of `railsim-config.yaml`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SimulationConfig {
    /// Clock, pacing, and headway settings.
    #[serde(default)]
    pub clock: ClockConfig,

    /// The line to build.
    #[serde(default = "default_line")]
    pub line: LineLayout,

    /// Trains in the fleet.
    #[serde(default = "default_trains")]
    pub trains: Vec<TrainConfig>,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            clock: ClockConfig::default(),
            line: default_line(),
            trains: default_trains(),
            logging: LoggingConfig::default(),
        }
    }
}

impl SimulationConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if the content is not valid YAML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string.
    ///
    /// An empty document yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yml::from_str(yaml)?)
    }
}

// ---------------------------------------------------------------------------
// Clock
// ---------------------------------------------------------------------------

/// Simulation clock and pacing.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ClockConfig {
    /// Time of day of tick 0.
    #[serde(default = "default_start_time")]
    pub start_time: NaiveTime,

    /// Last time of day that is simulated (inclusive).
    #[serde(default = "default_end_time")]
    pub end_time: NaiveTime,

    /// Real-time milliseconds slept between ticks.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// Minimum following distance between trains, in meters.
    #[serde(default = "default_headway_m")]
    pub headway_m: u32,

    /// Ticks to keep running after the end time while trains head home.
    /// Zero ends the run at the end time and pulls every train out at once.
    #[serde(default)]
    pub wind_down_ticks: u64,

    /// Seed for dwell perturbation.
    #[serde(default = "default_seed")]
    pub seed: u64,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            start_time: default_start_time(),
            end_time: default_end_time(),
            tick_interval_ms: default_tick_interval_ms(),
            headway_m: default_headway_m(),
            wind_down_ticks: 0,
            seed: default_seed(),
        }
    }
}

fn default_start_time() -> NaiveTime {
    NaiveTime::from_hms_opt(5, 0, 0).unwrap_or(NaiveTime::MIN)
}

fn default_end_time() -> NaiveTime {
    NaiveTime::from_hms_opt(22, 0, 0).unwrap_or(NaiveTime::MIN)
}

const fn default_tick_interval_ms() -> u64 {
    10
}

const fn default_headway_m() -> u32 {
    300
}

const fn default_seed() -> u64 {
    42
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_owned()
}

// ---------------------------------------------------------------------------
// Demo line and fleet
// ---------------------------------------------------------------------------

/// Station names and the distance from the previous station, south to north.
const DEMO_STATIONS: [(&str, u32); 13] = [
    ("Recto", 0),
    ("Legarda", 1050),
    ("Pureza", 1389),
    ("V. Mapa", 1357),
    ("J. Ruiz", 1234),
    ("Gilmore", 928),
    ("Betty Go-Belmonte", 1075),
    ("Araneta Center-Cubao", 1164),
    ("Anonas", 1438),
    ("Katipunan", 955),
    ("Santolan", 1970),
    ("Marikina-Pasig", 1790),
    ("Antipolo", 2232),
];

fn default_line() -> LineLayout {
    let mut stations = Vec::with_capacity(DEMO_STATIONS.len());
    for (sequence, (name, distance)) in (1_u32..).zip(DEMO_STATIONS) {
        stations.push(StationLayout {
            name: name.to_owned(),
            sequence,
            depot_sequence: 0,
            distance_to_previous: distance,
        });
    }
    LineLayout {
        name: "Line 2".to_owned(),
        platform_length: 106,
        north_loop_length: 300,
        south_loop_length: 300,
        stations,
        depot: DepotLayout {
            terminal: Terminal::North,
            platform_length: 100,
            spur_length: 200,
        },
    }
}

fn default_trains() -> Vec<TrainConfig> {
    let mut trains = Vec::new();
    for (number, minute) in (1_u16..).zip([0_u32, 6, 12, 18]) {
        let mut train = TrainConfig::new(number);
        train.deploy_at = NaiveTime::from_hms_opt(5, minute, 0);
        trains.push(train);
    }
    trains
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_gives_demo_defaults() {
        let config = SimulationConfig::parse("").unwrap();
        assert_eq!(config, SimulationConfig::default());
        assert_eq!(config.line.stations.len(), 13);
        assert_eq!(config.trains.len(), 4);
        assert_eq!(config.clock.headway_m, 300);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn demo_line_builds() {
        let network = railsim_network::build_line(&default_line()).unwrap();
        assert_eq!(network.stations().len(), 13);
        assert!(network.depot().is_ok());
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = SimulationConfig::parse(
            r#"
clock:
  start_time: "06:30:00"
  headway_m: 250
  wind_down_ticks: 600
line:
  name: Shuttle
  stations:
    - { name: Alpha, sequence: 1 }
    - { name: Bravo, sequence: 2, distance_to_previous: 800 }
trains:
  - number: 7
    stops: [Bravo]
logging:
  json: true
"#,
        )
        .unwrap();

        assert_eq!(
            config.clock.start_time,
            NaiveTime::from_hms_opt(6, 30, 0).unwrap()
        );
        assert_eq!(config.clock.end_time, default_end_time());
        assert_eq!(config.clock.headway_m, 250);
        assert_eq!(config.clock.wind_down_ticks, 600);
        assert_eq!(config.clock.tick_interval_ms, 10);
        assert_eq!(config.line.name, "Shuttle");
        assert_eq!(config.trains.len(), 1);
        assert_eq!(config.trains[0].number, 7);
        assert!(config.logging.json);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn malformed_yaml_is_rejected() {
        let err = SimulationConfig::parse("clock: [not, a, map]").unwrap_err();
        assert!(matches!(err, ConfigError::Yaml { .. }));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = SimulationConfig::from_file(Path::new("/nonexistent/railsim.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn project_config_file_loads() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("..")
            .join("..")
            .join("railsim-config.yaml");
        if path.exists() {
            let config = SimulationConfig::from_file(&path);
            assert!(config.is_ok(), "Failed to load project config: {config:?}");
            let config = config.unwrap();
            railsim_network::build_line(&config.line).unwrap();
        }
    }
}
