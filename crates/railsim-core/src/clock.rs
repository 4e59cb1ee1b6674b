//! Simulation clock: a time of day that advances one second per tick.
//!
//! The tick counter is the source of truth; the time of day is derived from
//! it and the configured start time. The run covers every second from the
//! start time up to and including the end time, all within one day.

use chrono::{NaiveTime, TimeDelta};

use crate::config::ClockConfig;

/// Errors that can occur during clock operations.
#[derive(Debug, thiserror::Error)]
pub enum ClockError {
    /// Tick counter would overflow.
    #[error("tick counter overflow: cannot advance beyond u64::MAX")]
    TickOverflow,

    /// Invalid clock configuration (e.g. end before start).
    #[error("invalid clock configuration: {reason}")]
    InvalidConfig {
        /// Explanation of what is wrong with the configuration.
        reason: String,
    },
}

/// The simulation clock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulationClock {
    /// Current tick number, starting at 0.
    tick: u64,
    start: NaiveTime,
    end: NaiveTime,
    /// Number of the last tick at or before the end time.
    last_tick: u64,
}

impl SimulationClock {
    /// Create a clock at tick 0.
    ///
    /// # Errors
    ///
    /// Returns [`ClockError::InvalidConfig`] if the end time is earlier than
    /// the start time.
    pub fn new(config: &ClockConfig) -> Result<Self, ClockError> {
        if config.end_time < config.start_time {
            return Err(ClockError::InvalidConfig {
                reason: format!(
                    "end time {} is before start time {}",
                    config.end_time, config.start_time
                ),
            });
        }
        let span = config.end_time.signed_duration_since(config.start_time);
        let last_tick = u64::try_from(span.num_seconds())
            .ok()
            .ok_or(ClockError::InvalidConfig {
                reason: "clock span does not fit in a tick counter".to_owned(),
            })?;
        Ok(Self {
            tick: 0,
            start: config.start_time,
            end: config.end_time,
            last_tick,
        })
    }

    /// Current tick number.
    pub const fn tick(&self) -> u64 {
        self.tick
    }

    /// Time of day of the first tick.
    pub const fn start_time(&self) -> NaiveTime {
        self.start
    }

    /// Last simulated time of day.
    pub const fn end_time(&self) -> NaiveTime {
        self.end
    }

    /// Current simulated time of day.
    ///
    /// Past the end time (during wind-down) the time keeps counting and
    /// wraps at midnight.
    pub fn time(&self) -> NaiveTime {
        let seconds = i64::try_from(self.tick).unwrap_or(i64::MAX);
        let elapsed = TimeDelta::try_seconds(seconds).unwrap_or(TimeDelta::MAX);
        self.start.overflowing_add_signed(elapsed).0
    }

    /// Current time formatted as `HH:MM:SS`.
    pub fn time_string(&self) -> String {
        self.time().format("%H:%M:%S").to_string()
    }

    /// Whether the clock has moved past the end time.
    pub const fn is_past_end(&self) -> bool {
        self.tick > self.last_tick
    }

    /// Ticks left up to and including the end time.
    pub const fn remaining_ticks(&self) -> u64 {
        self.last_tick.saturating_sub(self.tick)
    }

    /// Advance by one tick and return the new tick number.
    ///
    /// # Errors
    ///
    /// Returns [`ClockError::TickOverflow`] if the tick counter would
    /// overflow.
    pub fn advance(&mut self) -> Result<u64, ClockError> {
        self.tick = self.tick.checked_add(1).ok_or(ClockError::TickOverflow)?;
        Ok(self.tick)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn config(start: (u32, u32, u32), end: (u32, u32, u32)) -> ClockConfig {
        ClockConfig {
            start_time: NaiveTime::from_hms_opt(start.0, start.1, start.2).unwrap(),
            end_time: NaiveTime::from_hms_opt(end.0, end.1, end.2).unwrap(),
            ..ClockConfig::default()
        }
    }

    #[test]
    fn one_second_per_tick() {
        let mut clock = SimulationClock::new(&config((5, 0, 0), (6, 0, 0))).unwrap();
        assert_eq!(clock.tick(), 0);
        assert_eq!(clock.time_string(), "05:00:00");
        for _ in 0..61 {
            clock.advance().unwrap();
        }
        assert_eq!(clock.tick(), 61);
        assert_eq!(clock.time_string(), "05:01:01");
    }

    #[test]
    fn end_time_is_inclusive() {
        let mut clock = SimulationClock::new(&config((5, 0, 0), (5, 0, 2))).unwrap();
        assert_eq!(clock.remaining_ticks(), 2);
        clock.advance().unwrap();
        clock.advance().unwrap();
        assert!(!clock.is_past_end());
        assert_eq!(clock.time(), clock.end_time());
        clock.advance().unwrap();
        assert!(clock.is_past_end());
        assert_eq!(clock.remaining_ticks(), 0);
    }

    #[test]
    fn zero_length_day_runs_one_tick() {
        let mut clock = SimulationClock::new(&config((8, 0, 0), (8, 0, 0))).unwrap();
        assert!(!clock.is_past_end());
        clock.advance().unwrap();
        assert!(clock.is_past_end());
    }

    #[test]
    fn rejects_end_before_start() {
        let err = SimulationClock::new(&config((9, 0, 0), (8, 0, 0))).unwrap_err();
        assert!(matches!(err, ClockError::InvalidConfig { .. }));
    }

    #[test]
    fn time_wraps_after_midnight() {
        let mut clock = SimulationClock::new(&config((23, 59, 59), (23, 59, 59))).unwrap();
        clock.advance().unwrap();
        assert_eq!(clock.time_string(), "00:00:00");
    }
}
