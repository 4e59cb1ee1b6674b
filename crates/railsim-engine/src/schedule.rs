//! Tick callback that runs the deployment timetable.
//!
//! Trains with a `deploy_at` time leave the depot on the first tick at or
//! after that time of day. Once the run is winding down nothing more is
//! sent out.

use std::collections::VecDeque;
use std::sync::Arc;

use chrono::{NaiveTime, Timelike};
use railsim_core::fleet::Fleet;
use railsim_core::runner::{TickCallback, TickSummary};
use railsim_trains::TrainConfig;
use tracing::{debug, info, warn};

/// Pending departures, earliest first.
#[derive(Debug, Default)]
pub struct DeploymentSchedule {
    pending: VecDeque<(NaiveTime, u16)>,
    last_report_hour: Option<u32>,
}

impl DeploymentSchedule {
    /// Collect the departure times of `trains`. Trains without one stay in
    /// the depot.
    pub fn from_trains(trains: &[TrainConfig]) -> Self {
        let mut pending: Vec<_> = trains
            .iter()
            .filter_map(|train| train.deploy_at.map(|at| (at, train.number)))
            .collect();
        pending.sort_unstable();
        Self {
            pending: pending.into(),
            last_report_hour: None,
        }
    }

    /// Departures still to come.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// The next departure and the train making it.
    pub fn next_departure(&self) -> Option<(NaiveTime, u16)> {
        self.pending.front().copied()
    }

    fn depart_due(&mut self, now: NaiveTime, fleet: &Arc<Fleet>) {
        while let Some(&(at, number)) = self.pending.front()
            && at <= now
        {
            self.pending.pop_front();
            match fleet.deploy(number, None) {
                Ok(train) => info!(number, %train, scheduled = %at, "Scheduled departure"),
                Err(err) => warn!(number, error = %err, "Scheduled departure skipped"),
            }
        }
    }

    fn report(&mut self, summary: &TickSummary) {
        let hour = summary.time.hour();
        if self.last_report_hour != Some(hour) {
            self.last_report_hour = Some(hour);
            info!(
                time = %summary.time,
                tick = summary.tick,
                active = summary.active_trains,
                depot = summary.inactive_trains,
                "Service update"
            );
        }
    }
}

impl TickCallback for DeploymentSchedule {
    fn on_tick(&mut self, summary: &TickSummary, fleet: &Arc<Fleet>) {
        if summary.winding_down {
            if !self.pending.is_empty() {
                debug!(cancelled = self.pending.len(), "End of service, departures cancelled");
                self.pending.clear();
            }
            return;
        }
        self.depart_due(summary.time, fleet);
        self.report(summary);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use railsim_core::config::ClockConfig;
    use railsim_core::context::SimulationContext;
    use railsim_network::{LineLayout, build_line};

    use super::*;

    fn at(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn train(number: u16, deploy_at: Option<NaiveTime>) -> TrainConfig {
        let mut config = TrainConfig::new(number);
        config.deploy_at = deploy_at;
        config
    }

    fn summary(time: NaiveTime, winding_down: bool) -> TickSummary {
        TickSummary {
            tick: 0,
            time,
            active_trains: 0,
            inactive_trains: 0,
            winding_down,
        }
    }

    fn fleet(trains: &[TrainConfig]) -> (Arc<SimulationContext>, Arc<Fleet>) {
        let layout: LineLayout = serde_yml::from_str(
            r"
name: Schedule
stations:
  - { name: Alpha, sequence: 1 }
  - { name: Bravo, sequence: 2, distance_to_previous: 800 }
",
        )
        .unwrap();
        let ctx = Arc::new(SimulationContext::new(&ClockConfig::default()));
        let fleet = Fleet::new(
            Arc::clone(&ctx),
            Arc::new(build_line(&layout).unwrap()),
            trains,
            3,
        )
        .unwrap();
        (ctx, fleet)
    }

    #[test]
    fn departures_are_ordered_by_time() {
        let schedule = DeploymentSchedule::from_trains(&[
            train(3, Some(at(5, 12))),
            train(2, None),
            train(1, Some(at(5, 0))),
        ]);
        assert_eq!(schedule.pending(), 2);
        assert_eq!(schedule.next_departure(), Some((at(5, 0), 1)));
    }

    #[tokio::test]
    async fn due_trains_leave_the_depot() {
        let trains = [train(1, Some(at(5, 0))), train(2, Some(at(5, 6)))];
        let (ctx, fleet) = fleet(&trains);
        let mut schedule = DeploymentSchedule::from_trains(&trains);

        schedule.on_tick(&summary(at(4, 59), false), &fleet);
        assert_eq!(fleet.active_count(), 0);

        schedule.on_tick(&summary(at(5, 0), false), &fleet);
        assert!(fleet.is_active(1));
        assert!(!fleet.is_active(2));

        schedule.on_tick(&summary(at(5, 7), false), &fleet);
        assert!(fleet.is_active(2));
        assert_eq!(schedule.pending(), 0);

        ctx.mark_done();
        fleet.join_all().await;
        assert_eq!(fleet.inactive_numbers(), vec![1, 2]);
    }

    #[tokio::test]
    async fn train_already_out_is_skipped() {
        let trains = [train(1, Some(at(5, 0)))];
        let (ctx, fleet) = fleet(&trains);
        let mut schedule = DeploymentSchedule::from_trains(&trains);
        fleet.deploy(1, None).unwrap();

        schedule.on_tick(&summary(at(5, 0), false), &fleet);
        assert_eq!(schedule.pending(), 0);
        assert_eq!(fleet.active_count(), 1);

        ctx.mark_done();
        fleet.join_all().await;
    }

    #[tokio::test]
    async fn wind_down_cancels_remaining_departures() {
        let trains = [train(1, Some(at(5, 0)))];
        let (_ctx, fleet) = fleet(&trains);
        let mut schedule = DeploymentSchedule::from_trains(&trains);

        schedule.on_tick(&summary(at(6, 0), true), &fleet);
        assert_eq!(schedule.pending(), 0);
        assert_eq!(fleet.active_count(), 0);
    }
}
