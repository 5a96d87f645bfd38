use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use common::{config::AppConfig, models::View};
use gateway::RefreshTarget;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info, warn};

/// The periodic reloads. Each one only works while its view is visible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RefreshTask {
    Dashboard,
    Signals,
}

impl RefreshTask {
    pub fn view(&self) -> View {
        match self {
            RefreshTask::Dashboard => View::Dashboard,
            RefreshTask::Signals => View::Signals,
        }
    }
}

#[derive(Default)]
pub struct RefreshScheduler {
    tasks: HashMap<RefreshTask, JoinHandle<()>>,
}

impl RefreshScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Dashboard and signals, at the configured periods.
    pub fn schedule_defaults(&mut self, config: &AppConfig, target: Arc<dyn RefreshTarget>) {
        self.schedule(RefreshTask::Dashboard, config.dashboard_refresh, target.clone());
        self.schedule(RefreshTask::Signals, config.signals_refresh, target);
    }

    /// Starts `task`, replacing a timer already running for it. A zero
    /// period schedules nothing.
    pub fn schedule(&mut self, task: RefreshTask, period: Duration, target: Arc<dyn RefreshTarget>) {
        if period.is_zero() {
            warn!("Not scheduling {:?} refresh with a zero period", task);
            return;
        }
        let handle = tokio::spawn(async move {
            let mut ticker = time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick is immediate; activation already loaded the view.
            ticker.tick().await;

            loop {
                ticker.tick().await;
                let active = target.active_view();
                if active == task.view() {
                    debug!("Periodic refresh of {}", active);
                    target.refresh(active).await;
                }
            }
        });

        if let Some(previous) = self.tasks.insert(task, handle) {
            previous.abort();
        }
        info!("Scheduled {:?} refresh every {:?}", task, period);
    }

    #[cfg(test)]
    fn is_scheduled(&self, task: RefreshTask) -> bool {
        self.tasks.contains_key(&task)
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Aborts every timer and forgets them. Returns how many were running.
    pub fn cancel_all(&mut self) -> usize {
        let count = self.tasks.len();
        for (task, handle) in self.tasks.drain() {
            handle.abort();
            debug!("Cancelled {:?} refresh", task);
        }
        count
    }
}

impl Drop for RefreshScheduler {
    fn drop(&mut self) {
        self.cancel_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::CountingTarget;

    fn config(dashboard_secs: u64, signals_secs: u64) -> AppConfig {
        AppConfig {
            dashboard_refresh: Duration::from_secs(dashboard_secs),
            signals_refresh: Duration::from_secs(signals_secs),
            ..AppConfig::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn only_the_visible_view_is_refreshed() {
        let target = CountingTarget::new(View::Signals);
        let mut scheduler = RefreshScheduler::new();
        scheduler.schedule_defaults(&config(30, 60), target.clone());

        time::sleep(Duration::from_secs(125)).await;
        assert_eq!(target.count(View::Dashboard), 0);
        assert_eq!(target.count(View::Signals), 2);

        target.set_active(View::Dashboard);
        time::sleep(Duration::from_secs(61)).await;
        assert_eq!(target.count(View::Dashboard), 2);
        assert_eq!(target.count(View::Signals), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn hidden_views_cost_nothing() {
        let target = CountingTarget::new(View::Portfolio);
        let mut scheduler = RefreshScheduler::new();
        scheduler.schedule_defaults(&config(30, 60), target.clone());

        time::sleep(Duration::from_secs(600)).await;
        assert_eq!(target.total(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_all_stops_every_timer() {
        let target = CountingTarget::new(View::Dashboard);
        let mut scheduler = RefreshScheduler::new();
        scheduler.schedule_defaults(&config(30, 60), target.clone());
        assert_eq!(scheduler.len(), 2);

        time::sleep(Duration::from_secs(31)).await;
        assert_eq!(target.count(View::Dashboard), 1);

        assert_eq!(scheduler.cancel_all(), 2);
        assert_eq!(scheduler.len(), 0);
        assert!(!scheduler.is_scheduled(RefreshTask::Dashboard));

        time::sleep(Duration::from_secs(300)).await;
        assert_eq!(target.count(View::Dashboard), 1);
        assert_eq!(scheduler.cancel_all(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn rescheduling_replaces_the_timer() {
        let target = CountingTarget::new(View::Dashboard);
        let mut scheduler = RefreshScheduler::new();
        scheduler.schedule(RefreshTask::Dashboard, Duration::from_secs(30), target.clone());
        scheduler.schedule(RefreshTask::Dashboard, Duration::from_secs(30), target.clone());
        assert_eq!(scheduler.len(), 1);

        time::sleep(Duration::from_secs(31)).await;
        assert_eq!(target.count(View::Dashboard), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_period_is_not_scheduled() {
        let target = CountingTarget::new(View::Dashboard);
        let mut scheduler = RefreshScheduler::new();
        scheduler.schedule_defaults(&config(0, 60), target.clone());

        assert!(!scheduler.is_scheduled(RefreshTask::Dashboard));
        assert!(scheduler.is_scheduled(RefreshTask::Signals));
        time::sleep(Duration::from_secs(5)).await;
        assert_eq!(target.total(), 0);
    }
}
