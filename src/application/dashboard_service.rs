// Dashboard service - Poll cycle driving aggregation and notifications
use crate::application::sample_store::{SampleStore, StoreError};
use crate::domain::aggregator::WindowAggregator;
use crate::domain::dashboard::DashboardUpdate;
use crate::domain::notifier::{NotifierState, ThresholdNotifier};
use chrono::{DateTime, Local, TimeZone, Utc};
use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tokio::time::MissedTickBehavior;

const UPDATE_CHANNEL_CAPACITY: usize = 16;

pub type LatestUpdate = Option<Arc<DashboardUpdate>>;

/// Owns the notifier state for one dashboard. Cycles run one at a time on
/// `&mut self`, so notifier updates can never interleave.
pub struct DashboardService {
    store: Arc<dyn SampleStore>,
    aggregator: WindowAggregator,
    notifier: ThresholdNotifier,
    state: NotifierState,
    latest: watch::Sender<LatestUpdate>,
    updates: broadcast::Sender<Arc<DashboardUpdate>>,
}

impl DashboardService {
    pub fn new(
        store: Arc<dyn SampleStore>,
        aggregator: WindowAggregator,
        notifier: ThresholdNotifier,
    ) -> Self {
        let (latest, _) = watch::channel(None);
        let (updates, _) = broadcast::channel(UPDATE_CHANNEL_CAPACITY);
        Self {
            store,
            aggregator,
            notifier,
            state: NotifierState::default(),
            latest,
            updates,
        }
    }

    /// Receiver that always holds the most recent successful cycle
    pub fn latest(&self) -> watch::Receiver<LatestUpdate> {
        self.latest.subscribe()
    }

    /// Sender side of the per-cycle update stream, for new subscribers
    pub fn updates(&self) -> broadcast::Sender<Arc<DashboardUpdate>> {
        self.updates.clone()
    }

    #[cfg(test)]
    pub fn notifier_state(&self) -> NotifierState {
        self.state
    }

    /// One poll cycle. A failed fetch returns before anything is computed,
    /// leaving the notifier state and the published update untouched.
    pub async fn run_cycle<Tz>(
        &mut self,
        now: &DateTime<Tz>,
    ) -> Result<Arc<DashboardUpdate>, StoreError>
    where
        Tz: TimeZone,
        Tz::Offset: Display,
    {
        let samples = self.store.all_samples().await?;

        let snapshot = self.aggregator.aggregate(&samples, now);
        let notifications = self
            .notifier
            .check_thresholds(snapshot.combined.lifetime, &mut self.state);

        tracing::debug!(
            "Cycle over {} samples: lifetime {:.2} L, {} notifications",
            samples.len(),
            snapshot.combined.lifetime,
            notifications.len()
        );
        for event in &notifications {
            tracing::info!("Notification: {}", event.message);
        }

        let update = Arc::new(DashboardUpdate::new(
            now.with_timezone(&Utc),
            snapshot,
            notifications,
        ));
        self.latest.send_replace(Some(update.clone()));
        // No subscribers is fine
        let _ = self.updates.send(update.clone());

        Ok(update)
    }

    /// Run a cycle every `poll_interval` forever. Ticks that come due while
    /// a slow cycle is still running are skipped.
    pub async fn run(mut self, poll_interval: Duration) {
        let mut ticker = tokio::time::interval(poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        tracing::info!("Dashboard polling every {:?}", poll_interval);
        loop {
            ticker.tick().await;
            if let Err(e) = self.run_cycle(&Local::now()).await {
                tracing::warn!("Dashboard cycle skipped: {}", e);
            }
        }
    }
}
