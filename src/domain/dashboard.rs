// Dashboard domain model: one poll cycle's output
use chrono::{DateTime, Utc};

use super::notifier::NotificationEvent;
use super::snapshot::AggregateSnapshot;

#[derive(Debug, Clone, PartialEq)]
pub struct DashboardUpdate {
    pub computed_at: DateTime<Utc>,
    pub snapshot: AggregateSnapshot,
    pub notifications: Vec<NotificationEvent>,
}

impl DashboardUpdate {
    pub fn new(
        computed_at: DateTime<Utc>,
        snapshot: AggregateSnapshot,
        notifications: Vec<NotificationEvent>,
    ) -> Self {
        Self {
            computed_at,
            snapshot,
            notifications,
        }
    }
}
