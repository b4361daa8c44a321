// Mapper to convert dashboard updates to the JSON shape the web client reads
use crate::domain::dashboard::DashboardUpdate;
use crate::domain::notifier::{NotificationEvent, NotificationKind};
use crate::domain::snapshot::{HourlyBucket, TapUsage, UsageTotals};
use serde::Serialize;

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DashboardView {
    pub computed_at: i64,
    pub taps: Vec<TapView>,
    pub totals: TotalsView,
    pub hourly: Vec<BucketView>,
    pub notifications: Vec<NotificationView>,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TapView {
    pub sensor_name: String,
    pub live_flow: f64,
    pub today: f64,
    pub week: f64,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct TotalsView {
    pub today: f64,
    pub week: f64,
    pub month: f64,
    pub lifetime: f64,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct BucketView {
    pub label: String,
    pub liters: f64,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum NotificationView {
    #[serde(rename_all = "camelCase")]
    Milestone {
        liters: f64,
        message: String,
        delay_ms: Option<u64>,
    },
    #[serde(rename_all = "camelCase")]
    Tip {
        threshold: f64,
        message: String,
        delay_ms: Option<u64>,
    },
}

/// Values are rounded to the 2 decimals the dashboard displays
pub fn dashboard_to_view(update: &DashboardUpdate) -> DashboardView {
    DashboardView {
        computed_at: update.computed_at.timestamp_millis(),
        taps: update.snapshot.taps.iter().map(tap_to_view).collect(),
        totals: totals_to_view(&update.snapshot.combined),
        hourly: update.snapshot.hourly.iter().map(bucket_to_view).collect(),
        notifications: update.notifications.iter().map(notification_to_view).collect(),
    }
}

fn tap_to_view(tap: &TapUsage) -> TapView {
    TapView {
        sensor_name: tap.sensor_name.clone(),
        live_flow: round2(tap.live_flow),
        today: round2(tap.today),
        week: round2(tap.week),
    }
}

fn totals_to_view(totals: &UsageTotals) -> TotalsView {
    TotalsView {
        today: round2(totals.today),
        week: round2(totals.week),
        month: round2(totals.month),
        lifetime: round2(totals.lifetime),
    }
}

fn bucket_to_view(bucket: &HourlyBucket) -> BucketView {
    BucketView {
        label: bucket.label.clone(),
        liters: round2(bucket.liters),
    }
}

fn notification_to_view(event: &NotificationEvent) -> NotificationView {
    let message = event.message.clone();
    let delay_ms = event.delay.map(|d| d.as_millis() as u64);
    match event.kind {
        NotificationKind::Milestone { liters } => NotificationView::Milestone {
            liters,
            message,
            delay_ms,
        },
        NotificationKind::Tip { threshold } => NotificationView::Tip {
            threshold,
            message,
            delay_ms,
        },
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
