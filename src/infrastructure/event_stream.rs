// Server-Sent Events stream of dashboard updates
use crate::domain::dashboard::DashboardUpdate;
use crate::infrastructure::json_mapper::dashboard_to_view;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::{Stream, StreamExt};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;

/// One `dashboard` event per update. A client too slow to keep up skips
/// the updates it missed and resumes with the next one.
pub fn dashboard_events(
    rx: broadcast::Receiver<Arc<DashboardUpdate>>,
) -> impl Stream<Item = Result<Event, axum::Error>> {
    BroadcastStream::new(rx).filter_map(|msg| async move {
        match msg {
            Ok(update) => Some(
                Event::default()
                    .event("dashboard")
                    .json_data(dashboard_to_view(&update)),
            ),
            Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                tracing::debug!("Dashboard stream client lagged, skipped {} updates", skipped);
                None
            }
        }
    })
}

pub fn dashboard_sse(
    rx: broadcast::Receiver<Arc<DashboardUpdate>>,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    Sse::new(dashboard_events(rx)).keep_alive(KeepAlive::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::snapshot::{AggregateSnapshot, UsageTotals};
    use chrono::Utc;

    fn update() -> Arc<DashboardUpdate> {
        Arc::new(DashboardUpdate::new(
            Utc::now(),
            AggregateSnapshot {
                taps: Vec::new(),
                combined: UsageTotals::default(),
                hourly: Vec::new(),
            },
            Vec::new(),
        ))
    }

    #[tokio::test]
    async fn test_lagged_client_skips_to_latest() {
        let (tx, rx) = broadcast::channel(2);
        for _ in 0..5 {
            tx.send(update()).unwrap();
        }
        drop(tx);

        let events: Vec<_> = dashboard_events(rx).collect().await;
        assert_eq!(events.len(), 2);
        assert!(events.iter().all(|e| e.is_ok()));
    }
}
