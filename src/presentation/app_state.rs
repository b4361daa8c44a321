// Application state for HTTP handlers
use crate::application::dashboard_service::LatestUpdate;
use crate::application::sample_store::SampleStore;
use crate::domain::dashboard::DashboardUpdate;
use std::sync::Arc;
use tokio::sync::{broadcast, watch};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn SampleStore>,
    pub latest: watch::Receiver<LatestUpdate>,
    pub updates: broadcast::Sender<Arc<DashboardUpdate>>,
}
