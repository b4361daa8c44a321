// Ingestion service - Validates raw sensor lines and appends them to the log
use crate::application::sample_store::{SampleStore, StoreError};
use crate::domain::sample::{Sample, SensorReading};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::mpsc;

#[derive(Clone)]
pub struct IngestionService {
    store: Arc<dyn SampleStore>,
    max_flow: f64,
}

impl IngestionService {
    pub fn new(store: Arc<dyn SampleStore>, max_flow: f64) -> Self {
        Self { store, max_flow }
    }

    /// Parse one sensor line and persist it stamped with `now`.
    /// Returns `Ok(None)` when the line is rejected.
    pub async fn ingest_line(
        &self,
        line: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Sample>, StoreError> {
        let parsed = SensorReading::parse(line).and_then(|r| r.within_limit(self.max_flow));
        let reading = match parsed {
            Ok(reading) => reading,
            Err(e) => {
                tracing::debug!("Rejected sensor line {:?}: {}", line, e);
                return Ok(None);
            }
        };

        let sample = reading.into_sample(now);
        self.store.append(&sample).await?;
        Ok(Some(sample))
    }

    /// Drain sensor lines until every source has hung up
    pub async fn run(self, mut lines: mpsc::Receiver<String>) {
        while let Some(line) = lines.recv().await {
            if let Err(e) = self.ingest_line(&line, Utc::now()).await {
                tracing::error!("Error saving sample from {:?}: {}", line, e);
            }
        }
        tracing::info!("Sensor sources closed, ingestion stopped");
    }
}
