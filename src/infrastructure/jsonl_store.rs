// Newline-delimited JSON sample log
use crate::application::sample_store::{SampleStore, StoreError};
use crate::domain::sample::Sample;
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::PathBuf;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

/// One JSON record per line, appended in arrival order.
#[derive(Debug)]
pub struct JsonLinesStore {
    path: PathBuf,
    // Keeps readers from seeing a half-written line
    io_lock: Mutex<()>,
}

impl JsonLinesStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            io_lock: Mutex::new(()),
        }
    }
}

#[async_trait]
impl SampleStore for JsonLinesStore {
    async fn append(&self, sample: &Sample) -> Result<(), StoreError> {
        let mut line = serde_json::to_vec(sample).map_err(StoreError::Encode)?;
        line.push(b'\n');

        let _guard = self.io_lock.lock().await;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(&line).await?;
        file.flush().await?;
        Ok(())
    }

    async fn all_samples(&self) -> Result<Vec<Sample>, StoreError> {
        let contents = {
            let _guard = self.io_lock.lock().await;
            match tokio::fs::read_to_string(&self.path).await {
                Ok(contents) => contents,
                Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
                Err(e) => return Err(e.into()),
            }
        };

        let mut samples = contents
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(idx, line)| {
                serde_json::from_str::<Sample>(line).map_err(|source| StoreError::Malformed {
                    line: idx + 1,
                    source,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        // Stable: equal timestamps keep file order
        samples.sort_by_key(|s| s.timestamp);
        tracing::trace!("Read {} samples from {}", samples.len(), self.path.display());
        Ok(samples)
    }
}
