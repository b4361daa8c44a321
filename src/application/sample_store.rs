// Repository trait for the flow sample log
use crate::domain::sample::Sample;
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sample log I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed record on line {line}: {source}")]
    Malformed {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to encode sample: {0}")]
    Encode(#[source] serde_json::Error),
}

/// Append-only log of flow samples.
#[async_trait]
pub trait SampleStore: Send + Sync {
    /// Durably append one sample
    async fn append(&self, sample: &Sample) -> Result<(), StoreError>;

    /// Every stored sample, oldest first. Samples sharing a timestamp keep
    /// their insertion order.
    async fn all_samples(&self) -> Result<Vec<Sample>, StoreError>;
}

#[cfg(test)]
pub mod memory {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// In-memory store for service tests; `set_failing` makes reads error.
    #[derive(Default)]
    pub struct MemoryStore {
        samples: Mutex<Vec<Sample>>,
        failing: AtomicBool,
    }

    impl MemoryStore {
        pub fn with_samples(samples: Vec<Sample>) -> Self {
            Self {
                samples: Mutex::new(samples),
                failing: AtomicBool::new(false),
            }
        }

        pub fn set_failing(&self, failing: bool) {
            self.failing.store(failing, Ordering::SeqCst);
        }

        pub fn len(&self) -> usize {
            self.samples.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl SampleStore for MemoryStore {
        async fn append(&self, sample: &Sample) -> Result<(), StoreError> {
            self.samples.lock().unwrap().push(sample.clone());
            Ok(())
        }

        async fn all_samples(&self) -> Result<Vec<Sample>, StoreError> {
            if self.failing.load(Ordering::SeqCst) {
                return Err(StoreError::Io(std::io::Error::other("store offline")));
            }
            let mut samples = self.samples.lock().unwrap().clone();
            samples.sort_by_key(|s| s.timestamp);
            Ok(samples)
        }
    }
}
