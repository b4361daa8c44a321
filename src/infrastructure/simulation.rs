// Synthetic sensor readings for running without the sensor board
use rand::Rng;
use std::time::Duration;
use tokio::sync::mpsc;

/// The board reports once per second per tap
pub const READING_PERIOD: Duration = Duration::from_secs(1);

/// Flow ranges (L/s) handed out to simulated taps in turn
const FLOW_RANGES: [(f64, f64); 2] = [(0.01, 0.05), (0.05, 0.10)];

#[derive(Debug, Clone, PartialEq)]
pub struct SimulatedTap {
    pub sensor_name: String,
    pub min_flow: f64,
    pub max_flow: f64,
}

impl SimulatedTap {
    pub fn for_sensors(names: &[String]) -> Vec<Self> {
        names
            .iter()
            .zip(FLOW_RANGES.iter().cycle())
            .map(|(name, &(min_flow, max_flow))| Self {
                sensor_name: name.clone(),
                min_flow,
                max_flow,
            })
            .collect()
    }

    /// One reading in the board's wire format
    pub fn reading_line<R: Rng + ?Sized>(&self, rng: &mut R) -> String {
        let flow = rng.gen_range(self.min_flow..self.max_flow);
        format!("{}:{:.4}", self.sensor_name, flow)
    }
}

/// Emit one reading per tap every `period` until ingestion hangs up
pub async fn run(taps: Vec<SimulatedTap>, period: Duration, tx: mpsc::Sender<String>) {
    tracing::info!(
        "Starting SIMULATION MODE: generating readings for {} taps every {:?}",
        taps.len(),
        period
    );

    let mut ticker = tokio::time::interval(period);
    loop {
        ticker.tick().await;
        let lines: Vec<String> = {
            let mut rng = rand::thread_rng();
            taps.iter().map(|tap| tap.reading_line(&mut rng)).collect()
        };
        for line in lines {
            if tx.send(line).await.is_err() {
                return;
            }
        }
    }
}
