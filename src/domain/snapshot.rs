// Aggregated usage snapshot, recomputed every poll cycle

#[derive(Debug, Clone, PartialEq)]
pub struct TapUsage {
    pub sensor_name: String,
    /// Mean flow over the live window, in liters/second. Zero when idle.
    pub live_flow: f64,
    pub today: f64,
    pub week: f64,
}

/// Combined liters over the rolling windows.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct UsageTotals {
    pub today: f64,
    pub week: f64,
    pub month: f64,
    pub lifetime: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HourlyBucket {
    /// Wall-clock `HH:MM` of the bucket start.
    pub label: String,
    pub liters: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AggregateSnapshot {
    pub taps: Vec<TapUsage>,
    pub combined: UsageTotals,
    /// Oldest bucket first.
    pub hourly: Vec<HourlyBucket>,
}

impl AggregateSnapshot {
    #[cfg(test)]
    pub fn tap(&self, sensor_name: &str) -> Option<&TapUsage> {
        self.taps.iter().find(|t| t.sensor_name == sensor_name)
    }
}
