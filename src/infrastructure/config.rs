// Configuration - Settings file and environment overrides
use crate::domain::aggregator::WindowSettings;
use crate::domain::notifier::{ThresholdNotifier, UsageTip, default_tips};
use chrono::TimeDelta;
use config::builder::DefaultState;
use config::ConfigBuilder;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AppConfig {
    pub poll_interval_ms: u64,
    pub server: ServerSettings,
    pub store: StoreSettings,
    pub sensor: SensorSettings,
    pub aggregation: AggregationSettings,
    pub notifications: NotificationSettings,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerSettings {
    pub bind_addr: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StoreSettings {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SensorSettings {
    /// Serial device the sensor board writes `name:flow` lines to
    pub serial_port: PathBuf,
    pub baud_rate: u32,
    /// Readings above this many liters/second are dropped at ingestion
    pub max_flow: f64,
    /// Skip the serial device and generate readings
    pub simulate: bool,
    pub taps: Vec<String>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AggregationSettings {
    pub live_window_secs: u32,
    pub week_days: u32,
    pub month_days: u32,
    pub bucket_count: usize,
    pub bucket_width_secs: u32,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct NotificationSettings {
    pub milestone_liters: f64,
    pub stagger_ms: u64,
    pub tips: Vec<TipConfig>,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct TipConfig {
    pub liters: f64,
    pub message: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1000,
            server: ServerSettings::default(),
            store: StoreSettings::default(),
            sensor: SensorSettings::default(),
            aggregation: AggregationSettings::default(),
            notifications: NotificationSettings::default(),
        }
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:3000".to_string(),
        }
    }
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            path: PathBuf::from("water_usage.db"),
        }
    }
}

impl Default for SensorSettings {
    fn default() -> Self {
        Self {
            serial_port: PathBuf::from("/dev/ttyUSB0"),
            baud_rate: 9600,
            max_flow: 10.0,
            simulate: false,
            taps: vec!["tap1".to_string(), "tap2".to_string()],
        }
    }
}

impl Default for AggregationSettings {
    fn default() -> Self {
        Self {
            live_window_secs: 5,
            week_days: 7,
            month_days: 30,
            bucket_count: 12,
            bucket_width_secs: 3600,
        }
    }
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            milestone_liters: 1.0,
            stagger_ms: 500,
            tips: default_tips()
                .into_iter()
                .map(|tip| TipConfig {
                    liters: tip.liters,
                    message: tip.message,
                })
                .collect(),
        }
    }
}

impl AppConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(self.poll_interval_ms > 0, "poll_interval_ms must be positive");
        anyhow::ensure!(!self.sensor.taps.is_empty(), "sensor.taps must name at least one tap");
        anyhow::ensure!(self.sensor.baud_rate > 0, "sensor.baud_rate must be positive");
        anyhow::ensure!(
            self.sensor.max_flow.is_finite() && self.sensor.max_flow > 0.0,
            "sensor.max_flow must be a positive number"
        );

        let agg = &self.aggregation;
        anyhow::ensure!(agg.live_window_secs > 0, "aggregation.live_window_secs must be positive");
        anyhow::ensure!(
            agg.week_days > 0 && agg.month_days > 0,
            "aggregation.week_days and aggregation.month_days must be positive"
        );
        anyhow::ensure!(agg.bucket_count > 0, "aggregation.bucket_count must be positive");
        anyhow::ensure!(agg.bucket_width_secs > 0, "aggregation.bucket_width_secs must be positive");

        let notes = &self.notifications;
        anyhow::ensure!(
            notes.milestone_liters.is_finite() && notes.milestone_liters > 0.0,
            "notifications.milestone_liters must be a positive number"
        );
        if let Some(tip) = notes.tips.iter().find(|t| !t.liters.is_finite()) {
            anyhow::bail!("notification tip {:?} has a non-finite threshold", tip.message);
        }
        Ok(())
    }
}

impl AggregationSettings {
    pub fn window_settings(&self) -> WindowSettings {
        WindowSettings {
            live_window: TimeDelta::seconds(self.live_window_secs.into()),
            week: TimeDelta::days(self.week_days.into()),
            month: TimeDelta::days(self.month_days.into()),
            bucket_count: self.bucket_count,
            bucket_width: TimeDelta::seconds(self.bucket_width_secs.into()),
        }
    }
}

impl NotificationSettings {
    pub fn notifier(&self) -> ThresholdNotifier {
        let tips = self
            .tips
            .iter()
            .map(|t| UsageTip::new(t.liters, t.message.clone()))
            .collect();
        ThresholdNotifier::new(self.milestone_liters, Duration::from_millis(self.stagger_ms), tips)
    }
}

/// Load `config/flowmeter.*` (optional) overridden by `FLOWMETER_*`
/// environment variables, e.g. `FLOWMETER_SERVER__BIND_ADDR`.
pub fn load_app_config() -> anyhow::Result<AppConfig> {
    let builder = config::Config::builder()
        .add_source(config::File::with_name("config/flowmeter").required(false))
        .add_source(
            config::Environment::with_prefix("FLOWMETER")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("sensor.taps"),
        );

    build_app_config(builder)
}

fn build_app_config(builder: ConfigBuilder<DefaultState>) -> anyhow::Result<AppConfig> {
    let app_config: AppConfig = builder.build()?.try_deserialize()?;
    app_config.validate()?;
    Ok(app_config)
}
