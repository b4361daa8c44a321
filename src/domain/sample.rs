// Flow sample domain model
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One timestamped flow reading from one tap sensor.
///
/// `flow_rate` is persisted under the `flowRateLPM` key. The sensors report
/// liters/second, but every total treats the stored number as liters/minute
/// and divides by 60 (see [`Sample::liters`]). Kept for compatibility with
/// existing record logs until the sensors are recalibrated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "sensorName")]
    pub sensor_name: String,
    #[serde(rename = "flowRateLPM")]
    pub flow_rate: f64,
}

impl Sample {
    pub fn new(timestamp: DateTime<Utc>, sensor_name: impl Into<String>, flow_rate: f64) -> Self {
        Self {
            timestamp,
            sensor_name: sensor_name.into(),
            flow_rate,
        }
    }

    /// Liters contributed by this sample over one poll tick.
    pub fn liters(&self) -> f64 {
        self.flow_rate / 60.0
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum ReadingError {
    #[error("missing sensor name in {0:?}")]
    MissingSensor(String),
    #[error("unparseable flow rate {0:?}")]
    InvalidFlow(String),
    #[error("flow rate {0} is not a positive finite number")]
    NonPositiveFlow(f64),
    #[error("flow rate {flow} exceeds the sensor maximum of {max}")]
    ImplausibleFlow { flow: f64, max: f64 },
}

/// A parsed `<sensorName>:<flowRate>` line, not yet stamped with a time.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorReading {
    pub sensor_name: String,
    pub flow_rate: f64,
}

impl SensorReading {
    /// Parse one line of the sensor wire format.
    ///
    /// Zero flow is rejected along with negative and non-finite values: an
    /// idle tap produces no record.
    pub fn parse(line: &str) -> Result<Self, ReadingError> {
        let (name, flow) = line
            .split_once(':')
            .ok_or_else(|| ReadingError::MissingSensor(line.to_string()))?;

        let sensor_name = name.trim();
        if sensor_name.is_empty() {
            return Err(ReadingError::MissingSensor(line.to_string()));
        }

        let flow_rate: f64 = flow
            .trim()
            .parse()
            .map_err(|_| ReadingError::InvalidFlow(flow.trim().to_string()))?;

        if !flow_rate.is_finite() || flow_rate <= 0.0 {
            return Err(ReadingError::NonPositiveFlow(flow_rate));
        }

        Ok(Self {
            sensor_name: sensor_name.to_string(),
            flow_rate,
        })
    }

    /// Reject readings above what a tap sensor can physically report.
    pub fn within_limit(self, max_flow: f64) -> Result<Self, ReadingError> {
        if self.flow_rate > max_flow {
            return Err(ReadingError::ImplausibleFlow {
                flow: self.flow_rate,
                max: max_flow,
            });
        }
        Ok(self)
    }

    pub fn into_sample(self, now: DateTime<Utc>) -> Sample {
        Sample::new(now, self.sensor_name, self.flow_rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_reading() {
        let reading = SensorReading::parse(" tap1 :0.0312").unwrap();
        assert_eq!(reading.sensor_name, "tap1");
        assert_eq!(reading.flow_rate, 0.0312);
    }

    #[test]
    fn test_parse_rejects_malformed_lines() {
        assert_eq!(
            SensorReading::parse("tap1 0.5"),
            Err(ReadingError::MissingSensor("tap1 0.5".to_string()))
        );
        assert!(matches!(SensorReading::parse("  :0.5"), Err(ReadingError::MissingSensor(_))));
        assert!(matches!(SensorReading::parse("tap2:abc"), Err(ReadingError::InvalidFlow(_))));
        assert!(matches!(SensorReading::parse("tap2:0"), Err(ReadingError::NonPositiveFlow(_))));
        assert!(matches!(SensorReading::parse("tap2:-1.5"), Err(ReadingError::NonPositiveFlow(_))));
        assert!(matches!(SensorReading::parse("tap2:NaN"), Err(ReadingError::NonPositiveFlow(_))));
        assert!(matches!(SensorReading::parse("tap2:inf"), Err(ReadingError::NonPositiveFlow(_))));
        assert!(matches!(SensorReading::parse("tap1:0.5:x"), Err(ReadingError::InvalidFlow(_))));
        assert!(matches!(SensorReading::parse("tap1:0.5abc"), Err(ReadingError::InvalidFlow(_))));
    }

    #[test]
    fn test_flow_limit() {
        let reading = SensorReading::parse("tap1:1e15").unwrap();
        assert_eq!(
            reading.within_limit(10.0),
            Err(ReadingError::ImplausibleFlow { flow: 1e15, max: 10.0 })
        );

        let reading = SensorReading::parse("tap1:10").unwrap();
        assert_eq!(reading.clone().within_limit(10.0), Ok(reading));
    }

    #[test]
    fn test_liters_divides_stored_rate_by_sixty() {
        let sample = Sample::new(Utc::now(), "tap1", 3.0);
        assert_eq!(sample.liters(), 0.05);
    }

    #[test]
    fn test_record_json_layout() {
        let ts = Utc.timestamp_millis_opt(1_700_000_000_123).unwrap();
        let sample = SensorReading::parse("tap2:0.07").unwrap().into_sample(ts);

        let json = serde_json::to_value(&sample).unwrap();
        assert_eq!(json["timestamp"], 1_700_000_000_123_i64);
        assert_eq!(json["sensorName"], "tap2");
        assert_eq!(json["flowRateLPM"], 0.07);

        // Records written by older builds carry an extra `_id` key.
        let legacy = r#"{"timestamp":1700000000123,"sensorName":"tap2","flowRateLPM":0.07,"_id":"x1"}"#;
        let parsed: Sample = serde_json::from_str(legacy).unwrap();
        assert_eq!(parsed, sample);
    }
}
