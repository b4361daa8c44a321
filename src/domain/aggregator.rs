// Window aggregator - Usage windows recomputed from the full sample log
//
// Nothing is carried between calls: the same log and the same `now` always
// produce the same snapshot.
use chrono::{DateTime, LocalResult, NaiveTime, Offset, TimeDelta, TimeZone, Utc};
use std::fmt::Display;

use super::sample::Sample;
use super::snapshot::{AggregateSnapshot, HourlyBucket, TapUsage, UsageTotals};

#[derive(Debug, Clone, PartialEq)]
pub struct WindowSettings {
    pub live_window: TimeDelta,
    pub week: TimeDelta,
    pub month: TimeDelta,
    pub bucket_count: usize,
    pub bucket_width: TimeDelta,
}

impl Default for WindowSettings {
    fn default() -> Self {
        Self {
            live_window: TimeDelta::seconds(5),
            week: TimeDelta::days(7),
            month: TimeDelta::days(30),
            bucket_count: 12,
            bucket_width: TimeDelta::hours(1),
        }
    }
}

#[derive(Debug, Clone)]
pub struct WindowAggregator {
    taps: Vec<String>,
    settings: WindowSettings,
}

impl WindowAggregator {
    pub fn new(taps: Vec<String>, settings: WindowSettings) -> Self {
        Self { taps, settings }
    }

    /// Compute the snapshot for `log` as seen at `now`.
    ///
    /// `now`'s timezone decides where "today" starts and how bucket labels
    /// read; window arithmetic itself is done in UTC.
    pub fn aggregate<Tz>(&self, log: &[Sample], now: &DateTime<Tz>) -> AggregateSnapshot
    where
        Tz: TimeZone,
        Tz::Offset: Display,
    {
        let now_utc = now.with_timezone(&Utc);
        let today_start = local_midnight(now);
        let week_start = now_utc - self.settings.week;
        let month_start = now_utc - self.settings.month;
        let live_start = now_utc - self.settings.live_window;

        let taps: Vec<TapUsage> = self
            .taps
            .iter()
            .map(|name| {
                let readings: Vec<&Sample> =
                    log.iter().filter(|s| &s.sensor_name == name).collect();

                TapUsage {
                    sensor_name: name.clone(),
                    live_flow: mean_flow_since(&readings, live_start),
                    today: liters_since(readings.iter().copied(), Some(today_start)),
                    week: liters_since(readings.iter().copied(), Some(week_start)),
                }
            })
            .collect();

        let combined = UsageTotals {
            today: taps.iter().fold(0.0, |acc, t| acc + t.today),
            week: taps.iter().fold(0.0, |acc, t| acc + t.week),
            month: liters_since(log, Some(month_start)),
            lifetime: liters_since(log, None),
        };

        AggregateSnapshot {
            taps,
            combined,
            hourly: self.hourly_buckets(log, now),
        }
    }

    /// Bucket `k` (oldest first) holds samples that are between
    /// `count-1-k` and `count-k` bucket widths old. Samples older than
    /// `count` widths, or stamped after `now`, fall in no bucket.
    fn hourly_buckets<Tz>(&self, log: &[Sample], now: &DateTime<Tz>) -> Vec<HourlyBucket>
    where
        Tz: TimeZone,
        Tz::Offset: Display,
    {
        let count = self.settings.bucket_count;
        let width_ms = self.settings.bucket_width.num_milliseconds().max(1);
        let now_utc = now.with_timezone(&Utc);

        let mut liters = vec![0.0; count];
        for sample in log {
            let widths_ago = (now_utc - sample.timestamp)
                .num_milliseconds()
                .div_euclid(width_ms);
            let index = count as i64 - 1 - widths_ago;
            if (0..count as i64).contains(&index) {
                liters[index as usize] += sample.liters();
            }
        }

        liters
            .into_iter()
            .enumerate()
            .map(|(k, liters)| {
                let start = now.clone() - self.settings.bucket_width * (count - k) as i32;
                HourlyBucket {
                    label: start.format("%H:%M").to_string(),
                    liters,
                }
            })
            .collect()
    }
}

fn mean_flow_since(readings: &[&Sample], start: DateTime<Utc>) -> f64 {
    let (sum, n) = readings
        .iter()
        .filter(|s| s.timestamp >= start)
        .fold((0.0, 0usize), |(sum, n), s| (sum + s.flow_rate, n + 1));

    if n == 0 { 0.0 } else { sum / n as f64 }
}

fn liters_since<'a>(
    samples: impl IntoIterator<Item = &'a Sample>,
    start: Option<DateTime<Utc>>,
) -> f64 {
    samples
        .into_iter()
        .filter(|s| start.is_none_or(|t| s.timestamp >= t))
        .fold(0.0, |acc, s| acc + s.liters())
}

/// Midnight at the start of `now`'s local day, as a UTC instant.
fn local_midnight<Tz: TimeZone>(now: &DateTime<Tz>) -> DateTime<Utc> {
    let naive = now.date_naive().and_time(NaiveTime::MIN);
    match now.timezone().from_local_datetime(&naive) {
        LocalResult::Single(t) | LocalResult::Ambiguous(t, _) => t.with_timezone(&Utc),
        // Midnight skipped by a DST jump: use the current offset.
        LocalResult::None => {
            let offset = now.offset().fix().local_minus_utc();
            naive.and_utc() - TimeDelta::seconds(offset as i64)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;

    fn now() -> DateTime<FixedOffset> {
        // 14:30 local, UTC+2
        FixedOffset::east_opt(2 * 3600)
            .unwrap()
            .with_ymd_and_hms(2024, 3, 14, 14, 30, 0)
            .unwrap()
    }

    fn aggregator() -> WindowAggregator {
        WindowAggregator::new(vec!["tap1".into(), "tap2".into()], WindowSettings::default())
    }

    fn sample_ago(sensor: &str, ago: TimeDelta, flow: f64) -> Sample {
        Sample::new(now().with_timezone(&Utc) - ago, sensor, flow)
    }

    fn mixed_log() -> Vec<Sample> {
        vec![
            sample_ago("tap1", TimeDelta::days(45), 6.0),
            sample_ago("tap2", TimeDelta::days(20), 12.0),
            sample_ago("tap1", TimeDelta::days(3), 3.0),
            sample_ago("tap2", TimeDelta::hours(20), 1.2),
            sample_ago("tap1", TimeDelta::hours(5), 0.6),
            sample_ago("tap2", TimeDelta::hours(2), 0.3),
            sample_ago("tap1", TimeDelta::seconds(3), 0.04),
            sample_ago("tap1", TimeDelta::seconds(1), 0.02),
            sample_ago("tap2", TimeDelta::seconds(2), 0.08),
        ]
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_empty_log() {
        let snapshot = aggregator().aggregate(&[], &now());

        assert_eq!(snapshot.combined, UsageTotals::default());
        for tap in &snapshot.taps {
            assert_eq!(tap.live_flow, 0.0);
            assert_eq!(tap.today, 0.0);
            assert_eq!(tap.week, 0.0);
        }
        assert_eq!(snapshot.hourly.len(), 12);
        assert!(snapshot.hourly.iter().all(|b| b.liters == 0.0 && !b.label.is_empty()));
        assert_eq!(snapshot.hourly[0].label, "02:30");
        assert_eq!(snapshot.hourly[11].label, "13:30");
    }

    #[test]
    fn test_live_flow_is_mean_of_recent_samples() {
        let snapshot = aggregator().aggregate(&mixed_log(), &now());

        assert!(close(snapshot.tap("tap1").unwrap().live_flow, 0.03));
        assert!(close(snapshot.tap("tap2").unwrap().live_flow, 0.08));
    }

    #[test]
    fn test_live_flow_without_recent_samples_is_zero() {
        let log = vec![sample_ago("tap1", TimeDelta::seconds(6), 0.5)];
        let snapshot = aggregator().aggregate(&log, &now());

        assert_eq!(snapshot.tap("tap1").unwrap().live_flow, 0.0);
        assert_eq!(snapshot.tap("tap2").unwrap().live_flow, 0.0);
    }

    #[test]
    fn test_live_window_includes_its_boundary() {
        let log = vec![sample_ago("tap1", TimeDelta::seconds(5), 0.5)];
        let snapshot = aggregator().aggregate(&log, &now());

        assert_eq!(snapshot.tap("tap1").unwrap().live_flow, 0.5);
    }

    #[test]
    fn test_rolling_totals() {
        let snapshot = aggregator().aggregate(&mixed_log(), &now());
        let tap1 = snapshot.tap("tap1").unwrap();
        let tap2 = snapshot.tap("tap2").unwrap();

        // Today started at 00:00 local, 14.5h ago.
        assert!(close(tap1.today, (0.6 + 0.04 + 0.02) / 60.0));
        assert!(close(tap2.today, (0.3 + 0.08) / 60.0));
        assert!(close(tap1.week, (3.0 + 0.6 + 0.04 + 0.02) / 60.0));
        assert!(close(tap2.week, (1.2 + 0.3 + 0.08) / 60.0));
        assert!(close(snapshot.combined.month, (12.0 + 3.0 + 1.2 + 0.6 + 0.3 + 0.14) / 60.0));
        assert!(close(snapshot.combined.lifetime, (6.0 + 12.0 + 3.0 + 1.2 + 0.6 + 0.3 + 0.14) / 60.0));
    }

    #[test]
    fn test_combined_totals_are_additive() {
        let snapshot = aggregator().aggregate(&mixed_log(), &now());
        let today: f64 = snapshot.taps.iter().map(|t| t.today).sum();
        let week: f64 = snapshot.taps.iter().map(|t| t.week).sum();

        assert_eq!(snapshot.combined.today, today);
        assert_eq!(snapshot.combined.week, week);
    }

    #[test]
    fn test_month_and_lifetime_match_per_tap_sums() {
        let log = mixed_log();
        let now = now();
        let snapshot = aggregator().aggregate(&log, &now);
        let month_start = now.with_timezone(&Utc) - TimeDelta::days(30);

        let per_tap = |start: Option<DateTime<Utc>>| {
            ["tap1", "tap2"]
                .iter()
                .map(|name| liters_since(log.iter().filter(|s| s.sensor_name == *name), start))
                .sum::<f64>()
        };

        assert!(close(snapshot.combined.month, per_tap(Some(month_start))));
        assert!(close(snapshot.combined.lifetime, per_tap(None)));
    }

    #[test]
    fn test_today_follows_local_midnight() {
        // 01:00 local is 23:00 UTC the previous day.
        let log = vec![
            sample_ago("tap1", TimeDelta::minutes(13 * 60 + 30), 6.0),
            sample_ago("tap1", TimeDelta::minutes(15 * 60), 60.0),
        ];
        let snapshot = aggregator().aggregate(&log, &now());

        assert!(close(snapshot.tap("tap1").unwrap().today, 0.1));
    }

    #[test]
    fn test_hourly_bucket_boundaries() {
        let log = vec![
            sample_ago("tap1", TimeDelta::milliseconds(43_164_000), 6.0), // 11.99h
            sample_ago("tap2", TimeDelta::milliseconds(36_000), 12.0),    // 0.01h
            sample_ago("tap1", TimeDelta::hours(12), 60.0),               // 12.0h
        ];
        let snapshot = aggregator().aggregate(&log, &now());
        let liters: Vec<f64> = snapshot.hourly.iter().map(|b| b.liters).collect();

        assert!(close(liters[0], 0.1));
        assert!(close(liters[11], 0.2));
        assert!(close(liters.iter().sum::<f64>(), 0.3));
    }

    #[test]
    fn test_future_samples_fall_in_no_bucket() {
        let log = vec![sample_ago("tap1", TimeDelta::seconds(-30), 6.0)];
        let snapshot = aggregator().aggregate(&log, &now());

        assert!(snapshot.hourly.iter().all(|b| b.liters == 0.0));
        assert!(close(snapshot.combined.lifetime, 0.1));
    }

    #[test]
    fn test_custom_bucket_layout() {
        let settings = WindowSettings {
            bucket_count: 4,
            bucket_width: TimeDelta::minutes(30),
            ..WindowSettings::default()
        };
        let aggregator = WindowAggregator::new(vec!["tap1".into()], settings);
        let log = vec![
            sample_ago("tap1", TimeDelta::minutes(95), 6.0),
            sample_ago("tap1", TimeDelta::minutes(10), 6.0),
            sample_ago("tap1", TimeDelta::minutes(125), 6.0),
        ];
        let snapshot = aggregator.aggregate(&log, &now());

        let labels: Vec<&str> = snapshot.hourly.iter().map(|b| b.label.as_str()).collect();
        assert_eq!(labels, ["12:30", "13:00", "13:30", "14:00"]);
        assert!(close(snapshot.hourly[0].liters, 0.1));
        assert!(close(snapshot.hourly[3].liters, 0.1));
    }

    #[test]
    fn test_aggregate_is_repeatable() {
        let aggregator = aggregator();
        let log = mixed_log();

        let first = aggregator.aggregate(&log, &now());
        let second = aggregator.aggregate(&log, &now());
        assert_eq!(first, second);
    }

    #[test]
    fn test_unknown_sensors_count_only_toward_month_and_lifetime() {
        let log = vec![
            sample_ago("tap1", TimeDelta::minutes(1), 6.0),
            sample_ago("garden", TimeDelta::minutes(1), 6.0),
        ];
        let snapshot = aggregator().aggregate(&log, &now());

        assert!(close(snapshot.combined.today, 0.1));
        assert!(close(snapshot.combined.month, 0.2));
    }
}
