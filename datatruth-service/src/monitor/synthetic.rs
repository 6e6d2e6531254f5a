use async_trait::async_trait;
use datatruth_core::domain::DeviceUsageSample;
use rand::Rng;
use time::{OffsetDateTime, Time};

use crate::monitor::{new_sample_id, DataMonitor, MonitorError};

/// Measurement source for platforms without readable byte counters.
///
/// Synthesizes samples from configured daily rates with a small jitter, so
/// the rest of the system can be exercised end to end without entitlement.
pub struct SyntheticMonitor {
    operator: String,
    daily_mobile_bytes: i64,
    daily_wifi_bytes: i64,
}

impl SyntheticMonitor {
    pub fn new(operator: impl Into<String>, daily_mobile_bytes: i64, daily_wifi_bytes: i64) -> Self {
        Self {
            operator: operator.into(),
            daily_mobile_bytes,
            daily_wifi_bytes,
        }
    }

    fn sample_for_days(&self, days: f64, timestamp: OffsetDateTime) -> DeviceUsageSample {
        let jitter = rand::thread_rng().gen_range(0.95..1.05);
        let mobile = (self.daily_mobile_bytes as f64 * days * jitter).max(0.0) as i64;
        let wifi = (self.daily_wifi_bytes as f64 * days * jitter).max(0.0) as i64;
        DeviceUsageSample::new(new_sample_id(), timestamp, mobile, wifi)
    }
}

#[async_trait]
impl DataMonitor for SyntheticMonitor {
    async fn current_usage(&self) -> Result<DeviceUsageSample, MonitorError> {
        let now = OffsetDateTime::now_utc();
        let midnight = now.replace_time(Time::MIDNIGHT);
        let day_fraction = (now - midnight).whole_seconds() as f64 / 86_400.0;
        Ok(self.sample_for_days(day_fraction, now))
    }

    async fn usage_in_range(
        &self,
        start: OffsetDateTime,
        end: OffsetDateTime,
    ) -> Result<Option<DeviceUsageSample>, MonitorError> {
        if end <= start {
            return Ok(None);
        }
        let days = (end - start).whole_seconds() as f64 / 86_400.0;
        Ok(Some(self.sample_for_days(days, end)))
    }

    async fn current_month_usage(&self) -> Result<Option<DeviceUsageSample>, MonitorError> {
        let now = OffsetDateTime::now_utc();
        let midnight = now.replace_time(Time::MIDNIGHT);
        let day_fraction = (now - midnight).whole_seconds() as f64 / 86_400.0;
        let days = f64::from(now.day() - 1) + day_fraction;
        Ok(Some(self.sample_for_days(days, now)))
    }

    fn operator_name(&self) -> String {
        self.operator.clone()
    }

    fn has_mobile_data_capability(&self) -> bool {
        self.daily_mobile_bytes > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn samples_scale_with_days_within_jitter() {
        let monitor = SyntheticMonitor::new("Acme Mobile", 100_000_000, 400_000_000);
        let ts = datetime!(2024-03-10 00:00 UTC);

        for _ in 0..50 {
            let sample = monitor.sample_for_days(10.0, ts);
            assert!(sample.mobile_bytes >= 950_000_000 && sample.mobile_bytes <= 1_050_000_000);
            assert!(sample.wifi_bytes >= 3_800_000_000 && sample.wifi_bytes <= 4_200_000_000);
            assert_eq!(
                sample.total_bytes,
                sample.mobile_bytes + sample.wifi_bytes
            );
        }
    }

    #[test]
    fn zero_days_is_a_zero_sample() {
        let monitor = SyntheticMonitor::new("Acme Mobile", 100_000_000, 400_000_000);
        let sample = monitor.sample_for_days(0.0, datetime!(2024-03-10 00:00 UTC));
        assert_eq!(sample.total_bytes, 0);
    }

    #[tokio::test]
    async fn inverted_range_yields_nothing() {
        let monitor = SyntheticMonitor::new("Acme Mobile", 100_000_000, 400_000_000);
        let range = monitor
            .usage_in_range(
                datetime!(2024-03-10 00:00 UTC),
                datetime!(2024-03-09 00:00 UTC),
            )
            .await
            .unwrap();
        assert!(range.is_none());
    }

    #[tokio::test]
    async fn month_usage_is_always_available() {
        let monitor = SyntheticMonitor::new("Acme Mobile", 100_000_000, 400_000_000);
        assert!(monitor.current_month_usage().await.unwrap().is_some());
        assert!(monitor.has_mobile_data_capability());
    }

    #[test]
    fn wifi_only_setup_reports_no_mobile_capability() {
        let monitor = SyntheticMonitor::new("Acme Mobile", 0, 400_000_000);
        assert!(!monitor.has_mobile_data_capability());
    }
}
