use async_trait::async_trait;
use datatruth_core::domain::{unix_millis, ProviderReport, SampleSource};
use rand::Rng;
use time::OffsetDateTime;

/// Allowance advertised by the mock carrier: 5 GB.
pub const MOCK_DATA_LIMIT_BYTES: i64 = 5_000_000_000;

#[derive(thiserror::Error, Debug)]
pub enum ProviderError {
    #[error("provider request failed: {0}")]
    Request(String),
}

/// The seam a carrier-API client implements. `device_baseline_bytes` is a
/// hint for synthetic implementations; a live client queries the carrier
/// and ignores it.
#[async_trait]
pub trait ProviderClient: Send + Sync {
    fn provider_name(&self) -> &str;

    async fn fetch_report(
        &self,
        device_baseline_bytes: i64,
    ) -> Result<ProviderReport, ProviderError>;
}

/// Synthesizes carrier reports by scaling the device-measured usage with
/// billing noise in `[0.9, 1.1)`.
pub struct MockProviderClient {
    provider_name: String,
}

impl MockProviderClient {
    pub fn new(provider_name: impl Into<String>) -> Self {
        Self {
            provider_name: provider_name.into(),
        }
    }

    pub fn generate(&self, actual_device_usage: i64, now: OffsetDateTime) -> ProviderReport {
        let factor = rand::thread_rng().gen_range(0.9..1.1);
        let reported_bytes = (actual_device_usage as f64 * factor) as i64;

        ProviderReport {
            id: format!("provider_{}", unix_millis(now)),
            timestamp: now,
            reported_bytes,
            // Goes negative when the report exceeds the limit; not clamped.
            remaining_bytes: Some(MOCK_DATA_LIMIT_BYTES - reported_bytes),
            data_limit_bytes: Some(MOCK_DATA_LIMIT_BYTES),
            provider_name: self.provider_name.clone(),
            source: SampleSource::Provider,
        }
    }
}

#[async_trait]
impl ProviderClient for MockProviderClient {
    fn provider_name(&self) -> &str {
        &self.provider_name
    }

    async fn fetch_report(
        &self,
        device_baseline_bytes: i64,
    ) -> Result<ProviderReport, ProviderError> {
        Ok(self.generate(device_baseline_bytes, OffsetDateTime::now_utc()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn reports_stay_within_billing_noise() {
        let client = MockProviderClient::new("Acme Mobile");
        let now = datetime!(2024-01-02 10:00 UTC);
        let usage = 2_000_000_000;

        for _ in 0..50 {
            let report = client.generate(usage, now);
            assert!(report.reported_bytes >= 1_800_000_000);
            assert!(report.reported_bytes <= 2_200_000_000);
            assert_eq!(report.data_limit_bytes, Some(MOCK_DATA_LIMIT_BYTES));
            assert_eq!(
                report.remaining_bytes,
                Some(MOCK_DATA_LIMIT_BYTES - report.reported_bytes)
            );
            assert_eq!(report.provider_name, "Acme Mobile");
            assert_eq!(report.source, SampleSource::Provider);
        }
    }

    #[test]
    fn remaining_goes_negative_past_the_limit() {
        let client = MockProviderClient::new("Acme Mobile");
        let report = client.generate(10_000_000_000, datetime!(2024-01-02 10:00 UTC));
        assert!(report.remaining_bytes.unwrap() < 0);
    }

    #[test]
    fn report_ids_derive_from_the_instant() {
        let client = MockProviderClient::new("Acme Mobile");
        let now = datetime!(2024-01-02 10:00 UTC);
        let report = client.generate(1_000, now);
        assert_eq!(report.id, format!("provider_{}", unix_millis(now)));
    }
}
