mod data_plan;
mod discrepancy;
mod provider_report;
mod usage_sample;
mod usage_summary;

pub use data_plan::{
    DataPlan, PlanValidationError, DEFAULT_ALERT_THRESHOLD_PERCENTAGE,
    DEFAULT_DISCREPANCY_THRESHOLD_PERCENTAGE,
};
pub use discrepancy::{Discrepancy, ParseSeverityError, Severity};
pub use provider_report::ProviderReport;
pub use usage_sample::{DeviceUsageSample, SampleSource};
pub use usage_summary::UsageSummary;

use time::OffsetDateTime;

pub fn bytes_to_mb(bytes: i64) -> f64 {
    bytes as f64 / (1024.0 * 1024.0)
}

pub fn bytes_to_gb(bytes: i64) -> f64 {
    bytes as f64 / (1024.0 * 1024.0 * 1024.0)
}

/// Unix-millisecond view of an instant; the storage layer and synthetic
/// identifiers both use this representation.
pub fn unix_millis(ts: OffsetDateTime) -> i64 {
    (ts.unix_timestamp_nanos() / 1_000_000) as i64
}

pub fn from_unix_millis(ms: i64) -> Result<OffsetDateTime, time::error::ComponentRange> {
    OffsetDateTime::from_unix_timestamp_nanos(i128::from(ms) * 1_000_000)
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn millis_round_trip() {
        let ts = datetime!(2024-06-01 08:30:00.250 UTC);
        let ms = unix_millis(ts);
        assert_eq!(from_unix_millis(ms).unwrap(), ts);
    }

    #[test]
    fn byte_formatting() {
        assert_eq!(bytes_to_mb(1_048_576), 1.0);
        assert_eq!(bytes_to_gb(5_368_709_120), 5.0);
    }
}
