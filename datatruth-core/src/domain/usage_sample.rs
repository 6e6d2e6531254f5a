use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Which side of the reconciliation a record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SampleSource {
    Device,
    Provider,
}

impl SampleSource {
    pub fn as_str(self) -> &'static str {
        match self {
            SampleSource::Device => "DEVICE",
            SampleSource::Provider => "PROVIDER",
        }
    }
}

/// A single point-in-time measurement of device data consumption.
///
/// Append-only: samples are never updated or deleted once stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceUsageSample {
    pub id: String,
    pub timestamp: OffsetDateTime,
    pub mobile_bytes: i64,
    pub wifi_bytes: i64,
    pub total_bytes: i64,
    pub source: SampleSource,
}

impl DeviceUsageSample {
    /// Builds a sample whose total is the sum of its parts. Sources that can
    /// only observe an aggregate counter set the fields directly instead.
    pub fn new(
        id: impl Into<String>,
        timestamp: OffsetDateTime,
        mobile_bytes: i64,
        wifi_bytes: i64,
    ) -> Self {
        Self {
            id: id.into(),
            timestamp,
            mobile_bytes,
            wifi_bytes,
            total_bytes: mobile_bytes + wifi_bytes,
            source: SampleSource::Device,
        }
    }
}
