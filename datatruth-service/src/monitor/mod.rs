pub mod proc_net_dev;
pub mod synthetic;

pub use proc_net_dev::ProcNetDevMonitor;
pub use synthetic::SyntheticMonitor;

use async_trait::async_trait;
use datatruth_core::domain::DeviceUsageSample;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(thiserror::Error, Debug)]
pub enum MonitorError {
    #[error("usage counters unavailable: {0}")]
    Unavailable(String),
}

/// Capability interface over a platform's byte counters.
///
/// `Ok(None)` from the range and month queries means the platform cannot
/// answer (no entitlement, or no historical accounting); callers treat that
/// as "no data point this cycle", not as a failure.
#[async_trait]
pub trait DataMonitor: Send + Sync {
    /// A fresh sample from whatever accounting the platform offers.
    async fn current_usage(&self) -> Result<DeviceUsageSample, MonitorError>;

    async fn usage_in_range(
        &self,
        start: OffsetDateTime,
        end: OffsetDateTime,
    ) -> Result<Option<DeviceUsageSample>, MonitorError>;

    async fn current_month_usage(&self) -> Result<Option<DeviceUsageSample>, MonitorError>;

    fn operator_name(&self) -> String;

    fn has_mobile_data_capability(&self) -> bool;
}

pub(crate) fn new_sample_id() -> String {
    format!("usage_{}", Uuid::new_v4())
}
