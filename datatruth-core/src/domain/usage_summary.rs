use serde::{Deserialize, Serialize};

/// Plan-vs-consumption summary, recomputed on every read. Derived only;
/// never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageSummary {
    pub current_cycle_usage: i64,
    pub provider_reported_usage: Option<i64>,
    pub data_limit: Option<i64>,
    pub percentage_used: f64,
    pub days_remaining_in_cycle: i32,
    pub average_daily_usage: i64,
    pub projected_end_of_cycle_usage: i64,
    pub has_discrepancy: bool,
    /// Signed device-minus-provider gap; 0 when no provider report exists.
    pub discrepancy_amount: i64,
}
