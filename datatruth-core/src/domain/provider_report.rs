use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::domain::SampleSource;

/// A carrier-supplied usage figure, either fetched from a live API or
/// synthesized by the mock provider client. Append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderReport {
    pub id: String,
    pub timestamp: OffsetDateTime,
    pub reported_bytes: i64,
    /// Remaining allowance as reported. Not clamped: a provider that reports
    /// usage above the plan limit yields a negative remainder.
    pub remaining_bytes: Option<i64>,
    pub data_limit_bytes: Option<i64>,
    pub provider_name: String,
    pub source: SampleSource,
}
