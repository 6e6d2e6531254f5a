use std::str::FromStr;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Fixed classification of an absolute percentage difference.
///
/// The bands partition `[0, inf)`: `[0,5)` Low, `[5,15)` Medium, `[15,30)`
/// High, `[30,inf)` Critical. They do not move with the configurable
/// detection threshold, so a threshold below 5% can record a Low
/// discrepancy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// Classifies a percentage difference. The sign is irrelevant; the
    /// absolute value is what gets banded.
    pub fn for_percentage(difference_percentage: f64) -> Self {
        let p = difference_percentage.abs();
        if p < 5.0 {
            Severity::Low
        } else if p < 15.0 {
            Severity::Medium
        } else if p < 30.0 {
            Severity::High
        } else {
            Severity::Critical
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Low => "LOW",
            Severity::Medium => "MEDIUM",
            Severity::High => "HIGH",
            Severity::Critical => "CRITICAL",
        }
    }
}

#[derive(thiserror::Error, Debug)]
#[error("unknown severity '{0}'")]
pub struct ParseSeverityError(String);

impl FromStr for Severity {
    type Err = ParseSeverityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "LOW" => Ok(Severity::Low),
            "MEDIUM" => Ok(Severity::Medium),
            "HIGH" => Ok(Severity::High),
            "CRITICAL" => Ok(Severity::Critical),
            other => Err(ParseSeverityError(other.to_string())),
        }
    }
}

/// A recorded mismatch between device-measured and provider-reported usage.
///
/// Relates to its sample and report by value, not by foreign key; both sides
/// are copied in at detection time. Append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Discrepancy {
    pub id: String,
    pub timestamp: OffsetDateTime,
    pub device_measurement: i64,
    pub provider_report: i64,
    /// Signed: positive when the device measured more than the provider
    /// reported.
    pub difference_bytes: i64,
    pub difference_percentage: f64,
    pub severity: Severity,
    pub note: Option<String>,
}
