//! Discrepancy detection and usage-summary computation.
//!
//! Everything here is a pure function over immutable inputs: no I/O, no
//! clocks, no shared state. Callers resolve collaborator reads (latest
//! sample, latest report, active plan) and the current instant first, then
//! invoke.

use time::OffsetDateTime;

use crate::domain::{
    unix_millis, DataPlan, DeviceUsageSample, Discrepancy, ProviderReport, Severity, UsageSummary,
};

/// Billing cycles are approximated as a fixed 30 days, not calendar months.
pub const CYCLE_DAYS: i64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CyclePosition {
    pub days_elapsed: i64,
    pub days_remaining: i64,
}

/// Position within the fixed 30-day billing cycle.
///
/// The day-of-cycle is `(epoch_day % 30) + 1`, so it drifts relative to the
/// calendar; that approximation is intentional.
pub fn cycle_position(billing_cycle_start_day: u8, now: OffsetDateTime) -> CyclePosition {
    let epoch_day = now.unix_timestamp().div_euclid(86_400);
    let current_day = epoch_day.rem_euclid(CYCLE_DAYS) + 1;
    let start_day = i64::from(billing_cycle_start_day);

    let days_elapsed = if current_day >= start_day {
        current_day - start_day
    } else {
        (CYCLE_DAYS - start_day) + current_day
    };
    let days_remaining = (CYCLE_DAYS - days_elapsed).clamp(0, CYCLE_DAYS);

    CyclePosition {
        days_elapsed,
        days_remaining,
    }
}

/// Compares a device sample against a provider report and returns a
/// discrepancy record when the gap exceeds `threshold_percent`.
///
/// Returns `None` when the report is zero bytes (no meaningful baseline to
/// divide by) and when the absolute percentage gap is at or below the
/// threshold; the boundary itself does not trigger. Severity is classified
/// on the absolute percentage with fixed bands, independent of the
/// configured threshold.
///
/// Does not deduplicate: evaluating the same pair twice yields two records
/// with distinct instant-derived ids.
pub fn evaluate_discrepancy(
    sample: &DeviceUsageSample,
    report: &ProviderReport,
    threshold_percent: f64,
    now: OffsetDateTime,
) -> Option<Discrepancy> {
    if report.reported_bytes == 0 {
        return None;
    }

    let difference_bytes = sample.total_bytes - report.reported_bytes;
    let difference_percentage =
        difference_bytes as f64 / report.reported_bytes as f64 * 100.0;

    if difference_percentage.abs() <= threshold_percent {
        return None;
    }

    let note = if difference_bytes > 0 {
        "device measured more data"
    } else {
        "provider reported more data"
    };

    Some(Discrepancy {
        id: format!("disc_{}", unix_millis(now)),
        timestamp: now,
        device_measurement: sample.total_bytes,
        provider_report: report.reported_bytes,
        difference_bytes,
        difference_percentage,
        severity: Severity::for_percentage(difference_percentage),
        note: Some(note.to_string()),
    })
}

/// Aggregates the active plan and the latest readings into a [`UsageSummary`].
///
/// The provider report is the authoritative cycle usage when present; the
/// most recent device sample is the fallback, then 0. The summary-level
/// discrepancy compares the device sample against the report (both sides
/// must exist), against an allowance of the plan limit scaled by the plan's
/// discrepancy threshold.
pub fn compute_summary(
    plan: &DataPlan,
    latest_report: Option<&ProviderReport>,
    latest_sample: Option<&DeviceUsageSample>,
    now: OffsetDateTime,
) -> UsageSummary {
    let cycle = cycle_position(plan.billing_cycle_start_day, now);

    let provider_reported = latest_report.map(|r| r.reported_bytes);
    let current_cycle_usage = provider_reported
        .or_else(|| latest_sample.map(|s| s.total_bytes))
        .unwrap_or(0);

    let percentage_used =
        current_cycle_usage as f64 / plan.data_limit_bytes as f64 * 100.0;

    let average_daily_usage = if cycle.days_elapsed > 0 {
        current_cycle_usage / cycle.days_elapsed
    } else {
        0
    };
    let projected_end_of_cycle_usage = average_daily_usage * CYCLE_DAYS;

    let (has_discrepancy, discrepancy_amount) = match provider_reported {
        Some(reported) => {
            let device_side = latest_sample
                .map(|s| s.total_bytes)
                .unwrap_or(current_cycle_usage);
            let gap = device_side - reported;
            let allowance =
                plan.data_limit_bytes as f64 * plan.discrepancy_threshold_percentage / 100.0;
            (gap.abs() as f64 > allowance, gap)
        }
        None => (false, 0),
    };

    UsageSummary {
        current_cycle_usage,
        provider_reported_usage: provider_reported,
        data_limit: Some(plan.data_limit_bytes),
        percentage_used,
        days_remaining_in_cycle: cycle.days_remaining as i32,
        average_daily_usage,
        projected_end_of_cycle_usage,
        has_discrepancy,
        discrepancy_amount,
    }
}
