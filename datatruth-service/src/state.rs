//! Read-only snapshot handed to the presentation layer, plus the pure
//! transition function that produces the next snapshot from an event.
//!
//! Actions never mutate the snapshot in place; the orchestration layer folds
//! events through [`reduce`].

use datatruth_core::domain::{
    DataPlan, DeviceUsageSample, Discrepancy, ProviderReport, UsageSummary,
};
use serde::Serialize;

/// Discrepancies surfaced to the dashboard.
pub const RECENT_DISCREPANCY_WINDOW: usize = 5;
/// Samples surfaced as usage history.
pub const USAGE_HISTORY_WINDOW: usize = 10;

#[derive(Debug, Clone, Default, Serialize)]
pub struct DashboardState {
    pub loading: bool,
    pub current_sample: Option<DeviceUsageSample>,
    pub provider_report: Option<ProviderReport>,
    pub recent_discrepancies: Vec<Discrepancy>,
    pub plan: Option<DataPlan>,
    pub summary: Option<UsageSummary>,
    pub usage_history: Vec<DeviceUsageSample>,
    pub operator_name: Option<String>,
    pub error: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Clone)]
pub enum Event {
    LoadStarted,
    SampleCaptured(DeviceUsageSample),
    /// A range or month query answered; no status message, the sample just
    /// becomes current.
    UsageWindowLoaded(DeviceUsageSample),
    ReportFetched(ProviderReport),
    PlanSaved(DataPlan),
    OperatorResolved(String),
    SnapshotLoaded {
        plan: Option<DataPlan>,
        report: Option<ProviderReport>,
        summary: Option<UsageSummary>,
        history: Vec<DeviceUsageSample>,
        discrepancies: Vec<Discrepancy>,
    },
    Failed(String),
    MessagesCleared,
}

pub fn reduce(state: DashboardState, event: Event) -> DashboardState {
    match event {
        Event::LoadStarted => DashboardState {
            loading: true,
            error: None,
            ..state
        },
        Event::SampleCaptured(sample) => DashboardState {
            loading: false,
            current_sample: Some(sample),
            status: Some("live usage updated".to_string()),
            error: None,
            ..state
        },
        Event::UsageWindowLoaded(sample) => DashboardState {
            loading: false,
            current_sample: Some(sample),
            error: None,
            ..state
        },
        Event::ReportFetched(report) => DashboardState {
            loading: false,
            provider_report: Some(report),
            status: Some("provider data fetched".to_string()),
            error: None,
            ..state
        },
        Event::PlanSaved(plan) => DashboardState {
            loading: false,
            plan: Some(plan),
            status: Some("data plan configured".to_string()),
            error: None,
            ..state
        },
        Event::OperatorResolved(name) => DashboardState {
            operator_name: Some(name),
            ..state
        },
        Event::SnapshotLoaded {
            plan,
            report,
            summary,
            mut history,
            mut discrepancies,
        } => {
            history.truncate(USAGE_HISTORY_WINDOW);
            discrepancies.truncate(RECENT_DISCREPANCY_WINDOW);
            DashboardState {
                loading: false,
                plan,
                provider_report: report,
                summary,
                usage_history: history,
                recent_discrepancies: discrepancies,
                ..state
            }
        }
        Event::Failed(message) => DashboardState {
            loading: false,
            error: Some(message),
            ..state
        },
        Event::MessagesCleared => DashboardState {
            error: None,
            status: None,
            ..state
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use datatruth_core::domain::SampleSource;
    use time::macros::datetime;

    fn sample(id: &str, total: i64) -> DeviceUsageSample {
        DeviceUsageSample {
            id: id.to_string(),
            timestamp: datetime!(2024-01-02 10:00 UTC),
            mobile_bytes: total,
            wifi_bytes: 0,
            total_bytes: total,
            source: SampleSource::Device,
        }
    }

    fn discrepancy(id: &str) -> Discrepancy {
        Discrepancy {
            id: id.to_string(),
            timestamp: datetime!(2024-01-02 10:00 UTC),
            device_measurement: 2_200,
            provider_report: 2_000,
            difference_bytes: 200,
            difference_percentage: 10.0,
            severity: datatruth_core::domain::Severity::Medium,
            note: None,
        }
    }

    #[test]
    fn load_started_clears_previous_error() {
        let state = DashboardState {
            error: Some("boom".to_string()),
            ..DashboardState::default()
        };
        let next = reduce(state, Event::LoadStarted);
        assert!(next.loading);
        assert!(next.error.is_none());
    }

    #[test]
    fn capture_sets_current_sample_and_status() {
        let next = reduce(
            DashboardState::default(),
            Event::SampleCaptured(sample("usage_1", 100)),
        );
        assert_eq!(next.current_sample.as_ref().unwrap().id, "usage_1");
        assert_eq!(next.status.as_deref(), Some("live usage updated"));
        assert!(!next.loading);
    }

    #[test]
    fn window_load_sets_sample_without_status() {
        let next = reduce(
            DashboardState::default(),
            Event::UsageWindowLoaded(sample("usage_1", 100)),
        );
        assert!(next.current_sample.is_some());
        assert!(next.status.is_none());
    }

    #[test]
    fn snapshot_bounds_history_and_discrepancy_windows() {
        let history: Vec<_> = (0..25).map(|i| sample(&format!("usage_{i}"), i)).collect();
        let discrepancies: Vec<_> = (0..8).map(|i| discrepancy(&format!("disc_{i}"))).collect();

        let next = reduce(
            DashboardState::default(),
            Event::SnapshotLoaded {
                plan: None,
                report: None,
                summary: None,
                history,
                discrepancies,
            },
        );

        assert_eq!(next.usage_history.len(), USAGE_HISTORY_WINDOW);
        assert_eq!(next.recent_discrepancies.len(), RECENT_DISCREPANCY_WINDOW);
        // Most recent entries survive the truncation.
        assert_eq!(next.usage_history[0].id, "usage_0");
        assert_eq!(next.recent_discrepancies[0].id, "disc_0");
    }

    #[test]
    fn failure_lands_in_the_error_field() {
        let next = reduce(
            DashboardState::default(),
            Event::Failed("usage permission required".to_string()),
        );
        assert_eq!(next.error.as_deref(), Some("usage permission required"));
        assert!(!next.loading);
    }

    #[test]
    fn clearing_messages_keeps_the_data() {
        let with_data = reduce(
            DashboardState::default(),
            Event::SampleCaptured(sample("usage_1", 100)),
        );
        let cleared = reduce(with_data, Event::MessagesCleared);
        assert!(cleared.status.is_none());
        assert!(cleared.error.is_none());
        assert!(cleared.current_sample.is_some());
    }

    #[test]
    fn reduce_is_pure_over_identical_inputs() {
        let event = Event::SampleCaptured(sample("usage_1", 100));
        let a = reduce(DashboardState::default(), event.clone());
        let b = reduce(DashboardState::default(), event);
        assert_eq!(a.current_sample, b.current_sample);
        assert_eq!(a.status, b.status);
    }
}
